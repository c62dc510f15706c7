//! Server-side script resources
//!
//! Script bodies are opaque JavaScript; nothing here interprets them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A stored procedure registered on a collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredProcedure {
    pub id: String,
    pub body: String,
}

impl StoredProcedure {
    pub fn new(id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            body: body.into(),
        }
    }
}

/// Whether a trigger runs before or after the operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerType {
    Pre,
    Post,
}

/// Operation a trigger is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerOperation {
    All,
    Create,
    Update,
    Delete,
    Replace,
}

/// A trigger registered on a collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    pub id: String,
    pub body: String,
    pub trigger_type: TriggerType,
    pub trigger_operation: TriggerOperation,
}

impl Trigger {
    pub fn new(
        id: impl Into<String>,
        body: impl Into<String>,
        trigger_type: TriggerType,
        trigger_operation: TriggerOperation,
    ) -> Self {
        Self {
            id: id.into(),
            body: body.into(),
            trigger_type,
            trigger_operation,
        }
    }
}

/// Result of a stored procedure execution
#[derive(Debug, Clone, PartialEq)]
pub struct StoredProcedureResponse {
    /// Whatever the script passed to `setBody`
    pub response: Value,
    pub request_charge: f64,
    pub activity_id: Option<String>,
}

impl StoredProcedureResponse {
    /// The response rendered as text; strings are returned without quotes
    pub fn response_as_string(&self) -> String {
        match &self.response {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// Per-device aggregate maintained by the `UpdateMetadata` post-trigger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetadataAggregate {
    #[serde(rename = "id")]
    pub id: String,
    pub is_metadata: bool,
    pub min_size: i64,
    pub max_size: i64,
    pub total_size: i64,
    /// Documents folded in so far; the trigger seeds min/max when this is 0
    #[serde(default)]
    pub document_count: u64,
    pub device_id: String,
}

impl MetadataAggregate {
    /// A fresh aggregate: `{id}_metadata` with zeroed sizes
    pub fn new(device_id: impl Into<String>) -> Self {
        let device_id = device_id.into();
        Self {
            id: format!("{device_id}_metadata"),
            is_metadata: true,
            min_size: 0,
            max_size: 0,
            total_size: 0,
            document_count: 0,
            device_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_trigger_wire_shape() {
        let trigger = Trigger::new("UpdateMetadata", "function(){}", TriggerType::Post, TriggerOperation::Create);
        assert_eq!(
            serde_json::to_value(&trigger).unwrap(),
            json!({
                "id": "UpdateMetadata",
                "body": "function(){}",
                "triggerType": "Post",
                "triggerOperation": "Create"
            })
        );
    }

    #[test]
    fn test_response_as_string() {
        let mut response = StoredProcedureResponse {
            response: json!("Hello, World"),
            request_charge: 1.0,
            activity_id: None,
        };
        assert_eq!(response.response_as_string(), "Hello, World");
        response.response = json!({"a": 1});
        assert_eq!(response.response_as_string(), "{\"a\":1}");
        response.response = Value::Null;
        assert_eq!(response.response_as_string(), "");
    }

    #[test]
    fn test_metadata_aggregate_field_names() {
        let aggregate = MetadataAggregate::new("Device001");
        assert_eq!(
            serde_json::to_value(&aggregate).unwrap(),
            json!({
                "id": "Device001_metadata",
                "IsMetadata": true,
                "MinSize": 0,
                "MaxSize": 0,
                "TotalSize": 0,
                "DocumentCount": 0,
                "DeviceId": "Device001"
            })
        );
    }

    #[test]
    fn test_metadata_aggregate_without_count_reads_as_empty() {
        let aggregate: MetadataAggregate = serde_json::from_value(json!({
            "id": "Device001_metadata",
            "IsMetadata": true,
            "MinSize": 0,
            "MaxSize": 0,
            "TotalSize": 0,
            "DeviceId": "Device001"
        }))
        .unwrap();
        assert_eq!(aggregate.document_count, 0);
    }
}
