//! Query specifications, feed options and result pages

use crate::domain::document::{Document, PartitionKey};
use crate::domain::{Result, SamplesError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Page size the samples use unless configured otherwise
pub const DEFAULT_MAX_ITEM_COUNT: u32 = 500;

/// A named query parameter, e.g. `@id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlParameter {
    /// Parameter name including the leading `@`
    pub name: String,

    /// Parameter value
    pub value: Value,
}

/// Query text plus its parameters; the body of a query request
///
/// # Examples
///
/// ```
/// use cosmos_samples::domain::SqlQuerySpec;
///
/// let spec = SqlQuerySpec::new("SELECT * FROM root r WHERE r.id = @id")
///     .with_parameter("@id", "IndexManagement")
///     .unwrap();
/// assert_eq!(spec.parameters.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlQuerySpec {
    /// SQL query text
    pub query: String,

    /// Named parameters
    #[serde(default)]
    pub parameters: Vec<SqlParameter>,
}

impl SqlQuerySpec {
    /// Creates a spec without parameters
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            parameters: Vec::new(),
        }
    }

    /// Adds a named parameter
    ///
    /// # Errors
    ///
    /// Returns a validation error if the name does not start with `@` or the
    /// value cannot be serialized to JSON.
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Serialize) -> Result<Self> {
        let name = name.into();
        validate_parameter_name(&name)?;
        let value = serde_json::to_value(value)?;
        self.parameters.push(SqlParameter { name, value });
        Ok(self)
    }

    /// Looks up a parameter value by name
    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }

    /// Rejects specs that cannot be sent: empty text or malformed parameter names
    pub fn validate(&self) -> Result<()> {
        if self.query.trim().is_empty() {
            return Err(SamplesError::Validation(
                "Query text cannot be empty".to_string(),
            ));
        }
        for parameter in &self.parameters {
            validate_parameter_name(&parameter.name)?;
        }
        Ok(())
    }
}

impl From<&str> for SqlQuerySpec {
    fn from(query: &str) -> Self {
        Self::new(query)
    }
}

impl From<String> for SqlQuerySpec {
    fn from(query: String) -> Self {
        Self::new(query)
    }
}

fn validate_parameter_name(name: &str) -> Result<()> {
    let valid = name.len() > 1
        && name.starts_with('@')
        && name[1..]
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(SamplesError::Validation(format!(
            "Invalid query parameter name '{name}'. Parameter names start with '@' followed by letters, digits or '_'"
        )))
    }
}

/// Paging and routing options of a query
#[derive(Debug, Clone, PartialEq)]
pub struct FeedOptions {
    /// Maximum number of documents per page; `None` lets the service decide
    pub max_item_count: Option<u32>,

    /// Allow the query to fan out across partitions
    pub enable_cross_partition_query: bool,

    /// Restrict the query to a single partition
    pub partition_key: Option<PartitionKey>,

    /// Allow filters on paths that are not indexed
    pub enable_scan_in_query: bool,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            max_item_count: Some(DEFAULT_MAX_ITEM_COUNT),
            enable_cross_partition_query: true,
            partition_key: None,
            enable_scan_in_query: false,
        }
    }
}

impl FeedOptions {
    /// Sets the page size
    pub fn with_max_item_count(mut self, count: u32) -> Self {
        self.max_item_count = Some(count);
        self
    }

    /// Enables or disables cross-partition fan-out
    pub fn with_cross_partition(mut self, enabled: bool) -> Self {
        self.enable_cross_partition_query = enabled;
        self
    }

    /// Routes the query to one partition
    pub fn with_partition_key(mut self, key: impl Into<PartitionKey>) -> Self {
        self.partition_key = Some(key.into());
        self
    }

    /// Allows scans over non-indexed paths
    pub fn with_scan_in_query(mut self, enabled: bool) -> Self {
        self.enable_scan_in_query = enabled;
        self
    }
}

/// One page of query results
///
/// Pages are produced lazily by a query pager; none are persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultPage {
    /// Zero-based position of the page in its query
    pub page_index: usize,

    /// Documents in result order
    pub documents: Vec<Document>,

    /// Request units charged for this page
    pub request_charge: f64,

    /// Request units charged for this page and every page before it
    pub cumulative_request_charge: f64,

    /// Token to fetch the next page, absent on the last page
    pub continuation: Option<String>,

    /// Service-assigned id of the request that produced the page
    pub activity_id: Option<String>,
}

impl ResultPage {
    /// Number of documents in the page
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the page holds no documents
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Whether more pages follow
    pub fn has_more(&self) -> bool {
        self.continuation.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_spec_parameters() {
        let spec = SqlQuerySpec::new("SELECT * FROM root r WHERE r.id=@id")
            .with_parameter("@id", "db1")
            .unwrap();
        assert_eq!(spec.parameter("@id"), Some(&json!("db1")));
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_query_spec_serializes_as_request_body() {
        let spec = SqlQuerySpec::new("SELECT * FROM c WHERE c.n > @n")
            .with_parameter("@n", 5)
            .unwrap();
        let body = serde_json::to_value(&spec).unwrap();
        assert_eq!(
            body,
            json!({
                "query": "SELECT * FROM c WHERE c.n > @n",
                "parameters": [{"name": "@n", "value": 5}]
            })
        );
    }

    #[test]
    fn test_query_spec_rejects_bad_input() {
        assert!(SqlQuerySpec::new("").validate().is_err());
        assert!(SqlQuerySpec::new("   ").validate().is_err());
        assert!(SqlQuerySpec::new("SELECT * FROM c")
            .with_parameter("id", 1)
            .is_err());
        assert!(SqlQuerySpec::new("SELECT * FROM c")
            .with_parameter("@", 1)
            .is_err());
        assert!(SqlQuerySpec::new("SELECT * FROM c")
            .with_parameter("@a-b", 1)
            .is_err());
    }

    #[test]
    fn test_feed_options_defaults() {
        let options = FeedOptions::default();
        assert_eq!(options.max_item_count, Some(500));
        assert!(options.enable_cross_partition_query);
        assert!(options.partition_key.is_none());
        assert!(!options.enable_scan_in_query);
    }

    #[test]
    fn test_feed_options_builders() {
        let options = FeedOptions::default()
            .with_max_item_count(10)
            .with_cross_partition(false)
            .with_partition_key("Device001")
            .with_scan_in_query(true);
        assert_eq!(options.max_item_count, Some(10));
        assert!(!options.enable_cross_partition_query);
        assert_eq!(options.partition_key, Some(PartitionKey::from("Device001")));
        assert!(options.enable_scan_in_query);
    }
}
