//! Documents and partition keys
//!
//! A [`Document`] is an opaque JSON object. The store only cares about two
//! of its properties: the required `id` and, for partitioned collections,
//! the property named by the collection's [`PartitionKeyDefinition`].

use crate::domain::ids::validate_resource_id;
use crate::domain::{Result, SamplesError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Properties the service adds to every stored resource
pub const SYSTEM_PROPERTIES: [&str; 5] = ["_rid", "_self", "_etag", "_ts", "_attachments"];

/// Opaque JSON document with a required `id`
///
/// # Examples
///
/// ```
/// use cosmos_samples::domain::Document;
/// use serde_json::json;
///
/// let doc = Document::from_value(json!({"id": "doc1", "contact": "email"})).unwrap();
/// assert_eq!(doc.id(), Some("doc1"));
/// assert_eq!(doc.get("contact"), Some(&json!("email")));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    /// Creates an empty document
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Wraps a JSON value; only objects are documents
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(SamplesError::Validation(format!(
                "A document must be a JSON object, got: {other}"
            ))),
        }
    }

    /// Parses a JSON string into a document
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(json)?)
    }

    /// Serializes any serde type into a document
    pub fn from_serializable<T: Serialize>(value: &T) -> Result<Self> {
        Self::from_value(serde_json::to_value(value)?)
    }

    /// Deserializes the document into a typed value
    pub fn to_typed<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(Value::Object(self.0.clone()))?)
    }

    /// The `id` property, if present and a string
    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(Value::as_str)
    }

    /// Sets the `id` property
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.0.insert("id".to_string(), Value::String(id.into()));
    }

    /// Top-level property lookup
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Lookup by a `/`-separated property path such as `/Locations/City`
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.trim_start_matches('/').split('/');
        let first = segments.next()?;
        let mut current = self.0.get(first)?;
        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Inserts a top-level property, returning the previous value
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// All properties
    pub fn properties(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Number of top-level properties
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the document has no properties
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Copy of the document without service-assigned properties
    pub fn without_system_properties(&self) -> Self {
        let mut map = self.0.clone();
        for key in SYSTEM_PROPERTIES {
            map.remove(key);
        }
        Self(map)
    }

    /// Unwraps into a JSON value
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Checks the fields a create request requires
    ///
    /// The `id` must be present, be a string and follow the resource id
    /// rules (non-empty, no `/`, `\`, `?` or `#`).
    pub fn validate_for_create(&self) -> std::result::Result<(), String> {
        match self.0.get("id") {
            None => Err("The input content is invalid because the required property, 'id', is missing".to_string()),
            Some(Value::String(id)) => validate_resource_id("Document", id),
            Some(other) => Err(format!("Document 'id' must be a string, got: {other}")),
        }
    }

    /// Extracts the partition key value under the given definition
    ///
    /// Returns [`PartitionKey::Undefined`] when the collection is not
    /// partitioned or the document lacks the property.
    pub fn partition_key(&self, definition: Option<&PartitionKeyDefinition>) -> PartitionKey {
        definition
            .and_then(|def| def.paths.first())
            .and_then(|path| self.get_path(path))
            .map(|v| PartitionKey::Value(v.clone()))
            .unwrap_or(PartitionKey::Undefined)
    }
}

impl TryFrom<Value> for Document {
    type Error = SamplesError;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_value(value)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        doc.into_value()
    }
}

/// A partition key value used to route a request
#[derive(Debug, Clone, PartialEq)]
pub enum PartitionKey {
    /// A concrete JSON value (string, number, bool or null)
    Value(Value),
    /// The document has no value at the partition key path
    Undefined,
}

impl PartitionKey {
    /// Wire form used by the `x-ms-documentdb-partitionkey` header
    pub fn header_value(&self) -> String {
        match self {
            PartitionKey::Value(v) => Value::Array(vec![v.clone()]).to_string(),
            PartitionKey::Undefined => "[{}]".to_string(),
        }
    }
}

impl From<&str> for PartitionKey {
    fn from(value: &str) -> Self {
        PartitionKey::Value(Value::String(value.to_string()))
    }
}

impl From<String> for PartitionKey {
    fn from(value: String) -> Self {
        PartitionKey::Value(Value::String(value))
    }
}

impl From<Value> for PartitionKey {
    fn from(value: Value) -> Self {
        PartitionKey::Value(value)
    }
}

impl From<i64> for PartitionKey {
    fn from(value: i64) -> Self {
        PartitionKey::Value(Value::from(value))
    }
}

/// Partitioning strategy; the service only offers hash partitioning here
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PartitionKind {
    #[default]
    Hash,
}

/// Partition key definition of a collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionKeyDefinition {
    /// Property paths, e.g. `["/DeviceId"]`
    pub paths: Vec<String>,

    /// Partitioning kind
    #[serde(default)]
    pub kind: PartitionKind,
}

impl PartitionKeyDefinition {
    /// Hash partitioning on a single path
    pub fn hash(path: impl Into<String>) -> Self {
        Self {
            paths: vec![path.into()],
            kind: PartitionKind::Hash,
        }
    }

    /// Checks that exactly one path is given and that it starts with `/`
    pub fn validate(&self) -> std::result::Result<(), String> {
        match self.paths.as_slice() {
            [path] if path.starts_with('/') && path.len() > 1 => Ok(()),
            [path] => Err(format!("Partition key path '{path}' must start with '/'")),
            _ => Err(format!(
                "Exactly one partition key path is supported, got {}",
                self.paths.len()
            )),
        }
    }
}
