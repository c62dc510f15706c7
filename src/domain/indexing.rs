//! Indexing policies and collection definitions
//!
//! These types serialize to the JSON shape the service expects in a
//! create-collection body, so they are sent as-is or mapped onto the SDK's
//! container properties.

use crate::domain::document::PartitionKeyDefinition;
use crate::domain::ids::{CollectionId, DatabaseId};
use serde::{Deserialize, Serialize};

/// When index updates are applied relative to writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexingMode {
    /// Index updated synchronously with each write
    #[default]
    Consistent,
    /// Index updated asynchronously; queries may be eventually consistent
    Lazy,
    /// No index; queries require scans
    None,
}

/// A path pattern to include in the index, e.g. `/*`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludedPath {
    pub path: String,
}

/// A path pattern to exclude from the index, e.g. `/nonsearchable/?`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludedPath {
    pub path: String,
}

/// Indexing policy of a collection
///
/// # Examples
///
/// ```
/// use cosmos_samples::domain::{IndexingMode, IndexingPolicy};
///
/// let policy = IndexingPolicy::default()
///     .include_path("/*")
///     .exclude_path("/nonsearchable/?");
/// assert!(policy.automatic);
/// assert_eq!(policy.indexing_mode, IndexingMode::Consistent);
/// assert!(policy.is_path_excluded("/nonsearchable"));
/// assert!(!policy.is_path_excluded("/searchable"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexingPolicy {
    /// Index documents on write unless they opt out
    pub automatic: bool,

    pub indexing_mode: IndexingMode,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included_paths: Vec<IncludedPath>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_paths: Vec<ExcludedPath>,
}

impl Default for IndexingPolicy {
    fn default() -> Self {
        Self {
            automatic: true,
            indexing_mode: IndexingMode::Consistent,
            included_paths: Vec::new(),
            excluded_paths: Vec::new(),
        }
    }
}

impl IndexingPolicy {
    /// Policy under which documents are only indexed on explicit request
    pub fn manual() -> Self {
        Self {
            automatic: false,
            ..Self::default()
        }
    }

    /// Policy with the given mode
    pub fn with_mode(mode: IndexingMode) -> Self {
        Self {
            indexing_mode: mode,
            ..Self::default()
        }
    }

    pub fn include_path(mut self, path: impl Into<String>) -> Self {
        self.included_paths.push(IncludedPath { path: path.into() });
        self
    }

    pub fn exclude_path(mut self, path: impl Into<String>) -> Self {
        self.excluded_paths.push(ExcludedPath { path: path.into() });
        self
    }

    /// Whether a property path such as `/nonsearchable` falls under an
    /// excluded pattern
    ///
    /// Patterns end in `/?` (the scalar at that path) or `/*` (everything
    /// below it). A bare `/*` exclusion covers every path.
    pub fn is_path_excluded(&self, path: &str) -> bool {
        let path = path.trim_end_matches('/');
        self.excluded_paths.iter().any(|excluded| {
            let pattern = excluded.path.as_str();
            if let Some(prefix) = pattern.strip_suffix("/?") {
                path == prefix
            } else if let Some(prefix) = pattern.strip_suffix("/*") {
                prefix.is_empty() || path == prefix || path.starts_with(&format!("{prefix}/"))
            } else {
                path == pattern
            }
        })
    }
}

/// Body of a create-collection request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionDefinition {
    pub id: CollectionId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexing_policy: Option<IndexingPolicy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_key: Option<PartitionKeyDefinition>,
}

impl CollectionDefinition {
    /// Creates a definition with the service defaults
    pub fn new(id: CollectionId) -> Self {
        Self {
            id,
            indexing_policy: None,
            partition_key: None,
        }
    }

    /// Validates the raw name, then creates a definition
    pub fn named(id: &str) -> Result<Self, String> {
        Ok(Self::new(CollectionId::new(id)?))
    }

    pub fn with_indexing_policy(mut self, policy: IndexingPolicy) -> Self {
        self.indexing_policy = Some(policy);
        self
    }

    pub fn with_partition_key(mut self, key: PartitionKeyDefinition) -> Self {
        self.partition_key = Some(key);
        self
    }

    /// The policy in effect, falling back to the service default
    pub fn effective_indexing_policy(&self) -> IndexingPolicy {
        self.indexing_policy.clone().unwrap_or_default()
    }
}

/// A database as reported by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    pub id: DatabaseId,

    /// Service resource id
    #[serde(rename = "_rid", default, skip_serializing_if = "Option::is_none")]
    pub rid: Option<String>,

    /// Self link
    #[serde(rename = "_self", default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
}

impl DatabaseInfo {
    pub fn new(id: DatabaseId) -> Self {
        Self {
            id,
            rid: None,
            self_link: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_policy() {
        let policy = IndexingPolicy::default();
        assert!(policy.automatic);
        assert_eq!(policy.indexing_mode, IndexingMode::Consistent);
        assert!(!IndexingPolicy::manual().automatic);
        assert_eq!(
            IndexingPolicy::with_mode(IndexingMode::Lazy).indexing_mode,
            IndexingMode::Lazy
        );
    }

    #[test]
    fn test_policy_serializes_to_wire_shape() {
        let policy = IndexingPolicy::default()
            .include_path("/*")
            .exclude_path("/nonsearchable/?");
        let json = serde_json::to_value(&policy).unwrap();
        assert_eq!(
            json,
            json!({
                "automatic": true,
                "indexingMode": "consistent",
                "includedPaths": [{"path": "/*"}],
                "excludedPaths": [{"path": "/nonsearchable/?"}]
            })
        );
    }

    #[test]
    fn test_path_exclusion_patterns() {
        let policy = IndexingPolicy::default()
            .exclude_path("/nonsearchable/?")
            .exclude_path("/metadata/*");
        assert!(policy.is_path_excluded("/nonsearchable"));
        assert!(!policy.is_path_excluded("/nonsearchable/inner"));
        assert!(policy.is_path_excluded("/metadata"));
        assert!(policy.is_path_excluded("/metadata/created/by"));
        assert!(!policy.is_path_excluded("/metadataX"));
        assert!(!policy.is_path_excluded("/contact"));

        let everything = IndexingPolicy::default().exclude_path("/*");
        assert!(everything.is_path_excluded("/contact"));
    }

    #[test]
    fn test_collection_definition_body() {
        let def = CollectionDefinition::named("jsexamples")
            .unwrap()
            .with_partition_key(PartitionKeyDefinition::hash("/DeviceId"));
        let json = serde_json::to_value(&def).unwrap();
        assert_eq!(
            json,
            json!({
                "id": "jsexamples",
                "partitionKey": {"paths": ["/DeviceId"], "kind": "Hash"}
            })
        );
        assert!(CollectionDefinition::named("").is_err());
        assert_eq!(def.effective_indexing_policy(), IndexingPolicy::default());
    }

    #[test]
    fn test_database_info_deserializes_system_fields() {
        let info: DatabaseInfo =
            serde_json::from_value(json!({"id": "IndexManagement", "_rid": "abc==", "_self": "dbs/abc==/"}))
                .unwrap();
        assert_eq!(info.id.as_str(), "IndexManagement");
        assert_eq!(info.rid.as_deref(), Some("abc=="));
    }
}
