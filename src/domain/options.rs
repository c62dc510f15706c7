//! Request options, consistency levels and resource responses

use crate::domain::document::PartitionKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Consistency level requested for a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConsistencyLevel {
    Strong,
    BoundedStaleness,
    #[default]
    Session,
    Eventual,
    ConsistentPrefix,
}

impl ConsistencyLevel {
    /// Value of the `x-ms-consistency-level` header
    pub fn as_header_value(&self) -> &'static str {
        match self {
            ConsistencyLevel::Strong => "Strong",
            ConsistencyLevel::BoundedStaleness => "BoundedStaleness",
            ConsistencyLevel::Session => "Session",
            ConsistencyLevel::Eventual => "Eventual",
            ConsistencyLevel::ConsistentPrefix => "ConsistentPrefix",
        }
    }
}

impl fmt::Display for ConsistencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_header_value())
    }
}

impl FromStr for ConsistencyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strong" => Ok(ConsistencyLevel::Strong),
            "boundedstaleness" | "bounded_staleness" => Ok(ConsistencyLevel::BoundedStaleness),
            "session" => Ok(ConsistencyLevel::Session),
            "eventual" => Ok(ConsistencyLevel::Eventual),
            "consistentprefix" | "consistent_prefix" => Ok(ConsistencyLevel::ConsistentPrefix),
            _ => Err(format!(
                "Invalid consistency level '{s}'. Must be one of: Strong, BoundedStaleness, Session, Eventual, ConsistentPrefix"
            )),
        }
    }
}

/// Per-write override of the collection's automatic indexing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IndexingDirective {
    /// Follow the collection's indexing policy
    #[default]
    Default,
    /// Index the document even if the policy is manual
    Include,
    /// Keep the document out of the index
    Exclude,
}

impl IndexingDirective {
    /// Value of the `x-ms-indexing-directive` header; `None` for the default
    pub fn as_header_value(&self) -> Option<&'static str> {
        match self {
            IndexingDirective::Default => None,
            IndexingDirective::Include => Some("Include"),
            IndexingDirective::Exclude => Some("Exclude"),
        }
    }
}

/// Options of a single write or script call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    pub indexing_directive: IndexingDirective,

    /// Explicit partition key; extracted from the document when absent
    pub partition_key: Option<PartitionKey>,

    /// Pre-triggers to run, by id
    pub pre_triggers: Vec<String>,

    /// Post-triggers to run, by id
    pub post_triggers: Vec<String>,

    /// Assign a random `id` to documents that lack one
    pub generate_id: bool,
}

impl RequestOptions {
    pub fn with_indexing_directive(mut self, directive: IndexingDirective) -> Self {
        self.indexing_directive = directive;
        self
    }

    pub fn with_partition_key(mut self, key: impl Into<PartitionKey>) -> Self {
        self.partition_key = Some(key.into());
        self
    }

    pub fn with_pre_trigger(mut self, id: impl Into<String>) -> Self {
        self.pre_triggers.push(id.into());
        self
    }

    pub fn with_post_trigger(mut self, id: impl Into<String>) -> Self {
        self.post_triggers.push(id.into());
        self
    }

    pub fn with_generated_id(mut self) -> Self {
        self.generate_id = true;
        self
    }
}

/// A resource returned by the store together with its cost metadata
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceResponse<T> {
    pub resource: T,

    /// Request units charged for the call
    pub request_charge: f64,

    /// Service-assigned request id, if reported
    pub activity_id: Option<String>,
}

impl<T> ResourceResponse<T> {
    pub fn new(resource: T, request_charge: f64, activity_id: Option<String>) -> Self {
        Self {
            resource,
            request_charge,
            activity_id,
        }
    }

    /// Keeps the cost metadata while transforming the resource
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ResourceResponse<U> {
        ResourceResponse {
            resource: f(self.resource),
            request_charge: self.request_charge,
            activity_id: self.activity_id,
        }
    }

    pub fn into_resource(self) -> T {
        self.resource
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("Strong", ConsistencyLevel::Strong)]
    #[test_case("session", ConsistencyLevel::Session)]
    #[test_case("BoundedStaleness", ConsistencyLevel::BoundedStaleness)]
    #[test_case("consistent_prefix", ConsistencyLevel::ConsistentPrefix)]
    #[test_case("EVENTUAL", ConsistencyLevel::Eventual)]
    fn test_consistency_level_parse(input: &str, expected: ConsistencyLevel) {
        assert_eq!(input.parse::<ConsistencyLevel>().unwrap(), expected);
    }

    #[test]
    fn test_consistency_level_rejects_unknown() {
        assert!("linearizable".parse::<ConsistencyLevel>().is_err());
        assert_eq!(ConsistencyLevel::default(), ConsistencyLevel::Session);
        assert_eq!(ConsistencyLevel::Eventual.to_string(), "Eventual");
    }

    #[test]
    fn test_indexing_directive_header() {
        assert_eq!(IndexingDirective::Default.as_header_value(), None);
        assert_eq!(IndexingDirective::Include.as_header_value(), Some("Include"));
        assert_eq!(IndexingDirective::Exclude.as_header_value(), Some("Exclude"));
    }

    #[test]
    fn test_request_options_builders() {
        let options = RequestOptions::default()
            .with_indexing_directive(IndexingDirective::Exclude)
            .with_post_trigger("UpdateMetadata")
            .with_partition_key("Device001")
            .with_generated_id();
        assert_eq!(options.indexing_directive, IndexingDirective::Exclude);
        assert_eq!(options.post_triggers, vec!["UpdateMetadata".to_string()]);
        assert!(options.pre_triggers.is_empty());
        assert!(options.generate_id);
    }

    #[test]
    fn test_resource_response_map() {
        let response = ResourceResponse::new(2, 5.5, Some("abc".to_string()));
        let mapped = response.map(|n| n * 10);
        assert_eq!(mapped.resource, 20);
        assert_eq!(mapped.request_charge, 5.5);
        assert_eq!(mapped.activity_id.as_deref(), Some("abc"));
    }
}
