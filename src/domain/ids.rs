//! Resource identifier types with validation
//!
//! Newtype wrappers for database and collection identifiers, plus the
//! `CollectionRef` pair that addresses a collection inside a database.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const MAX_RESOURCE_ID_LEN: usize = 255;

pub(crate) fn validate_resource_id(kind: &str, id: &str) -> Result<(), String> {
    if id.trim().is_empty() {
        return Err(format!("{kind} ID cannot be empty"));
    }
    if id.len() > MAX_RESOURCE_ID_LEN {
        return Err(format!(
            "{kind} ID cannot be longer than {MAX_RESOURCE_ID_LEN} characters"
        ));
    }
    if let Some(c) = id.chars().find(|c| matches!(c, '/' | '\\' | '?' | '#')) {
        return Err(format!("{kind} ID '{id}' contains invalid character '{c}'"));
    }
    Ok(())
}

/// Database identifier newtype wrapper
///
/// # Examples
///
/// ```
/// use cosmos_samples::domain::ids::DatabaseId;
///
/// let db = DatabaseId::new("IndexManagement").unwrap();
/// assert_eq!(db.link(), "dbs/IndexManagement");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DatabaseId(String);

impl DatabaseId {
    /// Creates a new DatabaseId, rejecting empty ids and reserved characters
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        validate_resource_id("Database", &id)?;
        Ok(Self(id))
    }

    /// Returns the database ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resource link of the database: `dbs/{id}`
    pub fn link(&self) -> String {
        format!("dbs/{}", self.0)
    }
}

impl fmt::Display for DatabaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DatabaseId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for DatabaseId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DatabaseId> for String {
    fn from(id: DatabaseId) -> Self {
        id.0
    }
}

impl AsRef<str> for DatabaseId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Collection identifier newtype wrapper
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CollectionId(String);

impl CollectionId {
    /// Creates a new CollectionId, rejecting empty ids and reserved characters
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        validate_resource_id("Collection", &id)?;
        Ok(Self(id))
    }

    /// Returns the collection ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CollectionId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for CollectionId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CollectionId> for String {
    fn from(id: CollectionId) -> Self {
        id.0
    }
}

impl AsRef<str> for CollectionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Reference to a collection inside a database
///
/// Renders as the resource link `dbs/{db}/colls/{coll}` and parses from
/// that form, with or without a leading slash.
///
/// # Examples
///
/// ```
/// use cosmos_samples::domain::ids::CollectionRef;
/// use std::str::FromStr;
///
/// let coll = CollectionRef::from_str("/dbs/ServerSideScripts/colls/jsexamples").unwrap();
/// assert_eq!(coll.database().as_str(), "ServerSideScripts");
/// assert_eq!(coll.link(), "dbs/ServerSideScripts/colls/jsexamples");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionRef {
    database: DatabaseId,
    collection: CollectionId,
}

impl CollectionRef {
    /// Creates a reference from already validated ids
    pub fn new(database: DatabaseId, collection: CollectionId) -> Self {
        Self {
            database,
            collection,
        }
    }

    /// Validates and combines raw database and collection names
    pub fn from_names(database: &str, collection: &str) -> Result<Self, String> {
        Ok(Self::new(
            DatabaseId::new(database)?,
            CollectionId::new(collection)?,
        ))
    }

    /// The owning database
    pub fn database(&self) -> &DatabaseId {
        &self.database
    }

    /// The collection id
    pub fn collection(&self) -> &CollectionId {
        &self.collection
    }

    /// Resource link of the collection: `dbs/{db}/colls/{coll}`
    pub fn link(&self) -> String {
        format!("dbs/{}/colls/{}", self.database, self.collection)
    }

    /// Resource link of a child resource, e.g. `child_link("sprocs", "SimpleScript")`
    pub fn child_link(&self, resource_type: &str, id: &str) -> String {
        format!("{}/{}/{}", self.link(), resource_type, id)
    }
}

impl fmt::Display for CollectionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.link())
    }
}

impl FromStr for CollectionRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim_matches('/').split('/').collect();
        match parts.as_slice() {
            ["dbs", db, "colls", coll] => Self::from_names(db, coll),
            _ => Err(format!(
                "Invalid collection link '{s}'. Expected format: dbs/{{database}}/colls/{{collection}}"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_id_valid() {
        let id = DatabaseId::new("IndexManagement").unwrap();
        assert_eq!(id.as_str(), "IndexManagement");
        assert_eq!(id.to_string(), "IndexManagement");
        assert_eq!(id.link(), "dbs/IndexManagement");
    }

    #[test]
    fn test_database_id_rejects_empty_and_reserved() {
        assert!(DatabaseId::new("").is_err());
        assert!(DatabaseId::new("   ").is_err());
        assert!(DatabaseId::new("a/b").is_err());
        assert!(DatabaseId::new("a?b").is_err());
        assert!(DatabaseId::new("a#b").is_err());
        assert!(DatabaseId::new("a\\b").is_err());
        assert!(DatabaseId::new("x".repeat(256)).is_err());
    }

    #[test]
    fn test_collection_id_serde_validates() {
        let id: CollectionId = serde_json::from_str("\"jsexamples\"").unwrap();
        assert_eq!(id.as_str(), "jsexamples");
        assert!(serde_json::from_str::<CollectionId>("\"\"").is_err());
    }

    #[test]
    fn test_collection_ref_links() {
        let coll = CollectionRef::from_names("ServerSideScripts", "jsexamples").unwrap();
        assert_eq!(coll.link(), "dbs/ServerSideScripts/colls/jsexamples");
        assert_eq!(
            coll.child_link("sprocs", "SimpleScript"),
            "dbs/ServerSideScripts/colls/jsexamples/sprocs/SimpleScript"
        );
    }

    #[test]
    fn test_collection_ref_parse() {
        let a: CollectionRef = "/dbs/db/colls/coll".parse().unwrap();
        let b: CollectionRef = "dbs/db/colls/coll".parse().unwrap();
        assert_eq!(a, b);
        assert!("dbs/db".parse::<CollectionRef>().is_err());
        assert!("dbs/db/docs/coll".parse::<CollectionRef>().is_err());
        assert!("dbs//colls/coll".parse::<CollectionRef>().is_err());
    }
}
