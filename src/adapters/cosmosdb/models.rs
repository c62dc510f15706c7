//! Cosmos DB REST wire models
//!
//! Response bodies of the SQL API that are not domain types in their own
//! right. Request bodies are the domain types themselves.

use crate::domain::Document;
use serde::Deserialize;

/// Page of a document query
#[derive(Debug, Deserialize)]
pub struct DocumentsFeed {
    #[serde(rename = "Documents", default)]
    pub documents: Vec<Document>,

    #[serde(rename = "_count", default)]
    pub count: Option<u64>,
}

/// Error body returned with non-success statuses
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: Option<String>,

    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    /// Parses an error body, falling back to the raw text
    pub fn describe(raw: &str) -> String {
        match serde_json::from_str::<ErrorBody>(raw) {
            Ok(ErrorBody {
                code: Some(code),
                message: Some(message),
            }) => format!("{code}: {}", first_line(&message)),
            Ok(ErrorBody {
                message: Some(message),
                ..
            }) => first_line(&message).to_string(),
            _ => raw.trim().to_string(),
        }
    }
}

// Service messages carry a multi-line diagnostics trailer
fn first_line(message: &str) -> &str {
    message.lines().next().unwrap_or(message).trim()
}
