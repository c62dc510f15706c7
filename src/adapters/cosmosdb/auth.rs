//! Master-key request signing
//!
//! Every REST call carries an `authorization` header derived from the verb,
//! resource type, resource link and request date, signed with the account
//! key.

use crate::domain::{Result, SamplesError, StoreError};
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretVec};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Formats a timestamp the way `x-ms-date` expects (RFC 1123)
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Signs requests with a decoded master key
pub struct MasterKeySigner {
    key: SecretVec<u8>,
}

impl MasterKeySigner {
    /// Decodes a base64 master key
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the key is empty or not base64.
    pub fn new(encoded_key: &str) -> Result<Self> {
        let trimmed = encoded_key.trim();
        if trimmed.is_empty() {
            return Err(SamplesError::Configuration(
                "Master key cannot be empty".to_string(),
            ));
        }
        let bytes = general_purpose::STANDARD.decode(trimmed).map_err(|e| {
            SamplesError::Configuration(format!("Master key is not valid base64: {e}"))
        })?;
        Ok(Self {
            key: SecretVec::new(bytes),
        })
    }

    /// Builds the url-encoded `authorization` header value
    ///
    /// `resource_link` is case-sensitive and has no leading or trailing `/`.
    pub fn authorization(
        &self,
        verb: &str,
        resource_type: &str,
        resource_link: &str,
        date: &str,
    ) -> Result<String> {
        let payload = format!(
            "{}\n{}\n{}\n{}\n\n",
            verb.to_lowercase(),
            resource_type.to_lowercase(),
            resource_link,
            date.to_lowercase()
        );

        let mut mac = HmacSha256::new_from_slice(self.key.expose_secret()).map_err(|e| {
            StoreError::ConnectionFailed(format!("Cannot initialise request signer: {e}"))
        })?;
        mac.update(payload.as_bytes());
        let signature = general_purpose::STANDARD.encode(mac.finalize().into_bytes());

        let token = format!("type=master&ver=1.0&sig={signature}");
        Ok(url::form_urlencoded::byte_serialize(token.as_bytes()).collect())
    }
}
