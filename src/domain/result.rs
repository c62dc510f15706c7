//! Result type alias
//!
//! This module provides a convenient Result type alias that uses
//! `SamplesError` as the error type.

use super::errors::SamplesError;

/// Result type alias for crate operations
///
/// # Examples
///
/// ```
/// use cosmos_samples::domain::result::Result;
/// use cosmos_samples::domain::errors::SamplesError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(SamplesError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, SamplesError>;
