//! Logging and observability
//!
//! Structured `tracing` logging with:
//! - Configurable log levels, overridable with `RUST_LOG`
//! - Console output on stderr
//! - Optional JSON file logging with rotation
//!
//! # Example
//!
//! ```no_run
//! use cosmos_samples::logging::init_logging;
//! use cosmos_samples::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Samples started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log the cost of a store operation
///
/// # Example
///
/// ```no_run
/// use cosmos_samples::log_request_charge;
///
/// log_request_charge!("create_document", 5.71, Some("2f1e0c3a-activity"));
/// ```
#[macro_export]
macro_rules! log_request_charge {
    ($operation:expr, $charge:expr, $activity_id:expr) => {
        tracing::debug!(
            operation = $operation,
            request_charge = $charge,
            activity_id = ?$activity_id,
            "Request charge"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use cosmos_samples::log_error_with_context;
/// use cosmos_samples::domain::SamplesError;
///
/// let error = SamplesError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}
