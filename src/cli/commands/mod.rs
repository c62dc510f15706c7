//! CLI command implementations
//!
//! The sample commands share the same start-up: load the configuration,
//! open a connection, run a suite and map its summary to an exit code.

pub mod index;
pub mod init;
pub mod query;
pub mod scripts;
pub mod validate;

use crate::client::{Connection, ConnectionSettings, DocumentStoreClient};
use crate::config::{load_config, SamplesConfig};
use crate::samples::SampleSummary;

/// Exit code: success
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code: a sample step failed
pub const EXIT_SAMPLE_FAILURE: i32 = 1;
/// Exit code: configuration could not be loaded or is invalid
pub const EXIT_CONFIG_ERROR: i32 = 2;
/// Exit code: the store could not be reached
pub const EXIT_CONNECTION_ERROR: i32 = 3;
/// Exit code: anything else
pub const EXIT_FATAL: i32 = 5;

/// Loads the configuration and connects to the configured store
///
/// On failure the problem has already been printed and the exit code to
/// return is given back instead.
pub(crate) async fn open_connection(
    config_path: &str,
) -> std::result::Result<(SamplesConfig, Connection), i32> {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => {
            println!("❌ Failed to load configuration file");
            println!("   Error: {e}");
            return Err(EXIT_CONFIG_ERROR);
        }
    };

    let settings = ConnectionSettings::from_config(&config);
    match DocumentStoreClient::connect(settings).await {
        Ok(connection) => Ok((config, connection)),
        Err(e) => {
            println!("❌ Failed to connect to {}", config.store.endpoint);
            println!("   Error: {e}");
            Err(EXIT_CONNECTION_ERROR)
        }
    }
}

/// Prints the suite's console lines and picks the exit code for it
pub(crate) fn report(summary: &SampleSummary) -> i32 {
    for line in &summary.lines {
        println!("{line}");
    }
    println!();
    summary.log_summary();

    println!(
        "{} step(s), {} failed, total request charge {:.2}, took {:.2}s",
        summary.steps_run,
        summary.failures.len(),
        summary.total_request_charge,
        summary.duration.as_secs_f64()
    );

    exit_code_for(summary)
}

/// Maps a suite outcome to a process exit code
pub fn exit_code_for(summary: &SampleSummary) -> i32 {
    if summary.has_connection_failure() {
        EXIT_CONNECTION_ERROR
    } else if summary.is_successful() {
        EXIT_SUCCESS
    } else {
        EXIT_SAMPLE_FAILURE
    }
}

/// Closes the connection, downgrading a failure to a warning
pub(crate) fn close_connection(connection: &Connection) {
    if let Err(e) = connection.close() {
        tracing::warn!(error = %e, "Failed to close connection");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SamplesError, StoreError};

    #[test]
    fn test_exit_code_for_summary() {
        let mut summary = SampleSummary::new("index-management");
        assert_eq!(exit_code_for(&summary), EXIT_SUCCESS);

        let err = SamplesError::Store(StoreError::QueryFailed("bad".to_string()));
        summary.fail("UseLazyIndexing", "querying documents", &err);
        assert_eq!(exit_code_for(&summary), EXIT_SAMPLE_FAILURE);

        let err = SamplesError::Store(StoreError::ConnectionFailed("closed".to_string()));
        summary.fail("UseLazyIndexing", "querying documents", &err);
        assert_eq!(exit_code_for(&summary), EXIT_CONNECTION_ERROR);
    }
}
