//! Sample run summary and reporting
//!
//! Every suite returns a [`SampleSummary`]: the console lines it produced,
//! the steps it ran, what they cost and which of them failed.

use crate::domain::{SamplesError, StoreError};
use std::time::Duration;

/// Category of a failed step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Endpoint unreachable, credentials rejected or connection closed
    Connection,
    /// Malformed query or missing collection
    Query,
    /// Identifier already exists
    WriteConflict,
    /// Missing fields or rejected request
    Validation,
    /// Stored procedure or trigger failed
    Script,
    /// Anything else
    Other,
}

impl From<&SamplesError> for FailureKind {
    fn from(err: &SamplesError) -> Self {
        match err {
            SamplesError::Store(StoreError::ConnectionFailed(_)) => FailureKind::Connection,
            SamplesError::Store(StoreError::QueryFailed(_)) => FailureKind::Query,
            SamplesError::Store(StoreError::WriteConflict(_)) => FailureKind::WriteConflict,
            SamplesError::Store(StoreError::Validation(_)) | SamplesError::Validation(_) => {
                FailureKind::Validation
            }
            SamplesError::Store(StoreError::ScriptFailed(_)) => FailureKind::Script,
            _ => FailureKind::Other,
        }
    }
}

/// A step that did not complete
#[derive(Debug, Clone)]
pub struct SampleFailure {
    /// Name of the step, e.g. `UseManualIndexing`
    pub step: String,

    pub kind: FailureKind,

    pub message: String,
}

/// Outcome of one sample suite
#[derive(Debug, Clone, Default)]
pub struct SampleSummary {
    /// Suite name, e.g. `index-management`
    pub suite: String,

    /// Console output, in order
    pub lines: Vec<String>,

    /// Steps attempted
    pub steps_run: usize,

    /// Request units spent by the suite
    pub total_request_charge: f64,

    pub duration: Duration,

    pub failures: Vec<SampleFailure>,
}

impl SampleSummary {
    pub fn new(suite: impl Into<String>) -> Self {
        Self {
            suite: suite.into(),
            ..Self::default()
        }
    }

    /// Records a console line
    pub fn say(&mut self, line: impl Into<String>) {
        let line = line.into();
        tracing::info!(suite = %self.suite, "{line}");
        self.lines.push(line);
    }

    /// Adds to the suite's request charge
    pub fn charge(&mut self, request_charge: f64) {
        self.total_request_charge += request_charge;
    }

    /// Records a failed step and prints it like the service error it wraps
    pub fn fail(&mut self, step: &str, context: &str, error: &SamplesError) {
        crate::log_error_with_context!(error, context);
        self.lines.push(format!(
            "{step}: an error occurred while {context}: actual cause: {error}"
        ));
        self.failures.push(SampleFailure {
            step: step.to_string(),
            kind: FailureKind::from(error),
            message: error.to_string(),
        });
    }

    /// Marks the start of a step
    pub fn begin_step(&mut self, step: &str) {
        self.steps_run += 1;
        tracing::debug!(suite = %self.suite, step = step, "Running sample step");
    }

    pub fn is_successful(&self) -> bool {
        self.failures.is_empty()
    }

    /// Whether any failure was a connection failure
    pub fn has_connection_failure(&self) -> bool {
        self.failures
            .iter()
            .any(|f| f.kind == FailureKind::Connection)
    }

    /// Merges another suite's results into this one
    pub fn absorb(&mut self, other: SampleSummary) {
        self.lines.extend(other.lines);
        self.steps_run += other.steps_run;
        self.total_request_charge += other.total_request_charge;
        self.duration += other.duration;
        self.failures.extend(other.failures);
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            suite = %self.suite,
            steps = self.steps_run,
            failed = self.failures.len(),
            request_charge = format!("{:.2}", self.total_request_charge),
            duration_ms = self.duration.as_millis() as u64,
            "Sample suite completed"
        );

        for failure in &self.failures {
            tracing::warn!(
                step = %failure.step,
                kind = ?failure.kind,
                message = %failure.message,
                "Sample step failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kind_classification() {
        let err = SamplesError::Store(StoreError::WriteConflict("doc1".to_string()));
        assert_eq!(FailureKind::from(&err), FailureKind::WriteConflict);
        let err = SamplesError::Validation("missing id".to_string());
        assert_eq!(FailureKind::from(&err), FailureKind::Validation);
        let err = SamplesError::Io("disk".to_string());
        assert_eq!(FailureKind::from(&err), FailureKind::Other);
    }

    #[test]
    fn test_summary_records_failures() {
        let mut summary = SampleSummary::new("index-management");
        summary.begin_step("ExcludePathsFromIndex");
        summary.charge(2.5);
        summary.say("ExcludePathsFromIndex: Got a page of query result with 1 document(s) and request charge of 2.5");
        assert!(summary.is_successful());

        let err = SamplesError::Store(StoreError::ConnectionFailed("closed".to_string()));
        summary.fail("ExcludePathsFromIndex", "querying documents", &err);
        assert!(!summary.is_successful());
        assert!(summary.has_connection_failure());
        assert_eq!(summary.lines.len(), 2);
        assert!(summary.lines[1].contains("actual cause"));
    }

    #[test]
    fn test_absorb() {
        let mut first = SampleSummary::new("all");
        first.charge(1.0);
        let mut second = SampleSummary::new("scripts");
        second.begin_step("RunSimpleScript");
        second.charge(2.0);
        first.absorb(second);
        assert_eq!(first.steps_run, 1);
        assert!((first.total_request_charge - 3.0).abs() < f64::EPSILON);
    }
}
