//! Sample suites
//!
//! Each suite is a thin routine on top of a [`Connection`]: set up the
//! resources it needs, issue a few calls, and record what came back in a
//! [`SampleSummary`].
//!
//! - [`queries`] - ad-hoc queries with request charge reporting
//! - [`indexing`] - indexing directives and collection indexing policies
//! - [`scripts`] - stored procedures and post-triggers

pub mod indexing;
pub mod queries;
pub mod scripts;
pub mod summary;

pub use indexing::{IndexDemo, IndexingSamples};
pub use queries::{NamedQuery, QuerySamples, QUERY_SAMPLES};
pub use scripts::{ScriptDemo, ScriptSamples};
pub use summary::{FailureKind, SampleFailure, SampleSummary};

use crate::client::Connection;
use crate::domain::{CollectionRef, FeedOptions, Result, SqlQuerySpec};
use futures::StreamExt;

/// Runs a query and prints one line per result page
///
/// Returns the number of documents across all pages.
pub(crate) async fn output_results(
    connection: &Connection,
    collection: &CollectionRef,
    step: &str,
    query: &str,
    options: Option<&FeedOptions>,
    summary: &mut SampleSummary,
) -> Result<usize> {
    let mut pager = connection.query(collection, SqlQuerySpec::new(query), options)?;
    let mut documents = 0;
    while let Some(page) = pager.next().await {
        let page = page?;
        documents += page.len();
        summary.charge(page.request_charge);
        summary.say(format!(
            "{step}: Got a page of query result with {} document(s) and request charge of {}",
            page.len(),
            page.request_charge
        ));
    }
    Ok(documents)
}
