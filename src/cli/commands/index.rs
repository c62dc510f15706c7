//! Index command implementation

use super::{close_connection, open_connection, report, EXIT_CONFIG_ERROR};
use crate::domain::DatabaseId;
use crate::samples::{IndexDemo, IndexingSamples};
use clap::Args;

/// Arguments for the index command
#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Run only this demo (repeatable); all four run by default
    #[arg(long = "demo", value_name = "NAME")]
    pub demos: Vec<IndexDemo>,
}

impl IndexArgs {
    /// The demos to run, in the order given
    pub fn selected(&self) -> Vec<IndexDemo> {
        if self.demos.is_empty() {
            IndexDemo::ALL.to_vec()
        } else {
            self.demos.clone()
        }
    }

    /// Execute the index command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let demos = self.selected();
        tracing::info!(demos = ?demos, "Running index management samples");

        let (config, connection) = match open_connection(config_path).await {
            Ok(opened) => opened,
            Err(code) => return Ok(code),
        };

        let database = match DatabaseId::new(config.samples.index_database.clone()) {
            Ok(id) => id,
            Err(e) => {
                println!("❌ {e}");
                close_connection(&connection);
                return Ok(EXIT_CONFIG_ERROR);
            }
        };

        println!("🗂️  Index management samples in database {database}");
        println!();

        let summary = IndexingSamples::new(&connection, database).run(&demos).await;
        close_connection(&connection);
        Ok(report(&summary))
    }
}
