//! Scripts command implementation

use super::{close_connection, open_connection, report, EXIT_CONFIG_ERROR};
use crate::samples::{ScriptDemo, ScriptSamples};
use clap::Args;

/// Arguments for the scripts command
#[derive(Args, Debug)]
pub struct ScriptsArgs {
    /// Run only this demo (repeatable); both run by default
    #[arg(long = "demo", value_name = "NAME")]
    pub demos: Vec<ScriptDemo>,
}

impl ScriptsArgs {
    /// The demos to run, in the order given
    pub fn selected(&self) -> Vec<ScriptDemo> {
        if self.demos.is_empty() {
            ScriptDemo::ALL.to_vec()
        } else {
            self.demos.clone()
        }
    }

    /// Execute the scripts command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let demos = self.selected();
        tracing::info!(demos = ?demos, "Running server-side script samples");

        let (config, connection) = match open_connection(config_path).await {
            Ok(opened) => opened,
            Err(code) => return Ok(code),
        };

        let samples = match ScriptSamples::from_config(&connection, &config.samples) {
            Ok(s) => s,
            Err(e) => {
                println!("❌ {e}");
                close_connection(&connection);
                return Ok(EXIT_CONFIG_ERROR);
            }
        };

        println!("📜 Server-side script samples");
        println!();

        let summary = samples.run(&demos).await;
        close_connection(&connection);
        Ok(report(&summary))
    }
}
