//! List every component the configured registries know.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde_json::{Map, Value};

use super::common::{OutputFormat, open_registry};
use crate::config::DiversityConfig;

#[derive(Args, Debug)]
pub struct ListCommand {
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

impl ListCommand {
    pub async fn execute(self, config: &DiversityConfig) -> Result<()> {
        let registry = open_registry(config).await?;
        let listing = registry.list_components().await?;

        match self.format {
            OutputFormat::Json => {
                let object: Map<String, Value> = listing
                    .iter()
                    .map(|(name, versions)| {
                        let versions = versions.iter().map(|v| Value::String(v.to_string())).collect();
                        (name.clone(), Value::Array(versions))
                    })
                    .collect();
                println!("{}", Value::Object(object));
            }
            OutputFormat::Text => {
                if listing.is_empty() {
                    println!("{}", "No components found".yellow());
                }
                for (name, versions) in &listing {
                    let versions: Vec<String> = versions.iter().map(ToString::to_string).collect();
                    println!("{}: {}", name.bold(), versions.join(", "));
                }
            }
        }
        Ok(())
    }
}
