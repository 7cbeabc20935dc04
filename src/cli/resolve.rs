//! Show the resolved dependency set of a component, dependencies first.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde_json::json;

use super::common::{OutputFormat, find_component, open_registry, parse_requirement};
use crate::config::DiversityConfig;
use crate::resolver::ComponentSet;

#[derive(Args, Debug)]
pub struct ResolveCommand {
    /// Component name
    name: String,

    /// Version requirement
    #[arg(long = "version", value_name = "REQUIREMENT")]
    requirement: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

impl ResolveCommand {
    pub async fn execute(self, config: &DiversityConfig) -> Result<()> {
        let requirement = parse_requirement(self.requirement.as_deref())?;
        let registry = open_registry(config).await?;
        let root = find_component(&registry, &self.name, requirement.as_ref()).await?;

        let resolved = ComponentSet::new(registry).expand(&[root]).await?;

        match self.format {
            OutputFormat::Json => {
                let components: Vec<_> = resolved
                    .iter()
                    .map(|c| json!({ "name": c.name(), "version": c.version().to_string() }))
                    .collect();
                let discarded: Vec<String> = resolved.discarded().iter().map(|c| c.identity()).collect();
                println!("{}", json!({ "components": components, "discarded": discarded }));
            }
            OutputFormat::Text => {
                for component in &resolved {
                    println!("{} {}", component.name().bold(), component.version());
                }
                for component in resolved.discarded() {
                    println!("{} {} {}", component.name().dimmed(), component.version().to_string().dimmed(), "(discarded)".yellow());
                }
            }
        }
        Ok(())
    }
}
