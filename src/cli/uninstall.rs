use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::common::{parse_requirement, require_local};
use crate::config::DiversityConfig;

#[derive(Args, Debug)]
pub struct UninstallCommand {
    /// Component name
    name: String,

    /// Only remove versions matching this requirement
    #[arg(long = "version", value_name = "REQUIREMENT")]
    requirement: Option<String>,
}

impl UninstallCommand {
    pub async fn execute(self, config: &DiversityConfig) -> Result<()> {
        let requirement = parse_requirement(self.requirement.as_deref())?;
        let local = require_local(config)?;
        let removed = local.uninstall(&self.name, requirement.as_ref()).await?;

        if removed.is_empty() {
            println!("{} {}", "No installed version of".yellow(), self.name.bold());
        }
        for version in removed {
            println!("{} {} {}", "Uninstalled".green(), self.name.bold(), version);
        }
        Ok(())
    }
}
