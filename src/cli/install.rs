//! Install a component into the local registry.
//!
//! The source is a `diversity.json`, a directory holding one, or a URL of one. The spec
//! and every file it declares (templates, scripts, styles, themes, assets, thumbnail,
//! settings schema, translations) are copied to `<base_path>/<name>/<version>/`.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::common::require_local;
use crate::config::DiversityConfig;

#[derive(Args, Debug)]
pub struct InstallCommand {
    /// Path or URL of the component spec
    source: String,

    /// Reinstall even when the version is already installed
    #[arg(short, long)]
    force: bool,
}

impl InstallCommand {
    pub async fn execute(self, config: &DiversityConfig) -> Result<()> {
        let local = require_local(config)?;
        let component = local.install(&self.source, self.force).await?;
        println!("{} {} {}", "Installed".green(), component.name().bold(), component.version());
        Ok(())
    }
}
