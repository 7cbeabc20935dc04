//! Render a component to HTML.
//!
//! ```bash
//! diversity render page --settings page.json --context context.json
//! diversity render page --version "^2.0" --language en --output page.html
//! ```

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tracing::info;

use super::common::{find_component, open_registry, parse_requirement, read_json};
use crate::config::DiversityConfig;
use crate::engine::RenderContext;

#[derive(Args, Debug)]
pub struct RenderCommand {
    /// Component name
    name: String,

    /// Version requirement, e.g. "^1.2" or "2.0.1"
    #[arg(long = "version", value_name = "REQUIREMENT")]
    requirement: Option<String>,

    /// JSON file with the component's settings
    #[arg(long)]
    settings: Option<PathBuf>,

    /// JSON file with the render context
    #[arg(long)]
    context: Option<PathBuf>,

    /// Active language; overrides `language` in the context
    #[arg(long)]
    language: Option<String>,

    /// Write the HTML here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl RenderCommand {
    pub async fn execute(self, config: &DiversityConfig) -> Result<()> {
        let requirement = parse_requirement(self.requirement.as_deref())?;
        let registry = open_registry(config).await?;
        let component = find_component(&registry, &self.name, requirement.as_ref()).await?;

        let settings = read_json(self.settings.as_deref()).await?;
        let mut context = RenderContext::from_value(read_json(self.context.as_deref()).await?)?;
        if let Some(language) = self.language {
            context = context.with_language(language);
        }

        let engine = config.build_engine(registry)?;
        let html = engine.render(&component, &context, &settings).await?;

        match self.output {
            Some(path) => {
                tokio::fs::write(&path, &html)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                info!("Wrote {} to {}", component, path.display());
            }
            None => println!("{html}"),
        }
        Ok(())
    }
}
