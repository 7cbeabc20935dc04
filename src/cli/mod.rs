//! Command-line interface for Diversity.
//!
//! # Commands
//!
//! - `render` - Render a component with settings and context to HTML
//! - `resolve` - Show the resolved dependency set of a component
//! - `list` - List every component and version the registries know
//! - `install` - Install a component into the local registry from a path or URL
//! - `uninstall` - Remove installed versions from the local registry
//!
//! # Global Options
//!
//! - `--verbose` / `-v` - Debug logging
//! - `--quiet` / `-q` - Errors only
//! - `--config` / `-c` - Config file (default `~/.diversity/config.toml`)
//! - `--mode` - File mode of the local registry: `default`, `verbose`, `dryrun`, `nowrite`
//!
//! Logs go to stderr so rendered output on stdout can be piped.
//!
//! # Examples
//!
//! ```bash
//! diversity install ./components/header
//! diversity render page --settings page.json --context context.json > page.html
//! diversity resolve page --version "^2.0" --format json
//! diversity --mode dryrun uninstall header --version "<1.0"
//! ```

mod common;
mod install;
mod list;
mod render;
mod resolve;
mod uninstall;


pub use common::OutputFormat;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use crate::config::DiversityConfig;
use crate::registry::FileMode;

/// Main CLI structure.
#[derive(Parser, Debug)]
#[command(
    name = "diversity",
    about = "Diversity - versioned UI components, resolved and rendered",
    version,
    long_about = "Diversity renders versioned UI components. Components live in local or remote \
                  registries, declare semver dependencies, and nest other components through \
                  their settings."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// File mode of the local registry (default, verbose, dryrun, nowrite)
    #[arg(long, global = true)]
    mode: Option<FileMode>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a component to HTML
    Render(render::RenderCommand),

    /// Show the resolved dependency set of a component
    Resolve(resolve::ResolveCommand),

    /// List known components and versions
    List(list::ListCommand),

    /// Install a component into the local registry
    Install(install::InstallCommand),

    /// Remove installed versions from the local registry
    Uninstall(uninstall::UninstallCommand),
}

impl Cli {
    /// Log filter for the chosen verbosity.
    #[must_use]
    pub const fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "info"
        }
    }

    /// Load the configuration and run the command.
    pub async fn execute(self) -> Result<()> {
        let mut config = DiversityConfig::load_with_optional(self.config.clone()).await?;
        if let Some(mode) = self.mode {
            debug!("Using file mode {}", mode);
            config.set_mode(mode);
        }
        self.execute_with_config(config).await
    }

    /// Run the command against an already loaded configuration.
    pub async fn execute_with_config(self, config: DiversityConfig) -> Result<()> {
        match self.command {
            Commands::Render(cmd) => cmd.execute(&config).await,
            Commands::Resolve(cmd) => cmd.execute(&config).await,
            Commands::List(cmd) => cmd.execute(&config).await,
            Commands::Install(cmd) => cmd.execute(&config).await,
            Commands::Uninstall(cmd) => cmd.execute(&config).await,
        }
    }
}
