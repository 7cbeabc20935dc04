//! File operation strategies for local registry installs.
//!
//! The registry never branches on its mode; it asks the [`FileOps`] picked at
//! construction to do the work.
//!
//! | Mode      | Performs I/O | Prints operations |
//! |-----------|--------------|-------------------|
//! | `default` | yes          | no                |
//! | `verbose` | yes          | yes               |
//! | `dryrun`  | no           | yes               |
//! | `nowrite` | no           | no                |

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use crate::core::DiversityError;

/// File operations used by install and uninstall.
pub trait FileOps: Send + Sync + fmt::Debug {
    /// `mkdir -p`
    fn create_dir_all(&self, path: &Path) -> Result<()>;
    /// `cp`
    fn copy(&self, from: &Path, to: &Path) -> Result<()>;
    /// Write bytes to a file
    fn write(&self, path: &Path, content: &[u8]) -> Result<()>;
    /// `rm -rf`
    fn remove_dir_all(&self, path: &Path) -> Result<()>;
    /// Whether operations actually touch the filesystem.
    fn performs_io(&self) -> bool {
        true
    }
}

/// Plain filesystem operations.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFileOps;

impl FileOps for RealFileOps {
    fn create_dir_all(&self, path: &Path) -> Result<()> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        std::fs::copy(from, to)
            .map(|_| ())
            .with_context(|| format!("Failed to copy {} to {}", from.display(), to.display()))
    }

    fn write(&self, path: &Path, content: &[u8]) -> Result<()> {
        crate::utils::atomic_write(path, content)
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        match std::fs::remove_dir_all(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to remove directory: {}", path.display())),
        }
    }
}

/// Filesystem operations that also print what they do.
#[derive(Debug, Default, Clone, Copy)]
pub struct VerboseFileOps;

impl FileOps for VerboseFileOps {
    fn create_dir_all(&self, path: &Path) -> Result<()> {
        println!("mkdir -p {}", path.display());
        RealFileOps.create_dir_all(path)
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        println!("cp {} {}", from.display(), to.display());
        RealFileOps.copy(from, to)
    }

    fn write(&self, path: &Path, content: &[u8]) -> Result<()> {
        println!("write {} ({} bytes)", path.display(), content.len());
        RealFileOps.write(path, content)
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        println!("rm -rf {}", path.display());
        RealFileOps.remove_dir_all(path)
    }
}

/// Prints every operation and performs none.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunFileOps;

impl FileOps for DryRunFileOps {
    fn create_dir_all(&self, path: &Path) -> Result<()> {
        println!("mkdir -p {}", path.display());
        Ok(())
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        println!("cp {} {}", from.display(), to.display());
        Ok(())
    }

    fn write(&self, path: &Path, content: &[u8]) -> Result<()> {
        println!("write {} ({} bytes)", path.display(), content.len());
        Ok(())
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        println!("rm -rf {}", path.display());
        Ok(())
    }

    fn performs_io(&self) -> bool {
        false
    }
}

/// Performs nothing and prints nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoWriteFileOps;

impl FileOps for NoWriteFileOps {
    fn create_dir_all(&self, _path: &Path) -> Result<()> {
        Ok(())
    }

    fn copy(&self, _from: &Path, _to: &Path) -> Result<()> {
        Ok(())
    }

    fn write(&self, _path: &Path, _content: &[u8]) -> Result<()> {
        Ok(())
    }

    fn remove_dir_all(&self, _path: &Path) -> Result<()> {
        Ok(())
    }

    fn performs_io(&self) -> bool {
        false
    }
}

/// Install/uninstall mode of a local registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileMode {
    /// Perform I/O silently
    #[default]
    Default,
    /// Perform I/O and print each operation
    Verbose,
    /// Print each operation without performing it
    DryRun,
    /// Neither print nor perform
    NoWrite,
}

impl FileMode {
    /// The strategy implementing this mode.
    #[must_use]
    pub fn file_ops(self) -> Arc<dyn FileOps> {
        match self {
            Self::Default => Arc::new(RealFileOps),
            Self::Verbose => Arc::new(VerboseFileOps),
            Self::DryRun => Arc::new(DryRunFileOps),
            Self::NoWrite => Arc::new(NoWriteFileOps),
        }
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Default => "default",
            Self::Verbose => "verbose",
            Self::DryRun => "dryrun",
            Self::NoWrite => "nowrite",
        };
        f.write_str(name)
    }
}

impl FromStr for FileMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" | "normal" => Ok(Self::Default),
            "verbose" => Ok(Self::Verbose),
            "dryrun" | "dry-run" => Ok(Self::DryRun),
            "nowrite" | "no-write" => Ok(Self::NoWrite),
            other => Err(DiversityError::ConfigError {
                message: format!(
                    "unknown file mode '{other}' (expected default, verbose, dryrun or nowrite)"
                ),
            }
            .into()),
        }
    }
}
