//! Shared helpers for the integration suite.

#![allow(dead_code)]

use anyhow::{Context, Result};
use assert_cmd::Command;
use diversity::constants::API_WELCOME_SENTINEL;
use diversity::test_utils::RegistryFixture;
use diversity::test_utils::fixtures::FIXTURE_BASE_URL;
use mockito::ServerGuard;
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temp workspace holding a standard registry fixture and a config pointing at it.
pub struct TestProject {
    _temp_dir: TempDir, // Keep alive for RAII cleanup
    registry: RegistryFixture,
    work_dir: PathBuf,
    config_path: PathBuf,
}

impl TestProject {
    /// Standard components and a `[local]` section.
    pub fn new() -> Result<Self> {
        Self::with_config("")
    }

    /// Like [`TestProject::new`] with `extra` TOML appended to the config.
    pub fn with_config(extra: &str) -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let work_dir = temp_dir.path().join("work");
        fs::create_dir_all(&work_dir)?;

        let registry = RegistryFixture::standard()?;
        let config_path = temp_dir.path().join("config.toml");
        let config = format!(
            "[local]\nbase_path = {}\nbase_url = \"{FIXTURE_BASE_URL}\"\n\n[minification]\nbase_dir = {}\n\n{extra}",
            toml_string(registry.path()),
            toml_string(&temp_dir.path().join("minified")),
        );
        fs::write(&config_path, config).context("Failed to write config")?;

        Ok(Self {
            _temp_dir: temp_dir,
            registry,
            work_dir,
            config_path,
        })
    }

    /// The registry tree.
    pub fn registry(&self) -> &RegistryFixture {
        &self.registry
    }

    /// Scratch directory for settings, context, and output files.
    pub fn work_path(&self) -> &Path {
        &self.work_dir
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Write `value` as `<work>/<name>` and return its path.
    pub fn write_json(&self, name: &str, value: &Value) -> Result<PathBuf> {
        let path = self.work_dir.join(name);
        fs::write(&path, serde_json::to_string_pretty(value)?)?;
        Ok(path)
    }

    /// The `diversity` binary configured for this project.
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("diversity").expect("diversity binary");
        cmd.arg("--config")
            .arg(&self.config_path)
            .current_dir(&self.work_dir)
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG");
        cmd
    }
}

fn toml_string(path: &Path) -> String {
    toml::Value::String(path.to_string_lossy().into_owned()).to_string()
}

/// A mock Diversity API answering the welcome probe.
pub async fn mock_api() -> ServerGuard {
    let mut server = mockito::Server::new_async().await;
    server.mock("GET", "/").with_status(200).with_body(API_WELCOME_SENTINEL).create_async().await;
    server
}

/// Serve one version of `name` with its spec and files.
pub async fn serve_component(server: &mut ServerGuard, name: &str, version: &str, spec: &Value, files: &[(&str, &str)]) {
    server
        .mock("GET", format!("/components/{name}").as_str())
        .with_status(200)
        .with_body(json!([version]).to_string())
        .create_async()
        .await;
    server
        .mock("GET", format!("/components/{name}/{version}/files/diversity.json").as_str())
        .with_status(200)
        .with_body(spec.to_string())
        .create_async()
        .await;
    for (path, body) in files {
        server
            .mock("GET", format!("/components/{name}/{version}/files/{path}").as_str())
            .with_status(200)
            .with_body(*body)
            .create_async()
            .await;
    }
}

/// Answer 404 for `name`, as the API does for components it does not know.
pub async fn serve_missing(server: &mut ServerGuard, name: &str) {
    server.mock("GET", format!("/components/{name}").as_str()).with_status(404).create_async().await;
}
