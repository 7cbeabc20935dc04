//! On-disk registry fixtures.
//!
//! [`RegistryFixture::standard`] lays out the components most tests need:
//!
//! | Component | Versions | Notes |
//! |-----------|----------|-------|
//! | `dummy` | 0.0.1 | two scripts, one style, a template |
//! | `weak-sauce` | 0.0.4 | depends on `dummy >0.0.1`, which nothing satisfies |
//! | `alpha` | 1.0.0, 1.5.0, 2.0.0 | conflict target |
//! | `beta` | 1.0.0 | depends on `alpha ^1.5` |
//! | `conflicted` | 1.0.0 | depends on `alpha =1.0.0` and `beta ^1.0` |
//! | `child` | 1.0.0 | renders `settings.title` |
//! | `parent` | 1.0.0 | `sub` and `list` are diversity slots |
//! | `toponent` | 1.1 | version directory without patch number |

use anyhow::{Context, Result};
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::constants::SPEC_FILE_NAME;
use crate::registry::{FileMode, LocalRegistry, LocalRegistryOptions};

/// Base URL given to fixture registries.
pub const FIXTURE_BASE_URL: &str = "http://localhost/components";

/// A temporary local registry tree.
#[derive(Debug)]
pub struct RegistryFixture {
    dir: TempDir,
}

impl RegistryFixture {
    /// An empty tree.
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: TempDir::new().context("Failed to create temp registry")?,
        })
    }

    /// The tree with the standard component set.
    pub fn standard() -> Result<Self> {
        let fixture = Self::new()?;
        fixture.add_standard()?;
        Ok(fixture)
    }

    /// Root of the tree.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `spec` to `<name>/<version_dir>/diversity.json`.
    pub fn add(&self, name: &str, version_dir: &str, spec: &Value) -> Result<PathBuf> {
        let dir = self.path().join(name).join(version_dir);
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(SPEC_FILE_NAME), serde_json::to_string_pretty(spec)?)?;
        Ok(dir)
    }

    /// Write a development checkout `<name>/diversity.json`.
    pub fn add_dev(&self, name: &str, spec: &Value) -> Result<PathBuf> {
        let dir = self.path().join(name);
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(SPEC_FILE_NAME), serde_json::to_string_pretty(spec)?)?;
        Ok(dir)
    }

    /// Write a file next to an installed spec.
    pub fn add_file(&self, name: &str, version_dir: &str, relative: &str, content: &str) -> Result<()> {
        let path = self.path().join(name).join(version_dir).join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Options pointing at this tree, served under [`FIXTURE_BASE_URL`].
    pub fn options(&self) -> LocalRegistryOptions {
        LocalRegistryOptions::new(self.path()).with_base_url(FIXTURE_BASE_URL).with_mode(FileMode::Default)
    }

    /// A registry over this tree.
    pub fn registry(&self) -> Result<LocalRegistry> {
        LocalRegistry::new(self.options())
    }

    fn add_standard(&self) -> Result<()> {
        self.add(
            "dummy",
            "0.0.1",
            &json!({
                "name": "dummy",
                "version": "0.0.1",
                "template": "dummy.html",
                "script": ["js/dummy1.js", "js/dummy2.js"],
                "style": ["css/dummy.css"],
                "angular": true
            }),
        )?;
        self.add_file("dummy", "0.0.1", "dummy.html", "<p class=\"dummy\">dummy</p>")?;
        self.add_file("dummy", "0.0.1", "js/dummy1.js", "var dummy1 = 1;\n")?;
        self.add_file("dummy", "0.0.1", "js/dummy2.js", "var dummy2 = 2;\n")?;
        self.add_file("dummy", "0.0.1", "css/dummy.css", ".dummy {\n  color: red;\n}\n")?;

        self.add(
            "weak-sauce",
            "0.0.4",
            &json!({
                "name": "weak-sauce",
                "version": "0.0.4",
                "dependencies": { "dummy": ">0.0.1" }
            }),
        )?;

        for version in ["1.0.0", "1.5.0", "2.0.0"] {
            self.add(
                "alpha",
                version,
                &json!({
                    "name": "alpha",
                    "version": version,
                    "script": [format!("alpha-{version}.js")]
                }),
            )?;
        }

        self.add(
            "beta",
            "1.0.0",
            &json!({
                "name": "beta",
                "version": "1.0.0",
                "dependencies": { "alpha": "^1.5" },
                "script": ["beta.js"]
            }),
        )?;

        self.add(
            "conflicted",
            "1.0.0",
            &json!({
                "name": "conflicted",
                "version": "1.0.0",
                "dependencies": { "alpha": "=1.0.0", "beta": "^1.0" }
            }),
        )?;

        self.add(
            "child",
            "1.0.0",
            &json!({
                "name": "child",
                "version": "1.0.0",
                "template": "child.html",
                "script": ["child.js"],
                "settings": {
                    "type": "object",
                    "properties": { "title": { "type": "string" } }
                }
            }),
        )?;
        self.add_file("child", "1.0.0", "child.html", "<span class=\"child\">{{ settings.title }}</span>")?;

        self.add(
            "parent",
            "1.0.0",
            &json!({
                "name": "parent",
                "version": "1.0.0",
                "template": "parent.html",
                "script": ["parent.js"],
                "dependencies": { "dummy": "0.0.1" },
                "settings": {
                    "type": "object",
                    "properties": {
                        "heading": { "type": "string" },
                        "sub": { "type": "object", "format": "diversity" },
                        "list": {
                            "type": "array",
                            "items": { "type": "object", "format": "diversity" }
                        }
                    }
                }
            }),
        )?;
        self.add_file(
            "parent",
            "1.0.0",
            "parent.html",
            concat!(
                "<div class=\"parent\">{{ settings.heading | default(value=\"\") }}",
                "{% if settings.sub %}{{ settings.sub.componentHTML }}{% endif %}",
                "{% if settings.list %}{% for item in settings.list %}{{ item.componentHTML }}{% endfor %}{% endif %}",
                "</div>"
            ),
        )?;

        self.add(
            "toponent",
            "1.1",
            &json!({
                "name": "toponent",
                "version": "1.1",
                "dependencies": { "sub_one": "1.1" }
            }),
        )?;
        self.add(
            "sub_one",
            "1.1.4",
            &json!({ "name": "sub_one", "version": "1.1.4" }),
        )?;

        Ok(())
    }
}
