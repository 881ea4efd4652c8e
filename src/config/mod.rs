//! Project configuration (docpack.yaml)
//!
//! Every field is optional. Values given on the command line override the
//! file, and the file overrides frontmatter and built-in defaults.
//!
//! ```yaml
//! name: handbook
//! version: 1.0.0
//! include: ["docs/**", "*.md"]
//! max_depth: 2
//! exclude_navigation: true
//! naming: flattened
//! strip_prefix: docs
//! rules:
//!   - patterns: ["drafts/**"]
//!     template: "{{ text }} (draft)"
//! formats: [dir, zip]
//! ```

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DocpackError, Result};
use crate::packager::{NamingStrategy, PackageFormat};
use crate::path_utils::validate_glob;
use crate::rewrite::template;
use crate::walker::ExcludeRule;

/// Configuration file name looked up in the project root
pub const CONFIG_FILE: &str = "docpack.yaml";

/// Contents of docpack.yaml
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocpackConfig {
    /// Package name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Output directory, relative to the project root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Crawl include globs (default: everything)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,

    /// Crawl exclude globs, added to the built-in ones
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,

    /// Frontmatter field holding a document's identity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_field: Option<String>,

    /// Link-follow depth; absent means unbounded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_navigation: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub naming: Option<NamingStrategy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strip_prefix: Option<String>,

    /// Ordered exclude rules
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<ExcludeRule>,

    /// Template for links to excluded files that match no rule template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_template: Option<String>,

    /// Template for links whose target is outside the registry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unresolved_template: Option<String>,

    /// Output formats (`dir`, `zip`, `npm`, `marketplace`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub formats: Vec<String>,
}

impl DocpackConfig {
    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to a YAML string
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DocpackError::ConfigReadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Self::from_yaml(&content).map_err(|e| match e {
            DocpackError::ConfigParseFailed { reason, .. } => DocpackError::ConfigParseFailed {
                path: path.display().to_string(),
                reason,
            },
            other => other,
        })
    }

    /// Load `docpack.yaml` from `project_root` when it exists
    pub fn discover(project_root: &Path) -> Result<Option<Self>> {
        let path = config_path(project_root);
        if !path.is_file() {
            return Ok(None);
        }
        debug!(path = %path.display(), "loading configuration");
        Self::load(&path).map(Some)
    }

    /// Validate globs, templates and formats
    pub fn validate(&self) -> Result<()> {
        for pattern in self.include.iter().chain(&self.exclude) {
            validate_glob(pattern)?;
        }

        for (index, rule) in self.rules.iter().enumerate() {
            if rule.patterns.is_empty() {
                return Err(DocpackError::ConfigInvalid {
                    message: format!("rule {} has no patterns", index + 1),
                });
            }
            for pattern in &rule.patterns {
                validate_glob(pattern)?;
            }
            if let Some(t) = &rule.template {
                template::validate(t)?;
            }
        }

        for t in [&self.default_template, &self.unresolved_template]
            .into_iter()
            .flatten()
        {
            template::validate(t)?;
        }

        self.package_formats()?;

        if let Some(field) = &self.identity_field {
            if field.trim().is_empty() {
                return Err(DocpackError::ConfigInvalid {
                    message: "identity_field must not be empty".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Configured formats, parsed
    pub fn package_formats(&self) -> Result<Vec<PackageFormat>> {
        self.formats
            .iter()
            .map(|name| {
                PackageFormat::from_str(name, true).map_err(|_| DocpackError::ConfigInvalid {
                    message: format!(
                        "unknown format '{name}' (expected one of: dir, zip, npm, marketplace)"
                    ),
                })
            })
            .collect()
    }
}

/// Path of the configuration file for a project root
pub fn config_path(project_root: &Path) -> PathBuf {
    project_root.join(CONFIG_FILE)
}
