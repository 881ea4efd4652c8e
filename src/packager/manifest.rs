//! Package descriptors written next to a bundle
//!
//! - `package.json` - npm-style descriptor for publishing the bundle
//! - `.claude-plugin/marketplace.json` - marketplace listing with one plugin

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::PackageMetadata;
use crate::error::{DocpackError, Result, write_failed};

pub const PACKAGE_JSON: &str = "package.json";
pub const MARKETPLACE_JSON: &str = ".claude-plugin/marketplace.json";

/// `package.json` contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageJson {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Root document, relative to the package
    pub main: String,
    /// Every bundled file, relative to the package
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Marketplace listing (`.claude-plugin/marketplace.json`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketplaceConfig {
    pub name: String,
    #[serde(default)]
    pub plugins: Vec<MarketplacePlugin>,
}

/// One plugin entry in marketplace.json
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketplacePlugin {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Bundled documents, relative to `source`
    #[serde(default)]
    pub documents: Vec<String>,
}

impl MarketplaceConfig {
    /// Parse marketplace.json from a file path
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| DocpackError::ConfigReadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        serde_json::from_str(&content).map_err(|e| DocpackError::ConfigParseFailed {
            path: path.display().to_string(),
            reason: format!("Invalid JSON: {e}"),
        })
    }
}

/// Write `package.json` into `output_dir`
pub fn write_package_json(
    output_dir: &Path,
    metadata: &PackageMetadata,
    main: &str,
    files: &[String],
) -> Result<PathBuf> {
    let package = PackageJson {
        name: metadata.name.clone(),
        version: metadata.version.clone(),
        description: metadata.description.clone(),
        license: metadata.license.clone(),
        author: metadata.author.clone(),
        main: main.to_string(),
        files: files.to_vec(),
        keywords: vec!["documentation".to_string(), "docpack".to_string()],
    };
    write_json(&output_dir.join(PACKAGE_JSON), &package)
}

/// Write `.claude-plugin/marketplace.json` into `output_dir`
pub fn write_marketplace_json(
    output_dir: &Path,
    metadata: &PackageMetadata,
    documents: &[String],
) -> Result<PathBuf> {
    let config = MarketplaceConfig {
        name: metadata.name.clone(),
        plugins: vec![MarketplacePlugin {
            name: metadata.name.clone(),
            description: metadata.description.clone().unwrap_or_default(),
            version: Some(metadata.version.clone()),
            source: Some("./".to_string()),
            license: metadata.license.clone(),
            author: metadata.author.clone(),
            documents: documents.to_vec(),
        }],
    };
    write_json(&output_dir.join(MARKETPLACE_JSON), &config)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| write_failed(parent, &e))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, format!("{json}\n")).map_err(|e| write_failed(path, &e))?;
    debug!(path = %path.display(), "wrote manifest");
    Ok(path.to_path_buf())
}
