//! Destination naming for bundled files
//!
//! A [`PathMap`] assigns every bundled source file its path inside the
//! output directory. The root document always lands at the top of the
//! output under its own file name; everything else is named by the active
//! [`NamingStrategy`]. Two sources that would land on the same destination
//! (compared case-insensitively) fail the whole map before anything is
//! written.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DocpackError, Result};
use crate::path_utils::{glob_candidate, to_forward_slashes, to_kebab_case};

/// How bundled files are named in the output directory
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum NamingStrategy {
    /// File name only: `docs/api/intro.md` -> `intro.md`
    Flat,
    /// Kebab-case of the base-relative path: `docs/api/intro.md` -> `docs-api-intro.md`
    Flattened,
    /// Base-relative path as is
    #[default]
    Preserve,
}

impl NamingStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            NamingStrategy::Flat => "flat",
            NamingStrategy::Flattened => "flattened",
            NamingStrategy::Preserve => "preserve",
        }
    }
}

impl std::fmt::Display for NamingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Naming strategy plus the directories it is evaluated against
#[derive(Debug, Clone)]
pub struct Naming {
    pub strategy: NamingStrategy,

    /// Directory source paths are made relative to
    pub base_dir: PathBuf,

    /// Leading path removed before flattening (`docs` turns
    /// `docs/api/intro.md` into `api-intro.md`)
    pub strip_prefix: Option<String>,

    pub output_dir: PathBuf,
}

impl Naming {
    pub fn new(strategy: NamingStrategy, base_dir: &Path, output_dir: &Path) -> Self {
        Self {
            strategy,
            base_dir: base_dir.to_path_buf(),
            strip_prefix: None,
            output_dir: output_dir.to_path_buf(),
        }
    }

    pub fn with_strip_prefix(mut self, prefix: Option<String>) -> Self {
        self.strip_prefix = prefix;
        self
    }

    /// Destination of a non-root source file
    pub fn destination(&self, source: &Path) -> PathBuf {
        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        match self.strategy {
            NamingStrategy::Flat => self.output_dir.join(file_name),
            NamingStrategy::Preserve => {
                let relative = glob_candidate(source, Some(&self.base_dir));
                self.output_dir.join(relative.trim_start_matches('/'))
            }
            NamingStrategy::Flattened => self.output_dir.join(self.flattened_name(source)),
        }
    }

    fn flattened_name(&self, source: &Path) -> String {
        let relative = glob_candidate(source, Some(&self.base_dir));
        let mut relative = relative.trim_start_matches('/');

        if let Some(prefix) = &self.strip_prefix {
            let prefix = prefix.trim_matches('/');
            if !prefix.is_empty() {
                if let Some(rest) = relative.strip_prefix(prefix) {
                    if rest.starts_with('/') {
                        relative = rest.trim_start_matches('/');
                    }
                }
            }
        }

        let path = Path::new(relative);
        let without_ext = path.with_extension("");
        let key = to_kebab_case(&to_forward_slashes(&without_ext));
        match path.extension() {
            Some(ext) => format!("{key}.{}", ext.to_string_lossy()),
            None => key,
        }
    }
}

/// Ordered source -> destination assignment for one bundle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathMap {
    entries: Vec<(PathBuf, PathBuf)>,
    by_source: HashMap<PathBuf, usize>,
}

impl PathMap {
    /// Map `root` and every path in `sources`
    ///
    /// Fails with [`DocpackError::DestinationCollision`] as soon as two
    /// distinct sources share a destination.
    pub fn build<'a>(
        root: &Path,
        sources: impl IntoIterator<Item = &'a Path>,
        naming: &Naming,
    ) -> Result<Self> {
        let root_name = root.file_name().map(PathBuf::from).unwrap_or_default();
        let mut map = PathMap::default();
        let mut claimed: HashMap<String, usize> = HashMap::new();

        let planned = std::iter::once((root, naming.output_dir.join(root_name))).chain(
            sources
                .into_iter()
                .filter(|source| *source != root)
                .map(|source| (source, naming.destination(source))),
        );

        for (source, destination) in planned {
            if map.by_source.contains_key(source) {
                continue;
            }

            let key = to_forward_slashes(&destination).to_lowercase();
            if let Some(&index) = claimed.get(&key) {
                let (first_source, first_destination) = &map.entries[index];
                debug!(
                    first = %first_source.display(),
                    second = %source.display(),
                    "destination collision"
                );
                return Err(DocpackError::DestinationCollision {
                    strategy: naming.strategy.to_string(),
                    first_source: first_source.display().to_string(),
                    first_destination: first_destination.display().to_string(),
                    second_source: source.display().to_string(),
                    second_destination: destination.display().to_string(),
                });
            }

            claimed.insert(key, map.entries.len());
            map.by_source.insert(source.to_path_buf(), map.entries.len());
            map.entries.push((source.to_path_buf(), destination));
        }

        Ok(map)
    }

    /// Destination of `source`
    pub fn get(&self, source: &Path) -> Option<&Path> {
        self.by_source
            .get(source)
            .map(|&index| self.entries[index].1.as_path())
    }

    pub fn contains(&self, source: &Path) -> bool {
        self.by_source.contains_key(source)
    }

    /// `(source, destination)` pairs in insertion order, root first
    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Path)> {
        self.entries
            .iter()
            .map(|(source, destination)| (source.as_path(), destination.as_path()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
