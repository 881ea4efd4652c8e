//! Resource registry
//!
//! Owns every entity of a project, assigns each a unique identity and, once
//! all files are loaded, resolves local-file links to the identities of the
//! entities they point at.
//!
//! ## Identity derivation
//!
//! In priority order:
//!
//! 1. the configured frontmatter field, when present and non-empty
//! 2. the path relative to the base directory (segments joined by the
//!    separator, extension dropped for documents), when a base directory is
//!    configured and contains the file
//! 3. the file name without extension (assets keep their extension)
//!
//! ## Resolution
//!
//! Link extraction happens at parse time; resolution is a separate pass that
//! returns a [`LinkResolution`] side-table instead of mutating entities, so a
//! registry can be built incrementally before cross-references are final.

pub mod crawl;

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{DocpackError, Result};
use crate::path_utils::{glob_candidate, matches_glob, normalize_lexically, validate_glob};
use crate::resource::{Entity, EntityKind, ParsedFile, frontmatter, parse_file};

/// How identities are derived for new entities
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityOptions {
    /// Frontmatter field whose value, when set, is the identity
    pub field: Option<String>,

    /// Directory identities are made relative to
    pub base_dir: Option<PathBuf>,

    /// Joins directory segments of base-relative identities
    pub separator: String,
}

impl Default for IdentityOptions {
    fn default() -> Self {
        Self {
            field: None,
            base_dir: None,
            separator: "/".to_string(),
        }
    }
}

impl IdentityOptions {
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        self.base_dir = Some(dunce::canonicalize(&base_dir).unwrap_or(base_dir));
        self
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }
}

/// Address of one link: owning entity plus index into its link list
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkKey {
    pub entity: String,
    pub index: usize,
}

/// Resolved identities of local-file links, keyed by link location
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkResolution {
    resolved: BTreeMap<LinkKey, String>,
}

impl LinkResolution {
    /// Resolved identity of link `index` in entity `entity`
    pub fn get(&self, entity: &str, index: usize) -> Option<&str> {
        self.resolved
            .get(&LinkKey {
                entity: entity.to_string(),
                index,
            })
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&LinkKey, &str)> {
        self.resolved.iter().map(|(k, v)| (k, v.as_str()))
    }
}

/// Set of entities for one project
#[derive(Debug, Clone, Default)]
pub struct Registry {
    options: IdentityOptions,
    entities: BTreeMap<String, Entity>,
    by_path: HashMap<PathBuf, String>,
}

impl Registry {
    /// Create an empty registry with default identity options
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry with the given identity options
    pub fn with_options(options: IdentityOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> &IdentityOptions {
        &self.options
    }

    /// Parse a file and insert it, replacing any earlier parse of the same path
    pub fn add(&mut self, path: &Path) -> Result<&Entity> {
        let parsed = parse_file(path)?;
        let ids = self.insert_batch(vec![parsed])?;
        let id = ids.into_iter().next().unwrap_or_default();
        self.entities
            .get(&id)
            .ok_or_else(|| DocpackError::FileNotFound {
                path: path.display().to_string(),
            })
    }

    /// Parse a batch of files and insert them all, or none of them
    ///
    /// Every file is parsed and every identity checked before the registry
    /// is touched, so an identity conflict leaves the registry unchanged.
    pub fn add_many<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<Vec<String>> {
        let parsed = paths
            .iter()
            .map(|p| parse_file(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        self.insert_batch(parsed)
    }

    /// Insert already-parsed files with the same all-or-nothing semantics as
    /// [`Registry::add_many`]
    pub fn insert_batch(&mut self, batch: Vec<ParsedFile>) -> Result<Vec<String>> {
        let mut staged: Vec<(String, ParsedFile)> = Vec::with_capacity(batch.len());
        let mut staged_index: HashMap<PathBuf, usize> = HashMap::new();
        let mut claimed: HashMap<String, PathBuf> = HashMap::new();

        for parsed in batch {
            let id = self.derive_identity(&parsed);

            if let Some(path) = claimed.get(&id) {
                if *path != parsed.path {
                    return Err(duplicate(&id, path, &parsed.path));
                }
            }
            if let Some(existing) = self.entities.get(&id) {
                if existing.path != parsed.path {
                    return Err(duplicate(&id, &existing.path, &parsed.path));
                }
            }

            claimed.insert(id.clone(), parsed.path.clone());
            if let Some(&index) = staged_index.get(&parsed.path) {
                staged[index] = (id, parsed);
            } else {
                staged_index.insert(parsed.path.clone(), staged.len());
                staged.push((id, parsed));
            }
        }

        let mut ids = Vec::with_capacity(staged.len());
        for (id, parsed) in staged {
            if let Some(old_id) = self.by_path.remove(&parsed.path) {
                self.entities.remove(&old_id);
            }
            self.by_path.insert(parsed.path.clone(), id.clone());
            self.entities
                .insert(id.clone(), Entity::from_parsed(id.clone(), parsed));
            ids.push(id);
        }

        Ok(ids)
    }

    /// Identity a parsed file would receive in this registry
    pub fn derive_identity(&self, parsed: &ParsedFile) -> String {
        if let Some(field) = &self.options.field {
            if let Some(value) = frontmatter::get_str(&parsed.metadata, field) {
                let value = value.trim();
                if !value.is_empty() {
                    return value.to_string();
                }
            }
        }

        let keep_extension = parsed.kind == EntityKind::Asset;

        if let Some(base) = &self.options.base_dir {
            if let Ok(relative) = parsed.path.strip_prefix(base) {
                let mut segments: Vec<String> = relative
                    .parent()
                    .into_iter()
                    .flat_map(Path::components)
                    .map(|c| c.as_os_str().to_string_lossy().to_string())
                    .collect();
                segments.push(file_label(relative, keep_extension));
                return segments.join(&self.options.separator);
            }
        }

        file_label(&parsed.path, keep_extension)
    }

    /// Resolve every local-file link to the identity of its target entity
    ///
    /// Links whose target is not registered are simply absent from the
    /// result. Calling this twice on an unchanged registry yields equal
    /// resolutions.
    pub fn resolve_links(&self) -> LinkResolution {
        let mut resolved = BTreeMap::new();
        for entity in self.entities.values() {
            for (index, link) in entity.local_links() {
                let Some(target) = &link.target else {
                    continue;
                };
                if let Some(id) = self.by_path.get(target) {
                    resolved.insert(
                        LinkKey {
                            entity: entity.id.clone(),
                            index,
                        },
                        id.clone(),
                    );
                }
            }
        }
        debug!(links = resolved.len(), "resolved local links");
        LinkResolution { resolved }
    }

    /// Entity registered at `path`
    pub fn get(&self, path: &Path) -> Option<&Entity> {
        let id = self
            .by_path
            .get(path)
            .or_else(|| self.by_path.get(&normalize_lexically(path)))?;
        self.entities.get(id)
    }

    /// Entity with identity `id`
    pub fn get_by_id(&self, id: &str) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Entities whose path matches `pattern`
    ///
    /// The pattern is matched against the base-relative path when a base
    /// directory is configured, otherwise against the absolute path.
    pub fn get_by_pattern(&self, pattern: &str) -> Result<Vec<&Entity>> {
        validate_glob(pattern)?;
        let base = self.options.base_dir.as_deref();
        Ok(self
            .entities
            .values()
            .filter(|e| matches_glob(pattern, &glob_candidate(&e.path, base)))
            .collect())
    }

    /// Discover files below `base_dir` and add them as one batch
    pub fn crawl(
        &mut self,
        base_dir: &Path,
        include: &[String],
        exclude: &[String],
    ) -> Result<Vec<String>> {
        let files = crawl::discover(base_dir, include, exclude)?;
        debug!(
            base = %base_dir.display(),
            files = files.len(),
            "crawled project files"
        );
        self.add_many(&files)
    }

    /// All entities in identity order
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Copy of this registry with entity paths rewritten by `relocate`
    ///
    /// Identities are preserved; entities for which `relocate` returns
    /// `None` are left out.
    pub fn relocated(&self, relocate: impl Fn(&Path) -> Option<PathBuf>) -> Registry {
        let mut relocated = Registry::with_options(self.options.clone());
        for entity in self.entities.values() {
            let Some(path) = relocate(&entity.path) else {
                continue;
            };
            let mut moved = entity.clone();
            moved.path = path.clone();
            relocated.by_path.insert(path, moved.id.clone());
            relocated.entities.insert(moved.id.clone(), moved);
        }
        relocated
    }
}

fn file_label(path: &Path, keep_extension: bool) -> String {
    let label = if keep_extension {
        path.file_name()
    } else {
        path.file_stem()
    };
    label
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn duplicate(id: &str, first: &Path, second: &Path) -> DocpackError {
    DocpackError::DuplicateIdentity {
        id: id.to_string(),
        first: first.display().to_string(),
        second: second.display().to_string(),
    }
}
