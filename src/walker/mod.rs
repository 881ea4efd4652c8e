//! Bounded dependency walk
//!
//! Breadth-first traversal over resolved local-file links starting at a root
//! entity. Each candidate target is either accepted into the bundle at the
//! depth it was first reached, or logged as excluded with the first
//! applicable reason, checked in this fixed order:
//!
//! 1. `outside-project` - target lies outside the project root
//! 2. `navigation-file` - README/index/toc style file, when enabled
//! 3. `pattern-matched` - an exclude rule glob matches (first rule wins)
//! 4. `depth-exceeded` - accepting it would exceed the depth limit
//!
//! Link targets that are not in the registry are skipped silently; they are
//! a validation concern, not a bundling one.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::path_utils::{glob_candidate, is_within, matches_glob};
use crate::registry::{LinkResolution, Registry};
use crate::resource::Entity;

/// Base names (lowercase, without extension) treated as navigation files
pub const NAVIGATION_STEMS: &[&str] = &[
    "readme",
    "index",
    "toc",
    "overview",
    "summary",
    "contents",
    "table-of-contents",
    "table_of_contents",
];

const NAVIGATION_EXTENSIONS: &[&str] = &["md", "markdown", "mdx"];

/// Glob patterns deciding whether a link target is dropped, with an optional
/// template used to render links to dropped targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludeRule {
    pub patterns: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

impl ExcludeRule {
    pub fn new(patterns: Vec<String>) -> Self {
        Self {
            patterns,
            template: None,
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Whether any pattern matches the glob candidate path
    pub fn matches(&self, candidate: &str) -> bool {
        self.patterns.iter().any(|p| matches_glob(p, candidate))
    }
}

/// Walk policy
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    /// Deepest dependency level to bundle; `None` is unbounded
    pub max_depth: Option<usize>,

    /// Ordered exclude rules; the first match wins
    pub exclude_rules: Vec<ExcludeRule>,

    /// Boundary outside of which nothing is bundled
    pub project_root: PathBuf,

    /// Exclude README/index/toc style files
    pub exclude_navigation_files: bool,
}

/// Why a candidate was left out of the bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExclusionReason {
    OutsideProject,
    NavigationFile,
    PatternMatched,
    DepthExceeded,
}

impl ExclusionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ExclusionReason::OutsideProject => "outside-project",
            ExclusionReason::NavigationFile => "navigation-file",
            ExclusionReason::PatternMatched => "pattern-matched",
            ExclusionReason::DepthExceeded => "depth-exceeded",
        }
    }
}

impl std::fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entity accepted into the bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundledEntity {
    pub id: String,
    pub path: PathBuf,
    /// Link distance from the root (direct dependencies are depth 1)
    pub depth: usize,
}

/// Candidate left out of the bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExcludedReference {
    /// Absolute target path
    pub path: PathBuf,
    pub id: String,
    pub reason: ExclusionReason,
    /// Index of the matching rule for `pattern-matched` exclusions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<usize>,
    /// Identity of the entity whose link first reached the target
    pub from: String,
    pub depth: usize,
}

/// Outcome of one walk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WalkResult {
    /// Bundled documents in the order they were accepted
    pub entities: Vec<BundledEntity>,
    /// Bundled non-document files
    pub assets: Vec<BundledEntity>,
    pub excluded: Vec<ExcludedReference>,
    /// Greatest depth among accepted entities
    pub max_depth: usize,
}

impl WalkResult {
    /// Whether `id` was accepted as a document or asset
    pub fn contains(&self, id: &str) -> bool {
        self.entities.iter().chain(&self.assets).any(|e| e.id == id)
    }

    /// Exclusion entry for `path`, if it was excluded
    pub fn exclusion_for(&self, path: &Path) -> Option<&ExcludedReference> {
        self.excluded.iter().find(|e| e.path == path)
    }
}

/// Check whether a file name is a navigation file (case-insensitive)
pub fn is_navigation_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let lower = name.to_ascii_lowercase();
    let Some((stem, ext)) = lower.rsplit_once('.') else {
        return false;
    };
    NAVIGATION_STEMS.contains(&stem) && NAVIGATION_EXTENSIONS.contains(&ext)
}

/// Walk the dependency graph from `root_id`
///
/// A root that is not in the registry yields an empty result.
pub fn walk(
    root_id: &str,
    registry: &Registry,
    resolution: &LinkResolution,
    options: &WalkOptions,
) -> WalkResult {
    let mut result = WalkResult::default();
    let Some(root) = registry.get_by_id(root_id) else {
        debug!(root = root_id, "root is not registered, nothing to walk");
        return result;
    };

    let mut visited: HashSet<String> = HashSet::from([root.id.clone()]);
    let mut logged: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<(&Entity, usize)> = VecDeque::from([(root, 1)]);

    while let Some((entity, depth)) = queue.pop_front() {
        for (index, link) in entity.local_links() {
            let Some(target) = resolution
                .get(&entity.id, index)
                .and_then(|id| registry.get_by_id(id))
                .or_else(|| link.target.as_deref().and_then(|t| registry.get(t)))
            else {
                trace!(href = %link.href, from = %entity.id, "link target not registered");
                continue;
            };

            if visited.contains(&target.id) || logged.contains(&target.id) {
                continue;
            }

            if let Some((reason, rule)) = exclusion(target, depth, options) {
                debug!(
                    target = %target.id,
                    from = %entity.id,
                    reason = %reason,
                    "excluded from bundle"
                );
                logged.insert(target.id.clone());
                result.excluded.push(ExcludedReference {
                    path: target.path.clone(),
                    id: target.id.clone(),
                    reason,
                    rule,
                    from: entity.id.clone(),
                    depth,
                });
                continue;
            }

            visited.insert(target.id.clone());
            result.max_depth = result.max_depth.max(depth);
            let bundled = BundledEntity {
                id: target.id.clone(),
                path: target.path.clone(),
                depth,
            };

            if target.is_document() {
                result.entities.push(bundled);
                queue.push_back((target, depth + 1));
            } else {
                result.assets.push(bundled);
            }
        }
    }

    result
}

/// First applicable exclusion for a candidate reached at `depth`
fn exclusion(
    target: &Entity,
    depth: usize,
    options: &WalkOptions,
) -> Option<(ExclusionReason, Option<usize>)> {
    if !is_within(&target.path, &options.project_root) {
        return Some((ExclusionReason::OutsideProject, None));
    }

    if options.exclude_navigation_files && is_navigation_file(&target.path) {
        return Some((ExclusionReason::NavigationFile, None));
    }

    let candidate = glob_candidate(&target.path, Some(&options.project_root));
    if let Some(index) = options
        .exclude_rules
        .iter()
        .position(|rule| rule.matches(&candidate))
    {
        return Some((ExclusionReason::PatternMatched, Some(index)));
    }

    if options.max_depth.is_some_and(|max| depth > max) {
        return Some((ExclusionReason::DepthExceeded, None));
    }

    None
}
