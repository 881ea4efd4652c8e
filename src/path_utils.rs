//! Cross-platform path utilities for docpack
//!
//! Link targets, identities, glob candidates and template paths are all
//! compared and rendered with forward slashes regardless of the host, so
//! bundles look the same no matter where they were built.

use std::path::{Component, Path, PathBuf};

use wax::{CandidatePath, Glob, Pattern};

use crate::error::{DocpackError, Result};

/// Convert a path to a forward-slash string
///
/// ```
/// use std::path::Path;
/// use docpack::path_utils::to_forward_slashes;
///
/// assert_eq!(to_forward_slashes(Path::new("docs\\guide.md")), "docs/guide.md");
/// ```
pub fn to_forward_slashes(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Resolve `.` and `..` components without touching the file system.
///
/// `..` at the root is dropped, so the result never climbs above the
/// first component of an absolute path.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match result.components().next_back() {
                Some(Component::Normal(_)) => {
                    result.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => result.push(".."),
            },
            other => result.push(other.as_os_str()),
        }
    }
    result
}

/// Check whether `path` lies inside `root` (or is `root` itself)
pub fn is_within(path: &Path, root: &Path) -> bool {
    normalize_lexically(path).starts_with(normalize_lexically(root))
}

/// Relative path from directory `from_dir` to `to`, with forward slashes.
///
/// Both inputs are expected to be absolute. Returns `to` itself (forward
/// slashes) when the two share no common prefix, e.g. different drives.
pub fn relative_path(from_dir: &Path, to: &Path) -> String {
    let from = normalize_lexically(from_dir);
    let to = normalize_lexically(to);

    let from_parts: Vec<Component> = from.components().collect();
    let to_parts: Vec<Component> = to.components().collect();

    let common = from_parts
        .iter()
        .zip(to_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    if common == 0 {
        return to_forward_slashes(&to);
    }

    let mut segments: Vec<String> = Vec::new();
    for _ in common..from_parts.len() {
        segments.push("..".to_string());
    }
    for part in &to_parts[common..] {
        segments.push(part.as_os_str().to_string_lossy().to_string());
    }

    if segments.is_empty() {
        ".".to_string()
    } else {
        segments.join("/")
    }
}

/// Deepest directory containing every path in `paths`
pub fn common_ancestor<'a>(paths: impl IntoIterator<Item = &'a Path>) -> Option<PathBuf> {
    let mut iter = paths.into_iter();
    let first = iter.next()?;
    let mut ancestor = first.parent().map(Path::to_path_buf)?;

    for path in iter {
        while !path.starts_with(&ancestor) {
            if !ancestor.pop() {
                return None;
            }
        }
    }

    Some(ancestor)
}

/// Turn an arbitrary string into a kebab-case identifier.
///
/// Non-alphanumeric characters (including path separators) become hyphens,
/// camel-case humps are split, runs of hyphens collapse and leading or
/// trailing hyphens are trimmed. Returns "unknown" if nothing is left.
///
/// ```
/// use docpack::path_utils::to_kebab_case;
///
/// assert_eq!(to_kebab_case("docs/API Guide"), "docs-api-guide");
/// assert_eq!(to_kebab_case("gettingStarted"), "getting-started");
/// assert_eq!(to_kebab_case(":::"), "unknown");
/// ```
pub fn to_kebab_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut prev_lower = false;

    for c in input.chars() {
        if c.is_alphanumeric() {
            if c.is_uppercase() && prev_lower {
                out.push('-');
            }
            out.extend(c.to_lowercase());
            prev_lower = c.is_lowercase() || c.is_numeric();
        } else {
            out.push('-');
            prev_lower = false;
        }
    }

    let key = out
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    if key.is_empty() {
        "unknown".to_string()
    } else {
        key
    }
}

/// Validate a glob pattern, returning a typed error for bad syntax
pub fn validate_glob(pattern: &str) -> Result<()> {
    Glob::new(pattern)
        .map(|_| ())
        .map_err(|e| DocpackError::InvalidGlob {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
}

/// Check if a glob pattern matches a file path
///
/// Uses wax for platform-independent glob matching. Paths are normalized
/// to forward slashes. An invalid pattern falls back to an exact match.
pub fn matches_glob(pattern: &str, file_path: &str) -> bool {
    let normalized_path = to_forward_slashes(Path::new(file_path));
    let candidate = CandidatePath::from(normalized_path.as_str());

    match Glob::new(pattern) {
        Ok(glob) => glob.matched(&candidate).is_some(),
        Err(_) => pattern == normalized_path,
    }
}

/// Path used as a glob candidate: relative to `base` when inside it,
/// otherwise the absolute forward-slash path.
pub fn glob_candidate(path: &Path, base: Option<&Path>) -> String {
    if let Some(base) = base {
        if let Ok(relative) = normalize_lexically(path).strip_prefix(normalize_lexically(base)) {
            return to_forward_slashes(relative);
        }
    }
    to_forward_slashes(path)
}
