//! File discovery for registry crawls
//!
//! Walks a base directory and keeps files whose base-relative path matches
//! at least one include glob and no exclude glob. Directories matching an
//! exclude glob are pruned without being descended into.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{DocpackError, Result};
use crate::path_utils::{matches_glob, to_forward_slashes, validate_glob};

/// Include globs used when none are configured
pub const DEFAULT_INCLUDE: &[&str] = &["**/*"];

/// Exclude globs applied on top of configured ones
pub const DEFAULT_EXCLUDE: &[&str] = &[
    "**/.git",
    "**/.git/**",
    "**/node_modules",
    "**/node_modules/**",
    "**/target",
    "**/target/**",
];

/// Discover candidate files below `base`, sorted by path
pub fn discover(base: &Path, include: &[String], exclude: &[String]) -> Result<Vec<PathBuf>> {
    if !base.is_dir() {
        return Err(DocpackError::FileNotFound {
            path: base.display().to_string(),
        });
    }
    for pattern in include.iter().chain(exclude) {
        validate_glob(pattern)?;
    }

    let relative = |path: &Path| -> String {
        to_forward_slashes(path.strip_prefix(base).unwrap_or(path))
    };
    let excluded = |rel: &str| exclude.iter().any(|p| matches_glob(p, rel));

    let mut files = Vec::new();
    let walker = WalkDir::new(base).follow_links(true).into_iter();
    for entry in walker.filter_entry(|e| e.depth() == 0 || !excluded(&relative(e.path()))) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = relative(entry.path());
        if include.iter().any(|p| matches_glob(p, &rel)) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}

/// Configured globs, or the defaults when `configured` is empty
pub fn include_or_default(configured: &[String]) -> Vec<String> {
    if configured.is_empty() {
        DEFAULT_INCLUDE.iter().map(ToString::to_string).collect()
    } else {
        configured.to_vec()
    }
}

/// Configured exclude globs plus the built-in ones
pub fn exclude_with_defaults(configured: &[String]) -> Vec<String> {
    DEFAULT_EXCLUDE
        .iter()
        .map(ToString::to_string)
        .chain(configured.iter().cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(base: &Path, rel: &str) {
        let path = base.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "x").unwrap();
    }

    #[test]
    fn test_discover_with_globs() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.md");
        write(temp.path(), "docs/b.md");
        write(temp.path(), "docs/img/c.png");
        write(temp.path(), "drafts/d.md");

        let files = discover(
            temp.path(),
            &["**/*.md".to_string()],
            &["drafts/**".to_string()],
        )
        .unwrap();

        let names: Vec<String> = files
            .iter()
            .map(|f| to_forward_slashes(f.strip_prefix(temp.path()).unwrap()))
            .collect();
        assert_eq!(names, vec!["a.md", "docs/b.md"]);
    }

    #[test]
    fn test_default_excludes_prune_directories() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.md");
        write(temp.path(), "node_modules/pkg/readme.md");
        write(temp.path(), ".git/HEAD");

        let files = discover(
            temp.path(),
            &include_or_default(&[]),
            &exclude_with_defaults(&[]),
        )
        .unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("a.md"));
    }

    #[test]
    fn test_discover_rejects_invalid_glob() {
        let temp = TempDir::new().unwrap();
        let result = discover(temp.path(), &["docs/{a,b".to_string()], &[]);
        assert!(matches!(result, Err(DocpackError::InvalidGlob { .. })));
    }

    #[test]
    fn test_discover_missing_base() {
        let result = discover(Path::new("/nonexistent/base"), &[], &[]);
        assert!(matches!(result, Err(DocpackError::FileNotFound { .. })));
    }
}
