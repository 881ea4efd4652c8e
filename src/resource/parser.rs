//! Per-file parsing: reads one file and produces everything a registry
//! needs to build an entity except its identity.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::{EntityKind, Heading, Link, frontmatter, links};
use crate::error::{DocpackError, Result, read_failed};
use crate::hash;

/// Parsed contents of a single file
#[derive(Debug, Clone)]
pub struct ParsedFile {
    /// Canonical absolute path
    pub path: PathBuf,
    pub kind: EntityKind,
    pub body: Option<String>,
    pub links: Vec<Link>,
    pub headings: Vec<Heading>,
    pub size: u64,
    pub modified: Option<SystemTime>,
    pub checksum: String,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// Read and parse a file.
///
/// Markdown documents get their frontmatter, links and headings extracted;
/// any other file is an asset with only size, checksum and timestamps.
pub fn parse_file(path: &Path) -> Result<ParsedFile> {
    if !path.is_file() {
        return Err(DocpackError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let path = dunce::canonicalize(path).map_err(|e| read_failed(path, &e))?;
    let file_meta = std::fs::metadata(&path).map_err(|e| read_failed(&path, &e))?;
    let kind = EntityKind::from_path(&path);

    if kind == EntityKind::Asset {
        return Ok(ParsedFile {
            checksum: hash::hash_file(&path)?,
            path,
            kind,
            body: None,
            links: Vec::new(),
            headings: Vec::new(),
            size: file_meta.len(),
            modified: file_meta.modified().ok(),
            metadata: BTreeMap::new(),
        });
    }

    let content = std::fs::read_to_string(&path).map_err(|e| read_failed(&path, &e))?;
    let parsed = parse_document(&path, content);
    Ok(ParsedFile {
        modified: file_meta.modified().ok(),
        ..parsed
    })
}

/// Parse markdown text as if it were read from `path`
pub fn parse_document(path: &Path, content: String) -> ParsedFile {
    let source_dir = path.parent().unwrap_or(Path::new("/"));

    let (metadata, body_offset) = match frontmatter::split_frontmatter(&content) {
        Some(fm) => (frontmatter::to_metadata(&fm.value), fm.body_offset),
        None => (BTreeMap::new(), 0),
    };
    let extracted = links::extract(&content, body_offset, source_dir);

    ParsedFile {
        path: path.to_path_buf(),
        kind: EntityKind::Document,
        checksum: hash::hash_bytes(content.as_bytes()),
        size: content.len() as u64,
        modified: None,
        links: extracted.links,
        headings: extracted.headings,
        metadata,
        body: Some(content),
    }
}
