//! Resource models for parsed documents and data files
//!
//! An **Entity** is one file known to a registry: a markdown document with
//! its body, links and heading outline, or an asset (image, data file, ...)
//! that is only ever a link target.
//!
//! A **Link** is one occurrence of link syntax in a document, either inline
//! (`[text](target)`) or a reference-style definition (`[label]: target`),
//! together with the byte spans needed to rewrite it in place.

pub mod frontmatter;
pub mod links;
pub mod mime;
pub mod parser;

use std::collections::BTreeMap;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

pub use parser::{ParsedFile, parse_file};

/// File extensions treated as markdown documents
pub const DOCUMENT_EXTENSIONS: &[&str] = &["md", "markdown", "mdx"];

/// Classification of a link target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkType {
    /// Another file in the same tree (`guide.md`, `../img/a.png`)
    LocalFile,
    /// Same-file anchor (`#usage`)
    Anchor,
    /// URL with a scheme (`https://...`) or protocol-relative (`//host/...`)
    External,
    /// `mailto:` link or bare address
    Email,
    /// Empty or otherwise unclassifiable target
    Unknown,
}

impl LinkType {
    /// Parse a type name as used in configuration files
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "local-file" | "local" | "file" => Some(LinkType::LocalFile),
            "anchor" => Some(LinkType::Anchor),
            "external" | "url" => Some(LinkType::External),
            "email" | "mail" => Some(LinkType::Email),
            "unknown" => Some(LinkType::Unknown),
            _ => None,
        }
    }

    /// Name used in templates and configuration
    pub fn as_str(self) -> &'static str {
        match self {
            LinkType::LocalFile => "local-file",
            LinkType::Anchor => "anchor",
            LinkType::External => "external",
            LinkType::Email => "email",
            LinkType::Unknown => "unknown",
        }
    }
}

/// Whether a link occurrence is inline or a reference definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkNode {
    /// `[text](target)` or `![alt](target)`
    Inline,
    /// `[label]: target`
    Definition,
}

/// One link occurrence inside a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Link text, or the label for definitions
    pub text: String,

    /// Raw target exactly as written
    pub href: String,

    /// Optional link title (`"title"`)
    pub title: Option<String>,

    pub link_type: LinkType,

    /// Absolute, normalized target path for local-file links with a non-empty
    /// path part; anchors and query strings are stripped
    pub target: Option<PathBuf>,

    /// Fragment without the leading `#`
    pub fragment: Option<String>,

    /// 1-based line number
    pub line: usize,

    pub node: LinkNode,

    /// `![alt](src)` rather than `[text](href)`
    pub image: bool,

    /// Byte range of the whole occurrence: `[text](href)` for inline links
    /// (the `!` of an image is outside), `[label]: target` for definitions
    pub span: Range<usize>,

    /// Byte range of the destination (plus title for definitions)
    pub target_span: Range<usize>,

    /// Byte range of the full source line including its newline
    pub line_span: Range<usize>,
}

impl Link {
    /// True for local-file links that point at another file
    pub fn is_local_file(&self) -> bool {
        self.link_type == LinkType::LocalFile && self.target.is_some()
    }

    /// Fragment with its leading `#`, or an empty string
    pub fn fragment_suffix(&self) -> String {
        self.fragment
            .as_ref()
            .map(|f| format!("#{f}"))
            .unwrap_or_default()
    }
}

/// One ATX heading in a document outline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    pub level: u8,
    pub text: String,
    pub line: usize,
}

/// Document or asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    Document,
    Asset,
}

impl EntityKind {
    /// Classify a path by extension
    pub fn from_path(path: &Path) -> Self {
        let is_document = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                DOCUMENT_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            });
        if is_document {
            EntityKind::Document
        } else {
            EntityKind::Asset
        }
    }
}

/// A parsed, identity-bearing file held by a registry
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    /// Unique identity within the owning registry
    pub id: String,

    /// Canonical absolute path
    pub path: PathBuf,

    pub kind: EntityKind,

    /// Full text for documents, `None` for assets
    pub body: Option<String>,

    pub links: Vec<Link>,

    pub headings: Vec<Heading>,

    /// Size in bytes
    pub size: u64,

    pub modified: Option<SystemTime>,

    /// BLAKE3 checksum with `blake3:` prefix
    pub checksum: String,

    /// Frontmatter properties
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Entity {
    /// Build an entity from a parsed file and its derived identity
    pub fn from_parsed(id: impl Into<String>, parsed: ParsedFile) -> Self {
        Self {
            id: id.into(),
            path: parsed.path,
            kind: parsed.kind,
            body: parsed.body,
            links: parsed.links,
            headings: parsed.headings,
            size: parsed.size,
            modified: parsed.modified,
            checksum: parsed.checksum,
            metadata: parsed.metadata,
        }
    }

    pub fn is_document(&self) -> bool {
        self.kind == EntityKind::Document
    }

    /// File name including extension
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|s| s.to_str())
    }

    /// File name without extension
    pub fn stem(&self) -> Option<&str> {
        self.path.file_stem().and_then(|s| s.to_str())
    }

    /// File extension without the dot
    pub fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|s| s.to_str())
    }

    /// MIME type inferred from the extension
    pub fn mime_type(&self) -> &'static str {
        mime::from_extension(self.extension().unwrap_or_default())
    }

    /// Rough token estimate for LLM context budgeting (one token per four bytes)
    pub fn estimated_tokens(&self) -> u64 {
        self.size.div_ceil(4)
    }

    /// String value of a frontmatter property
    pub fn metadata_str(&self, key: &str) -> Option<String> {
        frontmatter::get_str(&self.metadata, key)
    }

    /// Local-file links that point at another file
    pub fn local_links(&self) -> impl Iterator<Item = (usize, &Link)> {
        self.links
            .iter()
            .enumerate()
            .filter(|(_, link)| link.is_local_file())
    }
}
