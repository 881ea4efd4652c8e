//! Rule-based link rewriting
//!
//! Every link occurrence handed to the engine is matched against an ordered
//! rule list. The first rule whose type filter, path patterns and excluded
//! identities all admit the link renders its template over a typed
//! [`RenderContext`], and the output replaces the link's source span:
//! the whole `[text](href)` for inline links, the right-hand side for
//! reference definitions. With [`TransformOptions::target_only`] only the
//! destination is replaced. With no matching rule the default template is
//! used, and with no default the link is left alone, except for definitions
//! of unresolved local targets, whose line is deleted.
//!
//! Rewriting is a span replace over the byte ranges recorded at parse time,
//! so several passes can be merged into one edit plan with [`edits`] and
//! applied once with [`apply_edits`].

pub mod template;

use std::collections::BTreeMap;
use std::ops::Range;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

use crate::error::Result;
use crate::path_utils::{glob_candidate, matches_glob, relative_path, validate_glob};
use crate::registry::{LinkResolution, Registry};
use crate::resource::{Entity, Link, LinkNode, LinkType};

pub use template::Template;

/// One rewrite rule
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteRule {
    /// Link types the rule applies to; `None` matches every type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<LinkType>>,

    /// Globs matched against the resolved entity's path; a link without a
    /// resolved entity never satisfies a pattern filter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patterns: Option<Vec<String>>,

    /// Identities the rule never applies to
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_ids: Vec<String>,

    pub template: String,
}

impl RewriteRule {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            ..Self::default()
        }
    }

    pub fn with_types(mut self, types: Vec<LinkType>) -> Self {
        self.types = Some(types);
        self
    }

    pub fn with_patterns(mut self, patterns: Vec<String>) -> Self {
        self.patterns = Some(patterns);
        self
    }

    pub fn with_exclude_ids(mut self, ids: Vec<String>) -> Self {
        self.exclude_ids = ids;
        self
    }

    /// Reject bad globs and malformed templates up front
    pub fn validate(&self) -> Result<()> {
        for pattern in self.patterns.iter().flatten() {
            validate_glob(pattern)?;
        }
        template::validate(&self.template)
    }

    fn matches(&self, link: &Link, entity: Option<&Entity>, base_dir: Option<&Path>) -> bool {
        if let Some(types) = &self.types {
            if !types.contains(&link.link_type) {
                return false;
            }
        }

        if let Some(patterns) = &self.patterns {
            let Some(entity) = entity else {
                return false;
            };
            let candidate = glob_candidate(&entity.path, base_dir);
            if !patterns.iter().any(|p| matches_glob(p, &candidate)) {
                return false;
            }
        }

        !entity.is_some_and(|e| self.exclude_ids.contains(&e.id))
    }
}

/// Inputs shared by every link of one transform
#[derive(Debug, Clone, Copy, Default)]
pub struct TransformOptions<'a> {
    pub rules: &'a [RewriteRule],

    pub default_template: Option<&'a str>,

    /// Registry links are resolved against
    pub registry: Option<&'a Registry>,

    /// Resolution side-table plus the identity of the document the links
    /// belong to; without it links are resolved by target path
    pub resolution: Option<(&'a LinkResolution, &'a str)>,

    /// Base for rule pattern matching; defaults to the registry's base dir
    pub base_dir: Option<&'a Path>,

    /// File the content is written to; enables `{{ path }}`
    pub source_file: Option<&'a Path>,

    /// Caller values available to templates
    pub extra: Option<&'a BTreeMap<String, Value>>,

    /// Render over the destination only, keeping link text and title; links
    /// nested in the text can then be rewritten in the same plan
    pub target_only: bool,
}

impl<'a> TransformOptions<'a> {
    /// Entity a link resolves to
    pub fn resolve(&self, index: usize, link: &Link) -> Option<&'a Entity> {
        let registry = self.registry?;
        if let Some((resolution, source_id)) = self.resolution {
            return resolution
                .get(source_id, index)
                .and_then(|id| registry.get_by_id(id));
        }
        link.target.as_deref().and_then(|t| registry.get(t))
    }

    fn pattern_base(&self) -> Option<&'a Path> {
        self.base_dir
            .or_else(|| self.registry.and_then(|r| r.options().base_dir.as_deref()))
    }
}

/// Per-link template fields
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LinkContext {
    pub text: String,
    pub href: String,
    pub title: String,
    /// Fragment with its leading `#`, or empty
    pub fragment: String,
    #[serde(rename = "type")]
    pub link_type: String,
    pub id: Option<String>,
    /// File name with extension
    pub name: Option<String>,
    pub stem: Option<String>,
    pub ext: Option<String>,
    pub mime: Option<String>,
    pub size: Option<u64>,
    pub tokens: Option<u64>,
    pub metadata: BTreeMap<String, Value>,
    /// Forward-slash path from the source file's directory to the entity
    pub path: Option<String>,
}

impl LinkContext {
    /// Context for `link`, enriched with `entity` when it resolved
    pub fn new(link: &Link, entity: Option<&Entity>, source_file: Option<&Path>) -> Self {
        let mut context = Self {
            text: link.text.clone(),
            href: link.href.clone(),
            title: link.title.clone().unwrap_or_default(),
            fragment: link.fragment_suffix(),
            link_type: link.link_type.as_str().to_string(),
            ..Self::default()
        };

        if let Some(entity) = entity {
            context.id = Some(entity.id.clone());
            context.name = entity.file_name().map(str::to_string);
            context.stem = entity.stem().map(str::to_string);
            context.ext = entity.extension().map(str::to_string);
            context.mime = Some(entity.mime_type().to_string());
            context.size = Some(entity.size);
            context.tokens = Some(entity.estimated_tokens());
            context.metadata = entity.metadata.clone();
            context.path = source_file
                .and_then(Path::parent)
                .map(|dir| relative_path(dir, &entity.path));
        }

        context
    }

    /// Value of a top-level field
    /// Names a template can read from the link
    pub const FIELDS: &'static [&'static str] = &[
        "text", "href", "title", "fragment", "type", "id", "name", "stem", "ext", "mime", "path",
        "size", "tokens", "metadata",
    ];

    pub fn field(&self, name: &str) -> Option<Value> {
        let text = |s: &str| Some(Value::String(s.to_string()));
        let optional = |s: &Option<String>| s.as_deref().map(|s| Value::String(s.to_string()));
        match name {
            "text" => text(&self.text),
            "href" => text(&self.href),
            "title" => text(&self.title),
            "fragment" => text(&self.fragment),
            "type" => text(&self.link_type),
            "id" => optional(&self.id),
            "name" => optional(&self.name),
            "stem" => optional(&self.stem),
            "ext" => optional(&self.ext),
            "mime" => optional(&self.mime),
            "path" => optional(&self.path),
            "size" => self.size.map(Value::from),
            "tokens" => self.tokens.map(Value::from),
            "metadata" => Some(Value::Object(
                self.metadata
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            )),
            _ => None,
        }
    }
}

/// Everything a template can see: the typed link plus caller extras
///
/// `{{ link.x }}` always reads the link. A bare `{{ x }}` naming a link
/// field reads the link too, even when that field is unset; other names
/// read the extras. Extras never shadow link data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderContext {
    pub link: LinkContext,
    pub extra: BTreeMap<String, Value>,
}

impl RenderContext {
    pub fn new(link: LinkContext, extra: BTreeMap<String, Value>) -> Self {
        Self { link, extra }
    }

    /// Value at a dotted path
    pub fn lookup(&self, path: &[&str]) -> Option<Value> {
        let (first, rest) = path.split_first()?;
        let (root, rest) = if *first == "link" {
            let (field, rest) = rest.split_first()?;
            (self.link.field(field)?, rest)
        } else if LinkContext::FIELDS.contains(first) {
            (self.link.field(first)?, rest)
        } else {
            (self.extra.get(*first).cloned()?, rest)
        };

        rest.iter()
            .try_fold(root, |value, key| value.get(*key).cloned())
    }
}

/// One span replacement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub span: Range<usize>,
    pub replacement: String,
    /// Whether the edit deletes a whole line
    pub removes_line: bool,
}

impl Edit {
    /// Replace the part of `link` a template renders over
    pub fn replace_link(link: &Link, replacement: String) -> Self {
        let span = match link.node {
            LinkNode::Inline => link.span.clone(),
            LinkNode::Definition => link.target_span.clone(),
        };
        Self {
            span,
            replacement,
            removes_line: false,
        }
    }

    /// Replace only the destination of `link`
    pub fn replace_target(link: &Link, replacement: String) -> Self {
        Self {
            span: link.target_span.clone(),
            replacement,
            removes_line: false,
        }
    }

    /// Drop the link syntax: inline links keep their text, definitions
    /// lose their line
    ///
    /// Inline links are stripped by deleting the syntax around the text, so
    /// edits for links nested in the text still apply.
    pub fn strip_link(link: &Link) -> Vec<Self> {
        match link.node {
            LinkNode::Inline => {
                let open = if link.image {
                    link.span.start.saturating_sub(1)..link.span.start + 1
                } else {
                    link.span.start..link.span.start + 1
                };
                let text_end = link.span.start + 1 + link.text.len();
                [open, text_end..link.span.end]
                    .into_iter()
                    .map(|span| Self {
                        span,
                        replacement: String::new(),
                        removes_line: false,
                    })
                    .collect()
            }
            LinkNode::Definition => vec![Self::delete_line(link)],
        }
    }

    pub fn delete_line(link: &Link) -> Self {
        Self {
            span: link.line_span.clone(),
            replacement: String::new(),
            removes_line: true,
        }
    }
}

/// Render `source` for a link with the options' extras
pub fn render_link(
    source: &str,
    link: &Link,
    entity: Option<&Entity>,
    options: &TransformOptions<'_>,
) -> Result<String> {
    let context = RenderContext::new(
        LinkContext::new(link, entity, options.source_file),
        options.extra.cloned().unwrap_or_default(),
    );
    template::render(source, &context)
}

/// Edits for the given `(index, link)` occurrences
///
/// Indices are positions in the owning document's link list and are used
/// to look up the resolution side-table.
pub fn edits<'l>(
    links: impl IntoIterator<Item = (usize, &'l Link)>,
    options: &TransformOptions<'_>,
) -> Result<Vec<Edit>> {
    let base_dir = options.pattern_base();
    let mut edits = Vec::new();

    for (index, link) in links {
        let entity = options.resolve(index, link);
        let template = options
            .rules
            .iter()
            .find(|rule| rule.matches(link, entity, base_dir))
            .map(|rule| rule.template.as_str())
            .or(options.default_template);

        match template {
            Some(source) => {
                let rendered = render_link(source, link, entity, options)?;
                trace!(href = %link.href, replacement = %rendered, "rewriting link");
                edits.push(if options.target_only {
                    Edit::replace_target(link, rendered)
                } else {
                    Edit::replace_link(link, rendered)
                });
            }
            None => {
                let orphan = link.node == LinkNode::Definition
                    && link.link_type == LinkType::LocalFile
                    && entity.is_none();
                if orphan {
                    trace!(href = %link.href, "deleting orphan definition");
                    edits.push(Edit::delete_line(link));
                }
            }
        }
    }

    Ok(edits)
}

/// Apply edits to `content`
///
/// Edits are applied in span order; an edit overlapping an earlier one is
/// dropped. When a line was deleted, runs of more than two blank lines are
/// collapsed to two.
pub fn apply_edits(content: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by_key(|e| (e.span.start, e.span.end));

    let mut out = String::with_capacity(content.len());
    let mut cursor = 0;
    let mut removed_line = false;

    for edit in edits {
        if edit.span.start < cursor || edit.span.end > content.len() {
            trace!(span = ?edit.span, "skipping overlapping edit");
            continue;
        }
        out.push_str(&content[cursor..edit.span.start]);
        out.push_str(&edit.replacement);
        cursor = edit.span.end;
        removed_line |= edit.removes_line;
    }
    out.push_str(&content[cursor..]);

    if removed_line {
        collapse_blank_lines(&out)
    } else {
        out
    }
}

/// Rewrite every link in `links` (indexed by position) and return the new
/// content
pub fn transform(content: &str, links: &[Link], options: &TransformOptions<'_>) -> Result<String> {
    let edits = edits(links.iter().enumerate(), options)?;
    Ok(apply_edits(content, edits))
}

fn collapse_blank_lines(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut blank_run = 0;
    for line in content.split_inclusive('\n') {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 2 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::IdentityOptions;
    use crate::resource::parser::parse_document;

    fn registry(docs: &[(&str, &str)]) -> Registry {
        let mut registry = Registry::with_options(IdentityOptions::default());
        let parsed = docs
            .iter()
            .map(|(path, content)| parse_document(Path::new(path), (*content).to_string()))
            .collect();
        registry.insert_batch(parsed).unwrap();
        registry
    }

    fn rewrite(reg: &Registry, id: &str, options: TransformOptions<'_>) -> String {
        let entity = reg.get_by_id(id).unwrap();
        let body = entity.body.as_deref().unwrap();
        transform(body, &entity.links, &options).unwrap()
    }

    #[test]
    fn test_pattern_rule_renders_identity() {
        let reg = registry(&[
            ("/p/a.md", "See [the guide](docs/guide.md).\n"),
            ("/p/docs/guide.md", "# Guide\n"),
        ]);
        let rules = vec![RewriteRule::new("DOC:{{id}}").with_patterns(vec!["docs/**".to_string()])];

        let out = rewrite(
            &reg,
            "a",
            TransformOptions {
                rules: &rules,
                registry: Some(&reg),
                base_dir: Some(Path::new("/p")),
                ..TransformOptions::default()
            },
        );
        assert_eq!(out, "See DOC:guide.\n");
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let reg = registry(&[("/p/a.md", "[b](b.md)\n"), ("/p/b.md", "")]);
        let rules = vec![
            RewriteRule::new("R1").with_types(vec![LinkType::LocalFile]),
            RewriteRule::new("R2"),
        ];

        let out = rewrite(
            &reg,
            "a",
            TransformOptions {
                rules: &rules,
                registry: Some(&reg),
                ..TransformOptions::default()
            },
        );
        assert_eq!(out, "R1\n");
    }

    #[test]
    fn test_rule_filters() {
        let reg = registry(&[
            ("/p/a.md", "[b](b.md) [web](https://x.dev) [gone](gone.md)\n"),
            ("/p/b.md", ""),
        ]);
        let rules = vec![
            RewriteRule::new("EXCLUDED").with_exclude_ids(vec!["b".to_string()]),
            RewriteRule::new("ANY-MD").with_patterns(vec!["*.md".to_string()]),
        ];

        let out = rewrite(
            &reg,
            "a",
            TransformOptions {
                rules: &rules,
                registry: Some(&reg),
                base_dir: Some(Path::new("/p")),
                ..TransformOptions::default()
            },
        );
        // b is excluded from rule 1 and matches rule 2; the unresolved link
        // cannot satisfy a pattern so only rule 1 applies to it
        assert_eq!(out, "ANY-MD EXCLUDED EXCLUDED\n");
    }

    #[test]
    fn test_default_template_and_untouched_links() {
        let reg = registry(&[("/p/a.md", "[b](b.md) and [web](https://x.dev)\n"), ("/p/b.md", "")]);
        let rules = vec![RewriteRule::new("<{{ href }}>").with_types(vec![LinkType::External])];

        let out = rewrite(
            &reg,
            "a",
            TransformOptions {
                rules: &rules,
                registry: Some(&reg),
                ..TransformOptions::default()
            },
        );
        assert_eq!(out, "[b](b.md) and <https://x.dev>\n");

        let out = rewrite(
            &reg,
            "a",
            TransformOptions {
                rules: &rules,
                default_template: Some("{{ text }}"),
                registry: Some(&reg),
                ..TransformOptions::default()
            },
        );
        assert_eq!(out, "b and <https://x.dev>\n");
    }

    #[test]
    fn test_relative_path_from_source_file() {
        let reg = registry(&[
            ("/p/docs/a.md", "[c](../img/c.md#top)\n"),
            ("/p/img/c.md", ""),
        ]);
        let rules = vec![RewriteRule::new("[{{ text }}]({{ path }}{{ fragment }})")];

        let out = rewrite(
            &reg,
            "a",
            TransformOptions {
                rules: &rules,
                registry: Some(&reg),
                source_file: Some(Path::new("/out/a.md")),
                ..TransformOptions::default()
            },
        );
        assert_eq!(out, "[c](../p/img/c.md#top)\n");
    }

    #[test]
    fn test_definitions_rewrite_right_hand_side() {
        let reg = registry(&[
            ("/p/a.md", "See [b][ref].\n\n[ref]: b.md \"Bee\"\n"),
            ("/p/b.md", ""),
        ]);
        let rules = vec![RewriteRule::new("out/{{ name }}")];

        let out = rewrite(
            &reg,
            "a",
            TransformOptions {
                rules: &rules,
                registry: Some(&reg),
                ..TransformOptions::default()
            },
        );
        assert_eq!(out, "See [b][ref].\n\n[ref]: out/b.md\n");
    }

    #[test]
    fn test_orphan_definitions_are_deleted() {
        let content = "Intro\n\n\n[gone]: gone.md\n\n\nOutro\n[web]: https://x.dev\n";
        let reg = registry(&[("/p/a.md", content)]);

        let out = rewrite(
            &reg,
            "a",
            TransformOptions {
                registry: Some(&reg),
                ..TransformOptions::default()
            },
        );
        assert_eq!(out, "Intro\n\n\nOutro\n[web]: https://x.dev\n");
    }

    #[test]
    fn test_resolution_side_table_is_used() {
        let reg = registry(&[("/p/a.md", "[b](b.md)\n"), ("/p/b.md", "")]);
        let resolution = reg.resolve_links();
        let rules = vec![RewriteRule::new("{{ id }}")];

        let out = rewrite(
            &reg,
            "a",
            TransformOptions {
                rules: &rules,
                registry: Some(&reg),
                resolution: Some((&resolution, "a")),
                ..TransformOptions::default()
            },
        );
        assert_eq!(out, "b\n");
    }

    #[test]
    fn test_transform_is_deterministic() {
        let reg = registry(&[
            ("/p/a.md", "[b](b.md) [c](c.md)\n[d]: b.md\n"),
            ("/p/b.md", ""),
            ("/p/c.md", ""),
        ]);
        let rules = vec![RewriteRule::new("{{ stem }}:{{ tokens }}")];
        let options = TransformOptions {
            rules: &rules,
            registry: Some(&reg),
            ..TransformOptions::default()
        };

        let first = rewrite(&reg, "a", options);
        let second = rewrite(&reg, "a", options);
        assert_eq!(first, second);
        assert_eq!(first, "b:0 c:0\n[d]: b:0\n");
    }

    #[test]
    fn test_extras_are_visible_but_never_shadow() {
        let reg = registry(&[("/p/a.md", "[b](b.md)\n"), ("/p/b.md", "")]);
        let rules = vec![RewriteRule::new("{{ project }}/{{ id }}/{{ link.id }}")];
        let extra = BTreeMap::from([
            ("project".to_string(), serde_json::json!("handbook")),
            ("id".to_string(), serde_json::json!("shadow")),
            ("link".to_string(), serde_json::json!({ "id": "shadow" })),
        ]);

        let out = rewrite(
            &reg,
            "a",
            TransformOptions {
                rules: &rules,
                registry: Some(&reg),
                extra: Some(&extra),
                ..TransformOptions::default()
            },
        );
        assert_eq!(out, "handbook/b/b\n");
    }

    #[test]
    fn test_unset_link_fields_stay_empty_despite_extras() {
        let reg = registry(&[("/p/a.md", "[gone](gone.md)\n")]);
        let rules = vec![RewriteRule::new("{{ project }}:{{ id }}:{{ text }}")];
        let extra = BTreeMap::from([
            ("project".to_string(), serde_json::json!("handbook")),
            ("id".to_string(), serde_json::json!("shadow")),
        ]);

        let out = rewrite(
            &reg,
            "a",
            TransformOptions {
                rules: &rules,
                registry: Some(&reg),
                extra: Some(&extra),
                ..TransformOptions::default()
            },
        );
        assert_eq!(out, "handbook::gone\n");
    }

    #[test]
    fn test_images_keep_their_bang() {
        let reg = registry(&[("/p/a.md", "![alt](b.md)\n"), ("/p/b.md", "")]);
        let rules = vec![RewriteRule::new("[{{ text }}](x/{{ name }})")];

        let out = rewrite(
            &reg,
            "a",
            TransformOptions {
                rules: &rules,
                registry: Some(&reg),
                ..TransformOptions::default()
            },
        );
        assert_eq!(out, "![alt](x/b.md)\n");
    }

    #[test]
    fn test_target_only_rewrites_nested_links_and_keeps_titles() {
        let reg = registry(&[
            ("/p/a.md", "[![badge](img/b.png)](docs/c.md \"Cee\")\n"),
            ("/p/img/b.png", ""),
            ("/p/docs/c.md", ""),
        ]);

        let out = rewrite(
            &reg,
            "a",
            TransformOptions {
                default_template: Some("{{ path }}{{ fragment }}"),
                registry: Some(&reg),
                source_file: Some(Path::new("/p/a.md")),
                target_only: true,
                ..TransformOptions::default()
            },
        );
        assert_eq!(out, "[![badge](img/b.png)](docs/c.md \"Cee\")\n");

        let out = rewrite(
            &reg,
            "a",
            TransformOptions {
                default_template: Some("{{ name }}"),
                registry: Some(&reg),
                target_only: true,
                ..TransformOptions::default()
            },
        );
        assert_eq!(out, "[![badge](b.png)](c.md \"Cee\")\n");
    }

    #[test]
    fn test_apply_edits_drops_overlaps() {
        let edits = vec![
            Edit {
                span: 0..5,
                replacement: "A".to_string(),
                removes_line: false,
            },
            Edit {
                span: 3..7,
                replacement: "B".to_string(),
                removes_line: false,
            },
            Edit {
                span: 8..9,
                replacement: "C".to_string(),
                removes_line: false,
            },
        ];
        assert_eq!(apply_edits("0123456789", edits), "A567C9");
    }

    #[test]
    fn test_rule_validation() {
        assert!(RewriteRule::new("{{ id }}").validate().is_ok());
        assert!(RewriteRule::new("{{ id").validate().is_err());
        assert!(
            RewriteRule::new("x")
                .with_patterns(vec!["docs/{a".to_string()])
                .validate()
                .is_err()
        );
    }
}
