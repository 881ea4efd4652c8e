//! Minimal `{{ name }}` template renderer
//!
//! Placeholders are dotted paths (`{{ id }}`, `{{ link.text }}`,
//! `{{ metadata.title }}`) looked up in a [`RenderContext`]. Unknown names
//! render as an empty string; malformed placeholders are rejected when the
//! template is parsed.

use serde_json::Value;

use super::RenderContext;
use crate::error::{DocpackError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(Vec<String>),
}

/// Parsed template, reusable across many renders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Parse template source
    pub fn parse(source: &str) -> Result<Self> {
        let invalid = |reason: &str| DocpackError::TemplateInvalid {
            template: source.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        let mut rest = source;

        while let Some(open) = rest.find("{{") {
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }
            let after_open = &rest[open + 2..];
            let close = after_open
                .find("}}")
                .ok_or_else(|| invalid("unterminated `{{`"))?;

            let name = after_open[..close].trim();
            if name.is_empty() {
                return Err(invalid("empty placeholder"));
            }
            let path: Vec<String> = name.split('.').map(str::to_string).collect();
            if path.iter().any(|segment| !is_valid_segment(segment)) {
                return Err(invalid(&format!("invalid placeholder name `{name}`")));
            }
            segments.push(Segment::Placeholder(path));
            rest = &after_open[close + 2..];
        }

        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Ok(Self { segments })
    }

    /// Render against a context
    pub fn render(&self, context: &RenderContext) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(path) => {
                    let path: Vec<&str> = path.iter().map(String::as_str).collect();
                    if let Some(value) = context.lookup(&path) {
                        out.push_str(&display_value(&value));
                    }
                }
            }
        }
        out
    }
}

/// Check template syntax without rendering
pub fn validate(source: &str) -> Result<()> {
    Template::parse(source).map(|_| ())
}

/// Parse and render in one step
pub fn render(source: &str, context: &RenderContext) -> Result<String> {
    Ok(Template::parse(source)?.render(context))
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

/// Text form of a context value: strings verbatim, null as empty,
/// structured values as compact JSON
fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
