//! Parse YAML frontmatter at the top of markdown documents.

use std::collections::BTreeMap;

use serde_yaml::Value;

/// Frontmatter block and the byte offset where the body starts
#[derive(Debug, Clone, PartialEq)]
pub struct Frontmatter {
    pub value: Value,
    pub body_offset: usize,
}

/// Split content into optional YAML frontmatter (between the first `---`
/// line and the next `---` line) and body.
///
/// Returns `None` when there is no valid frontmatter block: missing
/// delimiters, unparsable YAML, or YAML that is not a mapping.
pub fn split_frontmatter(content: &str) -> Option<Frontmatter> {
    let mut lines = content.split_inclusive('\n');
    let first = lines.next()?;
    if first.trim() != "---" {
        return None;
    }

    let start = first.len();
    let mut offset = start;
    for line in lines {
        if line.trim() == "---" {
            let yaml = &content[start..offset];
            let value: Value = serde_yaml::from_str(yaml).ok()?;
            if value.as_mapping().is_none() && !value.is_null() {
                return None;
            }
            return Some(Frontmatter {
                value,
                body_offset: offset + line.len(),
            });
        }
        offset += line.len();
    }

    None
}

/// Convert a frontmatter value into a metadata map
///
/// Non-string keys are stringified; values are carried over as JSON so
/// templates can render nested properties.
pub fn to_metadata(value: &Value) -> BTreeMap<String, serde_json::Value> {
    let mut metadata = BTreeMap::new();
    let Some(mapping) = value.as_mapping() else {
        return metadata;
    };

    for (key, val) in mapping {
        let key = match key {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => continue,
        };
        let json = serde_json::to_value(val).unwrap_or(serde_json::Value::Null);
        metadata.insert(key, json);
    }

    metadata
}

/// Get a scalar property as a string
pub fn get_str(metadata: &BTreeMap<String, serde_json::Value>, key: &str) -> Option<String> {
    match metadata.get(key)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
