//! Markdown link and heading extraction
//!
//! A small line-oriented scanner: it recognises inline links and images,
//! reference-style definitions and ATX headings, skips fenced code blocks
//! and inline code spans, and records byte spans so links can later be
//! rewritten in place without re-deriving their boundaries.

use std::ops::Range;
use std::path::Path;

use super::{Heading, Link, LinkNode, LinkType};
use crate::path_utils::normalize_lexically;

/// Links and heading outline of one document
#[derive(Debug, Default)]
pub struct Extracted {
    pub links: Vec<Link>,
    pub headings: Vec<Heading>,
}

/// Extract links and headings from `content`.
///
/// Lines starting before `skip_to` (the frontmatter block) are ignored.
/// Local-file targets are resolved against `source_dir`.
pub fn extract(content: &str, skip_to: usize, source_dir: &Path) -> Extracted {
    let mut extracted = Extracted::default();
    let mut fence: Option<(u8, usize)> = None;
    let mut offset = 0;

    for (index, raw) in content.split_inclusive('\n').enumerate() {
        let line_no = index + 1;
        let start = offset;
        offset += raw.len();
        if start < skip_to {
            continue;
        }

        let line = raw.trim_end_matches(['\n', '\r']);
        let indent = line.len() - line.trim_start_matches(' ').len();
        let trimmed = &line[indent..];

        if indent <= 3 {
            if let Some((marker, count, info)) = fence_marker(trimmed) {
                match fence {
                    None => fence = Some((marker, count)),
                    Some((open, open_count))
                        if open == marker && count >= open_count && info.trim().is_empty() =>
                    {
                        fence = None;
                    }
                    Some(_) => {}
                }
                continue;
            }
        }
        if fence.is_some() {
            continue;
        }

        let scanner = LineScanner {
            line,
            base: start,
            line_no,
            line_span: start..offset,
            source_dir,
        };

        if indent <= 3 {
            if let Some(heading) = parse_heading(trimmed, line_no) {
                extracted.headings.push(heading);
            }
            if let Some(definition) = scanner.definition(indent) {
                extracted.links.push(definition);
                continue;
            }
        }

        scanner.inline(0..line.len(), &mut extracted.links);
    }

    extracted
}

/// Opening or closing code fence: marker byte, run length, info string
fn fence_marker(trimmed: &str) -> Option<(u8, usize, &str)> {
    let marker = *trimmed.as_bytes().first()?;
    if marker != b'`' && marker != b'~' {
        return None;
    }
    let count = trimmed.bytes().take_while(|&b| b == marker).count();
    if count < 3 {
        return None;
    }
    Some((marker, count, &trimmed[count..]))
}

fn parse_heading(trimmed: &str, line_no: usize) -> Option<Heading> {
    let level = trimmed.bytes().take_while(|&b| b == b'#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &trimmed[level..];
    if !rest.is_empty() && !rest.starts_with([' ', '\t']) {
        return None;
    }

    let mut text = rest.trim();
    let without_closing = text.trim_end_matches('#');
    if without_closing.is_empty() || without_closing.ends_with([' ', '\t']) {
        text = without_closing.trim_end();
    }

    Some(Heading {
        level: u8::try_from(level).unwrap_or(6),
        text: text.to_string(),
        line: line_no,
    })
}

struct LineScanner<'a> {
    line: &'a str,
    base: usize,
    line_no: usize,
    line_span: Range<usize>,
    source_dir: &'a Path,
}

/// One recognised link occurrence, ranges relative to the line
struct Occurrence<'t> {
    text: &'t str,
    dest: Range<usize>,
    title: Option<String>,
    node: LinkNode,
    span: Range<usize>,
    target_span: Range<usize>,
    image: bool,
}

/// Parsed pieces of `[text](dest "title")`, relative to the line
struct InlineParts {
    text: Range<usize>,
    dest: Range<usize>,
    title: Option<String>,
    end: usize,
}

impl LineScanner<'_> {
    fn absolute(&self, range: &Range<usize>) -> Range<usize> {
        self.base + range.start..self.base + range.end
    }

    fn link(&self, occurrence: Occurrence) -> Link {
        let href = &self.line[occurrence.dest];
        let (link_type, target, fragment) = classify(href, self.source_dir);
        Link {
            text: occurrence.text.to_string(),
            href: href.to_string(),
            title: occurrence.title,
            link_type,
            target,
            fragment,
            line: self.line_no,
            node: occurrence.node,
            image: occurrence.image,
            span: self.absolute(&occurrence.span),
            target_span: self.absolute(&occurrence.target_span),
            line_span: self.line_span.clone(),
        }
    }

    /// `[label]: destination "optional title"`
    fn definition(&self, indent: usize) -> Option<Link> {
        let bytes = self.line.as_bytes();
        if bytes.get(indent) != Some(&b'[') {
            return None;
        }

        let close = indent + 1 + self.line[indent + 1..].find(']')?;
        let label = &self.line[indent + 1..close];
        if label.trim().is_empty() || label.contains('[') || label.starts_with('^') {
            return None;
        }
        if bytes.get(close + 1) != Some(&b':') {
            return None;
        }

        let rhs_start = skip_whitespace(bytes, close + 2);
        if rhs_start >= bytes.len() {
            return None;
        }

        let (dest, after) = if bytes[rhs_start] == b'<' {
            let end = rhs_start + 1 + self.line[rhs_start + 1..].find('>')?;
            (rhs_start + 1..end, end + 1)
        } else {
            let end = self.line[rhs_start..]
                .find(char::is_whitespace)
                .map_or(bytes.len(), |p| rhs_start + p);
            (rhs_start..end, end)
        };

        let rhs_end = self.line.trim_end().len().max(after);
        let rest = self.line[after..rhs_end].trim();
        let title = if rest.is_empty() {
            None
        } else {
            Some(parse_definition_title(rest)?)
        };

        Some(self.link(Occurrence {
            text: label,
            dest,
            title,
            node: LinkNode::Definition,
            span: indent..rhs_end,
            target_span: rhs_start..rhs_end,
            image: false,
        }))
    }

    /// Scan `range` of the line for inline links and images, recursing into
    /// link text so images nested inside links are found as well
    fn inline(&self, range: Range<usize>, out: &mut Vec<Link>) {
        let bytes = self.line.as_bytes();
        let mut i = range.start;

        while i < range.end {
            match bytes[i] {
                b'\\' => i += 2,
                b'`' => i = skip_code_span(bytes, i, range.end),
                b'[' => {
                    if let Some(parts) = self.inline_parts(i, range.end) {
                        let image = i > range.start
                            && bytes[i - 1] == b'!'
                            && !(i > range.start + 1 && bytes[i - 2] == b'\\');
                        let text = &self.line[parts.text.clone()];
                        out.push(self.link(Occurrence {
                            text,
                            dest: parts.dest.clone(),
                            title: parts.title,
                            node: LinkNode::Inline,
                            span: i..parts.end,
                            target_span: parts.dest,
                            image,
                        }));
                        self.inline(parts.text, out);
                        i = parts.end;
                    } else {
                        i += 1;
                    }
                }
                _ => i += 1,
            }
        }
    }

    fn inline_parts(&self, open: usize, limit: usize) -> Option<InlineParts> {
        let bytes = &self.line.as_bytes()[..limit];

        let mut depth = 0usize;
        let mut j = open;
        let close = loop {
            match bytes.get(j)? {
                b'\\' => j += 2,
                b'[' => {
                    depth += 1;
                    j += 1;
                }
                b']' => {
                    depth -= 1;
                    if depth == 0 {
                        break j;
                    }
                    j += 1;
                }
                _ => j += 1,
            }
        };

        if bytes.get(close + 1) != Some(&b'(') {
            return None;
        }

        let mut k = skip_whitespace(bytes, close + 2);
        let dest = if bytes.get(k) == Some(&b'<') {
            let end = k + 1 + bytes[k + 1..].iter().position(|&b| b == b'>')?;
            let dest = k + 1..end;
            k = end + 1;
            dest
        } else {
            let start = k;
            let mut parens = 0usize;
            while k < bytes.len() {
                match bytes[k] {
                    b'\\' => {
                        k += 2;
                        continue;
                    }
                    b'(' => parens += 1,
                    b')' => {
                        if parens == 0 {
                            break;
                        }
                        parens -= 1;
                    }
                    b if b.is_ascii_whitespace() => break,
                    _ => {}
                }
                k += 1;
            }
            k = k.min(bytes.len());
            start..k
        };

        k = skip_whitespace(bytes, k);
        let mut title = None;
        if let Some(&quote) = bytes.get(k) {
            let closing = match quote {
                b'"' => Some(b'"'),
                b'\'' => Some(b'\''),
                b'(' => Some(b')'),
                _ => None,
            };
            if let Some(closing) = closing {
                let end = k + 1 + bytes[k + 1..].iter().position(|&b| b == closing)?;
                title = Some(self.line[k + 1..end].to_string());
                k = skip_whitespace(bytes, end + 1);
            }
        }

        if bytes.get(k) != Some(&b')') {
            return None;
        }

        Some(InlineParts {
            text: open + 1..close,
            dest,
            title,
            end: k + 1,
        })
    }
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
        i += 1;
    }
    i
}

/// Index just past the code span starting at `i`, or past the opening
/// backtick run when it is never closed
fn skip_code_span(bytes: &[u8], i: usize, limit: usize) -> usize {
    let run = bytes[i..limit].iter().take_while(|&&b| b == b'`').count();
    let mut j = i + run;
    while j < limit {
        if bytes[j] == b'`' {
            let closing = bytes[j..limit].iter().take_while(|&&b| b == b'`').count();
            if closing == run {
                return j + closing;
            }
            j += closing;
        } else {
            j += 1;
        }
    }
    i + run
}

fn parse_definition_title(rest: &str) -> Option<String> {
    let first = rest.chars().next()?;
    let last = rest.chars().next_back()?;
    let matched = matches!((first, last), ('"', '"') | ('\'', '\'') | ('(', ')'));
    if matched && rest.len() >= 2 {
        Some(rest[1..rest.len() - 1].to_string())
    } else {
        None
    }
}

/// Classify a raw href and compute the absolute target for local files
pub fn classify(
    href: &str,
    source_dir: &Path,
) -> (LinkType, Option<std::path::PathBuf>, Option<String>) {
    let href = href.trim();
    if href.is_empty() {
        return (LinkType::Unknown, None, None);
    }

    if let Some(anchor) = href.strip_prefix('#') {
        return (LinkType::Anchor, None, Some(anchor.to_string()));
    }

    if href
        .as_bytes()
        .get(..7)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(b"mailto:"))
    {
        return (LinkType::Email, None, None);
    }

    if has_scheme(href) || href.starts_with("//") {
        return (LinkType::External, None, None);
    }

    if href.contains('@') && !href.contains('/') {
        return (LinkType::Email, None, None);
    }

    let (without_fragment, fragment) = match href.split_once('#') {
        Some((path, fragment)) => (path, Some(fragment.to_string())),
        None => (href, None),
    };
    let path_part = without_fragment
        .split_once('?')
        .map_or(without_fragment, |(path, _)| path);

    let decoded = percent_decode(path_part);
    let target = if decoded.is_empty() {
        None
    } else {
        Some(normalize_lexically(&source_dir.join(decoded)))
    };

    (LinkType::LocalFile, target, fragment)
}

/// `scheme:` with a scheme of at least two characters, so Windows drive
/// letters (`C:`) are not mistaken for URLs
fn has_scheme(href: &str) -> bool {
    let Some((scheme, _)) = href.split_once(':') else {
        return false;
    };
    scheme.len() > 1
        && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let high = char::from(bytes[i + 1]).to_digit(16);
            let low = char::from(bytes[i + 2]).to_digit(16);
            if let (Some(high), Some(low)) = (high, low) {
                out.push(u8::try_from(high * 16 + low).unwrap_or(b'%'));
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8(out).unwrap_or_else(|_| input.to_string())
}
