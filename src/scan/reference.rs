use crate::scan::sanitize::{has_image_extension, is_remote, sanitize_path};
use serde::{Deserialize, Serialize};

/// The three embed syntaxes recognized in a line of text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyntaxKind {
    /// `![alt](target "title")`
    EmbedLink,
    /// `![[target]]` or `![[target|alt]]`
    WikiLink,
    /// `<img src="target" alt="alt">`
    InlineTag,
}

/// Span identity of a reference: two references are the same if their keys are equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpanKey {
    /// 0-based line index.
    pub line: usize,
    /// Inclusive start column (codepoints).
    pub start: usize,
    /// Exclusive end column (codepoints).
    pub end: usize,
}

/// One occurrence of an image embed in a document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageReference {
    /// 0-based line index.
    pub line_index: usize,
    /// Inclusive start column, in codepoints.
    pub start_offset: usize,
    /// Exclusive end column, in codepoints.
    pub end_offset: usize,
    /// Exact source text at the span.
    pub raw_text: String,
    /// Link target exactly as written, before sanitizing.
    pub raw_target: String,
    /// Sanitized path or URL.
    pub asset_path: String,
    /// Alt text or caption (may be empty).
    pub alt_text: String,
    /// Which syntax produced this reference.
    pub syntax: SyntaxKind,
}

impl ImageReference {
    /// Span identity used for deduplication.
    pub fn span(&self) -> SpanKey {
        SpanKey {
            line: self.line_index,
            start: self.start_offset,
            end: self.end_offset,
        }
    }

    /// `true` for `http(s)://` targets, which are never processed.
    pub fn is_remote(&self) -> bool {
        is_remote(&self.asset_path)
    }

    /// `true` when `line[start..end]` still equals [`Self::raw_text`].
    pub fn matches_line(&self, line: &str) -> bool {
        char_slice(line, self.start_offset, self.end_offset)
            .is_some_and(|live| live == self.raw_text)
    }
}

/// Substring by codepoint range, or `None` when out of bounds.
pub(crate) fn char_slice(line: &str, start: usize, end: usize) -> Option<&str> {
    if start > end {
        return None;
    }
    let mut indices = line.char_indices().map(|(i, _)| i).chain([line.len()]);
    let from = indices.nth(start)?;
    let to = if end == start {
        from
    } else {
        indices.nth(end - start - 1)?
    };
    Some(&line[from..to])
}

/// Byte-level match produced by one syntax pass.
#[derive(Debug)]
struct RawMatch<'a> {
    start: usize,
    end: usize,
    target: &'a str,
    alt: &'a str,
}

/// Extract image references from a single line.
///
/// Results are ordered by syntax pass (embed-link, wiki-link, inline-tag) and left-to-right within
/// a pass. Overlapping matches from different passes are kept; callers deduplicate on
/// [`ImageReference::span`].
pub fn scan_line(line: &str, line_index: usize) -> Vec<ImageReference> {
    let passes: [(SyntaxKind, fn(&str) -> Vec<RawMatch<'_>>); 3] = [
        (SyntaxKind::EmbedLink, embed_link_matches),
        (SyntaxKind::WikiLink, wiki_link_matches),
        (SyntaxKind::InlineTag, inline_tag_matches),
    ];

    let mut out = Vec::new();
    for (syntax, pass) in passes {
        for m in pass(line) {
            let Some(asset_path) = sanitize_path(m.target) else {
                continue;
            };
            if !is_remote(&asset_path) && !has_image_extension(&asset_path) {
                continue;
            }
            out.push(ImageReference {
                line_index,
                start_offset: line[..m.start].chars().count(),
                end_offset: line[..m.end].chars().count(),
                raw_text: line[m.start..m.end].to_string(),
                raw_target: m.target.to_string(),
                asset_path,
                alt_text: m.alt.trim().to_string(),
                syntax,
            });
        }
    }
    out
}

/// Scan every line of `text` (split on `\n`).
pub fn scan_text(text: &str) -> Vec<ImageReference> {
    text.split('\n')
        .enumerate()
        .flat_map(|(idx, line)| scan_line(line, idx))
        .collect()
}

fn skip_spaces(b: &[u8], mut i: usize) -> usize {
    while i < b.len() && matches!(b[i], b' ' | b'\t') {
        i += 1;
    }
    i
}

fn embed_link_matches(line: &str) -> Vec<RawMatch<'_>> {
    let mut out = Vec::new();
    let mut i = 0usize;
    while let Some(off) = line[i..].find("![") {
        let start = i + off;
        match parse_embed_link_at(line, start) {
            Some(m) => {
                i = m.end;
                out.push(m);
            }
            None => i = start + 2,
        }
    }
    out
}

fn parse_embed_link_at(line: &str, start: usize) -> Option<RawMatch<'_>> {
    let b = line.as_bytes();
    let alt_start = start + 2;
    // `![[` belongs to the wiki-link pass.
    if b.get(alt_start) == Some(&b'[') {
        return None;
    }
    let alt_end = alt_start + line[alt_start..].find(']')?;
    let mut i = alt_end + 1;
    if b.get(i) != Some(&b'(') {
        return None;
    }
    i = skip_spaces(b, i + 1);

    let target = if b.get(i) == Some(&b'<') {
        let close = i + 1 + line[i + 1..].find('>')?;
        let t = &line[i + 1..close];
        i = close + 1;
        t
    } else {
        let s = i;
        while i < b.len() && b[i] != b')' && !b[i].is_ascii_whitespace() {
            i += 1;
        }
        if i == s {
            return None;
        }
        &line[s..i]
    };

    i = skip_spaces(b, i);
    if let Some(&q) = b.get(i)
        && matches!(q, b'"' | b'\'')
    {
        let close = i + 1 + line[i + 1..].find(q as char)?;
        i = skip_spaces(b, close + 1);
    }
    if b.get(i) != Some(&b')') {
        return None;
    }

    Some(RawMatch {
        start,
        end: i + 1,
        target,
        alt: &line[alt_start..alt_end],
    })
}

fn wiki_link_matches(line: &str) -> Vec<RawMatch<'_>> {
    let mut out = Vec::new();
    let mut i = 0usize;
    while let Some(off) = line[i..].find("![[") {
        let start = i + off;
        let inner_start = start + 3;
        let Some(close) = line[inner_start..].find("]]").map(|c| inner_start + c) else {
            break;
        };
        let inner = &line[inner_start..close];
        if inner.trim().is_empty() || inner.contains('[') {
            i = inner_start;
            continue;
        }
        let (target, alt) = inner.split_once('|').unwrap_or((inner, ""));
        out.push(RawMatch {
            start,
            end: close + 2,
            target,
            alt,
        });
        i = close + 2;
    }
    out
}

fn inline_tag_matches(line: &str) -> Vec<RawMatch<'_>> {
    let mut out = Vec::new();
    let b = line.as_bytes();
    let mut i = 0usize;
    while let Some(off) = line[i..].find('<') {
        let start = i + off;
        let name_end = start + 4;
        let is_img = b.len() > name_end
            && b[start + 1..name_end].eq_ignore_ascii_case(b"img")
            && (b[name_end].is_ascii_whitespace() || b[name_end] == b'/');
        if !is_img {
            i = start + 1;
            continue;
        }
        match parse_img_attributes(line, name_end) {
            Some((end, src, alt)) => {
                out.push(RawMatch {
                    start,
                    end,
                    target: src,
                    alt,
                });
                i = end;
            }
            None => i = start + 1,
        }
    }
    out
}

/// Parse attributes after `<img` up to the closing `>`.
///
/// Returns the exclusive end byte, the quoted `src` value and the `alt` value.
fn parse_img_attributes(line: &str, mut i: usize) -> Option<(usize, &str, &str)> {
    let b = line.as_bytes();
    let mut src = None;
    let mut alt = "";
    loop {
        while i < b.len() && (b[i].is_ascii_whitespace() || b[i] == b'/') {
            i += 1;
        }
        match b.get(i)? {
            b'>' => break,
            b'<' => return None,
            _ => {}
        }

        let name_start = i;
        while i < b.len() && (b[i].is_ascii_alphanumeric() || matches!(b[i], b'-' | b'_' | b':')) {
            i += 1;
        }
        if i == name_start {
            return None;
        }
        let name = &line[name_start..i];

        i = skip_spaces(b, i);
        if b.get(i) != Some(&b'=') {
            continue;
        }
        i = skip_spaces(b, i + 1);

        let (value, quoted) = match *b.get(i)? {
            q @ (b'"' | b'\'') => {
                let close = i + 1 + line[i + 1..].find(q as char)?;
                let v = &line[i + 1..close];
                i = close + 1;
                (v, true)
            }
            _ => {
                let s = i;
                while i < b.len() && !b[i].is_ascii_whitespace() && b[i] != b'>' {
                    i += 1;
                }
                (&line[s..i], false)
            }
        };

        if name.eq_ignore_ascii_case("src") && quoted {
            src = Some(value);
        } else if name.eq_ignore_ascii_case("data-src") && quoted && src.is_none() {
            src = Some(value);
        } else if name.eq_ignore_ascii_case("alt") {
            alt = value;
        }
    }
    Some((i + 1, src?, alt))
}

#[cfg(test)]
#[path = "../../tests/unit/scan/reference.rs"]
mod tests;
