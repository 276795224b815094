use crate::rewrite::document::TextEdit;
use crate::scan::reference::{ImageReference, SpanKey, SyntaxKind, scan_line};
use crate::vault::resolve::paths_match;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A reference whose asset was transformed, and the link text its replacement should use.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RewriteTarget {
    /// Reference as scanned before the batch ran.
    pub reference: ImageReference,
    /// New link path, written in the same relative form as the original link.
    pub new_link: String,
}

/// One reference rewritten by a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedRewrite {
    /// Line of the rewritten reference.
    pub line_index: usize,
    /// Source text before the rewrite.
    pub original_text: String,
    /// Source text after the rewrite.
    pub replacement: String,
    /// New link path inside `replacement`.
    pub new_link: String,
}

/// A reference that could not be rewritten.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SkippedRewrite {
    /// Reference as scanned before the batch ran.
    pub reference: ImageReference,
    /// Why it was skipped.
    pub reason: String,
}

/// Edits for one atomic document transaction, sorted by `(line desc, start desc)`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RewriteTransaction {
    /// Edits to submit.
    pub edits: Vec<TextEdit>,
    /// What each edit does, in the same order as `edits`.
    pub rewrites: Vec<AppliedRewrite>,
    /// Targets that were dropped.
    pub skipped: Vec<SkippedRewrite>,
}

impl RewriteTransaction {
    /// `true` when there is nothing to apply.
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }
}

/// Source text replacing `reference` once its asset lives at `new_link`.
pub fn replacement_text(reference: &ImageReference, new_link: &str) -> String {
    let alt = reference.alt_text.as_str();
    let link = encode_like(reference.syntax, &reference.raw_target, new_link);
    match reference.syntax {
        SyntaxKind::EmbedLink => format!("![{alt}]({link})"),
        SyntaxKind::WikiLink => {
            if alt.is_empty() {
                format!("![[{link}]]")
            } else {
                format!("![[{link}|{alt}]]")
            }
        }
        SyntaxKind::InlineTag => {
            let alt = alt.replace('"', "&quot;");
            format!("<img src=\"{link}\" alt=\"{alt}\">")
        }
    }
}

/// Write `new_link` the way `raw_target` was written, for a reference of kind `syntax`.
///
/// A target holding any `%XX` escape gets every path segment percent-encoded. Otherwise the link
/// stays literal except for characters `syntax` cannot hold: whitespace, `(`, `)`, `<` and `>`
/// in an embed link, `|` and `]` in a wiki link, `"` in an inline tag.
pub fn encode_like(syntax: SyntaxKind, raw_target: &str, new_link: &str) -> String {
    if has_percent_escape(raw_target) {
        return new_link
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
    }
    let mut out = String::with_capacity(new_link.len());
    let mut buf = [0u8; 4];
    for c in new_link.chars() {
        let reserved = match syntax {
            SyntaxKind::EmbedLink => c.is_whitespace() || matches!(c, '(' | ')' | '<' | '>'),
            SyntaxKind::WikiLink => matches!(c, '|' | ']'),
            SyntaxKind::InlineTag => c == '"',
        };
        if reserved {
            out.push_str(&urlencoding::encode(c.encode_utf8(&mut buf)));
        } else {
            out.push(c);
        }
    }
    out
}

fn has_percent_escape(s: &str) -> bool {
    s.as_bytes()
        .windows(3)
        .any(|w| w[0] == b'%' && w[1].is_ascii_hexdigit() && w[2].is_ascii_hexdigit())
}

/// Link path for a transformed asset, keeping the folder part of the original link.
///
/// `img/a.png` with a new file `Notes/img/a-rounded-25p.png` becomes `img/a-rounded-25p.png`.
pub fn relink(asset_path: &str, new_vault_path: &str) -> String {
    let new_name = new_vault_path.rsplit('/').next().unwrap_or(new_vault_path);
    match asset_path.rsplit_once('/') {
        Some((dir, _)) => format!("{dir}/{new_name}"),
        None => new_name.to_string(),
    }
}

/// Build one atomic transaction from `targets` against the live `text`.
///
/// Each target is re-validated against its recorded span; a stale target is re-located on the
/// same line by asset path, and skipped if that fails. Duplicate spans are dropped, as are
/// targets overlapping an edit accepted earlier.
pub fn build_transaction(text: &str, targets: &[RewriteTarget]) -> RewriteTransaction {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut claimed: HashSet<SpanKey> = HashSet::new();
    let mut accepted: Vec<(SpanKey, TextEdit, AppliedRewrite)> = Vec::new();
    let mut skipped = Vec::new();

    for target in targets {
        let reference = &target.reference;
        let Some(line) = lines.get(reference.line_index) else {
            skipped.push(skip(reference, "line no longer exists"));
            continue;
        };

        let live = if reference.matches_line(line) {
            Some(reference.clone())
        } else {
            scan_line(line, reference.line_index).into_iter().find(|c| {
                !claimed.contains(&c.span()) && paths_match(&c.asset_path, &reference.asset_path)
            })
        };
        let Some(live) = live else {
            skipped.push(skip(reference, "reference changed and could not be re-located"));
            continue;
        };

        let span = live.span();
        if claimed.contains(&span) {
            continue;
        }
        if accepted
            .iter()
            .any(|(s, _, _)| s.line == span.line && s.start < span.end && span.start < s.end)
        {
            skipped.push(skip(reference, "overlaps another rewritten reference"));
            continue;
        }
        claimed.insert(span);

        let replacement = replacement_text(&live, &target.new_link);
        accepted.push((
            span,
            TextEdit::on_line(span.line, span.start, span.end, replacement.clone()),
            AppliedRewrite {
                line_index: span.line,
                original_text: live.raw_text.clone(),
                replacement,
                new_link: target.new_link.clone(),
            },
        ));
    }

    for s in &skipped {
        tracing::warn!(
            line = s.reference.line_index,
            path = %s.reference.asset_path,
            reason = %s.reason,
            "reference rewrite skipped"
        );
    }

    accepted.sort_by(|a, b| (b.0.line, b.0.start).cmp(&(a.0.line, a.0.start)));
    let (edits, rewrites) = accepted.into_iter().map(|(_, e, r)| (e, r)).unzip();
    RewriteTransaction {
        edits,
        rewrites,
        skipped,
    }
}

/// Transaction turning previously rewritten references back into their original text.
///
/// A live reference is reverted only when it sits on a recorded line and its text equals that
/// line's recorded replacement. Each recorded rewrite is reverted at most once.
pub fn build_revert_transaction(text: &str, rewrites: &[AppliedRewrite]) -> RewriteTransaction {
    let mut used = vec![false; rewrites.len()];
    let mut pairs: Vec<(TextEdit, AppliedRewrite)> = Vec::new();
    for (idx, line) in text.split('\n').enumerate() {
        if !rewrites.iter().any(|r| r.line_index == idx) {
            continue;
        }
        let mut taken: Vec<SpanKey> = Vec::new();
        for reference in scan_line(line, idx) {
            let span = reference.span();
            if taken
                .iter()
                .any(|s| s.start < span.end && span.start < s.end)
            {
                continue;
            }
            let Some(pos) = rewrites.iter().zip(&used).position(|(r, &done)| {
                !done && r.line_index == idx && r.replacement == reference.raw_text
            }) else {
                continue;
            };
            used[pos] = true;
            taken.push(span);
            let rewrite = &rewrites[pos];
            pairs.push((
                TextEdit::on_line(idx, span.start, span.end, rewrite.original_text.clone()),
                AppliedRewrite {
                    line_index: idx,
                    original_text: reference.raw_text.clone(),
                    replacement: rewrite.original_text.clone(),
                    new_link: rewrite.new_link.clone(),
                },
            ));
        }
    }

    pairs.sort_by(|a, b| (b.0.from_line, b.0.from_col).cmp(&(a.0.from_line, a.0.from_col)));
    let (edits, rewrites) = pairs.into_iter().unzip();
    RewriteTransaction {
        edits,
        rewrites,
        skipped: Vec::new(),
    }
}

fn skip(reference: &ImageReference, reason: &str) -> SkippedRewrite {
    SkippedRewrite {
        reference: reference.clone(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/rewrite/transaction.rs"]
mod tests;
