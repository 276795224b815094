use crate::foundation::error::{RounderError, RounderResult};
use crate::vault::Vault;
use serde::{Deserialize, Serialize};
use std::io;
use std::sync::Arc;

/// Replace the text between two positions. Columns are codepoint offsets within a line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    /// Start line (0-based).
    pub from_line: usize,
    /// Start column, inclusive.
    pub from_col: usize,
    /// End line (0-based).
    pub to_line: usize,
    /// End column, exclusive.
    pub to_col: usize,
    /// Text inserted in place of the range.
    pub replacement: String,
}

impl TextEdit {
    /// Single-line edit replacing `line[start..end]`.
    pub fn on_line(line: usize, start: usize, end: usize, replacement: impl Into<String>) -> Self {
        Self {
            from_line: line,
            from_col: start,
            to_line: line,
            to_col: end,
            replacement: replacement.into(),
        }
    }
}

/// Edit boundary of a text document.
pub trait Document {
    /// Current full text.
    fn get_text(&self) -> RounderResult<String>;

    /// Apply every edit against the current coordinate space at once, or none of them.
    fn apply_atomic_edits(&mut self, edits: &[TextEdit]) -> RounderResult<()>;
}

/// Apply `edits` to `text` as one transaction.
///
/// Every edit is checked against the pre-edit text: single-line, in range, and not overlapping
/// another edit. Any violation rejects the whole transaction.
pub fn apply_edits_to_text(text: &str, edits: &[TextEdit]) -> RounderResult<String> {
    let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();

    for e in edits {
        if e.from_line != e.to_line {
            return Err(RounderError::document(format!(
                "multi-line edit {}:{}..{}:{} is not supported",
                e.from_line, e.from_col, e.to_line, e.to_col
            )));
        }
        let line = lines.get(e.from_line).ok_or_else(|| {
            RounderError::document(format!("edit targets missing line {}", e.from_line))
        })?;
        let len = line.chars().count();
        if e.from_col > e.to_col || e.to_col > len {
            return Err(RounderError::document(format!(
                "edit columns {}..{} out of range for line {} (length {len})",
                e.from_col, e.to_col, e.from_line
            )));
        }
    }

    let mut order: Vec<&TextEdit> = edits.iter().collect();
    order.sort_by_key(|e| (e.from_line, e.from_col, e.to_col));
    for pair in order.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if a.from_line == b.from_line && a.to_col > b.from_col {
            return Err(RounderError::document(format!(
                "overlapping edits on line {}: {}..{} and {}..{}",
                a.from_line, a.from_col, a.to_col, b.from_col, b.to_col
            )));
        }
    }

    for e in order.into_iter().rev() {
        let line = &mut lines[e.from_line];
        let from = byte_offset(line, e.from_col);
        let to = byte_offset(line, e.to_col);
        line.replace_range(from..to, &e.replacement);
    }
    Ok(lines.join("\n"))
}

fn byte_offset(line: &str, col: usize) -> usize {
    line.char_indices()
        .nth(col)
        .map(|(i, _)| i)
        .unwrap_or(line.len())
}

/// In-memory document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextDocument {
    text: String,
}

impl TextDocument {
    /// Wrap `text`.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Borrow the current text.
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl Document for TextDocument {
    fn get_text(&self) -> RounderResult<String> {
        Ok(self.text.clone())
    }

    fn apply_atomic_edits(&mut self, edits: &[TextEdit]) -> RounderResult<()> {
        self.text = apply_edits_to_text(&self.text, edits)?;
        Ok(())
    }
}

/// A UTF-8 text file stored in a vault. Re-read on every access, written once per transaction.
#[derive(Clone)]
pub struct FileDocument {
    vault: Arc<dyn Vault>,
    path: String,
}

impl FileDocument {
    /// Document at vault path `path`.
    pub fn new(vault: Arc<dyn Vault>, path: impl Into<String>) -> Self {
        Self {
            vault,
            path: path.into(),
        }
    }

    /// Vault path of the document.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Document for FileDocument {
    fn get_text(&self) -> RounderResult<String> {
        let bytes = self.vault.read(&self.path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => RounderError::file_not_found(self.path.clone()),
            _ => RounderError::read_failed(format!("'{}': {e}", self.path)),
        })?;
        String::from_utf8(bytes)
            .map_err(|_| RounderError::document(format!("'{}' is not valid UTF-8", self.path)))
    }

    fn apply_atomic_edits(&mut self, edits: &[TextEdit]) -> RounderResult<()> {
        if edits.is_empty() {
            return Ok(());
        }
        let text = apply_edits_to_text(&self.get_text()?, edits)?;
        self.vault
            .write(&self.path, text.as_bytes())
            .map_err(|e| RounderError::write_failed(format!("'{}': {e}", self.path)))
    }
}

impl std::fmt::Debug for FileDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileDocument")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/rewrite/document.rs"]
mod tests;
