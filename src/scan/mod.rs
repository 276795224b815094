//! Image reference extraction.
//!
//! Each embed syntax has its own small parser so malformed input in one syntax cannot disturb
//! matches of another. Offsets are reported in codepoints within the line.

/// Per-line scanner and the [`reference::ImageReference`] model.
pub mod reference;
/// Raw link target cleanup.
pub mod sanitize;
