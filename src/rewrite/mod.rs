//! Atomic, offset-safe rewriting of image references.
//!
//! All edits of a batch are computed against one snapshot of the document and submitted as a
//! single transaction, sorted so later-in-document edits come first.

/// Document boundary and the shared atomic edit applier.
pub mod document;
/// Replacement text and transaction building.
pub mod transaction;
