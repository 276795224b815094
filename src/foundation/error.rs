/// Convenience result type used across the crate.
pub type RounderResult<T> = Result<T, RounderError>;

/// Top-level error taxonomy.
///
/// The first seven variants are the per-asset failure kinds reported by a batch; the rest cover
/// invalid input and wrapped lower-level errors.
#[derive(thiserror::Error, Debug)]
pub enum RounderError {
    /// The referenced asset does not exist in the vault.
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// The asset exists but could not be read.
    #[error("read failed: {0}")]
    ReadFailed(String),

    /// Neither backup copy could be created.
    #[error("backup failed: {0}")]
    BackupFailed(String),

    /// The transform routine errored or timed out.
    #[error("transform failed: {0}")]
    TransformFailed(String),

    /// The transform produced empty or undecodable output.
    #[error("output invalid: {0}")]
    OutputInvalid(String),

    /// Writing or moving the final asset failed.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// An original could not be recovered from its backups.
    #[error("restore failed: {0}")]
    RestoreFailed(String),

    /// Invalid user-provided parameters or configuration.
    #[error("validation error: {0}")]
    Validation(String),

    /// The document rejected an edit transaction.
    #[error("document error: {0}")]
    Document(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Closed classification of [`RounderError`] values, used for aggregation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum FailureKind {
    /// See [`RounderError::FileNotFound`].
    FileNotFound,
    /// See [`RounderError::ReadFailed`].
    ReadFailed,
    /// See [`RounderError::BackupFailed`].
    BackupFailed,
    /// See [`RounderError::TransformFailed`].
    TransformFailed,
    /// See [`RounderError::OutputInvalid`].
    OutputInvalid,
    /// See [`RounderError::WriteFailed`].
    WriteFailed,
    /// See [`RounderError::RestoreFailed`].
    RestoreFailed,
    /// Validation, document or wrapped errors.
    Other,
}

impl RounderError {
    /// Build a [`RounderError::FileNotFound`] value.
    pub fn file_not_found(msg: impl Into<String>) -> Self {
        Self::FileNotFound(msg.into())
    }

    /// Build a [`RounderError::ReadFailed`] value.
    pub fn read_failed(msg: impl Into<String>) -> Self {
        Self::ReadFailed(msg.into())
    }

    /// Build a [`RounderError::BackupFailed`] value.
    pub fn backup_failed(msg: impl Into<String>) -> Self {
        Self::BackupFailed(msg.into())
    }

    /// Build a [`RounderError::TransformFailed`] value.
    pub fn transform_failed(msg: impl Into<String>) -> Self {
        Self::TransformFailed(msg.into())
    }

    /// Build a [`RounderError::OutputInvalid`] value.
    pub fn output_invalid(msg: impl Into<String>) -> Self {
        Self::OutputInvalid(msg.into())
    }

    /// Build a [`RounderError::WriteFailed`] value.
    pub fn write_failed(msg: impl Into<String>) -> Self {
        Self::WriteFailed(msg.into())
    }

    /// Build a [`RounderError::RestoreFailed`] value.
    pub fn restore_failed(msg: impl Into<String>) -> Self {
        Self::RestoreFailed(msg.into())
    }

    /// Build a [`RounderError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`RounderError::Document`] value.
    pub fn document(msg: impl Into<String>) -> Self {
        Self::Document(msg.into())
    }

    /// Classify this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::FileNotFound(_) => FailureKind::FileNotFound,
            Self::ReadFailed(_) => FailureKind::ReadFailed,
            Self::BackupFailed(_) => FailureKind::BackupFailed,
            Self::TransformFailed(_) => FailureKind::TransformFailed,
            Self::OutputInvalid(_) => FailureKind::OutputInvalid,
            Self::WriteFailed(_) => FailureKind::WriteFailed,
            Self::RestoreFailed(_) => FailureKind::RestoreFailed,
            Self::Validation(_) | Self::Document(_) | Self::Other(_) => FailureKind::Other,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
