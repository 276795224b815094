//! Shared error taxonomy, configuration and small helpers.

pub(crate) mod config;
pub(crate) mod error;

/// Milliseconds since the Unix epoch, or `0` if the clock is before it.
pub(crate) fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
