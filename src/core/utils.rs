//! Utility functions shared across the core modules.

/// Get current time in milliseconds since Unix epoch.
pub(crate) fn get_current_time_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
