//! Configuration for the turn-taking state machine.

use std::time::Duration;
use tracing::warn;

/// Default echo suppression window in milliseconds.
///
/// Sized to cover system latency plus acoustic travel time from speaker to
/// microphone. A tunable constant, not a protocol requirement.
pub const DEFAULT_ECHO_GUARD_MS: u64 = 500;

/// Configuration for [`TurnTakingMachine`](super::TurnTakingMachine).
#[derive(Debug, Clone, Copy)]
pub struct TurnTakingConfig {
    /// Master switch. When false, every machine operation is a safe
    /// pass-through: no state changes, no suppression, voice activity is
    /// always accepted.
    pub enabled: bool,

    /// Echo suppression window after system playback starts. Detected
    /// speech inside this window is presumed to be the system's own voice
    /// leaking into the microphone.
    pub echo_guard: Duration,
}

impl Default for TurnTakingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            echo_guard: Duration::from_millis(DEFAULT_ECHO_GUARD_MS),
        }
    }
}

impl TurnTakingConfig {
    /// Create a new config with the specified enabled state.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Create a new config with the specified echo guard duration.
    pub fn with_echo_guard(mut self, echo_guard: Duration) -> Self {
        self.echo_guard = echo_guard;
        self
    }

    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    ///
    /// - `TURN_TAKING_ENABLED`: `true`/`false` (also `1`/`0`, `yes`/`no`, `on`/`off`)
    /// - `ECHO_GUARD_MS`: echo guard duration in milliseconds
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var("TURN_TAKING_ENABLED") {
            config.enabled = matches!(
                raw.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }

        if let Ok(raw) = std::env::var("ECHO_GUARD_MS") {
            match raw.trim().parse::<u64>() {
                Ok(ms) => config.echo_guard = Duration::from_millis(ms),
                Err(_) => warn!(
                    value = %raw,
                    "Invalid ECHO_GUARD_MS value, using default of {}ms",
                    DEFAULT_ECHO_GUARD_MS
                ),
            }
        }

        config
    }
}
