//! Base trait definitions for speech collaborators.

use async_trait::async_trait;

/// Error type for speech synthesis and playback operations.
#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("Synthesis error: {0}")]
    Synthesis(String),
    #[error("Playback error: {0}")]
    Playback(String),
    #[error("Provider not ready: {0}")]
    ProviderNotReady(String),
}

/// Result type for speech operations.
pub type SpeechResult<T> = Result<T, SpeechError>;

/// Capability that turns text into audible speech.
///
/// `speak` suspends until playback of that utterance has finished; it is
/// the only suspension point the presentation sequencer has. `cancel` is
/// synchronous so the turn-taking machine can halt speech from its
/// non-suspending event handlers.
#[async_trait]
pub trait SpeechSynthesis: Send + Sync {
    /// Synthesize `text` and play it, resolving when playback completes.
    async fn speak(&self, text: &str) -> SpeechResult<()>;

    /// Halt any in-progress synthesis output. Idempotent: cancelling when
    /// nothing is playing is a no-op.
    fn cancel(&self) -> SpeechResult<()>;
}

/// One playing clip (pre-recorded or streamed audio).
///
/// The turn-taking machine keeps at most one of these registered at a
/// time; registering a new handle replaces the previous one.
pub trait PlaybackHandle: Send + Sync {
    /// Stop this clip. Idempotent: stopping an already stopped clip is a
    /// no-op.
    fn stop(&self) -> SpeechResult<()>;
}
