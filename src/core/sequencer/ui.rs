//! UI controller seam consumed by the presentation sequencer.

use async_trait::async_trait;

use crate::core::contract::UiMode;
use crate::core::speech::SpeechError;

/// Error type for UI controller operations.
#[derive(Debug, thiserror::Error)]
pub enum UiError {
    #[error("Speech error: {0}")]
    Speech(#[from] SpeechError),
    #[error("Element error: {0}")]
    Element(String),
    #[error("Input control error: {0}")]
    Input(String),
    #[error("Display error: {0}")]
    Display(String),
}

/// Result type for UI controller operations.
pub type UiResult<T> = Result<T, UiError>;

/// Collaborator surface the sequencer drives.
///
/// Every method must be safe to call repeatedly and redundantly: the
/// sequencer issues unconditional resets at the start of each turn and an
/// unlock on its cleanup path regardless of how the turn ended.
#[async_trait]
pub trait UiController: Send + Sync {
    /// Halt any speech currently playing.
    async fn stop_all_speech(&self) -> UiResult<()>;

    /// Synthesize `text` and play it, resolving when playback completes.
    async fn play_speech(&self, text: &str) -> UiResult<()>;

    /// Remove the highlight from every card.
    async fn clear_highlights(&self) -> UiResult<()>;

    /// Mark the card with `card_id` as highlighted.
    async fn highlight_card(&self, card_id: &str) -> UiResult<()>;

    /// Clear the highlight on the card with `card_id`.
    async fn unhighlight_card(&self, card_id: &str) -> UiResult<()>;

    /// Bring the card with `card_id` into view.
    async fn scroll_to_card(&self, card_id: &str) -> UiResult<()>;

    /// Disable both text entry and microphone activation.
    async fn lock_input(&self) -> UiResult<()>;

    /// Re-enable user input.
    async fn unlock_input(&self) -> UiResult<()>;

    /// Open the microphone, ready to listen again.
    async fn open_microphone(&self) -> UiResult<()>;

    /// Switch the display to the given mode.
    async fn set_display_mode(&self, mode: UiMode) -> UiResult<()>;
}
