//! Turn contract data model.
//!
//! A [`TurnContract`] describes one assistant turn: what to say, what to
//! show, and whether the microphone reopens afterwards. Contracts are
//! produced by the decision layer (rule-based or model-driven, out of scope
//! here) and consumed by the presentation sequencer. A contract is an
//! immutable, single-use unit of work: a partially executed contract cannot
//! be resumed, the producer must build and submit a fresh one.

use serde::{Deserialize, Deserializer, Serialize};

/// Display mode requested by a turn contract.
///
/// Closed set. Unknown values arriving from the decision layer degrade to
/// [`UiMode::StandardChat`] at the deserialization boundary, so an
/// unrecognized mode can never fault the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum UiMode {
    Idle,
    #[default]
    StandardChat,
    RestaurantPresentation,
    MenuPresentation,
    CartSummary,
    Confirmation,
}

impl UiMode {
    /// Parse a mode name, falling back to [`UiMode::StandardChat`] for
    /// anything unrecognized. Accepts the serialized camelCase names.
    pub fn parse(name: &str) -> Self {
        match name {
            "idle" => UiMode::Idle,
            "standardChat" => UiMode::StandardChat,
            "restaurantPresentation" => UiMode::RestaurantPresentation,
            "menuPresentation" => UiMode::MenuPresentation,
            "cartSummary" => UiMode::CartSummary,
            "confirmation" => UiMode::Confirmation,
            _ => UiMode::StandardChat,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UiMode::Idle => "idle",
            UiMode::StandardChat => "standardChat",
            UiMode::RestaurantPresentation => "restaurantPresentation",
            UiMode::MenuPresentation => "menuPresentation",
            UiMode::CartSummary => "cartSummary",
            UiMode::Confirmation => "confirmation",
        }
    }
}

impl std::fmt::Display for UiMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Manual impl so unknown mode names parse to the fallback instead of
// failing the whole contract.
impl<'de> Deserialize<'de> for UiMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(UiMode::parse(&raw))
    }
}

/// One highlighted-card-plus-narration unit within a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationStep {
    /// Metadata for external resumption and debugging tooling. Never used
    /// to reorder execution; order is array position.
    pub step_index: u32,
    /// Opaque id of a card currently displayed by the UI layer. Uniqueness
    /// within a contract and resolvability are the producer's
    /// responsibility; the sequencer issues highlight/scroll calls by id
    /// without validating existence.
    pub card_id: String,
    /// Text synthesized while the card is highlighted.
    pub tts_narrative: String,
}

/// Everything one assistant turn says and shows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnContract {
    /// Display mode for this turn. Missing or unrecognized values degrade
    /// to standard chat.
    #[serde(default)]
    pub ui_mode: UiMode,
    /// Text synthesized before any presentation steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_intro: Option<String>,
    /// Ordered presentation steps; execution order is array position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presentation_sequence: Option<Vec<PresentationStep>>,
    /// Text synthesized after all steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closing_question: Option<String>,
    /// Whether the microphone reopens after the turn, or the system waits
    /// for a pointer/tap selection instead. Mandatory: a contract that does
    /// not state it fails to parse.
    pub expect_selection: bool,
    /// Opaque data passed through untouched for callers outside this core.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl TurnContract {
    /// Presentation steps in execution order, empty when the contract has
    /// no presentation.
    pub fn steps(&self) -> &[PresentationStep] {
        self.presentation_sequence.as_deref().unwrap_or(&[])
    }
}
