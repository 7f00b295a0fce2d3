pub mod core;

// Re-export commonly used items for convenience
pub use core::contract::{PresentationStep, TurnContract, UiMode};
pub use core::coordinator::TurnCoordinator;
pub use core::sequencer::{PresentationSequencer, RenderOutcome, UiController, UiError, UiResult};
pub use core::speech::{PlaybackHandle, SpeechError, SpeechResult, SpeechSynthesis};
pub use core::turn_taking::{
    ConversationState, StateCallback, SubscriptionId, TurnId, TurnTakingConfig, TurnTakingMachine,
    VoiceEvent,
};
