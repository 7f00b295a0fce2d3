pub mod contract;
pub mod coordinator;
pub mod sequencer;
pub mod speech;
pub mod turn_taking;
pub(crate) mod utils;

// Re-export commonly used types for convenience
pub use contract::{PresentationStep, TurnContract, UiMode};
pub use coordinator::TurnCoordinator;
pub use sequencer::{PresentationSequencer, RenderOutcome, UiController, UiError, UiResult};
pub use speech::{PlaybackHandle, SpeechError, SpeechResult, SpeechSynthesis};
pub use turn_taking::{
    ConversationState, StateCallback, SubscriptionId, TurnId, TurnTakingConfig, TurnTakingMachine,
    VoiceEvent,
};
