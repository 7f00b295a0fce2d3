//! # Turn-Taking State Machine
//!
//! Owns the conversational state of one assistant session and interprets
//! raw voice-activity and playback lifecycle events against it: whether a
//! new sound is genuine user speech, an acoustic echo of the system's own
//! voice, or a barge-in interruption.
//!
//! # State Transitions
//!
//! ```text
//! Idle --vad start (accepted)--> UserSpeaking
//! UserSpeaking --vad end--> Processing
//! Processing --(vad ignored)--
//! Processing --playback start--> SystemSpeaking
//! SystemSpeaking --playback end--> Idle
//! SystemSpeaking --vad start (barge-in, stops speech)--> UserSpeaking
//! ```
//!
//! A direct `Idle -> SystemSpeaking` transition (an unprompted proactive
//! message) is equally valid and uses the same playback-start entry point.

pub mod config;
pub mod machine;
pub mod state;

pub use config::{TurnTakingConfig, DEFAULT_ECHO_GUARD_MS};
pub use machine::{StateCallback, SubscriptionId, TurnTakingMachine, VoiceEvent};
pub use state::{ConversationState, TurnId};
