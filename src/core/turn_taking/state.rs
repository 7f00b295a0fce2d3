//! Conversational state and turn identity types.

use std::fmt;

/// Conversational state of one assistant session.
///
/// Stored inside the machine as the enum discriminant in an atomic cell
/// for lock-free reads; mutated only through the machine's event-handler
/// operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConversationState {
    /// Nobody is speaking and nothing is being computed.
    Idle = 0,
    /// Voice activity has been accepted as genuine user speech.
    UserSpeaking = 1,
    /// The user finished speaking; a response is being computed. New
    /// speech is ignored rather than queued in this state.
    Processing = 2,
    /// Synthesized speech is playing. New speech is either echo (inside
    /// the guard window) or a barge-in.
    SystemSpeaking = 3,
}

impl ConversationState {
    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            1 => ConversationState::UserSpeaking,
            2 => ConversationState::Processing,
            3 => ConversationState::SystemSpeaking,
            _ => ConversationState::Idle,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationState::Idle => "idle",
            ConversationState::UserSpeaking => "user_speaking",
            ConversationState::Processing => "processing",
            ConversationState::SystemSpeaking => "system_speaking",
        }
    }
}

impl fmt::Display for ConversationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque id correlating playback start/stop events to one system turn.
///
/// Assigned by whoever starts a system-speaking turn; [`TurnId::new`]
/// mints a random id for callers that do not carry their own.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TurnId(String);

impl TurnId {
    /// Mint a fresh random turn id.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TurnId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for TurnId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&str> for TurnId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_round_trips_through_u8() {
        for state in [
            ConversationState::Idle,
            ConversationState::UserSpeaking,
            ConversationState::Processing,
            ConversationState::SystemSpeaking,
        ] {
            assert_eq!(ConversationState::from_u8(state as u8), state);
        }
    }

    #[test]
    fn test_unknown_discriminant_maps_to_idle() {
        assert_eq!(ConversationState::from_u8(42), ConversationState::Idle);
    }

    #[test]
    fn test_turn_ids_are_unique() {
        let a = TurnId::new();
        let b = TurnId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_turn_id_from_caller_string() {
        let id = TurnId::from("turn-7");
        assert_eq!(id.as_str(), "turn-7");
        assert_eq!(id.to_string(), "turn-7");
    }
}
