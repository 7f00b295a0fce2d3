//! Wires the turn-taking machine to the presentation sequencer.
//!
//! The machine and the sequencer are deliberately independent subsystems:
//! barge-in detection and presentation cancellation know nothing about
//! each other and remain usable on their own. This module is the one
//! place they are connected. When the user starts speaking while a
//! presentation is still rendering, the render is aborted at its next
//! checkpoint so the assistant does not keep narrating over the user.

use std::sync::Arc;
use tracing::debug;

use super::contract::TurnContract;
use super::sequencer::{PresentationSequencer, RenderOutcome, UiController};
use super::turn_taking::{ConversationState, SubscriptionId, TurnTakingMachine};

/// Owns one machine and one sequencer and keeps them coordinated for the
/// lifetime of an assistant session.
pub struct TurnCoordinator {
    machine: Arc<TurnTakingMachine>,
    sequencer: Arc<PresentationSequencer>,
    barge_in_subscription: SubscriptionId,
}

impl TurnCoordinator {
    pub fn new(machine: Arc<TurnTakingMachine>, sequencer: Arc<PresentationSequencer>) -> Self {
        let barge_in_subscription = {
            let sequencer = Arc::clone(&sequencer);
            machine.subscribe(Arc::new(move |state| {
                if state == ConversationState::UserSpeaking && sequencer.is_rendering() {
                    debug!("User speech during an in-flight presentation, aborting render");
                    sequencer.abort_render();
                }
            }))
        };

        Self {
            machine,
            sequencer,
            barge_in_subscription,
        }
    }

    pub fn machine(&self) -> &Arc<TurnTakingMachine> {
        &self.machine
    }

    pub fn sequencer(&self) -> &Arc<PresentationSequencer> {
        &self.sequencer
    }

    /// Render a contract through the coordinated sequencer.
    pub async fn render(&self, contract: &TurnContract, ui: &dyn UiController) -> RenderOutcome {
        self.sequencer.render(contract, ui).await
    }
}

impl Drop for TurnCoordinator {
    fn drop(&mut self) {
        self.machine.unsubscribe(self.barge_in_subscription);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::turn_taking::{TurnId, TurnTakingConfig};

    fn coordinator() -> TurnCoordinator {
        TurnCoordinator::new(
            Arc::new(TurnTakingMachine::new(TurnTakingConfig::default())),
            Arc::new(PresentationSequencer::new()),
        )
    }

    #[test]
    fn test_barge_in_without_render_leaves_sequencer_untouched() {
        let coordinator = coordinator();

        coordinator.machine().on_speech_playback_start(TurnId::new());
        coordinator.machine().set_echo_guard_until_ms(0);
        assert!(coordinator.machine().on_voice_activity_start());

        assert!(!coordinator.sequencer().is_rendering());
    }

    #[test]
    fn test_drop_unsubscribes_barge_in_hook() {
        let machine = Arc::new(TurnTakingMachine::new(TurnTakingConfig::default()));
        let sequencer = Arc::new(PresentationSequencer::new());

        let coordinator = TurnCoordinator::new(Arc::clone(&machine), Arc::clone(&sequencer));
        let id = coordinator.barge_in_subscription;
        drop(coordinator);

        assert!(!machine.unsubscribe(id), "hook already removed on drop");
    }
}
