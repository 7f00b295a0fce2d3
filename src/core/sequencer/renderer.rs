//! Presentation sequencer implementation.

use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, warn};

use crate::core::contract::TurnContract;

use super::ui::{UiController, UiError};

/// How a [`PresentationSequencer::render`] call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The full sequence ran to the end.
    Completed,
    /// A previous render was still live; this call made no UI calls.
    /// Dropped calls are never re-run; re-submit a fresh contract for
    /// guaranteed delivery.
    Dropped,
    /// [`PresentationSequencer::abort_render`] stopped the sequence at a
    /// checkpoint.
    Aborted,
    /// A collaborator call failed; the remaining sequence was skipped.
    Failed,
}

/// Internal control flow for a render run.
#[derive(Debug, thiserror::Error)]
enum RenderStop {
    #[error("render aborted")]
    Aborted,
    #[error(transparent)]
    Ui(#[from] UiError),
}

/// Drives one turn contract at a time against a UI controller.
///
/// The re-entrancy and abort flags assume a single logical owner; the
/// atomics make flag access safe from other tasks (`abort_render` may be
/// called from anywhere), but overlapping `render` calls are a caller
/// mistake answered by dropping, not queueing.
pub struct PresentationSequencer {
    /// True while a render call is live. Claimed by compare-exchange so an
    /// overlapping call is dropped without touching the UI.
    rendering: AtomicBool,

    /// Cooperative abort flag, polled at phase checkpoints. A speech await
    /// already in flight runs to completion; only the next checkpoint
    /// actually stops the sequence.
    abort_requested: AtomicBool,
}

impl PresentationSequencer {
    pub fn new() -> Self {
        Self {
            rendering: AtomicBool::new(false),
            abort_requested: AtomicBool::new(false),
        }
    }

    /// Whether a render call is currently live.
    pub fn is_rendering(&self) -> bool {
        self.rendering.load(Ordering::Acquire)
    }

    /// Request that the in-flight render stop at its next checkpoint.
    ///
    /// Callable at any time from any task. Best-effort: with no render in
    /// progress there is nothing to abort and the request is discarded, so
    /// the next contract always starts clean.
    pub fn abort_render(&self) {
        if !self.rendering.load(Ordering::Acquire) {
            debug!("Abort requested with no render in progress");
            return;
        }
        info!("Render abort requested");
        self.abort_requested.store(true, Ordering::Release);
    }

    /// Execute `contract` against `ui`, step by step.
    ///
    /// Collaborator failures never escape: they are logged, the cleanup
    /// path still runs, and the UI is left with input unlocked. The
    /// returned [`RenderOutcome`] is the only signal of how the turn
    /// ended.
    pub async fn render(&self, contract: &TurnContract, ui: &dyn UiController) -> RenderOutcome {
        if self
            .rendering
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("render called while a previous turn is still rendering; dropping call");
            return RenderOutcome::Dropped;
        }

        let mut input_unlocked = false;
        let result = self.render_inner(contract, ui, &mut input_unlocked).await;

        // Cleanup always runs: success, failure, or abort.
        if !input_unlocked {
            if let Err(e) = ui.unlock_input().await {
                error!(error = %e, "Failed to unlock input during render cleanup");
            }
        }
        self.abort_requested.store(false, Ordering::Release);
        self.rendering.store(false, Ordering::Release);

        match result {
            Ok(()) => {
                debug!("Turn render completed");
                RenderOutcome::Completed
            }
            Err(RenderStop::Aborted) => {
                info!("Turn render aborted before completion");
                RenderOutcome::Aborted
            }
            Err(RenderStop::Ui(e)) => {
                error!(error = %e, "Turn render failed; remaining sequence skipped");
                RenderOutcome::Failed
            }
        }
    }

    fn check_abort(&self) -> Result<(), RenderStop> {
        if self.abort_requested.load(Ordering::Acquire) {
            Err(RenderStop::Aborted)
        } else {
            Ok(())
        }
    }

    async fn render_inner(
        &self,
        contract: &TurnContract,
        ui: &dyn UiController,
        input_unlocked: &mut bool,
    ) -> Result<(), RenderStop> {
        // Hard reset: always the first three UI actions of every render.
        ui.stop_all_speech().await?;
        ui.clear_highlights().await?;
        ui.lock_input().await?;

        // Display mode. `UiMode` is a closed set; anything unrecognized
        // already degraded to standard chat at the contract boundary.
        ui.set_display_mode(contract.ui_mode).await?;

        // Intro narration.
        self.check_abort()?;
        if let Some(intro) = &contract.voice_intro {
            if !intro.is_empty() {
                ui.play_speech(intro).await?;
            }
        }

        // Presentation steps, in array order. The highlight of step N is
        // cleared before step N+1 begins; highlights never overlap.
        for step in contract.steps() {
            self.check_abort()?;
            debug!(
                step_index = step.step_index,
                card_id = %step.card_id,
                "Presenting card"
            );
            ui.scroll_to_card(&step.card_id).await?;
            ui.highlight_card(&step.card_id).await?;
            if !step.tts_narrative.is_empty() {
                ui.play_speech(&step.tts_narrative).await?;
            }
            ui.unhighlight_card(&step.card_id).await?;
        }

        // Closing question.
        self.check_abort()?;
        if let Some(closing) = &contract.closing_question {
            if !closing.is_empty() {
                ui.play_speech(closing).await?;
            }
        }

        // Microphone policy: reopen the microphone, or leave it closed and
        // wait for a pointer/tap selection.
        self.check_abort()?;
        ui.unlock_input().await?;
        *input_unlocked = true;
        if contract.expect_selection {
            ui.open_microphone().await?;
        }

        Ok(())
    }
}

impl Default for PresentationSequencer {
    fn default() -> Self {
        Self::new()
    }
}
