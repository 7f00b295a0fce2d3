//! # Presentation Sequencer
//!
//! Executes one [`TurnContract`](crate::core::contract::TurnContract)
//! against a [`UiController`]: hard reset, display mode, intro narration,
//! the presentation steps (scroll, highlight, narrate, unhighlight), the
//! closing question, and finally the microphone policy.
//!
//! Overlapping render calls are dropped, not queued, and an in-flight
//! render can be aborted cooperatively at phase checkpoints. Whether a
//! turn completes, fails on a collaborator, or is aborted, user input is
//! never left locked.

pub mod renderer;
pub mod ui;


pub use renderer::{PresentationSequencer, RenderOutcome};
pub use ui::{UiController, UiError, UiResult};
