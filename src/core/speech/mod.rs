//! Speech synthesis and playback collaborator seams.
//!
//! The engine never talks to a speech engine directly; it drives these
//! narrow traits. [`SpeechSynthesis`] wraps whatever synthesizes text
//! (cloud TTS, on-device fallback), [`PlaybackHandle`] wraps one
//! pre-recorded or streamed clip that is currently playing. Both stop
//! paths must tolerate being called when nothing is playing.

mod base;

pub use base::{PlaybackHandle, SpeechError, SpeechResult, SpeechSynthesis};
