//! Speech input/output for Scholar panels.
//!
//! Two independent state machines behind one controller:
//! - recognition (speech-to-text), Idle <-> Listening, which keeps listening
//!   across engine-level stops until the caller explicitly stops it;
//! - synthesis (text-to-speech), Idle <-> Speaking, where starting a new
//!   utterance always cancels the current one first.
//!
//! Platform speech engines plug in through [`RecognitionEngine`] and
//! [`SynthesisEngine`] and report back through `on_event`.

pub mod controller;
pub mod engine;
pub mod recognition;
pub mod state;
pub mod synthesis;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::SpeechController;
pub use engine::{RecognitionEngine, RecognitionEvent, SynthesisEngine, SynthesisEvent};
pub use recognition::RecognitionController;
pub use state::{ListeningEnded, RecognitionState, SynthesisState};
pub use synthesis::{ActiveUtterance, SpeakerHandle, SpeechSynthesizer, UtteranceToken};
