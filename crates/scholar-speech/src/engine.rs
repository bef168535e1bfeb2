//! Seams to the platform speech engines.
//!
//! Engines are driven synchronously and report asynchronously: whatever owns
//! the platform callbacks forwards them to `RecognitionController::on_event`
//! and `SpeechSynthesizer::on_event`.

use scholar_core::Result;

use crate::synthesis::UtteranceToken;

/// Continuous speech-to-text with interim results.
pub trait RecognitionEngine: Send + Sync {
    /// Begin (or resume) capture.
    fn start(&self, language: &str) -> Result<()>;
    /// Stop capture. Must be safe to call when not capturing.
    fn stop(&self);
}

/// Something the recognition engine reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// All results of the current engine session, oldest first. Interim and
    /// final results are both included; later results supersede earlier ones.
    Result { segments: Vec<String>, is_final: bool },
    /// The engine stopped capturing (silence timeout, network hiccup, ...).
    Ended,
    /// The engine reported an error. Fatal errors (e.g. microphone permission
    /// denied) end listening; others are followed by `Ended` and a restart.
    Error { message: String, fatal: bool },
}

/// Text-to-speech with a single global output queue.
pub trait SynthesisEngine: Send + Sync {
    /// Start speaking `text` as utterance `token`.
    fn speak(&self, token: UtteranceToken, text: &str, language: &str, rate: f32) -> Result<()>;
    /// Immediately stop all speech.
    fn cancel(&self);
}

/// Something the synthesis engine reported about an utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisEvent {
    Finished(UtteranceToken),
    Failed { token: UtteranceToken, message: String },
}

impl SynthesisEvent {
    pub fn token(&self) -> UtteranceToken {
        match self {
            SynthesisEvent::Finished(token) => *token,
            SynthesisEvent::Failed { token, .. } => *token,
        }
    }
}
