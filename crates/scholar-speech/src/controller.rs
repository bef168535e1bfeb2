//! One panel's speech surface: its own recognizer plus the shared synthesizer.

use std::sync::Arc;

use scholar_core::config::SpeechConfig;
use scholar_core::{OwnerId, Result, SpeechSession};

use crate::engine::RecognitionEngine;
use crate::recognition::RecognitionController;
use crate::synthesis::{SpeakerHandle, SpeechSynthesizer, UtteranceToken};

#[derive(Debug)]
pub struct SpeechController {
    recognition: RecognitionController,
    synthesis: Arc<SpeechSynthesizer>,
}

impl SpeechController {
    pub fn new(
        recognition_engine: Arc<dyn RecognitionEngine>,
        synthesizer: Arc<SpeechSynthesizer>,
        config: &SpeechConfig,
    ) -> Self {
        Self {
            recognition: RecognitionController::new(recognition_engine, config),
            synthesis: synthesizer,
        }
    }

    pub fn recognition(&self) -> &RecognitionController {
        &self.recognition
    }

    pub fn synthesizer(&self) -> &Arc<SpeechSynthesizer> {
        &self.synthesis
    }

    /// A new read-aloud handle on the shared synthesizer.
    pub fn speaker(&self) -> SpeakerHandle {
        SpeakerHandle::new(self.synthesis.clone())
    }

    pub fn start_listening(&self) -> Result<()> {
        self.recognition.start_listening()
    }

    pub fn stop_listening(&self) {
        self.recognition.stop_listening()
    }

    pub fn speak(&self, owner: OwnerId, text: &str) -> Result<UtteranceToken> {
        self.synthesis.speak(owner, text)
    }

    pub fn cancel_speech(&self) {
        self.synthesis.cancel_speech()
    }

    /// Called right before a request goes out: the microphone is released and
    /// any reading of a previous answer stops.
    pub fn prepare_for_request(&self) {
        self.recognition.stop_listening();
        self.synthesis.cancel_speech();
    }

    /// Called when the panel closes.
    pub fn dismiss(&self) {
        self.synthesis.cancel_speech();
        self.recognition.stop_listening();
        tracing::debug!("Speech controller dismissed");
    }

    pub fn session(&self) -> SpeechSession {
        SpeechSession {
            listening: self.recognition.is_listening(),
            speaking: self.synthesis.is_speaking(),
            active_utterance_owner: self.synthesis.active_owner(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
