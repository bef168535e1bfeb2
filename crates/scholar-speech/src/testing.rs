//! Recording engines for unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use scholar_core::{Result, ScholarError};

use crate::engine::{RecognitionEngine, SynthesisEngine};
use crate::synthesis::UtteranceToken;

#[derive(Default)]
pub struct RecordingRecognition {
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    pub fail_start: AtomicBool,
}

impl RecognitionEngine for RecordingRecognition {
    fn start(&self, _language: &str) -> Result<()> {
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(ScholarError::Speech("microphone unavailable".into()));
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SynthCall {
    Speak(UtteranceToken, String),
    Cancel,
}

#[derive(Default)]
pub struct RecordingSynthesis {
    pub calls: Mutex<Vec<SynthCall>>,
    pub fail_speak: AtomicBool,
}

impl RecordingSynthesis {
    pub fn calls(&self) -> Vec<SynthCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl SynthesisEngine for RecordingSynthesis {
    fn speak(&self, token: UtteranceToken, text: &str, _language: &str, _rate: f32) -> Result<()> {
        if self.fail_speak.load(Ordering::SeqCst) {
            return Err(ScholarError::Speech("no voices installed".into()));
        }
        self.calls
            .lock()
            .unwrap()
            .push(SynthCall::Speak(token, text.to_string()));
        Ok(())
    }

    fn cancel(&self) {
        self.calls.lock().unwrap().push(SynthCall::Cancel);
    }
}
