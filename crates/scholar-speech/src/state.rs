//! Speech state machines.
//!
//! Recognition:
//! - Idle -> Listening (start listening)
//! - Listening -> Idle (explicit stop, fatal engine error, restart give-up)
//!
//! Every Listening -> Idle move the caller did not ask for is reported as a
//! [`ListeningEnded`] reason.
//!
//! Synthesis:
//! - Idle -> Speaking (speak)
//! - Speaking -> Speaking (speak again: the previous utterance is cancelled)
//! - Speaking -> Idle (finished, failed, cancelled)

use std::fmt;

use serde::{Deserialize, Serialize};

/// Externally visible recognition state.
///
/// Engine restarts while listening never show up here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecognitionState {
    Idle,
    Listening,
}

impl fmt::Display for RecognitionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecognitionState::Idle => write!(f, "Idle"),
            RecognitionState::Listening => write!(f, "Listening"),
        }
    }
}

impl RecognitionState {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &RecognitionState) -> bool {
        matches!(
            (self, target),
            (RecognitionState::Idle, RecognitionState::Listening)
                | (RecognitionState::Listening, RecognitionState::Idle)
        )
    }
}

/// Why recognition left `Listening` without a `stop_listening` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListeningEnded {
    /// The engine stopped and automatic restart is turned off.
    EngineStopped,
    /// The engine stopped too often within a minute; restarts were abandoned.
    RestartLimit,
    /// The engine reported an unrecoverable error.
    Fatal(String),
    /// The engine stopped and could not be started again.
    RestartFailed(String),
}

impl fmt::Display for ListeningEnded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListeningEnded::EngineStopped => write!(f, "speech engine stopped"),
            ListeningEnded::RestartLimit => write!(f, "speech engine keeps stopping"),
            ListeningEnded::Fatal(msg) => write!(f, "speech engine error: {}", msg),
            ListeningEnded::RestartFailed(msg) => {
                write!(f, "speech engine restart failed: {}", msg)
            }
        }
    }
}

/// Synthesis state of the shared speech output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SynthesisState {
    Idle,
    Speaking,
}

impl fmt::Display for SynthesisState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SynthesisState::Idle => write!(f, "Idle"),
            SynthesisState::Speaking => write!(f, "Speaking"),
        }
    }
}

impl SynthesisState {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &SynthesisState) -> bool {
        matches!(
            (self, target),
            (SynthesisState::Idle, SynthesisState::Speaking)
                | (SynthesisState::Speaking, SynthesisState::Speaking)
                | (SynthesisState::Speaking, SynthesisState::Idle)
        )
    }
}

// =============================================================================
// Tests
// =============================================================================
