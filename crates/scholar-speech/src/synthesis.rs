//! Text-to-speech over a single shared output.
//!
//! The synthesis engine is one global resource. Every `speak` cancels whatever
//! is playing before it starts, so at most one utterance is ever active. Each
//! utterance gets a monotonic token; UI elements compare their own owner id
//! against the active utterance to decide whether they are the current speaker.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use uuid::Uuid;

use scholar_core::config::SpeechConfig;
use scholar_core::{OwnerId, Result, ScholarError};

use crate::engine::{SynthesisEngine, SynthesisEvent};
use crate::state::SynthesisState;

/// Monotonic identifier of one `speak` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtteranceToken(pub u64);

impl fmt::Display for UtteranceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "utterance-{}", self.0)
    }
}

/// The utterance currently playing and who asked for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveUtterance {
    pub token: UtteranceToken,
    pub owner: OwnerId,
}

/// Process-wide speech output.
pub struct SpeechSynthesizer {
    engine: Arc<dyn SynthesisEngine>,
    active: watch::Sender<Option<ActiveUtterance>>,
    next_token: AtomicU64,
    // Serializes cancel-then-start sequences against each other. Never held
    // while the engine reports events.
    engine_gate: Mutex<()>,
    language: String,
    rate: f32,
}

impl fmt::Debug for SpeechSynthesizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeechSynthesizer")
            .field("active", &*self.active.borrow())
            .field("language", &self.language)
            .field("rate", &self.rate)
            .finish()
    }
}

impl SpeechSynthesizer {
    pub fn new(engine: Arc<dyn SynthesisEngine>, config: &SpeechConfig) -> Self {
        let (active, _) = watch::channel(None);
        Self {
            engine,
            active,
            next_token: AtomicU64::new(1),
            engine_gate: Mutex::new(()),
            language: config.language.clone(),
            rate: config.rate,
        }
    }

    fn gate(&self) -> MutexGuard<'_, ()> {
        self.engine_gate.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> SynthesisState {
        state_of(&self.active.borrow())
    }

    pub fn is_speaking(&self) -> bool {
        self.state() == SynthesisState::Speaking
    }

    pub fn active(&self) -> Option<ActiveUtterance> {
        *self.active.borrow()
    }

    pub fn active_owner(&self) -> Option<OwnerId> {
        self.active().map(|a| a.owner)
    }

    /// Whether `owner` started the utterance that is playing right now.
    pub fn is_owner_speaking(&self, owner: OwnerId) -> bool {
        self.active_owner() == Some(owner)
    }

    /// Watch the active utterance, e.g. to flip play/stop icons.
    pub fn subscribe(&self) -> watch::Receiver<Option<ActiveUtterance>> {
        self.active.subscribe()
    }

    /// Cancel anything playing, then speak `text` on behalf of `owner`.
    pub fn speak(&self, owner: OwnerId, text: &str) -> Result<UtteranceToken> {
        if text.trim().is_empty() {
            return Err(ScholarError::Input("nothing to speak".to_string()));
        }

        let _gate = self.gate();
        // Unconditional: the engine may be playing audio another component started.
        self.engine.cancel();

        let token = UtteranceToken(self.next_token.fetch_add(1, Ordering::SeqCst));
        if let Some(previous) = self.transition(Some(ActiveUtterance { token, owner })) {
            tracing::debug!(previous = %previous.token, next = %token, "Utterance superseded");
        }

        if let Err(e) = self.engine.speak(token, text, &self.language, self.rate) {
            self.clear_if_current(token);
            tracing::warn!(error = %e, %token, "Speech synthesis failed to start");
            return Err(e);
        }

        tracing::debug!(%token, %owner, text_len = text.len(), "Speaking");
        Ok(token)
    }

    /// Speaking -> Idle. No-op when nothing is playing.
    pub fn cancel_speech(&self) {
        let _gate = self.gate();
        if let Some(active) = self.transition(None) {
            self.engine.cancel();
            tracing::debug!(token = %active.token, "Speech cancelled");
        }
    }

    /// Feed an engine event. Events for superseded utterances are ignored.
    pub fn on_event(&self, event: SynthesisEvent) {
        if let SynthesisEvent::Failed { token, message } = &event {
            tracing::warn!(%token, error = %message, "Utterance failed");
        }
        if !self.clear_if_current(event.token()) {
            tracing::debug!(token = %event.token(), "Stale synthesis event ignored");
        }
    }

    /// Swap in `next` if the implied state change is a valid transition.
    /// Watchers are notified only when it is. Returns the replaced utterance.
    fn transition(&self, next: Option<ActiveUtterance>) -> Option<ActiveUtterance> {
        let mut previous = None;
        self.active.send_if_modified(|active| {
            let (from, to) = (state_of(active), state_of(&next));
            if !from.can_transition_to(&to) {
                tracing::trace!(%from, %to, "Synthesis transition skipped");
                return false;
            }
            previous = std::mem::replace(active, next);
            true
        });
        previous
    }

    fn clear_if_current(&self, token: UtteranceToken) -> bool {
        self.active.send_if_modified(|active| match active {
            Some(a) if a.token == token => {
                *active = None;
                true
            }
            _ => false,
        })
    }
}

fn state_of(active: &Option<ActiveUtterance>) -> SynthesisState {
    match active {
        Some(_) => SynthesisState::Speaking,
        None => SynthesisState::Idle,
    }
}

// =============================================================================
// SpeakerHandle
// =============================================================================

/// A UI element's view of the shared synthesizer (a "read aloud" button).
///
/// Dropping the handle stops its own utterance, if it is still playing.
#[derive(Debug)]
pub struct SpeakerHandle {
    synth: Arc<SpeechSynthesizer>,
    owner: OwnerId,
}

impl SpeakerHandle {
    pub fn new(synth: Arc<SpeechSynthesizer>) -> Self {
        Self {
            synth,
            owner: Uuid::new_v4(),
        }
    }

    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    /// True only while this element's utterance is the one playing.
    pub fn is_speaking(&self) -> bool {
        self.synth.is_owner_speaking(self.owner)
    }

    pub fn speak(&self, text: &str) -> Result<UtteranceToken> {
        self.synth.speak(self.owner, text)
    }

    /// Stop this element's utterance. Leaves other elements' speech alone.
    pub fn stop(&self) {
        if self.is_speaking() {
            self.synth.cancel_speech();
        }
    }

    /// Play/stop button behaviour. Returns whether this element is now speaking.
    pub fn toggle(&self, text: &str) -> Result<bool> {
        if self.is_speaking() {
            self.synth.cancel_speech();
            Ok(false)
        } else {
            self.speak(text)?;
            Ok(true)
        }
    }
}

impl Drop for SpeakerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering as AtomicOrdering;

    use super::*;
    use crate::testing::{RecordingSynthesis, SynthCall};

    fn make_synth() -> (Arc<RecordingSynthesis>, Arc<SpeechSynthesizer>) {
        let engine = Arc::new(RecordingSynthesis::default());
        let synth = Arc::new(SpeechSynthesizer::new(
            engine.clone(),
            &SpeechConfig::default(),
        ));
        (engine, synth)
    }

    #[test]
    fn test_speak_cancels_first() {
        let (engine, synth) = make_synth();
        let owner = Uuid::new_v4();
        let token = synth.speak(owner, "hello").unwrap();

        assert_eq!(
            engine.calls(),
            vec![SynthCall::Cancel, SynthCall::Speak(token, "hello".into())]
        );
        assert_eq!(synth.state(), SynthesisState::Speaking);
        assert_eq!(synth.active_owner(), Some(owner));
    }

    #[test]
    fn test_second_speak_supersedes_first() {
        let (engine, synth) = make_synth();
        let a = synth.speak(Uuid::new_v4(), "A").unwrap();
        let owner_b = Uuid::new_v4();
        let b = synth.speak(owner_b, "B").unwrap();

        assert!(b > a);
        assert_eq!(synth.active().unwrap().token, b);
        assert_eq!(
            engine.calls(),
            vec![
                SynthCall::Cancel,
                SynthCall::Speak(a, "A".into()),
                SynthCall::Cancel,
                SynthCall::Speak(b, "B".into()),
            ]
        );

        // A's late completion must not end B.
        synth.on_event(SynthesisEvent::Finished(a));
        assert!(synth.is_speaking());
        assert_eq!(synth.active_owner(), Some(owner_b));
    }

    #[test]
    fn test_finished_returns_to_idle() {
        let (_engine, synth) = make_synth();
        let t = synth.speak(Uuid::new_v4(), "x").unwrap();
        synth.on_event(SynthesisEvent::Finished(t));
        assert_eq!(synth.state(), SynthesisState::Idle);
    }

    #[test]
    fn test_failed_returns_to_idle() {
        let (_engine, synth) = make_synth();
        let t = synth.speak(Uuid::new_v4(), "x").unwrap();
        synth.on_event(SynthesisEvent::Failed {
            token: t,
            message: "audio device lost".into(),
        });
        assert!(!synth.is_speaking());
    }

    #[test]
    fn test_cancel_from_idle_is_noop() {
        let (engine, synth) = make_synth();
        synth.cancel_speech();
        assert!(engine.calls().is_empty());
        assert_eq!(synth.state(), SynthesisState::Idle);
    }

    #[test]
    fn test_cancel_from_idle_does_not_notify() {
        let (_engine, synth) = make_synth();
        let rx = synth.subscribe();
        synth.cancel_speech();
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_cancel_while_speaking() {
        let (engine, synth) = make_synth();
        synth.speak(Uuid::new_v4(), "x").unwrap();
        synth.cancel_speech();
        assert_eq!(synth.state(), SynthesisState::Idle);
        assert_eq!(engine.calls().last(), Some(&SynthCall::Cancel));
    }

    #[test]
    fn test_blank_text_is_rejected_without_cancelling() {
        let (engine, synth) = make_synth();
        let owner = Uuid::new_v4();
        synth.speak(owner, "playing").unwrap();
        let before = engine.calls().len();

        let err = synth.speak(Uuid::new_v4(), "   ").unwrap_err();
        assert!(matches!(err, ScholarError::Input(_)));
        assert_eq!(engine.calls().len(), before);
        assert_eq!(synth.active_owner(), Some(owner));
    }

    #[test]
    fn test_engine_failure_leaves_idle() {
        let (engine, synth) = make_synth();
        engine.fail_speak.store(true, AtomicOrdering::SeqCst);
        assert!(synth.speak(Uuid::new_v4(), "x").is_err());
        assert!(!synth.is_speaking());
    }

    #[test]
    fn test_tokens_are_monotonic() {
        let (_engine, synth) = make_synth();
        let owner = Uuid::new_v4();
        let mut last = UtteranceToken(0);
        for _ in 0..10 {
            let t = synth.speak(owner, "x").unwrap();
            assert!(t > last);
            last = t;
        }
    }

    #[test]
    fn test_handle_reverts_when_other_element_speaks() {
        let (_engine, synth) = make_synth();
        let first = SpeakerHandle::new(synth.clone());
        let second = SpeakerHandle::new(synth.clone());

        first.speak("first answer").unwrap();
        assert!(first.is_speaking());
        assert!(!second.is_speaking());

        second.speak("second answer").unwrap();
        assert!(!first.is_speaking());
        assert!(second.is_speaking());
    }

    #[test]
    fn test_handle_toggle() {
        let (_engine, synth) = make_synth();
        let h = SpeakerHandle::new(synth.clone());
        assert!(h.toggle("read me").unwrap());
        assert!(h.is_speaking());
        assert!(!h.toggle("read me").unwrap());
        assert!(!synth.is_speaking());
    }

    #[test]
    fn test_handle_stop_leaves_other_speaker() {
        let (_engine, synth) = make_synth();
        let a = SpeakerHandle::new(synth.clone());
        let b = SpeakerHandle::new(synth.clone());
        b.speak("b").unwrap();
        a.stop();
        assert!(b.is_speaking());
    }

    #[test]
    fn test_dropping_speaking_handle_cancels() {
        let (_engine, synth) = make_synth();
        {
            let h = SpeakerHandle::new(synth.clone());
            h.speak("bye").unwrap();
            assert!(synth.is_speaking());
        }
        assert!(!synth.is_speaking());
    }

    #[tokio::test]
    async fn test_subscribe_sees_owner_change() {
        let (_engine, synth) = make_synth();
        let mut rx = synth.subscribe();
        let owner = Uuid::new_v4();
        synth.speak(owner, "hi").unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().map(|a| a.owner), Some(owner));
    }
}
