//! Continuous speech recognition with automatic restart.
//!
//! The engine may stop on its own at any time (silence timeouts are the usual
//! cause). While the caller still wants to listen, every such stop is answered
//! with a restart, so the visible state stays `Listening` until
//! `stop_listening` is called. The exceptions are a fatal engine error, a
//! failed restart, hitting the restart limit and running with auto-restart
//! off; each of those returns to `Idle` and publishes a [`ListeningEnded`].

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::sync::watch;

use scholar_core::config::SpeechConfig;
use scholar_core::Result;

use crate::engine::{RecognitionEngine, RecognitionEvent};
use crate::state::{ListeningEnded, RecognitionState};

const RESTART_WINDOW: Duration = Duration::from_secs(60);

struct Inner {
    state: RecognitionState,
    restarts: VecDeque<Instant>,
    last_error: Option<String>,
}

impl Inner {
    /// Move to `target` if the state machine allows it.
    fn transition(&mut self, target: RecognitionState) -> bool {
        if !self.state.can_transition_to(&target) {
            tracing::trace!(from = %self.state, to = %target, "Recognition transition skipped");
            return false;
        }
        tracing::debug!(from = %self.state, to = %target, "Recognition state changed");
        self.state = target;
        true
    }
}

/// Speech-to-text controller for one panel.
pub struct RecognitionController {
    engine: Arc<dyn RecognitionEngine>,
    inner: Mutex<Inner>,
    transcript: watch::Sender<String>,
    ended: watch::Sender<Option<ListeningEnded>>,
    language: String,
    auto_restart: bool,
    max_restarts_per_minute: u32,
}

impl std::fmt::Debug for RecognitionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecognitionController")
            .field("state", &self.state())
            .field("language", &self.language)
            .field("auto_restart", &self.auto_restart)
            .finish()
    }
}

impl RecognitionController {
    pub fn new(engine: Arc<dyn RecognitionEngine>, config: &SpeechConfig) -> Self {
        let (transcript, _) = watch::channel(String::new());
        let (ended, _) = watch::channel(None);
        Self {
            engine,
            inner: Mutex::new(Inner {
                state: RecognitionState::Idle,
                restarts: VecDeque::new(),
                last_error: None,
            }),
            transcript,
            ended,
            language: config.language.clone(),
            auto_restart: config.auto_restart,
            max_restarts_per_minute: config.max_restarts_per_minute,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> RecognitionState {
        self.lock().state
    }

    pub fn is_listening(&self) -> bool {
        self.state() == RecognitionState::Listening
    }

    /// The live transcript: the latest full-text result.
    pub fn transcript(&self) -> String {
        self.transcript.borrow().clone()
    }

    /// Watch the live transcript. Every update replaces the previous value.
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.transcript.subscribe()
    }

    /// Watch for listening ending without the caller. Reset to `None` on
    /// every `start_listening`.
    pub fn subscribe_ended(&self) -> watch::Receiver<Option<ListeningEnded>> {
        self.ended.subscribe()
    }

    /// Why the last listening session ended on its own, if it did.
    pub fn ended_reason(&self) -> Option<ListeningEnded> {
        self.ended.borrow().clone()
    }

    /// The error that last ended listening, if any.
    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    /// Idle -> Listening. No-op when already listening.
    pub fn start_listening(&self) -> Result<()> {
        {
            let mut inner = self.lock();
            if !inner.transition(RecognitionState::Listening) {
                tracing::debug!("start_listening ignored: already listening");
                return Ok(());
            }
            inner.restarts.clear();
            inner.last_error = None;
            self.ended.send_if_modified(|reason| reason.take().is_some());
        }

        if let Err(e) = self.engine.start(&self.language) {
            let mut inner = self.lock();
            inner.transition(RecognitionState::Idle);
            inner.last_error = Some(e.to_string());
            tracing::warn!(error = %e, "Speech recognition failed to start");
            return Err(e);
        }

        tracing::info!(language = %self.language, "Speech recognition started");
        Ok(())
    }

    /// Listening -> Idle. No-op when idle. Late engine events are ignored afterwards.
    pub fn stop_listening(&self) {
        if !self.lock().transition(RecognitionState::Idle) {
            return;
        }
        self.engine.stop();
        tracing::info!("Speech recognition stopped");
    }

    /// Feed an engine event into the state machine.
    pub fn on_event(&self, event: RecognitionEvent) {
        match event {
            RecognitionEvent::Result { segments, is_final } => {
                let inner = self.lock();
                if inner.state != RecognitionState::Listening {
                    tracing::debug!("Late recognition result ignored");
                    return;
                }
                let text: String = segments.concat();
                tracing::debug!(text_len = text.len(), is_final, "Transcript updated");
                // Published while holding the lock so a concurrent stop cannot
                // slip in between the state check and the update.
                self.transcript.send_replace(text);
            }
            RecognitionEvent::Ended => self.handle_engine_end(),
            RecognitionEvent::Error { message, fatal } => {
                if !fatal {
                    tracing::debug!(error = %message, "Recoverable recognition error");
                    return;
                }
                let ended = {
                    let mut inner = self.lock();
                    self.end(&mut inner, ListeningEnded::Fatal(message.clone()))
                };
                if ended {
                    self.engine.stop();
                    tracing::warn!(error = %message, "Speech recognition ended by fatal error");
                }
            }
        }
    }

    /// Listening -> Idle on the engine's account. Returns false when the
    /// caller had already stopped.
    fn end(&self, inner: &mut Inner, reason: ListeningEnded) -> bool {
        if !inner.transition(RecognitionState::Idle) {
            return false;
        }
        match &reason {
            ListeningEnded::EngineStopped => {}
            ListeningEnded::RestartLimit => inner.last_error = Some(reason.to_string()),
            ListeningEnded::Fatal(msg) | ListeningEnded::RestartFailed(msg) => {
                inner.last_error = Some(msg.clone())
            }
        }
        self.ended.send_replace(Some(reason));
        true
    }

    fn handle_engine_end(&self) {
        {
            let mut inner = self.lock();
            if inner.state != RecognitionState::Listening {
                return;
            }
            if !self.auto_restart {
                self.end(&mut inner, ListeningEnded::EngineStopped);
                tracing::info!("Speech recognition ended (auto-restart disabled)");
                return;
            }

            let now = Instant::now();
            while inner
                .restarts
                .front()
                .is_some_and(|t| now.duration_since(*t) > RESTART_WINDOW)
            {
                inner.restarts.pop_front();
            }
            if inner.restarts.len() >= self.max_restarts_per_minute as usize {
                let restarts = inner.restarts.len();
                self.end(&mut inner, ListeningEnded::RestartLimit);
                tracing::warn!(restarts, "Speech recognition restart limit reached, giving up");
                return;
            }
            inner.restarts.push_back(now);
        }

        if let Err(e) = self.engine.start(&self.language) {
            let mut inner = self.lock();
            self.end(&mut inner, ListeningEnded::RestartFailed(e.to_string()));
            tracing::warn!(error = %e, "Speech recognition restart failed");
            return;
        }

        // A stop may have landed while the engine was restarting.
        if self.state() == RecognitionState::Idle {
            self.engine.stop();
            return;
        }
        tracing::debug!("Speech recognition restarted after engine stop");
    }
}

// =============================================================================
// Tests
// =============================================================================
