//! Chat orchestrator: central coordinator wiring gateway, history, and speech.
//!
//! One orchestrator serves one panel. The panel owns its history and passes
//! it in for every turn; the orchestrator keeps no chat state of its own.

use std::sync::Arc;

use tokio::sync::watch;

use scholar_core::config::ChatConfig;
use scholar_core::{prompt_is_empty, ConversationHistory, MediaAttachment, PromptPart, ScholarError};
use scholar_gateway::{GenerateOptions, GeneratedImage, ImageRequest, ModelGateway};
use scholar_speech::SpeechController;

use crate::error::ChatError;
use crate::history::SessionBuilder;
use crate::stream::{LiveTurn, StreamingConsumer};
use crate::structured::{StructuredShape, StructuredValidator};

/// One user message for a chat panel.
#[derive(Debug, Clone, Default)]
pub struct SendRequest {
    pub text: String,
    pub notes: Option<String>,
    pub attachment: Option<MediaAttachment>,
}

impl SendRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_attachment(mut self, attachment: MediaAttachment) -> Self {
        self.attachment = Some(attachment);
        self
    }
}

pub struct ChatOrchestrator {
    gateway: Arc<dyn ModelGateway>,
    speech: Option<Arc<SpeechController>>,
    sessions: SessionBuilder,
    consumer: StreamingConsumer,
    config: ChatConfig,
    max_images: u8,
}

impl std::fmt::Debug for ChatOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatOrchestrator")
            .field("speech", &self.speech.is_some())
            .field("max_message_length", &self.config.max_message_length)
            .field("max_images", &self.max_images)
            .finish()
    }
}

impl ChatOrchestrator {
    pub fn new(gateway: Arc<dyn ModelGateway>, config: ChatConfig, max_images: u8) -> Self {
        Self {
            gateway,
            speech: None,
            sessions: SessionBuilder::new(config.system_instruction.clone()),
            consumer: StreamingConsumer::new(),
            config,
            max_images,
        }
    }

    /// Attach the panel's speech controller so requests silence it first.
    pub fn with_speech(mut self, speech: Arc<SpeechController>) -> Self {
        self.speech = Some(speech);
        self
    }

    pub fn speech(&self) -> Option<&Arc<SpeechController>> {
        self.speech.as_ref()
    }

    /// Watch the assistant turn while it streams.
    pub fn subscribe(&self) -> watch::Receiver<Option<LiveTurn>> {
        self.consumer.subscribe()
    }

    /// Send one chat message and stream the reply into `history`.
    ///
    /// Returns the full reply text. On a stream failure the reply turn still
    /// ends up finalized with an error marker.
    pub async fn send_message(
        &self,
        history: &mut ConversationHistory,
        request: SendRequest,
    ) -> Result<String, ChatError> {
        let text = request.text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if text.chars().count() > self.config.max_message_length {
            return Err(ChatError::MessageTooLong(self.config.max_message_length));
        }
        if history.is_in_progress() {
            return Err(ChatError::TurnInFlight);
        }

        self.prepare_for_request();

        // Built before the new user turn lands: prior context must not repeat it.
        let input = self.sessions.build(
            history,
            text,
            request.notes.as_deref(),
            request.attachment.as_ref(),
        );

        history.push_user(text, request.attachment.as_ref().map(|a| a.descriptor()))?;
        let turn_id = history.open_response()?;

        tracing::info!(
            turn_id = %turn_id,
            prior_turns = input.prior.len(),
            "Sending chat message"
        );

        let stream = match self
            .open_stream(&input.system_instruction, input.prior, &input.message)
            .await
        {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(turn_id = %turn_id, error = %e, "Failed to open response stream");
                self.consumer.fail_open_turn(history, &e);
                return Err(e.into());
            }
        };

        self.consumer.consume(history, stream).await
    }

    async fn open_stream(
        &self,
        system_instruction: &str,
        prior: Vec<scholar_core::ModelTurn>,
        message: &[PromptPart],
    ) -> scholar_core::Result<scholar_gateway::FragmentStream> {
        let session = self.gateway.create_session(system_instruction, prior)?;
        self.gateway.send_streamed(&session, message).await
    }

    /// Ask for a schema-constrained answer and validate it as `T`.
    pub async fn request_structured<T: StructuredShape>(
        &self,
        parts: &[PromptPart],
    ) -> Result<T, ChatError> {
        ensure_prompt(parts)?;
        self.prepare_for_request();

        tracing::info!(shape = T::LABEL, "Requesting structured response");
        let raw = self.gateway.generate_structured(parts, &T::schema()).await?;
        StructuredValidator::validate::<T>(&raw).into_result()
    }

    /// Single-shot text answer for panels without history.
    pub async fn ask(&self, parts: &[PromptPart]) -> Result<String, ChatError> {
        ensure_prompt(parts)?;
        self.prepare_for_request();

        let options =
            GenerateOptions::with_system_instruction(self.config.system_instruction.clone());
        let text = self.gateway.generate(parts, &options).await?;
        tracing::debug!(len = text.len(), "Single-shot answer received");
        Ok(text)
    }

    /// Generate `count` images for `prompt`. Counts outside the configured
    /// range are rejected before any network work.
    pub async fn generate_images(
        &self,
        prompt: &str,
        count: u32,
    ) -> Result<Vec<GeneratedImage>, ChatError> {
        let request = ImageRequest::new(prompt, count, self.max_images)?;
        self.prepare_for_request();

        let images = self.gateway.generate_images(&request).await?;
        tracing::info!(requested = count, received = images.len(), "Images generated");
        Ok(images)
    }

    /// Stop speech for a closing panel.
    pub fn dismiss(&self) {
        if let Some(speech) = &self.speech {
            speech.dismiss();
        }
    }

    fn prepare_for_request(&self) {
        if let Some(speech) = &self.speech {
            speech.prepare_for_request();
        }
    }
}

impl Drop for ChatOrchestrator {
    fn drop(&mut self) {
        self.dismiss();
    }
}

fn ensure_prompt(parts: &[PromptPart]) -> Result<(), ChatError> {
    if prompt_is_empty(parts) {
        return Err(ScholarError::Input("prompt cannot be empty".to_string()).into());
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
