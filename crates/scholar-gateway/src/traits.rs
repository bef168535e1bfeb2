use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use scholar_core::{ModelTurn, PromptPart, Result, ScholarError};

// =============================================================================
// Fragment streams
// =============================================================================

/// Producer half of a [`FragmentStream`].
pub type FragmentSender = mpsc::Sender<Result<String>>;

/// Lazy, finite, forward-only sequence of text deltas.
///
/// Each fragment is a contiguous addition to the final text. The sequence ends
/// when the producer drops its sender (model finished or transport closed). An
/// `Err` item is terminal: the producer sends nothing after it. A stream cannot
/// be restarted; retrying needs a new gateway call.
#[derive(Debug)]
pub struct FragmentStream {
    rx: mpsc::Receiver<Result<String>>,
}

impl FragmentStream {
    /// Create a connected sender/stream pair with the given buffer capacity.
    pub fn channel(capacity: usize) -> (FragmentSender, FragmentStream) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (tx, FragmentStream { rx })
    }

    /// A stream that yields the given items in order and then ends.
    pub fn from_items(items: Vec<Result<String>>) -> FragmentStream {
        let (tx, stream) = Self::channel(items.len().max(1));
        for item in items {
            // Capacity covers every item, so this cannot fail for lack of room.
            let _ = tx.try_send(item);
        }
        stream
    }

    /// A stream of successful fragments.
    pub fn from_fragments<I, S>(fragments: I) -> FragmentStream
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_items(fragments.into_iter().map(|f| Ok(f.into())).collect())
    }

    /// Wait for the next fragment. `None` once the stream has ended.
    pub async fn next(&mut self) -> Option<Result<String>> {
        self.rx.recv().await
    }

    /// Drain the stream into one string, stopping at the first error.
    pub async fn collect_text(mut self) -> Result<String> {
        let mut text = String::new();
        while let Some(item) = self.next().await {
            text.push_str(&item?);
        }
        Ok(text)
    }
}

// =============================================================================
// Request/response types
// =============================================================================

/// Options for single-shot text generation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateOptions {
    pub system_instruction: Option<String>,
    pub temperature: Option<f32>,
}

impl GenerateOptions {
    pub fn with_system_instruction(instruction: impl Into<String>) -> Self {
        Self {
            system_instruction: Some(instruction.into()),
            temperature: None,
        }
    }
}

/// A chat session: the system instruction plus prior turns to fold into the
/// remote context. Holds no remote state; it is rebuilt for every turn.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionHandle {
    pub id: Uuid,
    pub system_instruction: String,
    pub history: Vec<ModelTurn>,
}

/// A validated image generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub prompt: String,
    pub number_of_images: u8,
}

impl ImageRequest {
    /// Build a request, rejecting a blank prompt or a count outside `1..=max_images`.
    ///
    /// Out-of-range counts are an input error; they are never clamped.
    pub fn new(prompt: impl Into<String>, number_of_images: u32, max_images: u8) -> Result<Self> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(ScholarError::Input("image prompt cannot be empty".to_string()));
        }
        if number_of_images == 0 || number_of_images > u32::from(max_images) {
            return Err(ScholarError::Input(format!(
                "number of images must be between 1 and {}, got {}",
                max_images, number_of_images
            )));
        }
        Ok(Self {
            prompt,
            number_of_images: number_of_images as u8,
        })
    }
}

/// One generated image.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for GeneratedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratedImage")
            .field("media_type", &self.media_type)
            .field("bytes_len", &self.bytes.len())
            .finish()
    }
}

// =============================================================================
// ModelGateway
// =============================================================================

/// The remote generative capability.
///
/// Every operation checks for a credential before any network work and fails
/// fast with [`ScholarError::Configuration`] when it is missing. Transport and
/// model failures surface once as [`ScholarError::Remote`]; nothing is retried.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Single-shot text generation.
    async fn generate(&self, parts: &[PromptPart], options: &GenerateOptions) -> Result<String>;

    /// Single-shot generation constrained to `schema`. Returns the raw text;
    /// the caller validates it.
    async fn generate_structured(
        &self,
        parts: &[PromptPart],
        schema: &serde_json::Value,
    ) -> Result<String>;

    /// Streaming generation without history.
    async fn stream_generate(&self, parts: &[PromptPart]) -> Result<FragmentStream>;

    /// Build a chat session from a system instruction and prior turns.
    fn create_session(
        &self,
        system_instruction: &str,
        prior_history: Vec<ModelTurn>,
    ) -> Result<SessionHandle>;

    /// Stream the reply to `parts` within `session`.
    async fn send_streamed(
        &self,
        session: &SessionHandle,
        parts: &[PromptPart],
    ) -> Result<FragmentStream>;

    /// Generate images from a text prompt.
    async fn generate_images(&self, request: &ImageRequest) -> Result<Vec<GeneratedImage>>;
}

// =============================================================================
// Tests
// =============================================================================
