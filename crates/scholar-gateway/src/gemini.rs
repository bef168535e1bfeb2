//! [`ModelGateway`] over the Gemini REST API.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::Value;
use uuid::Uuid;

use scholar_core::config::{GatewayConfig, ImageConfig};
use scholar_core::{prompt_is_empty, ModelTurn, PromptPart, Result, ScholarError};

use crate::parse;
use crate::request;
use crate::sse::SseDecoder;
use crate::traits::{
    FragmentSender, FragmentStream, GenerateOptions, GeneratedImage, ImageRequest, ModelGateway,
    SessionHandle,
};

/// Gemini-backed model gateway.
///
/// The credential is captured once at construction; a missing credential
/// does not fail construction, it fails every call.
#[derive(Clone)]
pub struct GeminiGateway {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    text_model: String,
    image_model: String,
    stream_buffer: usize,
    max_images: u8,
}

impl std::fmt::Debug for GeminiGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiGateway")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("text_model", &self.text_model)
            .field("image_model", &self.image_model)
            .finish()
    }
}

impl GeminiGateway {
    /// Build a gateway with an explicit credential.
    pub fn new(
        config: &GatewayConfig,
        images: &ImageConfig,
        api_key: Option<String>,
    ) -> Result<Self> {
        // Connect timeout only: a total timeout would cut long streams.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| ScholarError::Configuration(format!("build http client: {}", e)))?;

        let api_key = api_key.filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            tracing::warn!(
                env = %config.api_key_env,
                "No API key configured; model features are unavailable"
            );
        }

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.clone(),
            text_model: config.text_model.clone(),
            image_model: config.image_model.clone(),
            stream_buffer: config.stream_buffer,
            max_images: images.max_images,
        })
    }

    /// Build a gateway reading the credential from `config.api_key_env`.
    pub fn from_env(config: &GatewayConfig, images: &ImageConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).ok();
        Self::new(config, images, api_key)
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    fn credential(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            ScholarError::Configuration(
                "no API key configured for the model gateway".to_string(),
            )
        })
    }

    fn ensure_prompt(parts: &[PromptPart]) -> Result<()> {
        if prompt_is_empty(parts) {
            return Err(ScholarError::Input("prompt cannot be empty".to_string()));
        }
        Ok(())
    }

    /// POST a JSON body and return the response if it succeeded.
    async fn post_json(&self, api_key: &str, url: &str, body: &Value) -> Result<reqwest::Response> {
        let resp = self
            .client
            .post(url)
            .header("x-goog-api-key", api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| ScholarError::Remote(format!("http request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.bytes().await.unwrap_or_default();
            let message = parse::error_message(status.as_u16(), &body);
            tracing::warn!(status = status.as_u16(), url = %url, "Model request failed");
            return Err(ScholarError::Remote(message));
        }
        Ok(resp)
    }

    async fn generate_with(&self, body: Value) -> Result<String> {
        let api_key = self.credential()?;
        let url = request::model_url(&self.base_url, &self.text_model, "generateContent");
        let resp = self.post_json(api_key, &url, &body).await?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ScholarError::Remote(format!("failed reading response body: {}", e)))?;
        let text = parse::parse_generate_response(&bytes)?;
        tracing::debug!(text_len = text.len(), "Model response received");
        Ok(text)
    }

    async fn open_stream(&self, body: Value) -> Result<FragmentStream> {
        let api_key = self.credential()?;
        let url = format!(
            "{}?alt=sse",
            request::model_url(&self.base_url, &self.text_model, "streamGenerateContent")
        );
        let resp = self.post_json(api_key, &url, &body).await?;

        let (tx, stream) = FragmentStream::channel(self.stream_buffer);
        tokio::spawn(pump_sse(resp, tx));
        Ok(stream)
    }
}

/// Read an SSE body and forward fragments in emission order.
///
/// Stops at the first error, or early if the consumer went away.
async fn pump_sse(resp: reqwest::Response, tx: FragmentSender) {
    let mut body = resp.bytes_stream();
    let mut decoder = SseDecoder::new();
    let mut fragments = 0usize;

    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, fragments, "Stream interrupted");
                let _ = tx
                    .send(Err(ScholarError::Remote(format!("stream interrupted: {}", e))))
                    .await;
                return;
            }
        };
        for payload in decoder.push(&chunk) {
            if !forward(&payload, &tx, &mut fragments).await {
                return;
            }
        }
    }
    for payload in decoder.finish() {
        if !forward(&payload, &tx, &mut fragments).await {
            return;
        }
    }
    tracing::debug!(fragments, "Stream completed");
}

async fn forward(payload: &str, tx: &FragmentSender, fragments: &mut usize) -> bool {
    match parse::parse_stream_chunk(payload) {
        Ok(Some(text)) => {
            *fragments += 1;
            tx.send(Ok(text)).await.is_ok()
        }
        Ok(None) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Bad stream chunk");
            let _ = tx.send(Err(e)).await;
            false
        }
    }
}

#[async_trait]
impl ModelGateway for GeminiGateway {
    async fn generate(&self, parts: &[PromptPart], options: &GenerateOptions) -> Result<String> {
        self.credential()?;
        Self::ensure_prompt(parts)?;
        let body = request::build_generate_body(
            &[],
            parts,
            options.system_instruction.as_deref(),
            options.temperature.map(request::temperature_config),
        );
        self.generate_with(body).await
    }

    async fn generate_structured(&self, parts: &[PromptPart], schema: &Value) -> Result<String> {
        self.credential()?;
        Self::ensure_prompt(parts)?;
        let body = request::build_generate_body(
            &[],
            parts,
            None,
            Some(request::structured_config(schema)),
        );
        self.generate_with(body).await
    }

    async fn stream_generate(&self, parts: &[PromptPart]) -> Result<FragmentStream> {
        self.credential()?;
        Self::ensure_prompt(parts)?;
        let body = request::build_generate_body(&[], parts, None, None);
        self.open_stream(body).await
    }

    fn create_session(
        &self,
        system_instruction: &str,
        prior_history: Vec<ModelTurn>,
    ) -> Result<SessionHandle> {
        self.credential()?;
        let handle = SessionHandle {
            id: Uuid::new_v4(),
            system_instruction: system_instruction.to_string(),
            history: prior_history,
        };
        tracing::debug!(
            session_id = %handle.id,
            prior_turns = handle.history.len(),
            "Chat session created"
        );
        Ok(handle)
    }

    async fn send_streamed(
        &self,
        session: &SessionHandle,
        parts: &[PromptPart],
    ) -> Result<FragmentStream> {
        self.credential()?;
        Self::ensure_prompt(parts)?;
        let body = request::build_generate_body(
            &session.history,
            parts,
            Some(&session.system_instruction),
            None,
        );
        tracing::info!(session_id = %session.id, "Streaming chat turn");
        self.open_stream(body).await
    }

    async fn generate_images(&self, req: &ImageRequest) -> Result<Vec<GeneratedImage>> {
        let api_key = self.credential()?;
        // Re-check against this gateway's limit; the request may have been
        // built with a different one.
        if req.number_of_images == 0 || req.number_of_images > self.max_images {
            return Err(ScholarError::Input(format!(
                "number of images must be between 1 and {}, got {}",
                self.max_images, req.number_of_images
            )));
        }
        let url = request::model_url(&self.base_url, &self.image_model, "predict");
        let resp = self
            .post_json(api_key, &url, &request::build_image_body(req))
            .await?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ScholarError::Remote(format!("failed reading response body: {}", e)))?;
        let images = parse::parse_image_predictions(&bytes)?;
        tracing::info!(count = images.len(), "Images generated");
        Ok(images)
    }
}
