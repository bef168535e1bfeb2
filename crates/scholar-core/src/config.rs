use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, ScholarError};

/// Top-level configuration for Scholar.
///
/// Loaded from `~/.scholar/config.toml` by default. Every section falls back
/// to its defaults when missing, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScholarConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default)]
    pub images: ImageConfig,
}

impl ScholarConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ScholarConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration, falling back to defaults if the file is missing or invalid.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Reject values that would make a feature unusable.
    pub fn validate(&self) -> Result<()> {
        if self.gateway.text_model.trim().is_empty() {
            return Err(ScholarError::Configuration(
                "gateway.text_model must not be empty".to_string(),
            ));
        }
        if self.gateway.stream_buffer == 0 {
            return Err(ScholarError::Configuration(
                "gateway.stream_buffer must be at least 1".to_string(),
            ));
        }
        if self.images.max_images == 0 {
            return Err(ScholarError::Configuration(
                "images.max_images must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Model gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Environment variable holding the API key. Read once at startup.
    pub api_key_env: String,
    /// Base URL of the generative language API.
    pub base_url: String,
    /// Model used for text, structured and streaming calls.
    pub text_model: String,
    /// Model used for image generation.
    pub image_model: String,
    /// Connect timeout in seconds. Streams themselves are never cut locally.
    pub connect_timeout_secs: u64,
    /// Capacity of the fragment channel between the HTTP reader and the consumer.
    pub stream_buffer: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_key_env: "GEMINI_API_KEY".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            text_model: "gemini-2.5-flash".to_string(),
            image_model: "imagen-3.0-generate-002".to_string(),
            connect_timeout_secs: 10,
            stream_buffer: 64,
        }
    }
}

/// Chat panel settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Maximum accepted message length in characters.
    pub max_message_length: usize,
    /// Base system instruction for chat sessions.
    pub system_instruction: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_message_length: 8_000,
            system_instruction: "You are a friendly, patient study assistant. Explain concepts \
                                 clearly, use examples, and format answers in Markdown."
                .to_string(),
        }
    }
}

/// Speech input/output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// BCP-47 language tag for recognition and synthesis.
    pub language: String,
    /// Restart recognition after engine-level stops while still listening.
    pub auto_restart: bool,
    /// Upper bound on automatic restarts within one minute before giving up.
    pub max_restarts_per_minute: u32,
    /// Synthesis speaking rate (1.0 is normal).
    pub rate: f32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            language: "en-US".to_string(),
            auto_restart: true,
            max_restarts_per_minute: 30,
            rate: 1.0,
        }
    }
}

/// Image generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Largest accepted number of images per request. Larger requests are rejected.
    pub max_images: u8,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self { max_images: 4 }
    }
}

// =============================================================================
// Tests
// =============================================================================
