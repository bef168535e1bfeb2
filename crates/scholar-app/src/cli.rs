//! CLI argument definitions for the Scholar terminal.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use scholar_core::ScholarConfig;

/// Scholar: a study assistant on top of a hosted generative model.
#[derive(Parser, Debug)]
#[command(name = "scholar", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// One-off question, answered in a single response.
    Ask { prompt: String },

    /// Interactive chat with streamed answers.
    Chat {
        /// Plain-text notes the answers should be based on.
        #[arg(long)]
        notes: Option<PathBuf>,
        /// File sent along with the first message (image, PDF, ...).
        #[arg(long)]
        attach: Option<PathBuf>,
    },

    /// Multiple-choice quiz on a topic.
    Quiz {
        topic: String,
        #[arg(short = 'n', long, default_value_t = 5)]
        count: u32,
    },

    /// Feedback and a badge for progress on a skill.
    Feedback {
        skill: String,
        #[arg(long)]
        goal: String,
        #[arg(long)]
        progress: String,
    },

    /// Project ideas for a domain.
    Ideas {
        domain: String,
        #[arg(long, default_value = "beginner")]
        level: String,
    },

    /// Analyze a source file and suggest a fix.
    Debug {
        file: PathBuf,
        /// Error message the code produces.
        #[arg(long)]
        error: Option<String>,
    },

    /// Generate a single-page website.
    Website {
        description: String,
        /// Write the page here instead of printing it.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Generate images from a prompt.
    Images {
        prompt: String,
        #[arg(short = 'n', long, default_value_t = 1)]
        count: u32,
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > SCHOLAR_CONFIG env var > ~/.scholar/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("SCHOLAR_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".scholar").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".scholar").join("config.toml");
    }
    PathBuf::from("config.toml")
}

/// Load the configuration without logging.
///
/// Tracing is not installed yet when this runs, so a problem with an existing
/// file is handed back for the caller to report. A missing file is not a
/// problem: defaults apply.
pub fn load_config(path: &Path) -> (ScholarConfig, Option<String>) {
    if !path.exists() {
        return (ScholarConfig::default(), None);
    }
    match ScholarConfig::load(path) {
        Ok(config) => (config, None),
        Err(e) => (ScholarConfig::default(), Some(e.to_string())),
    }
}

/// Media type for an attached file, from its extension.
pub fn media_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        Some("md") => "text/markdown",
        _ => "application/octet-stream",
    }
}

/// File extension for a generated image's media type.
pub fn extension_for(media_type: &str) -> &'static str {
    match media_type {
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        _ => "png",
    }
}
