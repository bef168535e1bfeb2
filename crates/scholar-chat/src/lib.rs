//! Chat and structured-output flows for Scholar panels.
//!
//! Assembles model context from a caller-owned history, streams replies into
//! the in-progress turn, and validates schema-constrained JSON responses.

pub mod error;
pub mod history;
pub mod orchestrator;
pub mod schema;
pub mod stream;
pub mod structured;
pub mod tasks;

pub use error::ChatError;
pub use history::{SessionBuilder, SessionInput};
pub use orchestrator::{ChatOrchestrator, SendRequest};
pub use schema::{DebugAnalysis, ProjectIdea, QuizQuestion, SkillFeedback, WebsiteCode};
pub use stream::{LiveTurn, StreamingConsumer};
pub use structured::{StructuredResult, StructuredShape, StructuredValidator};
