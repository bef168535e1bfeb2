//! Model gateway for Scholar.
//!
//! Wraps the hosted generative model behind the [`ModelGateway`] trait:
//! single-shot text, single-shot structured (JSON) output, token streaming,
//! chat sessions folded from caller-held history, and image generation.
//! [`GeminiGateway`] speaks the Gemini REST API over `reqwest`.

pub mod gemini;
pub mod parse;
pub mod request;
pub mod sse;
pub mod traits;

pub use gemini::GeminiGateway;
pub use traits::{
    FragmentSender, FragmentStream, GenerateOptions, GeneratedImage, ImageRequest, ModelGateway,
    SessionHandle,
};
