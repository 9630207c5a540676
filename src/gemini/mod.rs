//! Gemini generative-language backend.
//!
//! - `prompt` - system-instruction construction and generation parameters
//! - `client` - one-shot REST client implementing [`crate::ReplyBackend`]

pub mod client;
pub mod prompt;

pub use client::GeminiClient;
pub use prompt::{GenerationRequest, DEFAULT_TEMPERATURE, DYNAMIC_TEMPERATURE, MODEL};
