//! Reply generation on top of a pluggable text backend.
//!
//! The generator is pure given `(config, message)`: it builds a prompt,
//! issues exactly one backend call, and either returns the produced text or a
//! classified [`ReplyError`]. There is no retry and no backoff.

use std::sync::Arc;

use log::warn;
use thiserror::Error;

use crate::config::GeneratorConfig;
use crate::gemini::prompt::{self, GenerationRequest};

/// Returned when the backend produces an empty default-template reply.
pub const DEFAULT_REPLY_FALLBACK: &str = "Hello,\nThank you for your message. We have received it successfully.\n\nOur working hours are 10:00 AM to 6:00 PM (Monday to Friday).\nWe will get back to you as soon as possible during working hours.\n\nThank you for your patience.";

/// Returned when the backend produces an empty dynamic reply.
pub const DYNAMIC_REPLY_FALLBACK: &str =
    "Hello, thank you for reaching out. We have received your message and will respond shortly.";

/// Classified generation failure.
///
/// The display strings are the exact user-facing messages surfaced by the
/// product; callers show them verbatim.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReplyError {
    #[error("The AI service key is missing. Please configure your API key.")]
    MissingCredential,
    #[error("The AI service key is invalid. Please check your configuration.")]
    InvalidCredential,
    #[error("The AI is currently receiving too many requests. Please wait a moment and try again.")]
    RateLimited,
    #[error("The AI declined to answer this message due to safety filters.")]
    SafetyBlocked,
    #[error("Could not reach the AI service. Please check your connection and try again.")]
    NetworkFailure,
    #[error("An unexpected error occurred. Please try again.")]
    Unknown,
}

impl ReplyError {
    /// Classify a raw backend error message by substring.
    ///
    /// A missing credential is never classified from text; it is detected
    /// before a request is built.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("api key not valid")
            || lower.contains("invalid api key")
            || lower.contains("api_key_invalid")
        {
            ReplyError::InvalidCredential
        } else if lower.contains("quota") || lower.contains("429") || lower.contains("rate limit") {
            ReplyError::RateLimited
        } else if lower.contains("safety") {
            ReplyError::SafetyBlocked
        } else if lower.contains("network")
            || lower.contains("fetch")
            || lower.contains("connection")
            || lower.contains("timed out")
            || lower.contains("dns")
        {
            ReplyError::NetworkFailure
        } else {
            ReplyError::Unknown
        }
    }
}

/// Seam between the generator and the generative-text service.
///
/// Implementations return the produced text verbatim; an empty string is a
/// valid result and triggers the caller's fallback.
pub trait ReplyBackend: Send + Sync {
    fn generate(&self, request: &GenerationRequest) -> Result<String, ReplyError>;
}

/// High-level reply generator bound to a backend.
#[derive(Clone)]
pub struct ReplyGenerator {
    backend: Arc<dyn ReplyBackend>,
}

impl ReplyGenerator {
    pub fn new(backend: Arc<dyn ReplyBackend>) -> Self {
        Self { backend }
    }

    /// Generate the standing auto-reply template for the business profile.
    ///
    /// Returns non-empty text, or a classified error for the caller to
    /// surface. An empty backend result yields [`DEFAULT_REPLY_FALLBACK`].
    pub fn generate_default_reply(&self, config: &GeneratorConfig) -> Result<String, ReplyError> {
        let request = prompt::default_reply_request(config);
        let text = self.backend.generate(&request)?;
        if text.trim().is_empty() {
            return Ok(DEFAULT_REPLY_FALLBACK.to_string());
        }
        Ok(text)
    }

    /// Generate a reply addressing a specific incoming message.
    ///
    /// Never fails: on error the classified user-facing string is returned in
    /// place of reply text, so the activity log always resolves.
    pub fn generate_reply_to(&self, incoming: &str, config: &GeneratorConfig) -> String {
        let request = prompt::dynamic_reply_request(incoming, config);
        match self.backend.generate(&request) {
            Ok(text) if text.trim().is_empty() => DYNAMIC_REPLY_FALLBACK.to_string(),
            Ok(text) => text,
            Err(err) => {
                warn!("dynamic reply generation failed: {err}");
                err.to_string()
            }
        }
    }
}
