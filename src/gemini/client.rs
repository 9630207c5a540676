//! One-shot REST client for the Gemini `generateContent` endpoint.

use std::time::Duration;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::gemini::prompt::{GenerationRequest, MODEL};
use crate::generator::{ReplyBackend, ReplyError};

/// Base URL of the generative-language API.
pub const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Environment variables consulted for the API credential, in order.
pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Gemini backend issuing one HTTPS request per generation.
pub struct GeminiClient {
    agent: ureq::Agent,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl GeminiClient {
    /// Create a client with an explicit API key. An empty key counts as
    /// missing and fails at call time.
    pub fn new(api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        Self {
            agent: ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build(),
            api_key: if api_key.is_empty() {
                None
            } else {
                Some(api_key)
            },
            base_url: API_BASE.to_string(),
            model: MODEL.to_string(),
        }
    }

    /// Create a client from the runtime environment.
    ///
    /// The credential is resolved lazily; a missing variable surfaces as
    /// [`ReplyError::MissingCredential`] on the first call, not here.
    pub fn from_env() -> Self {
        let key = API_KEY_VARS
            .iter()
            .find_map(|var| std::env::var(var).ok())
            .unwrap_or_default();
        Self::new(key)
    }

    /// Override the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the model identifier.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

impl ReplyBackend for GeminiClient {
    fn generate(&self, request: &GenerationRequest) -> Result<String, ReplyError> {
        let api_key = self.api_key.as_deref().ok_or(ReplyError::MissingCredential)?;
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, api_key
        );
        let body = GenerateContentBody {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: &request.system_instruction,
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part {
                    text: &request.user_content,
                }],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
            },
        };

        debug!(
            "generateContent: model={} temperature={}",
            self.model, request.temperature
        );

        let response = match self.agent.post(&url).send_json(&body) {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                let detail = response.into_string().unwrap_or_default();
                warn!("generateContent failed with status {code}: {detail}");
                return Err(ReplyError::classify(&format!("{code} {detail}")));
            }
            Err(err) => {
                warn!("generateContent transport failure: {err}");
                return Err(ReplyError::NetworkFailure);
            }
        };

        let parsed: GenerateContentResponse = response.into_json().map_err(|err| {
            warn!("generateContent returned unparseable body: {err}");
            ReplyError::Unknown
        })?;
        parsed.into_text()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentBody<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct GenerateContentResponse {
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Extract the produced text, mapping safety blocks to an error. An
    /// absent or empty candidate yields an empty string so the generator's
    /// fallback applies.
    fn into_text(self) -> Result<String, ReplyError> {
        if let Some(feedback) = &self.prompt_feedback {
            if feedback.block_reason.is_some() {
                return Err(ReplyError::SafetyBlocked);
            }
        }
        let Some(candidate) = self.candidates.into_iter().next() else {
            return Ok(String::new());
        };
        if candidate.finish_reason.as_deref() == Some("SAFETY") {
            return Err(ReplyError::SafetyBlocked);
        }
        let text = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();
        Ok(text)
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_key_is_missing_credential() {
        let client = GeminiClient::new("");
        let request = GenerationRequest {
            system_instruction: "test".into(),
            user_content: "test".into(),
            temperature: 0.7,
        };
        assert_eq!(
            client.generate(&request).unwrap_err(),
            ReplyError::MissingCredential
        );
    }

    #[test]
    fn request_body_uses_api_field_names() {
        let body = GenerateContentBody {
            system_instruction: Content {
                role: None,
                parts: vec![Part { text: "sys" }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: "hello" }],
            }],
            generation_config: GenerationConfig { temperature: 0.5 },
        };
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "sys");
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["generationConfig"]["temperature"], 0.5);
    }

    #[test]
    fn response_text_is_extracted_from_first_candidate() {
        let parsed: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Hello "},{"text":"there."}]},"finishReason":"STOP"}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.into_text().unwrap(), "Hello there.");
    }

    #[test]
    fn empty_response_yields_empty_text() {
        let parsed: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.into_text().unwrap(), "");
    }

    #[test]
    fn safety_block_is_classified() {
        let blocked: GenerateContentResponse = serde_json::from_str(
            r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#,
        )
        .unwrap();
        assert_eq!(blocked.into_text().unwrap_err(), ReplyError::SafetyBlocked);

        let stopped: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"finishReason":"SAFETY"}]}"#,
        )
        .unwrap();
        assert_eq!(stopped.into_text().unwrap_err(), ReplyError::SafetyBlocked);
    }
}
