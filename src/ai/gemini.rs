use std::time::Duration;

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use super::{Capability, VisionModel};
use crate::error::AiError;
use crate::metadata::ImageSource;

/// Where and how long to talk to the vision endpoint.
#[derive(Clone, Debug)]
pub struct GeminiConfig {
    /// API root without the `/models/...` suffix. A trailing slash is ignored.
    pub base_url: String,
    /// Model name placed in the request path.
    pub model: String,
    /// Whole-request timeout, in seconds.
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-1.5-flash".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Blocking client for a `generateContent` vision endpoint.
pub struct GeminiClient {
    config: GeminiConfig,
    api_key: String,
    client: reqwest::blocking::Client,
}

impl GeminiClient {
    /// The key is supplied by the caller; it is never read from the environment.
    pub fn new(api_key: &str, config: GeminiConfig) -> Result<Self, AiError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(AiError::MissingCredential);
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AiError::Http(e.to_string()))?;
        Ok(Self {
            config: GeminiConfig {
                base_url: config.base_url.trim_end_matches('/').to_string(),
                ..config
            },
            api_key: api_key.to_string(),
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url, self.config.model
        )
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 2],
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    Image { inline_data: InlineData<'a> },
}

#[derive(Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl VisionModel for GeminiClient {
    fn invoke(&self, capability: Capability, image: &ImageSource) -> Result<String, AiError> {
        let start = std::time::Instant::now();
        let mime_type = image.effective_mime_type();
        let body = GenerateRequest {
            contents: [Content {
                parts: [
                    Part::Text {
                        text: capability.prompt(),
                    },
                    Part::Image {
                        inline_data: InlineData {
                            mime_type: &mime_type,
                            data: base64::engine::general_purpose::STANDARD.encode(&image.bytes),
                        },
                    },
                ],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    AiError::Connection(self.config.base_url.clone())
                } else if e.is_timeout() {
                    AiError::Timeout(self.config.timeout_secs)
                } else {
                    AiError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(AiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| AiError::Http(format!("unreadable response body: {e}")))?;

        let text = response_text(parsed)?;
        log::debug!(
            "vision model {} answered {capability} in {} ms ({} chars)",
            self.config.model,
            start.elapsed().as_millis(),
            text.len()
        );
        Ok(text)
    }
}

/// Concatenated text parts of the first candidate.
///
/// A reply with no candidate, no content, or only whitespace is an
/// [`AiError::EmptyResponse`].
fn response_text(response: GenerateResponse) -> Result<String, AiError> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<String>())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(AiError::EmptyResponse);
    }
    Ok(text)
}
