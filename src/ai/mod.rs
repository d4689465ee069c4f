//! Vision-model boundary.
//!
//! Each capability is one `invoke(capability, image) -> raw text` call against a
//! [`VisionModel`]. Turning raw text into the result shape is a separate pure
//! step ([`parse_response`]) that never fails: malformed output falls back to an
//! empty list or a placeholder object.

#[cfg(feature = "remote-ai")]
pub mod gemini;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::AiError;
use crate::metadata::ImageSource;

// ------------------------------------------------------------
// Capabilities and prompts
// ------------------------------------------------------------

/// One question the vision model can be asked about an image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    Ocr,
    Objects,
    UiElements,
    Design,
    Description,
}

const OCR_PROMPT: &str = "\
Extract all visible text from this image. Respond with a JSON array only, one element per \
text block: [{\"text\": string, \"confidence\": number between 0 and 1, \
\"boundingBox\": {\"x\": number, \"y\": number, \"width\": number, \"height\": number}}]. \
Respond with [] if there is no text.";

const OBJECTS_PROMPT: &str = "\
Detect the objects in this image. Respond with a JSON array only: \
[{\"label\": string, \"confidence\": number between 0 and 1, \
\"boundingBox\": {\"x\": number, \"y\": number, \"width\": number, \"height\": number}}].";

const UI_PROMPT: &str = "\
This image may be a screenshot of a user interface. List its UI elements as a JSON array \
only: [{\"type\": string, \"text\": string, \"description\": string, \
\"boundingBox\": {\"x\": number, \"y\": number, \"width\": number, \"height\": number}}]. \
Respond with [] if it is not a user interface.";

const DESIGN_PROMPT: &str = "\
Analyze the visual design of this image. Respond with a JSON object only: \
{\"style\": string, \"colorScheme\": string, \"layout\": string, \"typography\": string, \
\"mood\": string, \"suggestions\": [string]}.";

const DESCRIPTION_PROMPT: &str = "\
Describe this image in two or three plain sentences. Respond with the description only.";

impl Capability {
    pub const ALL: [Capability; 5] = [
        Capability::Ocr,
        Capability::Objects,
        Capability::UiElements,
        Capability::Design,
        Capability::Description,
    ];

    /// Key of this capability in the `ai` block of a result.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ocr => "ocr",
            Self::Objects => "objects",
            Self::UiElements => "uiElements",
            Self::Design => "designAnalysis",
            Self::Description => "description",
        }
    }

    /// Accepts result keys as well as the option flag names.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim() {
            "ocr" | "aiOcr" => Some(Self::Ocr),
            "objects" | "aiObjects" => Some(Self::Objects),
            "uiElements" | "ui" | "aiUI" => Some(Self::UiElements),
            "designAnalysis" | "design" | "aiDesign" => Some(Self::Design),
            "description" => Some(Self::Description),
            _ => None,
        }
    }

    pub fn prompt(self) -> &'static str {
        match self {
            Self::Ocr => OCR_PROMPT,
            Self::Objects => OBJECTS_PROMPT,
            Self::UiElements => UI_PROMPT,
            Self::Design => DESIGN_PROMPT,
            Self::Description => DESCRIPTION_PROMPT,
        }
    }

    fn is_list(self) -> bool {
        matches!(self, Self::Ocr | Self::Objects | Self::UiElements)
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ------------------------------------------------------------
// Model boundary
// ------------------------------------------------------------

/// A model that answers one capability request about one image with free text.
pub trait VisionModel: Send + Sync {
    fn invoke(&self, capability: Capability, image: &ImageSource) -> Result<String, AiError>;
}

/// The `ai` block of a result. Field contents are passed through from the model.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAnnotations {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objects: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ui_elements: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub design_analysis: Option<Value>,
}

impl AiAnnotations {
    /// Store the parsed form of `raw` under the key for `capability`.
    pub fn insert_raw(&mut self, capability: Capability, raw: &str) {
        let value = parse_response(capability, raw);
        match capability {
            Capability::Ocr => self.ocr = Some(into_list(value)),
            Capability::Objects => self.objects = Some(into_list(value)),
            Capability::UiElements => self.ui_elements = Some(into_list(value)),
            Capability::Design => self.design_analysis = Some(value),
            Capability::Description => {
                self.description = Some(match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                })
            }
        }
    }
}

fn into_list(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        _ => Vec::new(),
    }
}

// ------------------------------------------------------------
// Response parsing
// ------------------------------------------------------------

/// Remove a Markdown code fence (```` ``` ```` or ```` ```json ````) around a response.
///
/// Text before the opening fence is dropped. The opening fence may sit on its
/// own line with a language tag, or share a line with the payload
/// (```` ```json [..] ``` ````). Unfenced text comes back trimmed.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(start) = trimmed.find("```") else {
        return trimmed;
    };
    let after_ticks = &trimmed[start + 3..];
    let body = match after_ticks.split_once('\n') {
        Some((first_line, rest)) if is_language_tag(first_line.trim()) => rest,
        _ => skip_json_tag(after_ticks),
    };
    match body.find("```") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}

/// `json`, `JSON`, `c++`, or nothing at all.
fn is_language_tag(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '_'))
}

/// Drop a `json` tag that shares its line with the payload.
fn skip_json_tag(s: &str) -> &str {
    let s = s.trim_start();
    match s.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => {
            let rest = &s[4..];
            if rest.starts_with(|c: char| c.is_whitespace() || c == '[' || c == '{') {
                rest
            } else {
                s
            }
        }
        _ => s,
    }
}

/// Turn raw model text into the JSON value stored for `capability`.
///
/// List capabilities yield an array (empty when the text is not a JSON array, or
/// an object wrapping one). Design analysis yields an object, or a placeholder
/// carrying the raw text. Descriptions yield a string.
///
/// Text that already parses as JSON is used as is, so backticks inside string
/// values survive. Fences are only stripped when that first parse fails.
pub fn parse_response(capability: Capability, raw: &str) -> Value {
    let trimmed = raw.trim();
    let (body, parsed) = match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => (trimmed, Ok(value)),
        Err(_) => {
            let body = strip_code_fence(trimmed);
            (body, serde_json::from_str::<Value>(body))
        }
    };

    match capability {
        Capability::Description => match parsed {
            Ok(Value::String(s)) => Value::String(s.trim().to_string()),
            Ok(Value::Object(map)) => match map.get("description") {
                Some(Value::String(s)) => Value::String(s.trim().to_string()),
                _ => Value::String(body.to_string()),
            },
            _ => Value::String(body.to_string()),
        },
        Capability::Design => match parsed {
            Ok(value @ Value::Object(_)) => value,
            _ => {
                log::warn!("design analysis response is not a JSON object, using placeholder");
                json!({
                    "error": "design analysis could not be parsed",
                    "raw": body,
                })
            }
        },
        cap => {
            debug_assert!(cap.is_list());
            match parsed {
                Ok(value @ Value::Array(_)) => value,
                Ok(Value::Object(mut map)) => match map.remove(cap.as_str()) {
                    Some(value @ Value::Array(_)) => value,
                    _ => {
                        log::warn!("{cap} response object has no `{cap}` array, using []");
                        Value::Array(Vec::new())
                    }
                },
                _ => {
                    log::warn!("{cap} response is not valid JSON, using []");
                    Value::Array(Vec::new())
                }
            }
        }
    }
}

// ------------------------------------------------------------
// Concurrent collection
// ------------------------------------------------------------

/// Invoke every capability concurrently and gather the parsed results.
///
/// All-or-nothing: if any invocation fails, no annotations are returned and the
/// error lists every failed capability.
pub fn collect_annotations(
    model: &dyn VisionModel,
    image: &ImageSource,
    capabilities: &[Capability],
) -> Result<AiAnnotations, String> {
    let responses: Vec<(Capability, Result<String, AiError>)> = std::thread::scope(|scope| {
        let handles: Vec<_> = capabilities
            .iter()
            .map(|&cap| (cap, scope.spawn(move || model.invoke(cap, image))))
            .collect();
        handles
            .into_iter()
            .map(|(cap, handle)| {
                let res = handle
                    .join()
                    .unwrap_or_else(|_| Err(AiError::Http("vision model worker panicked".into())));
                (cap, res)
            })
            .collect()
    });

    let mut annotations = AiAnnotations::default();
    let mut failures = Vec::new();
    for (cap, res) in responses {
        match res {
            Ok(raw) => annotations.insert_raw(cap, &raw),
            Err(e) => {
                log::warn!("vision model failed for {cap}: {e}");
                failures.push(format!("{cap}: {e}"));
            }
        }
    }

    if failures.is_empty() {
        Ok(annotations)
    } else {
        Err(format!("AI analysis failed ({})", failures.join("; ")))
    }
}
