use wasm_bindgen::prelude::*;
use js_sys::JSON;

pub mod ai;
pub mod analysis;
pub mod colors;
pub mod error;
pub mod median_cut;
pub mod metadata;
pub mod options;
pub mod pixels;
pub mod statistics;

pub use ai::{AiAnnotations, Capability, VisionModel};
pub use analysis::{Analysis, AnalysisResult, CanvasReport, analyze, attach_annotations};
pub use colors::{PaletteEntry, RgbTriple, extract_palette, hex_to_rgb, rgb_to_hex};
pub use error::{AiError, AnalyzeError};
pub use median_cut::PaletteSize;
pub use metadata::{ImageMetadata, ImageSource};
pub use options::AnalysisOptions;
pub use pixels::PixelBuffer;
pub use statistics::{ImageStatistics, compute_statistics};

// ------------------------------------------------------------
// JS interop helpers
// ------------------------------------------------------------

fn js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn js_stringify(value: &JsValue) -> Result<String, JsValue> {
    JSON::stringify(value).map(String::from)
}

// ------------------------------------------------------------
// Core analysis exports
// ------------------------------------------------------------

/// Analyze an image in the browser.
///
/// `options` is a plain object with the form flags (`basicInfo`, `colors`, `base64`,
/// `statistics`, `aiOcr`, `aiObjects`, `aiUI`, `aiDesign`, `paletteSize`); missing
/// flags take their defaults. AI flags are ignored here: the page calls the vision
/// model itself and merges the block with [`attach_ai_annotations`].
///
/// The returned object is the JSON result (`timestamp`, `canvas`).
#[wasm_bindgen]
pub fn analyze_image(
    input: Vec<u8>,
    file_name: String,
    mime_type: String,
    options: JsValue,
) -> Result<JsValue, JsValue> {
    let options = if options.is_undefined() || options.is_null() {
        AnalysisOptions::default()
    } else {
        AnalysisOptions::from_json(&js_stringify(&options)?).map_err(js_error)?
    };

    let source = ImageSource::new(file_name, mime_type, input);
    let analysis = analyze(&source, &options, None).map_err(js_error)?;
    let json = analysis.result.to_json(false).map_err(js_error)?;
    JSON::parse(&json)
}

/// Dominant colors only, as an array of `{hex, rgb, percentage}`.
#[wasm_bindgen]
pub fn extract_dominant_colors(input: Vec<u8>, n_colors: usize) -> Result<JsValue, JsValue> {
    let size = PaletteSize::new(n_colors).map_err(js_error)?;
    let buffer = PixelBuffer::decode(&input).map_err(js_error)?;
    let entries = extract_palette(buffer.as_raw(), size);
    let json = serde_json::to_string(&entries).map_err(js_error)?;
    JSON::parse(&json)
}

// ------------------------------------------------------------
// Vision-model helpers
// ------------------------------------------------------------

/// Prompt text for one capability (`ocr`, `objects`, `uiElements`, `designAnalysis`,
/// `description`, or the matching option flag name).
#[wasm_bindgen]
pub fn ai_prompt(capability: &str) -> Result<String, JsValue> {
    Capability::parse(capability)
        .map(|cap| cap.prompt().to_string())
        .ok_or_else(|| JsValue::from_str(&format!("Unknown AI capability: {capability}")))
}

/// Parse raw model output for one capability, falling back to `[]` or a
/// placeholder object when the text is not the expected JSON.
#[wasm_bindgen]
pub fn parse_ai_response(capability: &str, raw: &str) -> Result<JsValue, JsValue> {
    let cap = Capability::parse(capability)
        .ok_or_else(|| JsValue::from_str(&format!("Unknown AI capability: {capability}")))?;
    let value = ai::parse_response(cap, raw);
    JSON::parse(&value.to_string())
}

/// Return a copy of `result` with `ai` set to `annotations`.
#[wasm_bindgen]
pub fn attach_ai_annotations(result: JsValue, annotations: JsValue) -> Result<JsValue, JsValue> {
    let merged = attach_annotations(&js_stringify(&result)?, &js_stringify(&annotations)?)
        .map_err(js_error)?;
    JSON::parse(&merged)
}
