use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::ai::{AiAnnotations, VisionModel, collect_annotations};
use crate::colors::{PaletteEntry, extract_palette};
use crate::error::AnalyzeError;
use crate::metadata::{ImageMetadata, ImageSource, extract_metadata};
use crate::options::AnalysisOptions;
use crate::pixels::PixelBuffer;
use crate::statistics::{ImageStatistics, compute_statistics};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorReport {
    pub dominant_colors: Vec<PaletteEntry>,
}

/// Core output. A disabled section is absent from the JSON; statistics that
/// could not be computed (no visible pixels) serialize as `null`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CanvasReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ImageMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colors: Option<ColorReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<Option<ImageStatistics>>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub timestamp: String,
    pub canvas: CanvasReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai: Option<AiAnnotations>,
}

impl AnalysisResult {
    pub fn to_json(&self, pretty: bool) -> Result<String, AnalyzeError> {
        let json = if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        };
        json.map_err(|e| AnalyzeError::Serialize(e.to_string()))
    }
}

/// Merge an externally produced `ai` block into a serialized result.
///
/// The block must have the [`AiAnnotations`] shape; an existing `ai` key is replaced.
pub fn attach_annotations(result_json: &str, annotations_json: &str) -> Result<String, AnalyzeError> {
    let mut result: serde_json::Value = serde_json::from_str(result_json)
        .map_err(|e| AnalyzeError::InvalidAnnotations(format!("result is not JSON: {e}")))?;
    let annotations: AiAnnotations = serde_json::from_str(annotations_json)
        .map_err(|e| AnalyzeError::InvalidAnnotations(format!("malformed AI annotations: {e}")))?;

    let object = result
        .as_object_mut()
        .ok_or_else(|| AnalyzeError::InvalidAnnotations("result is not a JSON object".to_string()))?;
    let ai = serde_json::to_value(annotations).map_err(|e| AnalyzeError::Serialize(e.to_string()))?;
    object.insert("ai".to_string(), ai);

    serde_json::to_string(&result).map_err(|e| AnalyzeError::Serialize(e.to_string()))
}

/// A finished analysis plus the message to show when the vision model failed.
#[derive(Clone, Debug)]
pub struct Analysis {
    pub result: AnalysisResult,
    pub ai_error: Option<String>,
}

/// Run every enabled stage over one image.
///
/// Decoding failures abort the whole analysis. Vision-model failures only drop
/// the `ai` block and are reported through [`Analysis::ai_error`]. AI flags do
/// nothing unless a `model` is supplied.
pub fn analyze(
    source: &ImageSource,
    options: &AnalysisOptions,
    model: Option<&dyn VisionModel>,
) -> Result<Analysis, AnalyzeError> {
    let palette_size = options.palette_size()?;
    let buffer = PixelBuffer::decode(&source.bytes)?;
    log::debug!(
        "decoded {} ({}x{}, {} bytes)",
        source.name,
        buffer.width(),
        buffer.height(),
        source.bytes.len()
    );

    let mut canvas = CanvasReport::default();
    if options.basic_info {
        canvas.metadata = Some(extract_metadata(source, buffer.width(), buffer.height()));
    }
    if options.colors {
        canvas.colors = Some(ColorReport {
            dominant_colors: extract_palette(buffer.as_raw(), palette_size),
        });
    }
    if options.base64 {
        canvas.base64 = Some(source.to_data_url());
    }
    if options.statistics {
        canvas.statistics = Some(compute_statistics(&buffer));
    }

    let capabilities = options.ai_capabilities();
    let (ai, ai_error) = match model {
        Some(model) if !capabilities.is_empty() => {
            match collect_annotations(model, source, &capabilities) {
                Ok(annotations) => (Some(annotations), None),
                Err(message) => (None, Some(message)),
            }
        }
        None if !capabilities.is_empty() => {
            log::debug!("AI options set but no vision model supplied, skipping");
            (None, None)
        }
        _ => (None, None),
    };

    log::info!(
        "analyzed {} ({} AI capabilities{})",
        source.name,
        if ai.is_some() { capabilities.len() } else { 0 },
        if ai_error.is_some() { ", AI failed" } else { "" }
    );

    Ok(Analysis {
        result: AnalysisResult {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            canvas,
            ai,
        },
        ai_error,
    })
}
