use serde::{Deserialize, Serialize};

use crate::ai::Capability;
use crate::error::AnalyzeError;
use crate::median_cut::PaletteSize;

/// Which parts of the analysis to produce.
///
/// Deserializes from the same flag names the browser form uses; missing
/// fields take their defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisOptions {
    pub basic_info: bool,
    pub colors: bool,
    pub base64: bool,
    pub statistics: bool,
    pub ai_ocr: bool,
    pub ai_objects: bool,
    #[serde(rename = "aiUI")]
    pub ai_ui: bool,
    pub ai_design: bool,
    pub palette_size: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            basic_info: true,
            colors: true,
            base64: false,
            statistics: true,
            ai_ocr: false,
            ai_objects: false,
            ai_ui: false,
            ai_design: false,
            palette_size: PaletteSize::default().colors(),
        }
    }
}

impl AnalysisOptions {
    pub fn from_json(json: &str) -> Result<Self, AnalyzeError> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(json).map_err(|e| AnalyzeError::InvalidOptions(e.to_string()))
    }

    pub fn palette_size(&self) -> Result<PaletteSize, AnalyzeError> {
        PaletteSize::new(self.palette_size)
    }

    /// Capabilities to request from a vision model, in output order.
    ///
    /// A caption is requested alongside any other capability.
    pub fn ai_capabilities(&self) -> Vec<Capability> {
        let mut caps: Vec<Capability> = [
            (self.ai_ocr, Capability::Ocr),
            (self.ai_objects, Capability::Objects),
            (self.ai_ui, Capability::UiElements),
            (self.ai_design, Capability::Design),
        ]
        .into_iter()
        .filter_map(|(on, cap)| on.then_some(cap))
        .collect();

        if !caps.is_empty() {
            caps.push(Capability::Description);
        }
        caps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_form_flags() {
        let opts = AnalysisOptions::from_json(
            r#"{"basicInfo":false,"colors":true,"base64":true,"aiUI":true,"paletteSize":16}"#,
        )
        .unwrap();
        assert!(!opts.basic_info);
        assert!(opts.base64);
        assert!(opts.ai_ui);
        assert!(opts.statistics);
        assert_eq!(opts.palette_size().unwrap().colors(), 16);
    }

    #[test]
    fn empty_json_is_default() {
        assert_eq!(AnalysisOptions::from_json("  ").unwrap(), AnalysisOptions::default());
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(matches!(
            AnalysisOptions::from_json("{colors: yes}"),
            Err(AnalyzeError::InvalidOptions(_))
        ));
    }

    #[test]
    fn description_rides_along() {
        let mut opts = AnalysisOptions::default();
        assert!(opts.ai_capabilities().is_empty());
        opts.ai_design = true;
        opts.ai_ocr = true;
        assert_eq!(
            opts.ai_capabilities(),
            vec![Capability::Ocr, Capability::Design, Capability::Description]
        );
    }
}
