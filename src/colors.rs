use palette::Srgb;
use serde::{Deserialize, Serialize};

use crate::median_cut::{PaletteSize, median_cut};
use crate::pixels::sample_colors;

/// A sample counts toward a palette entry when its RGB distance is below this.
pub const MATCH_DISTANCE: u32 = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RgbTriple {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl From<Srgb<u8>> for RgbTriple {
    fn from(c: Srgb<u8>) -> Self {
        Self {
            r: c.red,
            g: c.green,
            b: c.blue,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaletteEntry {
    pub hex: String,
    pub rgb: RgbTriple,
    /// Share of samples within [`MATCH_DISTANCE`] of this color, 0..=100.
    pub percentage: f64,
}

/// Lowercase `#rrggbb`.
pub fn rgb_to_hex(c: Srgb<u8>) -> String {
    format!("#{:02x}{:02x}{:02x}", c.red, c.green, c.blue)
}

/// Parse `#rrggbb` or `rrggbb`, case-insensitive.
pub fn hex_to_rgb(s: &str) -> Option<Srgb<u8>> {
    let hex = s.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Srgb::new(r, g, b))
}

fn within_match_distance(a: Srgb<u8>, b: Srgb<u8>) -> bool {
    let dr = i32::from(a.red) - i32::from(b.red);
    let dg = i32::from(a.green) - i32::from(b.green);
    let db = i32::from(a.blue) - i32::from(b.blue);
    ((dr * dr + dg * dg + db * db) as u32) < MATCH_DISTANCE * MATCH_DISTANCE
}

/// `part / total` as a percentage rounded half up to two decimals.
fn percent_of(part: u64, total: u64) -> f64 {
    ((part * 20_000 + total) / (2 * total)) as f64 / 100.0
}

/// Score every representative color against all samples and sort by share.
///
/// A sample may be close to several representatives, or to none, so the
/// percentages are independent and do not have to add up to 100.
pub fn summarize_palette(representatives: &[Srgb<u8>], samples: &[Srgb<u8>]) -> Vec<PaletteEntry> {
    if samples.is_empty() {
        return Vec::new();
    }
    let total = samples.len() as u64;

    let mut entries: Vec<PaletteEntry> = representatives
        .iter()
        .map(|&color| {
            let close = samples
                .iter()
                .filter(|&&s| within_match_distance(color, s))
                .count();
            PaletteEntry {
                hex: rgb_to_hex(color),
                rgb: color.into(),
                percentage: percent_of(close as u64, total),
            }
        })
        .collect();

    entries.sort_by(|a, b| b.percentage.total_cmp(&a.percentage));
    entries
}

/// Sample, quantize and summarize in one go.
pub fn extract_palette(raw: &[u8], size: PaletteSize) -> Vec<PaletteEntry> {
    let samples = sample_colors(raw);
    let mut working = samples.clone();
    let representatives = median_cut(&mut working, size);
    log::debug!(
        "palette: {} samples -> {} representatives",
        samples.len(),
        representatives.len()
    );
    summarize_palette(&representatives, &samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_is_lowercase_and_padded() {
        assert_eq!(rgb_to_hex(Srgb::new(255, 0, 10)), "#ff000a");
        assert_eq!(rgb_to_hex(Srgb::new(0, 0, 0)), "#000000");
    }

    #[test]
    fn hex_parsing() {
        assert_eq!(hex_to_rgb("#FF000A"), Some(Srgb::new(255, 0, 10)));
        assert_eq!(hex_to_rgb("00ff00"), Some(Srgb::new(0, 255, 0)));
        assert_eq!(hex_to_rgb("#fff"), None);
        assert_eq!(hex_to_rgb("#gg0000"), None);
        assert_eq!(hex_to_rgb("#ééé"), None);
        assert_eq!(hex_to_rgb("#+1+2+3"), None);
        assert_eq!(hex_to_rgb("-1-2-3"), None);
    }

    #[test]
    fn distance_threshold_is_strict() {
        // 30^2 + 40^2 = 50^2 exactly
        assert!(!within_match_distance(Srgb::new(0, 0, 0), Srgb::new(30, 40, 0)));
        assert!(within_match_distance(Srgb::new(0, 0, 0), Srgb::new(30, 39, 0)));
    }

    #[test]
    fn overlapping_entries_may_exceed_hundred() {
        let reps = [Srgb::new(100, 100, 100), Srgb::new(110, 100, 100)];
        let samples = [Srgb::new(105, 100, 100); 4];
        let entries = summarize_palette(&reps, &samples);
        let sum: f64 = entries.iter().map(|e| e.percentage).sum();
        assert_eq!(sum, 200.0);
    }

    #[test]
    fn entries_sorted_descending() {
        let reps = [Srgb::new(0, 0, 0), Srgb::new(255, 255, 255)];
        let samples = [
            Srgb::new(0, 0, 0),
            Srgb::new(250, 250, 250),
            Srgb::new(255, 255, 255),
        ];
        let entries = summarize_palette(&reps, &samples);
        assert_eq!(entries[0].hex, "#ffffff");
        assert_eq!(entries[0].percentage, 66.67);
        assert_eq!(entries[1].percentage, 33.33);
    }

    #[test]
    fn percentages_round_half_up() {
        assert_eq!(percent_of(1, 8), 12.5);
        assert_eq!(percent_of(1, 3), 33.33);
        assert_eq!(percent_of(2, 3), 66.67);
        assert_eq!(percent_of(1, 20_001), 0.0);
        assert_eq!(percent_of(1, 20_000), 0.01);
    }

    #[test]
    fn no_samples_no_entries() {
        assert!(summarize_palette(&[Srgb::new(1, 1, 1)], &[]).is_empty());
    }
}
