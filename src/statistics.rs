use serde::{Deserialize, Serialize};

use crate::pixels::PixelBuffer;

/// Per-channel luma weights scaled by 1000, so brightness sums stay exact.
const LUMA_WEIGHTS_MILLI: [u64; 3] = [299, 587, 114];

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColorDistribution {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageStatistics {
    pub average_brightness: f64,
    /// Population standard deviation of per-pixel brightness.
    pub average_contrast: f64,
    pub color_distribution: ColorDistribution,
}

/// Round half away from zero to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Milli-units to units at two decimals. A single division before rounding
/// keeps exact halves such as 1005 exact.
fn round2_milli(value: f64) -> f64 {
    (value / 10.0).round() / 100.0
}

#[inline(always)]
fn brightness_milli(px: &[u8]) -> u64 {
    LUMA_WEIGHTS_MILLI[0] * u64::from(px[0])
        + LUMA_WEIGHTS_MILLI[1] * u64::from(px[1])
        + LUMA_WEIGHTS_MILLI[2] * u64::from(px[2])
}

/// Brightness, contrast and channel averages over every visible pixel.
///
/// Returns `None` when no pixel passes the alpha threshold.
pub fn compute_statistics(buffer: &PixelBuffer) -> Option<ImageStatistics> {
    let mut count = 0u64;
    let mut brightness_sum = 0u64;
    let mut channel_sum = [0u64; 3];

    for px in buffer.visible_pixels() {
        count += 1;
        brightness_sum += brightness_milli(px);
        channel_sum[0] += u64::from(px[0]);
        channel_sum[1] += u64::from(px[1]);
        channel_sum[2] += u64::from(px[2]);
    }

    if count == 0 {
        log::warn!("statistics: no visible pixels, nothing to compute");
        return None;
    }

    let n = count as f64;
    let mean_milli = brightness_sum as f64 / n;

    let squared_dev: f64 = buffer
        .visible_pixels()
        .map(|px| {
            let d = brightness_milli(px) as f64 - mean_milli;
            d * d
        })
        .sum();
    let contrast_milli = (squared_dev / n).sqrt();

    Some(ImageStatistics {
        average_brightness: round2_milli(mean_milli),
        average_contrast: round2_milli(contrast_milli),
        color_distribution: ColorDistribution {
            red: round2(channel_sum[0] as f64 / n),
            green: round2(channel_sum[1] as f64 / n),
            blue: round2(channel_sum[2] as f64 / n),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(w: u32, h: u32, pixels: &[[u8; 4]]) -> PixelBuffer {
        PixelBuffer::from_rgba(w, h, pixels.concat()).unwrap()
    }

    #[test]
    fn uniform_red() {
        let stats = compute_statistics(&buffer(2, 2, &[[255, 0, 0, 255]; 4])).unwrap();
        assert_eq!(stats.average_brightness, 76.25);
        assert_eq!(stats.average_contrast, 0.0);
        assert_eq!(
            stats.color_distribution,
            ColorDistribution {
                red: 255.0,
                green: 0.0,
                blue: 0.0
            }
        );
    }

    #[test]
    fn black_and_white_contrast() {
        let stats = compute_statistics(&buffer(
            2,
            1,
            &[[0, 0, 0, 255], [255, 255, 255, 255]],
        ))
        .unwrap();
        assert_eq!(stats.average_brightness, 127.5);
        assert_eq!(stats.average_contrast, 127.5);
        assert_eq!(stats.color_distribution.green, 127.5);
    }

    #[test]
    fn transparent_pixels_ignored() {
        let stats = compute_statistics(&buffer(
            2,
            1,
            &[[0, 0, 0, 10], [0, 0, 255, 200]],
        ))
        .unwrap();
        assert_eq!(stats.average_brightness, 29.07);
        assert_eq!(stats.average_contrast, 0.0);
        assert_eq!(stats.color_distribution.blue, 255.0);
    }

    #[test]
    fn fully_transparent_is_none() {
        assert!(compute_statistics(&buffer(2, 2, &[[200, 10, 10, 0]; 4])).is_none());
    }

    #[test]
    fn rounding() {
        assert_eq!(round2(66.666), 66.67);
        assert_eq!(round2(0.004), 0.0);
        assert_eq!(round2_milli(76_245.0), 76.25);
        assert_eq!(round2_milli(1_005.0), 1.01);
    }
}
