use image::GenericImageView;
use palette::Srgb;

use crate::error::AnalyzeError;

/// Pixels with alpha below this are treated as not visually present.
pub const ALPHA_THRESHOLD: u8 = 128;

/// Only every `SAMPLE_STRIDE`-th pixel is considered for palette estimation.
pub const SAMPLE_STRIDE: usize = 10;

/// Decoded interleaved RGBA8 pixels with their dimensions.
#[derive(Clone, Debug)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    raw: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap an already decoded RGBA8 buffer. `raw.len()` must equal `4 * width * height`.
    pub fn from_rgba(width: u32, height: u32, raw: Vec<u8>) -> Result<Self, AnalyzeError> {
        if width == 0 || height == 0 {
            return Err(AnalyzeError::EmptyImage);
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(4))
            .ok_or_else(|| AnalyzeError::Decode("image dimensions overflow".to_string()))?;
        if raw.len() != expected {
            return Err(AnalyzeError::Decode(format!(
                "pixel buffer length {} does not match dimensions {width}x{height}",
                raw.len()
            )));
        }
        Ok(Self { width, height, raw })
    }

    /// Decode any format the `image` crate understands into RGBA8.
    pub fn decode(bytes: &[u8]) -> Result<Self, AnalyzeError> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| AnalyzeError::Decode(e.to_string()))?;
        let (width, height) = img.dimensions();
        Self::from_rgba(width, height, img.to_rgba8().into_raw())
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Interleaved RGBA bytes, row-major, four per pixel.
    pub fn as_raw(&self) -> &[u8] {
        &self.raw
    }

    /// Iterate over pixels with alpha at or above [`ALPHA_THRESHOLD`].
    pub fn visible_pixels(&self) -> impl Iterator<Item = &[u8]> {
        self.raw
            .chunks_exact(4)
            .filter(|px| px[3] >= ALPHA_THRESHOLD)
    }
}

/// Take every tenth pixel of the buffer, skipping those below the alpha threshold.
pub fn sample_colors(raw: &[u8]) -> Vec<Srgb<u8>> {
    raw.chunks_exact(4)
        .step_by(SAMPLE_STRIDE)
        .filter(|px| px[3] >= ALPHA_THRESHOLD)
        .map(|px| Srgb::new(px[0], px[1], px[2]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(n: usize, px: [u8; 4]) -> Vec<u8> {
        px.iter().copied().cycle().take(n * 4).collect()
    }

    #[test]
    fn samples_every_tenth_pixel() {
        let mut raw = Vec::new();
        for i in 0..25u8 {
            raw.extend_from_slice(&[i, 0, 0, 255]);
        }
        let samples = sample_colors(&raw);
        let reds: Vec<u8> = samples.iter().map(|c| c.red).collect();
        assert_eq!(reds, vec![0, 10, 20]);
    }

    #[test]
    fn skips_translucent_pixels() {
        let mut raw = solid(20, [9, 9, 9, 255]);
        raw[3] = 127;
        let samples = sample_colors(&raw);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0], Srgb::new(9, 9, 9));
    }

    #[test]
    fn empty_buffer_yields_no_samples() {
        assert!(sample_colors(&[]).is_empty());
    }

    #[test]
    fn rejects_mismatched_length() {
        let err = PixelBuffer::from_rgba(2, 2, vec![0; 12]).unwrap_err();
        assert!(matches!(err, AnalyzeError::Decode(_)));
    }

    #[test]
    fn rejects_zero_dimensions() {
        let err = PixelBuffer::from_rgba(0, 5, Vec::new()).unwrap_err();
        assert!(matches!(err, AnalyzeError::EmptyImage));
    }

    #[test]
    fn decode_reports_garbage() {
        let err = PixelBuffer::decode(b"definitely not an image").unwrap_err();
        assert!(matches!(err, AnalyzeError::Decode(_)));
    }

    #[test]
    fn visible_pixels_respects_threshold() {
        let mut raw = solid(4, [1, 2, 3, 128]);
        raw[7] = 0;
        let buffer = PixelBuffer::from_rgba(2, 2, raw).unwrap();
        assert_eq!(buffer.visible_pixels().count(), 3);
    }
}
