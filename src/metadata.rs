use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// An image as handed over by the caller: a name, a declared MIME type and the raw bytes.
#[derive(Clone, Debug)]
pub struct ImageSource {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageSource {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Declared MIME type, or the one implied by the sniffed container format
    /// when nothing was declared.
    pub fn effective_mime_type(&self) -> String {
        let declared = self.mime_type.trim();
        if !declared.is_empty() {
            return declared.to_string();
        }
        image::guess_format(&self.bytes)
            .map(|format| format.to_mime_type().to_string())
            .unwrap_or_else(|_| "application/octet-stream".to_string())
    }

    /// `data:<mime>;base64,<payload>` over the original bytes.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.effective_mime_type(),
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    pub file_name: String,
    pub file_size: u64,
    pub file_type: String,
    pub dimensions: Dimensions,
    pub aspect_ratio: String,
}

/// Width over height with two decimals, e.g. `"1.78:1"`.
pub fn aspect_ratio(width: u32, height: u32) -> String {
    format!("{:.2}:1", f64::from(width) / f64::from(height))
}

/// Describe `source` using the decoded `width` and `height`.
///
/// `fileType` is the declared MIME type, or the sniffed one when the caller
/// left it blank. `fileSize` is the length of the original bytes.
pub fn extract_metadata(source: &ImageSource, width: u32, height: u32) -> ImageMetadata {
    ImageMetadata {
        file_name: source.name.clone(),
        file_size: source.bytes.len() as u64,
        file_type: source.effective_mime_type(),
        dimensions: Dimensions { width, height },
        aspect_ratio: aspect_ratio(width, height),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_ratios() {
        assert_eq!(aspect_ratio(1920, 1080), "1.78:1");
        assert_eq!(aspect_ratio(100, 100), "1.00:1");
        assert_eq!(aspect_ratio(1000, 3000), "0.33:1");
    }

    #[test]
    fn declared_mime_wins() {
        let src = ImageSource::new("a.png", " image/webp ", vec![0x89, b'P', b'N', b'G']);
        assert_eq!(src.effective_mime_type(), "image/webp");
    }

    #[test]
    fn blank_mime_falls_back_to_sniffing() {
        let png_magic = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        let src = ImageSource::new("a", "", png_magic);
        assert_eq!(src.effective_mime_type(), "image/png");

        let unknown = ImageSource::new("a", "", b"????????".to_vec());
        assert_eq!(unknown.effective_mime_type(), "application/octet-stream");
    }

    #[test]
    fn data_url() {
        let src = ImageSource::new("a.gif", "image/gif", b"abc".to_vec());
        assert_eq!(src.to_data_url(), "data:image/gif;base64,YWJj");
    }

    #[test]
    fn metadata_fields() {
        let src = ImageSource::new("photo.jpg", "image/jpeg", vec![0; 42]);
        let meta = extract_metadata(&src, 1920, 1080);
        assert_eq!(meta.file_size, 42);
        assert_eq!(meta.file_type, "image/jpeg");
        assert_eq!(meta.dimensions, Dimensions { width: 1920, height: 1080 });
        assert_eq!(meta.aspect_ratio, "1.78:1");
    }
}
