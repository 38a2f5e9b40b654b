/// Output format resolution
///
/// Decides which MIME type a save encodes to and maps it onto one of the
/// encoders the Capture Engine supports.

use crate::error::CaptureError;

/// Used when neither the config nor the source URL names a format
pub const FALLBACK_MIME: &str = "image/jpeg";

/// Encoders supported by the Capture Engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Lossy, honours quality, no alpha channel
    Jpeg,
    /// Lossless
    Png,
    /// Lossless
    WebP,
}

impl OutputFormat {
    /// Map a MIME type onto an encoder. Unknown types fail; there is no
    /// silent substitution of a different format.
    pub fn from_mime(mime: &str) -> Result<Self, CaptureError> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Ok(OutputFormat::Jpeg),
            "image/png" => Ok(OutputFormat::Png),
            "image/webp" => Ok(OutputFormat::WebP),
            _ => Err(CaptureError::encoding(mime, "unsupported output format")),
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::WebP => "image/webp",
        }
    }

    pub fn supports_quality(self) -> bool {
        matches!(self, OutputFormat::Jpeg)
    }
}

/// Resolve the MIME type for a save of `source_url`
///
/// A configured MIME always wins. Otherwise `data:` URLs use their declared
/// type and other URLs are matched on their file extension.
pub fn resolve_output_mime(source_url: &str, preferred: Option<&str>) -> String {
    if let Some(mime) = preferred.filter(|m| !m.trim().is_empty()) {
        return mime.to_string();
    }

    if let Some(rest) = source_url.strip_prefix("data:") {
        let declared = rest.split([';', ',']).next().unwrap_or_default();
        if declared.starts_with("image/") {
            return declared.to_ascii_lowercase();
        }
        return FALLBACK_MIME.to_string();
    }

    // Drop query string and fragment before looking at the extension
    let path = source_url.split(['?', '#']).next().unwrap_or_default();
    let file_name = path.rsplit('/').next().unwrap_or_default();
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => FALLBACK_MIME,
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preferred_mime_wins() {
        assert_eq!(resolve_output_mime("a.png", Some("image/webp")), "image/webp");
        assert_eq!(resolve_output_mime("a.png", Some("  ")), "image/png");
    }

    #[test]
    fn test_extension_lookup() {
        assert_eq!(resolve_output_mime("https://cdn/x/photo.JPEG", None), "image/jpeg");
        assert_eq!(resolve_output_mime("photo.webp?size=large#top", None), "image/webp");
        assert_eq!(resolve_output_mime("/tmp/shot.png", None), "image/png");
        assert_eq!(resolve_output_mime("blob:photo-editor/7", None), FALLBACK_MIME);
        assert_eq!(resolve_output_mime("archive.tar.gz", None), FALLBACK_MIME);
        assert_eq!(resolve_output_mime("", None), FALLBACK_MIME);
    }

    #[test]
    fn test_data_url_mime() {
        assert_eq!(resolve_output_mime("data:image/png;base64,AAAA", None), "image/png");
        assert_eq!(resolve_output_mime("data:text/plain,hi", None), FALLBACK_MIME);
    }

    #[test]
    fn test_format_mapping() {
        assert_eq!(OutputFormat::from_mime("image/jpeg").unwrap(), OutputFormat::Jpeg);
        assert_eq!(OutputFormat::from_mime("IMAGE/PNG").unwrap(), OutputFormat::Png);
        assert_eq!(OutputFormat::from_mime("image/webp").unwrap(), OutputFormat::WebP);
        assert!(OutputFormat::Jpeg.supports_quality());
        assert!(!OutputFormat::Png.supports_quality());

        let err = OutputFormat::from_mime("image/gif").unwrap_err();
        assert!(matches!(err, CaptureError::EncodingFailure { .. }));
    }
}
