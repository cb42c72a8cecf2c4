//! Image references: remote URLs or inline base64 data URLs

use crate::{Error, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::fmt;

/// MIME type used when nothing better is known
pub const FALLBACK_MIME: &str = "image/png";

/// An image as the poster stores it.
#[derive(Clone, PartialEq, Eq)]
pub enum ImageRef {
    /// An http(s) URL resolved at render time
    Remote(String),
    /// Bytes carried inline, tagged with their MIME type
    Inline { mime_type: String, data: Vec<u8> },
}

impl ImageRef {
    /// Parse a stored reference string.
    pub fn parse(reference: &str) -> Result<Self> {
        let reference = reference.trim();
        if let Some(rest) = reference.strip_prefix("data:") {
            let (header, payload) = rest
                .split_once(',')
                .ok_or_else(|| Error::InvalidImageReference("data URL without payload".into()))?;
            let mut params = header.split(';');
            let mime = params.next().unwrap_or_default();
            if !params.any(|p| p.eq_ignore_ascii_case("base64")) {
                return Err(Error::InvalidImageReference(
                    "only base64 data URLs are supported".into(),
                ));
            }
            let data = BASE64
                .decode(payload.trim())
                .map_err(|e| Error::InvalidImageReference(format!("bad base64 payload: {}", e)))?;
            let mime_type = if mime.is_empty() { FALLBACK_MIME } else { mime };
            return Ok(ImageRef::Inline {
                mime_type: mime_type.to_string(),
                data,
            });
        }

        if is_remote_url(reference) {
            Ok(ImageRef::Remote(reference.to_string()))
        } else {
            Err(Error::InvalidImageReference(truncate(reference, 80)))
        }
    }

    /// Inline reference with a sniffed MIME type
    pub fn from_bytes(data: Vec<u8>) -> Self {
        let mime_type = sniff_mime(&data).to_string();
        ImageRef::Inline { mime_type, data }
    }

    pub fn inline_png(data: Vec<u8>) -> Self {
        ImageRef::Inline {
            mime_type: "image/png".to_string(),
            data,
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, ImageRef::Inline { .. })
    }

    /// The string form stored in a `PosterRecord`
    pub fn to_reference_string(&self) -> String {
        match self {
            ImageRef::Remote(url) => url.clone(),
            ImageRef::Inline { mime_type, data } => {
                format!("data:{};base64,{}", mime_type, BASE64.encode(data))
            }
        }
    }

    /// Base64 payload of an inline image
    pub fn base64_payload(&self) -> Option<String> {
        match self {
            ImageRef::Inline { data, .. } => Some(BASE64.encode(data)),
            ImageRef::Remote(_) => None,
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_reference_string())
    }
}

// Inline payloads can be megabytes; keep Debug short.
impl fmt::Debug for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageRef::Remote(url) => f.debug_tuple("Remote").field(url).finish(),
            ImageRef::Inline { mime_type, data } => f
                .debug_struct("Inline")
                .field("mime_type", mime_type)
                .field("len", &data.len())
                .finish(),
        }
    }
}

#[cfg(feature = "gemini")]
fn is_remote_url(s: &str) -> bool {
    url::Url::parse(s)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
        .unwrap_or(false)
}

#[cfg(not(feature = "gemini"))]
fn is_remote_url(s: &str) -> bool {
    let lower = s.to_ascii_lowercase();
    (lower.starts_with("http://") || lower.starts_with("https://")) && s.len() > "https://".len()
}

/// Guess the MIME type of image bytes, falling back to `image/png`
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .map(|f| f.to_mime_type())
        .unwrap_or(FALLBACK_MIME)
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_SIG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[test]
    fn parses_data_url() {
        let r = ImageRef::parse("data:image/jpeg;base64,AAEC").unwrap();
        assert_eq!(
            r,
            ImageRef::Inline {
                mime_type: "image/jpeg".into(),
                data: vec![0, 1, 2]
            }
        );
        assert_eq!(r.to_reference_string(), "data:image/jpeg;base64,AAEC");
    }

    #[test]
    fn parses_remote_url() {
        let r = ImageRef::parse("https://example.com/a.png").unwrap();
        assert_eq!(r, ImageRef::Remote("https://example.com/a.png".into()));
        assert!(!r.is_inline());
    }

    #[test]
    fn rejects_non_base64_and_garbage() {
        assert!(matches!(
            ImageRef::parse("data:text/plain,hello"),
            Err(Error::InvalidImageReference(_))
        ));
        assert!(ImageRef::parse("data:image/png;base64,***").is_err());
        assert!(ImageRef::parse("ftp://host/file.png").is_err());
        assert!(ImageRef::parse("").is_err());
    }

    #[test]
    fn missing_mime_falls_back_to_png() {
        let r = ImageRef::parse("data:;base64,AAEC").unwrap();
        match r {
            ImageRef::Inline { mime_type, .. } => assert_eq!(mime_type, FALLBACK_MIME),
            _ => panic!("expected inline"),
        }
    }

    #[test]
    fn sniffs_png_and_defaults_unknown() {
        assert_eq!(sniff_mime(PNG_SIG), "image/png");
        assert_eq!(sniff_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), "image/jpeg");
        assert_eq!(sniff_mime(b"plain"), FALLBACK_MIME);
    }

    #[test]
    fn debug_does_not_dump_payload() {
        let r = ImageRef::inline_png(vec![7; 4096]);
        let dbg = format!("{:?}", r);
        assert!(dbg.contains("4096"));
        assert!(dbg.len() < 100);
    }
}
