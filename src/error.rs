//! Error types for poster sessions, the image gateway and export

use thiserror::Error;

/// Result type alias for posterkit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while editing or exporting a poster
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid service credential. Raised before any network attempt.
    #[error("{0}")]
    ConfigError(String),

    /// The generative-image service call failed. Shown to users after a
    /// session label, so the message carries no prefix of its own.
    #[error("{0}")]
    UpstreamError(String),

    /// Fetching or decoding the current image before an edit failed
    #[error("{0}")]
    ImageFetchError(String),

    /// Raster capture or encoding of the poster surface failed
    #[error("Export failed: {0}")]
    ExportError(String),

    /// A string that is neither an http(s) URL nor a base64 data URL
    #[error("Invalid image reference: {0}")]
    InvalidImageReference(String),

    /// Local file IO
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for failures raised while talking to (or preparing input for) the
    /// remote image service.
    pub fn is_gateway_error(&self) -> bool {
        matches!(
            self,
            Error::ConfigError(_) | Error::UpstreamError(_) | Error::ImageFetchError(_)
        )
    }
}

#[cfg(feature = "gemini")]
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::UpstreamError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_is_displayed_verbatim() {
        let e = Error::ConfigError("no key".into());
        assert_eq!(e.to_string(), "no key");
        assert!(e.is_gateway_error());
    }

    #[test]
    fn upstream_error_reads_cleanly_after_a_label() {
        let e = Error::UpstreamError("HTTP 500: model overloaded".into());
        assert_eq!(
            format!("Error al generar el fondo: {}", e),
            "Error al generar el fondo: HTTP 500: model overloaded"
        );
    }

    #[test]
    fn export_error_is_not_a_gateway_error() {
        assert!(!Error::ExportError("tainted".into()).is_gateway_error());
    }
}
