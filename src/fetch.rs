//! Turning any image reference into raw bytes plus a MIME type.
//!
//! Inline references are decoded locally and never touch the network.
//! Remote references are downloaded through an [`ImageFetcher`]; the
//! HTTP-backed implementation lives behind the `gemini` feature.

use crate::image_ref::ImageRef;
use crate::Result;

/// Downloads a remote image and returns it as an inline reference.
pub trait ImageFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<ImageRef>;
}

/// Bytes and MIME type ready to be sent upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// Normalize an image to bytes + MIME type, fetching only remote URLs.
pub fn normalize(image: &ImageRef, fetcher: &dyn ImageFetcher) -> Result<NormalizedImage> {
    let inline = match image {
        ImageRef::Inline { .. } => image.clone(),
        ImageRef::Remote(url) => {
            log::debug!("fetching remote image before edit: {}", url);
            fetcher.fetch(url)?
        }
    };
    match inline {
        ImageRef::Inline { mime_type, data } => Ok(NormalizedImage { data, mime_type }),
        ImageRef::Remote(url) => Err(crate::Error::ImageFetchError(format!(
            "fetcher returned a remote reference for {}",
            url
        ))),
    }
}

#[cfg(feature = "gemini")]
pub use http::{HttpImageFetcher, FETCH_FAILED_MESSAGE};

#[cfg(feature = "gemini")]
mod http {
    use super::ImageFetcher;
    use crate::image_ref::{sniff_mime, ImageRef};
    use crate::{Error, Result, StudioConfig};
    use reqwest::blocking::Client;
    use reqwest::header::CONTENT_TYPE;

    /// Message shown when the current image cannot be prepared for editing
    pub const FETCH_FAILED_MESSAGE: &str = "No se pudo procesar la imagen actual para editarla.";

    /// Fetches images over HTTP with a blocking reqwest client
    pub struct HttpImageFetcher {
        client: Client,
        user_agent: String,
    }

    impl HttpImageFetcher {
        pub fn new(config: &StudioConfig) -> Result<Self> {
            let client = Client::builder()
                .timeout(config.timeout())
                .build()
                .map_err(|e| Error::Other(format!("Failed to build HTTP client: {}", e)))?;
            Ok(Self::with_client(client, config.user_agent.clone()))
        }

        pub fn with_client(client: Client, user_agent: String) -> Self {
            Self { client, user_agent }
        }
    }

    impl ImageFetcher for HttpImageFetcher {
        fn fetch(&self, url: &str) -> Result<ImageRef> {
            let resp = self
                .client
                .get(url)
                .header("User-Agent", self.user_agent.clone())
                .send()
                .map_err(|e| {
                    log::warn!("image fetch failed for {}: {}", url, e);
                    Error::ImageFetchError(FETCH_FAILED_MESSAGE.to_string())
                })?;

            let status = resp.status();
            if !status.is_success() {
                log::warn!("image fetch for {} returned HTTP {}", url, status);
                return Err(Error::ImageFetchError(format!(
                    "{} (HTTP {})",
                    FETCH_FAILED_MESSAGE,
                    status.as_u16()
                )));
            }

            let declared = resp
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.split(';').next().unwrap_or_default().trim().to_string())
                .filter(|v| !v.is_empty());

            let data = resp
                .bytes()
                .map_err(|e| {
                    log::warn!("reading image body from {} failed: {}", url, e);
                    Error::ImageFetchError(FETCH_FAILED_MESSAGE.to_string())
                })?
                .to_vec();

            let mime_type = declared.unwrap_or_else(|| sniff_mime(&data).to_string());
            Ok(ImageRef::Inline { mime_type, data })
        }
    }
}
