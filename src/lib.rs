//! Posterkit
//!
//! Editing sessions for a fixed-layout advertisement poster: text fields and
//! a featured background image, with the background optionally generated or
//! edited by a remote generative-image service, and export to JPEG or to the
//! host's print flow.
//!
//! # Features
//!
//! - **gemini** (default): HTTP gateway to the Gemini image model and the
//!   HTTP fetcher used to normalize remote images before an edit
//! - **Modular Design**: the session is generic over [`ImageGateway`], so
//!   hosts and tests can swap the backend
//!
//! # Example
//!
//! ```no_run
//! use posterkit::{EditingSession, PosterPatch, StudioConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StudioConfig {
//!     timeout_ms: 60_000,
//!     ..Default::default()
//! };
//!
//! let gateway = posterkit::new_gateway(&config)?;
//! let mut session = EditingSession::new(gateway);
//! session.update_fields(&PosterPatch {
//!     cta_text: Some("Nuevo CTA".into()),
//!     ..Default::default()
//! });
//! session.request_background_generation("cyber");
//! if let Some(err) = session.last_error() {
//!     eprintln!("{}", err);
//! }
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

pub mod error;
pub use error::{Error, Result};

pub mod poster;
pub use poster::{apply_partial, PosterField, PosterPatch, PosterRecord, SessionStatus};

pub mod styles;
pub use styles::StyleOption;

pub mod image_ref;
pub use image_ref::ImageRef;

pub mod fetch;

// HTTP backend for the generative-image service
#[cfg(feature = "gemini")]
pub mod gemini;

pub mod session;
pub use session::{
    EditingSession, ImageOutcome, PendingImageRequest, RequestToken, SessionSnapshot, SettleResult,
};

pub mod rendering;
pub use rendering::raster::CaptureOptions;

pub mod export;
pub use export::Exporter;

// Host integrations: print flow and local file selection
pub mod platform;

// Async-friendly session handle (worker-thread backed)
pub mod async_api;
pub use async_api::Studio;

/// Environment variables consulted for the service credential, in order
pub const DEFAULT_API_KEY_ENV: [&str; 2] = ["API_KEY", "GEMINI_API_KEY"];

/// Message raised when no usable credential is configured
pub const MISSING_API_KEY_MESSAGE: &str =
    "La API KEY no está configurada. Verifica las variables de entorno y vuelve a ejecutar.";

/// Configuration for the gateway and export
///
/// The defaults talk to the public Gemini endpoint with the image model the
/// poster tool was designed around. `timeout_ms == 0` leaves request
/// duration to the transport.
///
/// # Examples
///
/// ```
/// let cfg = posterkit::StudioConfig::default();
/// assert_eq!(cfg.aspect_ratio, "3:4");
/// assert_eq!(cfg.jpeg_quality, 95);
/// ```
#[derive(Debug, Clone)]
pub struct StudioConfig {
    /// Explicit credential; takes precedence over the environment
    pub api_key: Option<String>,
    /// Environment variables searched for the credential
    pub api_key_env: Vec<String>,
    /// Model identifier sent with every request
    pub model: String,
    /// Base URL of the Generative Language API
    pub endpoint: String,
    /// Request timeout in milliseconds (0 => none)
    pub timeout_ms: u64,
    /// User agent string for outgoing requests
    pub user_agent: String,
    /// Aspect ratio requested for generated images
    pub aspect_ratio: String,
    /// Raster capture settings for image export
    pub capture: CaptureOptions,
    /// JPEG quality for image export (1..=100)
    pub jpeg_quality: u8,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: DEFAULT_API_KEY_ENV.iter().map(|s| s.to_string()).collect(),
            model: "gemini-2.5-flash-image".to_string(),
            endpoint: "https://generativelanguage.googleapis.com".to_string(),
            timeout_ms: 0,
            user_agent: format!("posterkit/{}", env!("CARGO_PKG_VERSION")),
            aspect_ratio: "3:4".to_string(),
            capture: CaptureOptions::default(),
            jpeg_quality: 95,
        }
    }
}

impl StudioConfig {
    /// Defaults overlaid with `POSTERKIT_*` environment variables
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(model) = env_non_empty("POSTERKIT_MODEL") {
            cfg.model = model;
        }
        if let Some(endpoint) = env_non_empty("POSTERKIT_ENDPOINT") {
            cfg.endpoint = endpoint;
        }
        if let Some(ms) = env_non_empty("POSTERKIT_TIMEOUT_MS") {
            match ms.parse() {
                Ok(ms) => cfg.timeout_ms = ms,
                Err(_) => log::warn!("ignoring invalid POSTERKIT_TIMEOUT_MS={:?}", ms),
            }
        }
        cfg
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    /// Find the service credential.
    ///
    /// Empty values and the literal `undefined` (what unset build-time
    /// variables tend to become) count as missing.
    pub fn resolve_api_key(&self) -> Result<String> {
        let explicit = self.api_key.clone().filter(|k| is_usable_key(k));
        explicit
            .or_else(|| {
                self.api_key_env
                    .iter()
                    .filter_map(|name| std::env::var(name).ok())
                    .find(|k| is_usable_key(k))
            })
            .ok_or_else(|| Error::ConfigError(MISSING_API_KEY_MESSAGE.to_string()))
    }
}

fn is_usable_key(key: &str) -> bool {
    let key = key.trim();
    !key.is_empty() && key != "undefined"
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// A remote service that produces and edits poster backgrounds.
///
/// Both operations return `Ok(None)` when the service answered without an
/// image. Implementations make at most one attempt per call.
pub trait ImageGateway: Send + Sync {
    /// Generate a background for `topic` in the given style descriptor
    fn generate_background(&self, topic: &str, style: &str) -> Result<Option<ImageRef>>;

    /// Apply a natural-language edit to `current`
    fn edit_image(&self, current: &ImageRef, instruction: &str) -> Result<Option<ImageRef>>;
}

impl<G: ImageGateway + ?Sized> ImageGateway for Box<G> {
    fn generate_background(&self, topic: &str, style: &str) -> Result<Option<ImageRef>> {
        (**self).generate_background(topic, style)
    }

    fn edit_image(&self, current: &ImageRef, instruction: &str) -> Result<Option<ImageRef>> {
        (**self).edit_image(current, instruction)
    }
}

impl<G: ImageGateway + ?Sized> ImageGateway for std::sync::Arc<G> {
    fn generate_background(&self, topic: &str, style: &str) -> Result<Option<ImageRef>> {
        (**self).generate_background(topic, style)
    }

    fn edit_image(&self, current: &ImageRef, instruction: &str) -> Result<Option<ImageRef>> {
        (**self).edit_image(current, instruction)
    }
}

/// Create the default gateway backend
#[cfg(feature = "gemini")]
pub fn new_gateway(config: &StudioConfig) -> Result<impl ImageGateway> {
    gemini::GeminiGateway::new(config.clone())
}
