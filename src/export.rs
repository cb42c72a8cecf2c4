//! Export adapter: JPEG download and print hand-off
//!
//! Both paths render the same display list; the image export captures the
//! poster card at the configured scale over a black backdrop, the print path
//! stretches the poster over a whole page with nothing else on it.

use crate::fetch::ImageFetcher;
use crate::platform::PrintHost;
use crate::rendering::layout::layout_poster;
use crate::rendering::paint::{build_display_list, PaintCommand};
use crate::rendering::raster::{rasterize, rasterize_page, CaptureOptions};
use crate::rendering::{Screenshot, SurfaceSize, POSTER_SURFACE};
use crate::{PosterRecord, Result, StudioConfig};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Download name prefix for exported posters
pub const EXPORT_PREFIX: &str = "poster-cx-automations";

/// A4 portrait at 150 dpi
pub const PRINT_PAGE: SurfaceSize = SurfaceSize {
    width: 1240,
    height: 1754,
};

/// `poster-cx-automations-<unix-millis>.jpg`
pub fn export_file_name(unix_millis: u128) -> String {
    format!("{}-{}.jpg", EXPORT_PREFIX, unix_millis)
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

pub struct Exporter {
    capture: CaptureOptions,
    jpeg_quality: u8,
    page: SurfaceSize,
    fetcher: Option<Box<dyn ImageFetcher>>,
}

impl Exporter {
    /// Exporter that never loads remote images
    pub fn offline(capture: CaptureOptions, jpeg_quality: u8) -> Self {
        Self {
            capture,
            jpeg_quality,
            page: PRINT_PAGE,
            fetcher: None,
        }
    }

    /// Exporter configured from `config`; remote images are fetched over HTTP
    #[cfg(feature = "gemini")]
    pub fn new(config: &StudioConfig) -> Result<Self> {
        let fetcher = crate::fetch::HttpImageFetcher::new(config)?;
        Ok(Self::offline(config.capture, config.jpeg_quality).with_fetcher(Box::new(fetcher)))
    }

    #[cfg(not(feature = "gemini"))]
    pub fn new(config: &StudioConfig) -> Result<Self> {
        Ok(Self::offline(config.capture, config.jpeg_quality))
    }

    pub fn with_fetcher(mut self, fetcher: Box<dyn ImageFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn with_page(mut self, page: SurfaceSize) -> Self {
        self.page = page;
        self
    }

    pub fn capture_options(&self) -> &CaptureOptions {
        &self.capture
    }

    fn display_list(record: &PosterRecord) -> Vec<PaintCommand> {
        build_display_list(&layout_poster(record, POSTER_SURFACE))
    }

    /// Rasterize the poster card without writing anything
    pub fn capture(&self, record: &PosterRecord) -> Result<Screenshot> {
        rasterize(
            &Self::display_list(record),
            POSTER_SURFACE,
            &self.capture,
            self.fetcher.as_deref(),
        )
    }

    /// Capture, encode as JPEG and write the timestamped file into `dir`
    pub fn export_as_image(&self, record: &PosterRecord, dir: &Path) -> Result<PathBuf> {
        let shot = self.capture(record)?;
        let jpeg = shot.encode_jpeg(self.jpeg_quality)?;
        let path = dir.join(export_file_name(unix_millis()));
        std::fs::write(&path, jpeg)?;
        log::info!("exported {}x{} poster to {}", shot.width, shot.height, path.display());
        Ok(path)
    }

    /// Render the print page and hand it to `host`. Failures are only logged.
    ///
    /// The page is written as a PNG into the temp directory and ownership of
    /// that file passes to the host, which removes it once the job is done.
    pub fn export_as_print(&self, record: &PosterRecord, host: &dyn PrintHost) {
        let page = rasterize_page(
            &Self::display_list(record),
            POSTER_SURFACE,
            self.page,
            self.fetcher.as_deref(),
        )
        .and_then(|shot| shot.encode_png());
        let png = match page {
            Ok(png) => png,
            Err(e) => {
                log::warn!("print page could not be rendered: {}", e);
                return;
            }
        };
        let path = std::env::temp_dir().join(format!("{}-print-{}.png", EXPORT_PREFIX, unix_millis()));
        if let Err(e) = std::fs::write(&path, png) {
            log::warn!("print page could not be written to {}: {}", path.display(), e);
            let _ = std::fs::remove_file(&path);
            return;
        }
        host.print(&path);
    }
}
