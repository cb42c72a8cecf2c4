//! Poster surface rendering: layout, display list and rasterization.
//!
//! The poster is laid out on a fixed 3:4 logical surface and rasterized at
//! whatever pixel size the caller asks for, so the same display list feeds
//! both the JPEG export and the print page.

pub mod layout;
pub mod paint;
pub mod raster;

use crate::{Error, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, RgbImage};
use std::io::Cursor;

/// Logical size of the poster surface
pub const POSTER_SURFACE: SurfaceSize = SurfaceSize {
    width: 600,
    height: 800,
};

/// Width and height in logical (or device) pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl Default for SurfaceSize {
    fn default() -> Self {
        POSTER_SURFACE
    }
}

/// A captured surface
#[derive(Debug, Clone)]
pub struct Screenshot {
    pub width: u32,
    pub height: u32,
    pub pixels: RgbImage,
}

impl Screenshot {
    pub fn new(pixels: RgbImage) -> Self {
        Self {
            width: pixels.width(),
            height: pixels.height(),
            pixels,
        }
    }

    pub fn encode_jpeg(&self, quality: u8) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
        encoder
            .encode_image(&self.pixels)
            .map_err(|e| Error::ExportError(format!("JPEG encoding failed: {}", e)))?;
        Ok(out)
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());
        self.pixels
            .write_to(&mut out, ImageFormat::Png)
            .map_err(|e| Error::ExportError(format!("PNG encoding failed: {}", e)))?;
        Ok(out.into_inner())
    }
}
