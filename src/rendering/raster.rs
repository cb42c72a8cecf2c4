/// Software rasterizer for the poster display list

use super::layout::{Rgba, GLYPH_ADVANCE};
use super::paint::PaintCommand;
use super::{Screenshot, SurfaceSize};
use crate::fetch::ImageFetcher;
use crate::image_ref::ImageRef;
use crate::{Error, Result};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};

/// Corner radius of the poster card in logical pixels
pub const CARD_CORNER_RADIUS: f32 = 40.0;

/// Settings for capturing the poster surface.
///
/// `use_cors` allows remote images to be requested. With it off, drawing a
/// remote image taints the surface: `allow_taint` then makes the capture
/// fail at encode time, otherwise such images are left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureOptions {
    /// Device pixels per logical pixel
    pub scale: u32,
    pub use_cors: bool,
    pub allow_taint: bool,
    /// Backdrop shown outside the rounded card
    pub background: [u8; 3],
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            scale: 2,
            use_cors: true,
            allow_taint: true,
            background: [0, 0, 0],
        }
    }
}

struct Canvas {
    img: RgbImage,
    sx: f32,
    sy: f32,
}

impl Canvas {
    fn new(width: u32, height: u32, surface: SurfaceSize, background: [u8; 3]) -> Self {
        Self {
            img: RgbImage::from_pixel(width.max(1), height.max(1), Rgb(background)),
            sx: width as f32 / surface.width.max(1) as f32,
            sy: height as f32 / surface.height.max(1) as f32,
        }
    }

    /// Logical rect to clipped device bounds (x0, y0, x1, y1), exclusive end
    fn device_bounds(&self, x: f32, y: f32, w: f32, h: f32) -> (u32, u32, u32, u32) {
        let clamp_x = |v: f32| v.round().clamp(0.0, self.img.width() as f32) as u32;
        let clamp_y = |v: f32| v.round().clamp(0.0, self.img.height() as f32) as u32;
        (
            clamp_x(x * self.sx),
            clamp_y(y * self.sy),
            clamp_x((x + w) * self.sx),
            clamp_y((y + h) * self.sy),
        )
    }

    fn blend(&mut self, x: u32, y: u32, rgba: Rgba, coverage: f32) {
        let a = (rgba.3 as f32 / 255.0) * coverage.clamp(0.0, 1.0);
        if a <= 0.0 {
            return;
        }
        let px = self.img.get_pixel_mut(x, y);
        let src = [rgba.0, rgba.1, rgba.2];
        for (d, s) in px.0.iter_mut().zip(src) {
            *d = (s as f32 * a + *d as f32 * (1.0 - a)).round() as u8;
        }
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, rgba: Rgba) {
        let (x0, y0, x1, y1) = self.device_bounds(x, y, w, h);
        for py in y0..y1 {
            for px in x0..x1 {
                self.blend(px, py, rgba, 1.0);
            }
        }
    }

    fn fill_gradient(&mut self, x: f32, y: f32, w: f32, h: f32, top: Rgba, bottom: Rgba) {
        let (x0, y0, x1, y1) = self.device_bounds(x, y, w, h);
        let rows = (y1 - y0).max(1) as f32;
        for py in y0..y1 {
            let t = ((py - y0) as f32 + 0.5) / rows;
            let lerp = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
            let rgba = (
                lerp(top.0, bottom.0),
                lerp(top.1, bottom.1),
                lerp(top.2, bottom.2),
                lerp(top.3, bottom.3),
            );
            for px in x0..x1 {
                self.blend(px, py, rgba, 1.0);
            }
        }
    }

    fn fill_disc(&mut self, cx: f32, cy: f32, radius: f32, rgba: Rgba) {
        if radius <= 0.0 {
            return;
        }
        let (rx, ry) = (radius * self.sx, radius * self.sy);
        let (dcx, dcy) = (cx * self.sx, cy * self.sy);
        let (x0, y0, x1, y1) = self.device_bounds(cx - radius - 1.0, cy - radius - 1.0, 2.0 * radius + 2.0, 2.0 * radius + 2.0);
        let edge = rx.min(ry);
        for py in y0..y1 {
            for px in x0..x1 {
                let dx = (px as f32 + 0.5 - dcx) / rx;
                let dy = (py as f32 + 0.5 - dcy) / ry;
                let d = (dx * dx + dy * dy).sqrt();
                let coverage = edge * (1.0 - d) + 0.5;
                if coverage > 0.0 {
                    self.blend(px, py, rgba, coverage);
                }
            }
        }
    }

    /// Draw text as solid glyph cells; glyph shapes are not rendered
    fn fill_text(&mut self, x: f32, y: f32, text: &str, size: f32, rgba: Rgba) {
        let advance = size * GLYPH_ADVANCE;
        for (i, ch) in text.chars().enumerate() {
            if ch.is_whitespace() {
                continue;
            }
            let gx = x + i as f32 * advance;
            let (top, height) = if ch.is_lowercase() {
                (0.35, 0.55)
            } else {
                (0.15, 0.75)
            };
            self.fill_rect(gx, y + size * top, advance * 0.8, size * height, rgba);
        }
    }

    fn draw_cover(&mut self, x: f32, y: f32, w: f32, h: f32, image: &DynamicImage, brightness: f32) {
        let (x0, y0, x1, y1) = self.device_bounds(x, y, w, h);
        let (dw, dh) = (x1 - x0, y1 - y0);
        if dw == 0 || dh == 0 || image.width() == 0 || image.height() == 0 {
            return;
        }
        // Crop the cover window in source pixels first so the resize target
        // never exceeds the destination rect.
        let (iw, ih) = (image.width(), image.height());
        let scale = (dw as f32 / iw as f32).max(dh as f32 / ih as f32);
        let sw = ((dw as f32 / scale).round() as u32).clamp(1, iw);
        let sh = ((dh as f32 / scale).round() as u32).clamp(1, ih);
        let (sx, sy) = ((iw - sw) / 2, (ih - sh) / 2);
        let rgb = image.to_rgb8();
        let window = imageops::crop_imm(&rgb, sx, sy, sw, sh).to_image();
        let resized = imageops::resize(&window, dw, dh, FilterType::Triangle);
        for py in 0..dh {
            for px in 0..dw {
                let src = resized.get_pixel(px, py);
                let adjust = |c: u8| (c as f32 * brightness).round().clamp(0.0, 255.0) as u8;
                self.img.put_pixel(x0 + px, y0 + py, Rgb([adjust(src[0]), adjust(src[1]), adjust(src[2])]));
            }
        }
    }

    /// Restore the backdrop outside a rounded rectangle covering the canvas
    fn round_corners(&mut self, radius: f32, background: [u8; 3]) {
        if radius <= 0.0 {
            return;
        }
        let (w, h) = (self.img.width() as f32, self.img.height() as f32);
        let (rx, ry) = (radius * self.sx, radius * self.sy);
        for py in 0..self.img.height() {
            for px in 0..self.img.width() {
                let fx = px as f32 + 0.5;
                let fy = py as f32 + 0.5;
                let cx = if fx < rx { rx } else if fx > w - rx { w - rx } else { continue };
                let cy = if fy < ry { ry } else if fy > h - ry { h - ry } else { continue };
                let dx = (fx - cx) / rx;
                let dy = (fy - cy) / ry;
                if dx * dx + dy * dy > 1.0 {
                    self.img.put_pixel(px, py, Rgb(background));
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ImagePolicy {
    use_cors: bool,
    allow_taint: bool,
}

fn decode(data: &[u8], what: &str) -> Option<DynamicImage> {
    match image::load_from_memory(data) {
        Ok(img) => Some(img),
        Err(e) => {
            log::warn!("skipping undecodable image {}: {}", what, e);
            None
        }
    }
}

/// Resolve an image for drawing. `Ok(None)` leaves the area unpainted.
fn load_image(reference: &str, policy: ImagePolicy, fetcher: Option<&dyn ImageFetcher>) -> Result<Option<DynamicImage>> {
    let parsed = match ImageRef::parse(reference) {
        Ok(r) => r,
        Err(e) => {
            log::warn!("skipping image: {}", e);
            return Ok(None);
        }
    };
    match parsed {
        ImageRef::Inline { data, .. } => Ok(decode(&data, "(inline)")),
        ImageRef::Remote(url) => {
            if !policy.use_cors {
                if policy.allow_taint {
                    return Err(Error::ExportError(format!(
                        "surface tainted by cross-origin image {}",
                        url
                    )));
                }
                log::warn!("leaving out cross-origin image {}", url);
                return Ok(None);
            }
            let Some(fetcher) = fetcher else {
                log::warn!("no fetcher configured; leaving out {}", url);
                return Ok(None);
            };
            match fetcher.fetch(&url) {
                Ok(ImageRef::Inline { data, .. }) => Ok(decode(&data, &url)),
                Ok(ImageRef::Remote(_)) => Ok(None),
                Err(e) => {
                    log::warn!("could not load {}: {}", url, e);
                    Ok(None)
                }
            }
        }
    }
}

fn render(
    commands: &[PaintCommand],
    surface: SurfaceSize,
    device: SurfaceSize,
    corner_radius: f32,
    background: [u8; 3],
    policy: ImagePolicy,
    fetcher: Option<&dyn ImageFetcher>,
) -> Result<Screenshot> {
    let mut canvas = Canvas::new(device.width, device.height, surface, background);
    for cmd in commands {
        match cmd {
            PaintCommand::SolidRect { x, y, width, height, rgba } => {
                canvas.fill_rect(*x as f32, *y as f32, *width as f32, *height as f32, *rgba)
            }
            PaintCommand::Gradient { x, y, width, height, top, bottom } => {
                canvas.fill_gradient(*x as f32, *y as f32, *width as f32, *height as f32, *top, *bottom)
            }
            PaintCommand::Disc { cx, cy, radius, rgba } => canvas.fill_disc(*cx, *cy, *radius, *rgba),
            PaintCommand::Image { x, y, width, height, reference, brightness } => {
                if let Some(img) = load_image(reference, policy, fetcher)? {
                    canvas.draw_cover(*x as f32, *y as f32, *width as f32, *height as f32, &img, *brightness);
                }
            }
            PaintCommand::Text { x, y, text, size, rgba } => {
                canvas.fill_text(*x as f32, *y as f32, text, *size as f32, *rgba)
            }
        }
    }
    canvas.round_corners(corner_radius, background);
    Ok(Screenshot::new(canvas.img))
}

/// Capture the poster card at `options.scale` device pixels per logical pixel.
pub fn rasterize(
    commands: &[PaintCommand],
    surface: SurfaceSize,
    options: &CaptureOptions,
    fetcher: Option<&dyn ImageFetcher>,
) -> Result<Screenshot> {
    let scale = options.scale.max(1);
    let device = SurfaceSize {
        width: surface.width * scale,
        height: surface.height * scale,
    };
    let policy = ImagePolicy {
        use_cors: options.use_cors,
        allow_taint: options.allow_taint,
    };
    render(commands, surface, device, CARD_CORNER_RADIUS, options.background, policy, fetcher)
}

/// Render the poster stretched over a whole printable page, square corners.
pub fn rasterize_page(
    commands: &[PaintCommand],
    surface: SurfaceSize,
    page: SurfaceSize,
    fetcher: Option<&dyn ImageFetcher>,
) -> Result<Screenshot> {
    let policy = ImagePolicy {
        use_cors: true,
        allow_taint: false,
    };
    render(commands, surface, page, 0.0, [255, 255, 255], policy, fetcher)
}
