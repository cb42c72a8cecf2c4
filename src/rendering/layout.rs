//! Fixed poster layout on the logical 600x800 surface.
//!
//! Content is stacked from the bottom edge upwards: footer with the call to
//! action, a divider, the trust row, subtitle, title and finally the accent
//! bar. The featured image fills the whole surface underneath.

use super::SurfaceSize;
use crate::PosterRecord;

pub type Rgba = (u8, u8, u8, u8);

pub const WHITE: Rgba = (255, 255, 255, 255);
pub const GRAY_200: Rgba = (229, 231, 235, 255);
pub const GRAY_400: Rgba = (156, 163, 175, 255);
pub const BLUE_300: Rgba = (147, 197, 253, 255);
pub const BLUE_400: Rgba = (96, 165, 250, 255);
pub const BLUE_500: Rgba = (59, 130, 246, 255);
pub const BLUE_600: Rgba = (37, 99, 235, 255);

const PADDING: i32 = 48;

/// Approximate advance of one glyph as a fraction of the font size
pub const GLYPH_ADVANCE: f32 = 0.55;

const AVATAR_COLORS: [Rgba; 4] = [
    (251, 191, 36, 255),
    (52, 211, 153, 255),
    (244, 114, 182, 255),
    (129, 140, 248, 255),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Fill(Rgba),
    /// Image scaled to cover the rect, cropped to its centre
    CoverImage { reference: String, brightness: f32 },
    /// Vertical gradient between two colors
    Scrim { top: Rgba, bottom: Rgba },
    /// Circle inscribed in the rect with an optional ring
    Disc { color: Rgba, ring: Option<Rgba> },
    /// Wrapped text, one entry per line
    Text { lines: Vec<String>, size: u32, line_height: u32, color: Rgba },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutNode {
    pub rect: Rect,
    pub kind: NodeKind,
}

impl LayoutNode {
    fn new(rect: Rect, kind: NodeKind) -> Self {
        Self { rect, kind }
    }
}

/// Greedy word wrap by estimated glyph width. Never returns an empty list.
pub fn wrap_text(text: &str, max_width: u32, size: u32) -> Vec<String> {
    let advance = (size as f32 * GLYPH_ADVANCE).max(1.0);
    let chars_per_line = ((max_width as f32 / advance) as usize).max(1);

    let mut lines = Vec::new();
    let mut cur = String::new();
    for word in text.split_whitespace() {
        let cur_len = cur.chars().count();
        let word_len = word.chars().count();
        if cur_len + word_len + 1 > chars_per_line && !cur.is_empty() {
            lines.push(std::mem::take(&mut cur));
        }
        if !cur.is_empty() {
            cur.push(' ');
        }
        cur.push_str(word);
    }
    if !cur.is_empty() || lines.is_empty() {
        lines.push(cur);
    }
    lines
}

/// Text block whose last line ends at `bottom`
fn text_node(x: i32, bottom: i32, width: u32, text: &str, size: u32, leading: f32, color: Rgba) -> LayoutNode {
    let mut node = text_below(x, bottom, width, text, size, leading, color);
    node.rect.y -= node.rect.height as i32;
    node
}

/// Text block whose first line starts at `top`
fn text_below(x: i32, top: i32, width: u32, text: &str, size: u32, leading: f32, color: Rgba) -> LayoutNode {
    let lines = wrap_text(text, width, size);
    let line_height = (size as f32 * leading).round() as u32;
    let height = line_height * lines.len() as u32;
    LayoutNode::new(
        Rect::new(x, top, width, height),
        NodeKind::Text {
            lines,
            size,
            line_height,
            color,
        },
    )
}

/// Lay out the poster for `record` on `surface`.
///
/// Coordinates are logical pixels; the rasterizer maps them to device pixels.
pub fn layout_poster(record: &PosterRecord, surface: SurfaceSize) -> Vec<LayoutNode> {
    let w = surface.width;
    let h = surface.height as i32;
    let content_w = w.saturating_sub(2 * PADDING as u32);
    let full = Rect::new(0, 0, w, surface.height);
    let mut nodes = vec![
        LayoutNode::new(full, NodeKind::Fill(WHITE)),
        LayoutNode::new(
            full,
            NodeKind::CoverImage {
                reference: record.featured_image_url.clone(),
                brightness: 0.9,
            },
        ),
    ];

    // Readability scrims: dark towards the bottom, a lighter one at the top
    let mid = h / 2;
    nodes.push(LayoutNode::new(
        Rect::new(0, 0, w, mid as u32),
        NodeKind::Scrim { top: (0, 0, 0, 0), bottom: (0, 0, 0, 102) },
    ));
    nodes.push(LayoutNode::new(
        Rect::new(0, mid, w, (h - mid) as u32),
        NodeKind::Scrim { top: (0, 0, 0, 102), bottom: (0, 0, 0, 230) },
    ));
    nodes.push(LayoutNode::new(
        Rect::new(0, 0, w, mid as u32),
        NodeKind::Scrim { top: (0, 0, 0, 77), bottom: (0, 0, 0, 0) },
    ));

    // Footer
    let footer_top = h - PADDING - 56;
    nodes.push(text_node(PADDING, footer_top + 14, content_w / 2, "COMIENZA EL CAMBIO", 10, 1.4, BLUE_400));
    nodes.push(text_below(PADDING, footer_top + 22, content_w - 140, &record.cta_text, 20, 1.25, WHITE));
    let right = w as i32 - PADDING;
    nodes.push(LayoutNode::new(
        Rect::new(right - 56 - 16 - 56, footer_top, 56, 56),
        NodeKind::Disc { color: WHITE, ring: None },
    ));
    nodes.push(LayoutNode::new(
        Rect::new(right - 56, footer_top, 56, 56),
        NodeKind::Disc { color: BLUE_600, ring: None },
    ));

    let divider_y = footer_top - 40;
    nodes.push(LayoutNode::new(
        Rect::new(PADDING, divider_y, content_w, 1),
        NodeKind::Fill((255, 255, 255, 51)),
    ));

    // Trust row
    let content_bottom = divider_y - 32 - 16;
    let row_top = content_bottom - 40;
    for (i, color) in AVATAR_COLORS.iter().enumerate() {
        nodes.push(LayoutNode::new(
            Rect::new(PADDING + i as i32 * 28, row_top, 40, 40),
            NodeKind::Disc { color: *color, ring: Some(WHITE) },
        ));
    }
    let label_x = PADDING + 3 * 28 + 40 + 24;
    let label_w = (w as i32 - PADDING - label_x).max(0) as u32;
    nodes.push(text_node(label_x, row_top + 20, label_w, "CONFIANZA TOTAL", 12, 1.4, BLUE_300));
    nodes.push(text_node(
        label_x,
        row_top + 36,
        label_w,
        "Más de 500 empresas automatizadas",
        10,
        1.4,
        GRAY_400,
    ));

    // Subtitle, title and accent bar stack upwards
    let subtitle = text_node(
        PADDING,
        row_top - 40,
        (content_w as f32 * 0.9) as u32,
        &record.subtitle,
        20,
        1.625,
        GRAY_200,
    );
    let title = text_node(PADDING, subtitle.rect.y - 24, content_w, &record.title, 48, 1.1, WHITE);
    let bar = LayoutNode::new(Rect::new(PADDING, title.rect.y - 32 - 6, 64, 6), NodeKind::Fill(BLUE_500));
    nodes.push(bar);
    nodes.push(title);
    nodes.push(subtitle);

    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::POSTER_SURFACE;

    fn text_of(node: &LayoutNode) -> Option<String> {
        match &node.kind {
            NodeKind::Text { lines, .. } => Some(lines.join(" ")),
            _ => None,
        }
    }

    #[test]
    fn wrap_respects_width_and_keeps_words() {
        let lines = wrap_text("uno dos tres cuatro cinco", 55, 10); // 10 chars per line
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.chars().count() <= 10 || !l.contains(' ')));
        assert_eq!(lines.join(" "), "uno dos tres cuatro cinco");
        assert_eq!(wrap_text("", 100, 10), vec![String::new()]);
    }

    #[test]
    fn featured_image_fills_the_surface() {
        let nodes = layout_poster(&PosterRecord::default(), POSTER_SURFACE);
        let img = nodes
            .iter()
            .find(|n| matches!(n.kind, NodeKind::CoverImage { .. }))
            .expect("image node");
        assert_eq!(img.rect, Rect::new(0, 0, 600, 800));
    }

    #[test]
    fn record_text_appears_in_order_bottom_up() {
        let rec = PosterRecord::default();
        let nodes = layout_poster(&rec, POSTER_SURFACE);
        let find = |needle: &str| {
            nodes
                .iter()
                .find(|n| text_of(n).as_deref() == Some(needle))
                .unwrap_or_else(|| panic!("missing {}", needle))
                .rect
        };
        let title = find(&rec.title);
        let subtitle = find(&rec.subtitle);
        let cta = find(&rec.cta_text);
        assert!(title.bottom() <= subtitle.y);
        assert!(subtitle.bottom() < cta.y);
        assert!(title.y > 0, "title must stay on the surface");
        assert!(cta.bottom() <= 800);
    }

    #[test]
    fn longer_titles_push_the_accent_bar_up() {
        let short = PosterRecord { title: "Hola".into(), ..Default::default() };
        let long = PosterRecord {
            title: "Una frase bastante larga que ocupa varias lineas en el afiche".into(),
            ..Default::default()
        };
        let bar_y = |r: &PosterRecord| {
            layout_poster(r, POSTER_SURFACE)
                .into_iter()
                .find(|n| n.kind == NodeKind::Fill(BLUE_500))
                .unwrap()
                .rect
                .y
        };
        assert!(bar_y(&long) < bar_y(&short));
    }
}
