/// Paint commands produced from the poster layout

use super::layout::{LayoutNode, NodeKind, Rgba};

#[derive(Debug, Clone, PartialEq)]
pub enum PaintCommand {
    SolidRect {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        rgba: Rgba,
    },
    Gradient {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        top: Rgba,
        bottom: Rgba,
    },
    Disc {
        cx: f32,
        cy: f32,
        radius: f32,
        rgba: Rgba,
    },
    Image {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        reference: String,
        brightness: f32,
    },
    /// One line of text; `size` is the font size in logical pixels
    Text {
        x: i32,
        y: i32,
        text: String,
        size: u32,
        rgba: Rgba,
    },
}

const RING_WIDTH: f32 = 2.0;

/// Flatten layout nodes into paint order (back to front)
pub fn build_display_list(nodes: &[LayoutNode]) -> Vec<PaintCommand> {
    let mut out = Vec::with_capacity(nodes.len() + 8);
    for node in nodes {
        let r = node.rect;
        match &node.kind {
            NodeKind::Fill(rgba) => out.push(PaintCommand::SolidRect {
                x: r.x,
                y: r.y,
                width: r.width,
                height: r.height,
                rgba: *rgba,
            }),
            NodeKind::CoverImage { reference, brightness } => out.push(PaintCommand::Image {
                x: r.x,
                y: r.y,
                width: r.width,
                height: r.height,
                reference: reference.clone(),
                brightness: *brightness,
            }),
            NodeKind::Scrim { top, bottom } => out.push(PaintCommand::Gradient {
                x: r.x,
                y: r.y,
                width: r.width,
                height: r.height,
                top: *top,
                bottom: *bottom,
            }),
            NodeKind::Disc { color, ring } => {
                let radius = r.width.min(r.height) as f32 / 2.0;
                let cx = r.x as f32 + r.width as f32 / 2.0;
                let cy = r.y as f32 + r.height as f32 / 2.0;
                let inner = match ring {
                    Some(ring) => {
                        out.push(PaintCommand::Disc { cx, cy, radius, rgba: *ring });
                        radius - RING_WIDTH
                    }
                    None => radius,
                };
                out.push(PaintCommand::Disc { cx, cy, radius: inner, rgba: *color });
            }
            NodeKind::Text { lines, size, line_height, color } => {
                let inset = line_height.saturating_sub(*size) as i32 / 2;
                for (i, line) in lines.iter().enumerate() {
                    if line.is_empty() {
                        continue;
                    }
                    out.push(PaintCommand::Text {
                        x: r.x,
                        y: r.y + i as i32 * *line_height as i32 + inset,
                        text: line.clone(),
                        size: *size,
                        rgba: *color,
                    });
                }
            }
        }
    }
    out
}
