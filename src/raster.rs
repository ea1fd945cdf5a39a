use std::ops::Range;

use egui::Color32;
use image::{Rgba, RgbaImage};

use crate::grid::{CompositeMode, OverlayShape};

/// Copy of `base` with every shape painted on top, in order.
pub fn compose_overlay(base: &RgbaImage, shapes: &[OverlayShape]) -> RgbaImage {
    let mut img = base.clone();
    for shape in shapes {
        draw_shape(&mut img, shape);
    }
    img
}

pub fn draw_shape(img: &mut RgbaImage, shape: &OverlayShape) {
    match *shape {
        OverlayShape::Line {
            from,
            to,
            width,
            color,
            mode,
        } => {
            debug_assert!(
                from.x == to.x || from.y == to.y,
                "overlay lines are axis-aligned: {from:?} -> {to:?}"
            );
            let half = width / 2.0;
            let (cols, rows) = if from.x == to.x {
                (
                    pixel_span(from.x - half, from.x + half),
                    pixel_span(from.y.min(to.y), from.y.max(to.y)),
                )
            } else {
                (
                    pixel_span(from.x.min(to.x), from.x.max(to.x)),
                    pixel_span(from.y - half, from.y + half),
                )
            };
            fill_band(img, cols, rows, 0, color, mode);
        }
        OverlayShape::Rect {
            rect,
            stroke_width,
            color,
            mode,
        } => {
            let outer = rect.expand(stroke_width / 2.0);
            let cols = pixel_span(outer.min.x, outer.max.x);
            let rows = pixel_span(outer.min.y, outer.max.y);
            let band = stroke_width.round().max(1.0) as i64;
            fill_band(img, cols, rows, band, color, mode);
        }
    }
}

/// Pixel indices covered by `[a, b)`, at least one wide. Not clipped.
fn pixel_span(a: f32, b: f32) -> Range<i64> {
    let start = a.round() as i64;
    let end = b.round() as i64;
    start..end.max(start + 1)
}

fn clip(span: &Range<i64>, limit: u32) -> Range<u32> {
    let limit = i64::from(limit);
    let start = span.start.clamp(0, limit);
    let end = span.end.clamp(start, limit);
    start as u32..end as u32
}

/// Paints the `cols × rows` block, leaving out everything more than `band`
/// pixels away from its edge. A `band` of 0 fills the block.
///
/// The hole is taken from the block's own pixel edges, so a stroked rect keeps
/// a band of at least one pixel however thin its stroke is.
fn fill_band(
    img: &mut RgbaImage,
    cols: Range<i64>,
    rows: Range<i64>,
    band: i64,
    color: Color32,
    mode: CompositeMode,
) {
    let (hole_cols, hole_rows) = if band > 0 {
        (
            cols.start + band..cols.end - band,
            rows.start + band..rows.end - band,
        )
    } else {
        (0..0, 0..0)
    };

    for y in clip(&rows, img.height()) {
        let in_hole_row = hole_rows.contains(&i64::from(y));
        for x in clip(&cols, img.width()) {
            if in_hole_row && hole_cols.contains(&i64::from(x)) {
                continue;
            }
            paint(img.get_pixel_mut(x, y), color, mode);
        }
    }
}

fn paint(px: &mut Rgba<u8>, color: Color32, mode: CompositeMode) {
    match mode {
        CompositeMode::Invert => {
            px.0[0] ^= color.r();
            px.0[1] ^= color.g();
            px.0[2] ^= color.b();
        }
        CompositeMode::Normal => {
            // Color32 is premultiplied.
            let keep = 1.0 - color.a() as f32 / 255.0;
            for (dst, src) in px.0.iter_mut().zip(color.to_array()) {
                *dst = (src as f32 + *dst as f32 * keep).round().min(255.0) as u8;
            }
        }
    }
}

/// Upload format for the viewport texture.
pub fn to_color_image(img: &RgbaImage) -> egui::ColorImage {
    let size = [img.width() as usize, img.height() as usize];
    egui::ColorImage::from_rgba_unmultiplied(size, img.as_flat_samples().as_slice())
}
