//! Guide grid drawn over the image.
//!
//! The overlay is recomputed from scratch whenever one of its inputs changes.
//! Cells that already hold a point are left without a rectangle so annotated
//! regions stay uncluttered.

use egui::{pos2, Color32, Pos2, Rect};

use crate::model::{AnnotationStore, Canvas};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompositeMode {
    /// Plain source-over painting.
    Normal,
    /// Source XOR destination, so the shape stays visible on any background.
    Invert,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OverlayShape {
    /// Horizontal or vertical segment, `width` thick.
    Line {
        from: Pos2,
        to: Pos2,
        width: f32,
        color: Color32,
        mode: CompositeMode,
    },
    /// Unfilled rectangle stroked along `rect` with the given width.
    Rect {
        rect: Rect,
        stroke_width: f32,
        color: Color32,
        mode: CompositeMode,
    },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridConfig {
    /// Edge length of a cell, in image pixels.
    pub cell_size: u32,
    pub visible: bool,
    pub color: Color32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cell_size: 100,
            visible: false,
            color: Color32::from_rgb(127, 127, 127),
        }
    }
}

/// Thickness and line width of the overlay for the current zoom level.
///
/// `view_scale` is the number of image pixels covered by one screen pixel, so
/// both values stay constant on screen.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stroke {
    pub border: f32,
    pub line_width: f32,
}

impl Stroke {
    pub fn for_view_scale(view_scale: f32, border_px: f32) -> Self {
        Self {
            border: view_scale * border_px,
            line_width: view_scale,
        }
    }
}

/// Cells covering `[0, width) × [0, height)`, column by column. The last
/// column and row are clipped to the image.
pub fn cells(canvas: Canvas, cell_size: u32) -> impl Iterator<Item = Rect> {
    let step = cell_size.max(1);
    let xs = (0..canvas.width).step_by(step as usize);
    xs.flat_map(move |x| {
        (0..canvas.height).step_by(step as usize).map(move |y| {
            let w = step.min(canvas.width - x);
            let h = step.min(canvas.height - y);
            Rect::from_min_size(pos2(x as f32, y as f32), egui::vec2(w as f32, h as f32))
        })
    })
}

/// Whether some point's dot touches `cell` and its centre lies inside it.
pub fn is_occupied(cell: Rect, store: &AnnotationStore) -> bool {
    store.points().any(|point| {
        store.point_bounds(point.position).intersects(cell)
            && contains_half_open(cell, point.position)
    })
}

fn contains_half_open(rect: Rect, pos: Pos2) -> bool {
    pos.x >= rect.min.x && pos.x < rect.max.x && pos.y >= rect.min.y && pos.y < rect.max.y
}

fn too_small(cell: Rect, border: f32) -> bool {
    border > cell.width() || border * 2.0 > cell.height()
}

pub fn generate_overlay(
    config: &GridConfig,
    stroke: Stroke,
    store: &AnnotationStore,
) -> Vec<OverlayShape> {
    let Some(canvas) = store.canvas() else {
        return Vec::new();
    };
    if !config.visible {
        return Vec::new();
    }

    let step = config.cell_size.max(1);
    let (width, height) = (canvas.width as f32, canvas.height as f32);
    let mut shapes = Vec::new();

    for x in (step..canvas.width).step_by(step as usize) {
        shapes.push(OverlayShape::Line {
            from: pos2(x as f32, 0.0),
            to: pos2(x as f32, height),
            width: stroke.line_width,
            color: config.color,
            mode: CompositeMode::Invert,
        });
    }
    for y in (step..canvas.height).step_by(step as usize) {
        shapes.push(OverlayShape::Line {
            from: pos2(0.0, y as f32),
            to: pos2(width, y as f32),
            width: stroke.line_width,
            color: config.color,
            mode: CompositeMode::Invert,
        });
    }

    let border = stroke.border;
    for cell in cells(canvas, step) {
        if too_small(cell, border) || is_occupied(cell, store) {
            continue;
        }
        shapes.push(OverlayShape::Rect {
            rect: cell.shrink(border / 2.0),
            stroke_width: border,
            color: config.color,
            mode: CompositeMode::Invert,
        });
    }

    log::debug!(
        "grid overlay: {} shapes for {}x{} cell {}",
        shapes.len(),
        canvas.width,
        canvas.height,
        step
    );
    shapes
}
