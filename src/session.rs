//! One tally session: the annotation store, the grid settings and the
//! toolbar state, driven by one handler per input event.

use std::ops::RangeInclusive;

use egui::{Color32, Pos2};

use crate::grid::{generate_overlay, GridConfig, OverlayShape, Stroke};
use crate::model::{AnnotationStore, Canvas, CategoryId, PlacementError, Point};
use crate::settings::Settings;

/// Growth factor applied per wheel notch when resizing with the wheel.
pub const WHEEL_STEP: f32 = 1.2;

pub struct Session {
    store: AnnotationStore,
    grid: GridConfig,
    border_px: f32,
    view_scale: f32,

    current: CategoryId,
    last: CategoryId,

    grid_range: RangeInclusive<u32>,
    size_range: RangeInclusive<f32>,
    sized_for_image: bool,

    overlay: Vec<OverlayShape>,
    revision: u64,
}

impl Session {
    pub fn new(settings: &Settings) -> Self {
        let colors = settings.category_colors();
        let last = CategoryId(if colors.len() > 1 { 1 } else { 0 });
        Self {
            store: AnnotationStore::new(&colors, settings.default_point_size),
            grid: GridConfig {
                color: settings.grid_color.to_egui(),
                ..GridConfig::default()
            },
            border_px: settings.grid_border_px,
            view_scale: 1.0,
            current: CategoryId(0),
            last,
            grid_range: 10..=500,
            size_range: 10.0..=100.0,
            sized_for_image: false,
            overlay: Vec::new(),
            revision: 0,
        }
    }

    // ── Accessors ───────────────────────────────────────────────────────────

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn canvas(&self) -> Option<Canvas> {
        self.store.canvas()
    }

    pub fn grid(&self) -> &GridConfig {
        &self.grid
    }

    pub fn current(&self) -> CategoryId {
        self.current
    }

    pub fn last(&self) -> CategoryId {
        self.last
    }

    pub fn grid_range(&self) -> RangeInclusive<u32> {
        self.grid_range.clone()
    }

    pub fn size_range(&self) -> RangeInclusive<f32> {
        self.size_range.clone()
    }

    pub fn stroke(&self) -> Stroke {
        Stroke::for_view_scale(self.view_scale, self.border_px)
    }

    /// Shapes of the most recent grid regeneration.
    pub fn overlay(&self) -> &[OverlayShape] {
        &self.overlay
    }

    /// Increases every time the overlay is regenerated.
    pub fn overlay_revision(&self) -> u64 {
        self.revision
    }

    /// Count of the selected category, as copied to the clipboard.
    pub fn current_count(&self) -> usize {
        self.store.count(self.current)
    }

    // ── Image ───────────────────────────────────────────────────────────────

    /// Switches to a freshly decoded image, or to none after a failed load.
    /// Either way every point is dropped.
    pub fn load_image(&mut self, canvas: Option<Canvas>) {
        self.store.set_canvas(canvas);
        if let Some(canvas) = canvas {
            let (w, h) = (canvas.width, canvas.height);
            let longest = w.max(h);

            let grid_min = (w / 20).max(1);
            self.grid_range = grid_min..=(longest / 2).max(grid_min);
            let size_min = (w / 200).max(1) as f32;
            self.size_range = size_min..=((longest / 10) as f32).max(size_min);

            if !self.sized_for_image {
                self.sized_for_image = true;
                self.set_grid_size(w / 5);
                self.set_point_size((w / 100) as f32);
            } else {
                let grid = self.grid.cell_size;
                let size = self.store.point_size();
                let clamped_grid = clamp_u32(grid, &self.grid_range);
                if clamped_grid != grid {
                    self.set_grid_size(clamped_grid);
                }
                self.set_point_size(size);
            }
        }
        self.regenerate();
    }

    pub fn set_view_scale(&mut self, view_scale: f32) {
        if view_scale > 0.0 && view_scale != self.view_scale {
            self.view_scale = view_scale;
            self.regenerate();
        }
    }

    // ── Points ──────────────────────────────────────────────────────────────

    /// Left click: place a point of the selected category.
    pub fn place_point(&mut self, position: Pos2) -> Result<Point, PlacementError> {
        match self.store.add_point(self.current, position) {
            Ok(point) => {
                log::debug!(
                    "placed {:?} in category {} at ({:.1}, {:.1})",
                    point.id,
                    point.category.0 + 1,
                    position.x,
                    position.y
                );
                self.regenerate();
                Ok(point)
            }
            Err(err) => {
                log::debug!("rejected click at ({:.1}, {:.1}): {err}", position.x, position.y);
                Err(err)
            }
        }
    }

    /// Right click: delete whichever point lies under the cursor, if any.
    pub fn remove_point_at(&mut self, position: Pos2) -> Option<Point> {
        let found = self.store.find_point_near(position)?;
        let removed = match self.store.remove_point(found.category, found.id) {
            Ok(point) => point,
            Err(err) => {
                debug_assert!(false, "point {:?} was just found: {err}", found.id);
                return None;
            }
        };
        log::debug!("removed {:?} from category {}", removed.id, removed.category.0 + 1);
        self.regenerate();
        Some(removed)
    }

    // ── Categories ──────────────────────────────────────────────────────────

    pub fn select_category(&mut self, category: CategoryId) {
        assert!(
            category.0 < self.store.categories().len(),
            "unknown category {category:?}"
        );
        self.last = self.current;
        self.current = category;
    }

    /// Jump back to the previously selected category.
    pub fn swap_category(&mut self) {
        self.select_category(self.last);
    }

    pub fn reset_category(&mut self, category: CategoryId) {
        self.store.reset_category(category);
        self.regenerate();
    }

    pub fn clear_all(&mut self) {
        self.store.clear_all();
        self.regenerate();
    }

    pub fn recolor(&mut self, category: CategoryId, color: Color32) {
        self.store.recolor(category, color);
    }

    // ── Sliders ─────────────────────────────────────────────────────────────

    pub fn set_point_size(&mut self, size: f32) {
        let (lo, hi) = (*self.size_range.start(), *self.size_range.end());
        self.store.resize_all_points(size.clamp(lo, hi));
    }

    /// Moving the grid slider also shows the grid.
    pub fn set_grid_size(&mut self, cell_size: u32) {
        self.grid.cell_size = clamp_u32(cell_size, &self.grid_range);
        self.grid.visible = true;
        self.regenerate();
    }

    pub fn set_grid_visible(&mut self, visible: bool) {
        self.grid.visible = visible;
        self.regenerate();
    }

    pub fn toggle_grid(&mut self) {
        self.set_grid_visible(!self.grid.visible);
    }

    /// Scales the point size by `WHEEL_STEP` per notch; negative notches shrink.
    pub fn wheel_point_size(&mut self, notches: f32) {
        let size = self.store.point_size() * WHEEL_STEP.powf(notches);
        self.set_point_size(size);
    }

    pub fn wheel_grid_size(&mut self, notches: f32) {
        let size = self.grid.cell_size as f32 * WHEEL_STEP.powf(notches);
        self.set_grid_size(size.round().max(1.0) as u32);
    }

    fn regenerate(&mut self) {
        self.overlay = generate_overlay(&self.grid, self.stroke(), &self.store);
        self.revision += 1;
    }
}

fn clamp_u32(value: u32, range: &RangeInclusive<u32>) -> u32 {
    value.clamp(*range.start(), *range.end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;

    fn session() -> Session {
        let mut session = Session::new(&Settings::default());
        session.load_image(Some(Canvas::new(1000, 600)));
        session
    }

    #[test]
    fn first_load_sizes_grid_and_points() {
        let session = session();
        assert_eq!(session.grid().cell_size, 200);
        assert!(session.grid().visible);
        assert_eq!(session.store().point_size(), 10.0);
        assert_eq!(session.grid_range(), 50..=500);
        assert_eq!(session.size_range(), 5.0..=100.0);
        assert!(!session.overlay().is_empty());
    }

    #[test]
    fn later_loads_keep_sizes_within_new_ranges() {
        let mut session = session();
        session.set_grid_size(120);
        session.load_image(Some(Canvas::new(200, 100)));
        // grid range is now 10..=100
        assert_eq!(session.grid().cell_size, 100);
        // size range is now 1..=20
        assert_eq!(session.store().point_size(), 10.0);
    }

    #[test]
    fn failed_load_clears_everything() {
        let mut session = session();
        session.place_point(pos2(10.0, 10.0)).unwrap();
        session.load_image(None);
        assert_eq!(session.store().total(), 0);
        assert!(session.canvas().is_none());
        assert!(session.overlay().is_empty());
        assert_eq!(
            session.place_point(pos2(10.0, 10.0)),
            Err(PlacementError::OutOfBounds)
        );
    }

    #[test]
    fn placing_and_removing_refresh_the_overlay() {
        let mut session = session();
        let rects = |s: &Session| {
            s.overlay()
                .iter()
                .filter(|shape| matches!(shape, OverlayShape::Rect { .. }))
                .count()
        };
        let before = rects(&session);
        let revision = session.overlay_revision();

        session.place_point(pos2(50.0, 50.0)).unwrap();
        assert_eq!(rects(&session), before - 1);
        assert!(session.overlay_revision() > revision);

        let removed = session.remove_point_at(pos2(52.0, 50.0)).unwrap();
        assert_eq!(removed.position, pos2(50.0, 50.0));
        assert_eq!(rects(&session), before);
        assert!(session.remove_point_at(pos2(52.0, 50.0)).is_none());
    }

    #[test]
    fn right_click_removes_from_the_owning_category() {
        let mut session = session();
        session.place_point(pos2(50.0, 50.0)).unwrap();
        session.select_category(CategoryId(1));
        session.place_point(pos2(250.0, 250.0)).unwrap();
        session.select_category(CategoryId(2));

        let removed = session.remove_point_at(pos2(51.0, 51.0)).unwrap();
        assert_eq!(removed.category, CategoryId(0));
        assert_eq!(session.store().count(CategoryId(0)), 0);
        assert_eq!(session.store().count(CategoryId(1)), 1);
        assert!(session.remove_point_at(pos2(51.0, 51.0)).is_none());
    }

    #[test]
    fn rejected_click_changes_nothing() {
        let mut session = session();
        session.place_point(pos2(50.0, 50.0)).unwrap();
        let revision = session.overlay_revision();
        assert_eq!(session.place_point(pos2(50.0, 50.0)), Err(PlacementError::Occupied));
        assert_eq!(
            session.place_point(pos2(1000.0, 50.0)),
            Err(PlacementError::OutOfBounds)
        );
        assert_eq!(session.overlay_revision(), revision);
        assert_eq!(session.store().total(), 1);
    }

    #[test]
    fn points_go_to_the_selected_category() {
        let mut session = session();
        session.select_category(CategoryId(2));
        let point = session.place_point(pos2(300.0, 300.0)).unwrap();
        assert_eq!(point.category, CategoryId(2));
        assert_eq!(session.current_count(), 1);
        session.select_category(CategoryId(1));
        assert_eq!(session.current_count(), 0);
    }

    #[test]
    fn swap_returns_to_previous_category() {
        let mut session = Session::new(&Settings::default());
        assert_eq!(session.current(), CategoryId(0));
        session.swap_category();
        assert_eq!(session.current(), CategoryId(1));
        session.select_category(CategoryId(2));
        session.swap_category();
        assert_eq!(session.current(), CategoryId(1));
        assert_eq!(session.last(), CategoryId(2));
    }

    #[test]
    #[should_panic]
    fn selecting_unknown_category_panics() {
        let mut session = Session::new(&Settings::default());
        session.select_category(CategoryId(3));
    }

    #[test]
    fn grid_slider_shows_grid_and_clamps() {
        let mut session = session();
        session.set_grid_visible(false);
        assert!(session.overlay().is_empty());
        session.set_grid_size(5);
        assert!(session.grid().visible);
        assert_eq!(session.grid().cell_size, 50);
        session.toggle_grid();
        assert!(!session.grid().visible);
    }

    #[test]
    fn wheel_scales_and_clamps() {
        let mut session = session();
        session.wheel_point_size(1.0);
        assert!((session.store().point_size() - 12.0).abs() < 1e-4);
        session.wheel_point_size(-1.0);
        assert!((session.store().point_size() - 10.0).abs() < 1e-4);
        session.wheel_point_size(40.0);
        assert_eq!(session.store().point_size(), 100.0);

        session.wheel_grid_size(1.0);
        assert_eq!(session.grid().cell_size, 240);
        session.wheel_grid_size(-30.0);
        assert_eq!(session.grid().cell_size, 50);
    }

    #[test]
    fn zooming_changes_border_thickness() {
        let mut session = session();
        session.set_view_scale(2.0);
        let border = session.overlay().iter().find_map(|shape| match shape {
            OverlayShape::Rect { stroke_width, .. } => Some(*stroke_width),
            _ => None,
        });
        assert_eq!(border, Some(20.0));
    }

    #[test]
    fn reset_and_clear() {
        let mut session = session();
        session.place_point(pos2(10.0, 10.0)).unwrap();
        session.select_category(CategoryId(1));
        session.place_point(pos2(500.0, 10.0)).unwrap();

        session.reset_category(CategoryId(0));
        assert_eq!(session.store().total(), 1);
        assert_eq!(session.store().count(CategoryId(1)), 1);

        session.clear_all();
        assert_eq!(session.store().total(), 0);
    }
}
