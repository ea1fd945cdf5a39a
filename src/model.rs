use std::collections::BTreeMap;
use std::fmt;

// ── Identifiers ─────────────────────────────────────────────────────────────

/// Index of a tally category. Stable for the lifetime of the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CategoryId(pub usize);

/// Identity of a placed point. Ids grow monotonically, so ordering by id is
/// insertion order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PointId(u64);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub id: PointId,
    pub position: egui::Pos2,
    pub category: CategoryId,
}

// ── Canvas ──────────────────────────────────────────────────────────────────

/// Dimensions of the loaded image, in image pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Half-open containment: `[0, width) × [0, height)`.
    pub fn contains(&self, pos: egui::Pos2) -> bool {
        pos.x >= 0.0 && pos.x < self.width as f32 && pos.y >= 0.0 && pos.y < self.height as f32
    }
}

// ── Errors ──────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlacementError {
    /// The position lies outside the loaded image, or no image is loaded.
    OutOfBounds,
    /// Another point already sits under the position.
    Occupied,
    /// The point is not a member of the given category.
    NotFound,
}

impl fmt::Display for PlacementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlacementError::OutOfBounds => write!(f, "position is outside the image"),
            PlacementError::Occupied => write!(f, "a point is already placed there"),
            PlacementError::NotFound => write!(f, "no such point in this category"),
        }
    }
}

impl std::error::Error for PlacementError {}

// ── Categories ──────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct Category {
    color: egui::Color32,
    points: BTreeMap<PointId, egui::Pos2>,
}

impl Category {
    fn new(color: egui::Color32) -> Self {
        Self {
            color,
            points: BTreeMap::new(),
        }
    }

    pub fn color(&self) -> egui::Color32 {
        self.color
    }

    pub fn count(&self) -> usize {
        self.points.len()
    }

    pub fn contains(&self, id: PointId) -> bool {
        self.points.contains_key(&id)
    }

    /// Point ids and positions, in insertion order.
    pub fn points(&self) -> impl Iterator<Item = (PointId, egui::Pos2)> + '_ {
        self.points.iter().map(|(id, pos)| (*id, *pos))
    }
}

// ── Store ───────────────────────────────────────────────────────────────────

/// Owns every placed point, grouped by category, plus the shared point size.
#[derive(Clone, Debug)]
pub struct AnnotationStore {
    canvas: Option<Canvas>,
    categories: Vec<Category>,
    point_size: f32,
    next_id: u64,
}

pub const MIN_POINT_SIZE: f32 = 1.0;

impl AnnotationStore {
    pub fn new(colors: &[egui::Color32], point_size: f32) -> Self {
        Self {
            canvas: None,
            categories: colors.iter().copied().map(Category::new).collect(),
            point_size: point_size.max(MIN_POINT_SIZE),
            next_id: 0,
        }
    }

    pub fn canvas(&self) -> Option<Canvas> {
        self.canvas
    }

    /// Switches to a new image (or to none), dropping every point.
    pub fn set_canvas(&mut self, canvas: Option<Canvas>) {
        self.canvas = canvas;
        self.clear_all();
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn category(&self, category: CategoryId) -> &Category {
        &self.categories[category.0]
    }

    pub fn category_ids(&self) -> impl Iterator<Item = CategoryId> {
        (0..self.categories.len()).map(CategoryId)
    }

    /// Rendered diameter of every point. Hit-testing uses half of it.
    pub fn point_size(&self) -> f32 {
        self.point_size
    }

    pub fn hit_radius(&self) -> f32 {
        self.point_size / 2.0
    }

    pub fn add_point(
        &mut self,
        category: CategoryId,
        position: egui::Pos2,
    ) -> Result<Point, PlacementError> {
        assert!(category.0 < self.categories.len(), "unknown category {category:?}");
        match self.canvas {
            Some(canvas) if canvas.contains(position) => {}
            _ => return Err(PlacementError::OutOfBounds),
        }
        if self.find_point_near(position).is_some() {
            return Err(PlacementError::Occupied);
        }

        let id = PointId(self.next_id);
        self.next_id += 1;
        self.categories[category.0].points.insert(id, position);
        Ok(Point {
            id,
            position,
            category,
        })
    }

    pub fn remove_point(
        &mut self,
        category: CategoryId,
        id: PointId,
    ) -> Result<Point, PlacementError> {
        let position = self.categories[category.0]
            .points
            .remove(&id)
            .ok_or(PlacementError::NotFound)?;
        Ok(Point {
            id,
            position,
            category,
        })
    }

    /// Nearest point strictly within the hit radius of `position`. Equal
    /// distances resolve to the earliest placed point.
    pub fn find_point_near(&self, position: egui::Pos2) -> Option<Point> {
        let radius = self.hit_radius();
        let mut best: Option<(f32, Point)> = None;
        for point in self.points() {
            let dist = point.position.distance(position);
            if dist >= radius {
                continue;
            }
            let closer = match &best {
                None => true,
                Some((best_dist, best_point)) => {
                    dist < *best_dist || (dist == *best_dist && point.id < best_point.id)
                }
            };
            if closer {
                best = Some((dist, point));
            }
        }
        best.map(|(_, point)| point)
    }

    pub fn reset_category(&mut self, category: CategoryId) {
        self.categories[category.0].points.clear();
    }

    pub fn clear_all(&mut self) {
        for category in &mut self.categories {
            category.points.clear();
        }
    }

    pub fn recolor(&mut self, category: CategoryId, color: egui::Color32) {
        self.categories[category.0].color = color;
    }

    pub fn resize_all_points(&mut self, size: f32) {
        self.point_size = size.max(MIN_POINT_SIZE);
    }

    pub fn count(&self, category: CategoryId) -> usize {
        self.categories[category.0].count()
    }

    pub fn total(&self) -> usize {
        self.categories.iter().map(Category::count).sum()
    }

    /// Share of the total held by `category`, truncated to a whole percent.
    pub fn percent(&self, category: CategoryId) -> usize {
        let total = self.total();
        if total == 0 {
            0
        } else {
            self.count(category) * 100 / total
        }
    }

    /// Every point across all categories.
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.categories
            .iter()
            .enumerate()
            .flat_map(|(index, category)| {
                category.points().map(move |(id, position)| Point {
                    id,
                    position,
                    category: CategoryId(index),
                })
            })
    }

    /// Square covered by a point's rendered dot.
    pub fn point_bounds(&self, position: egui::Pos2) -> egui::Rect {
        egui::Rect::from_center_size(position, egui::vec2(self.point_size, self.point_size))
    }
}
