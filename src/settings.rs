use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_egui(self) -> egui::Color32 {
        egui::Color32::from_rgb(self.r, self.g, self.b)
    }
}

/// User-tunable defaults. Every field may be omitted from the JSON file.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// One entry per tally category, in toolbar order.
    pub categories: Vec<Rgb>,
    /// Opacity of placed points, 0.0 to 1.0.
    pub point_alpha: f32,
    pub default_point_size: f32,
    pub grid_color: Rgb,
    /// Cell border thickness in screen pixels.
    pub grid_border_px: f32,
    pub window_size: [f32; 2],
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            categories: vec![
                Rgb::new(255, 0, 0),
                Rgb::new(0, 128, 0),
                Rgb::new(0, 0, 255),
            ],
            point_alpha: 0.7,
            default_point_size: 25.0,
            grid_color: Rgb::new(127, 127, 127),
            grid_border_px: 10.0,
            window_size: [1200.0, 800.0],
        }
    }
}

impl Settings {
    pub fn from_json(data: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(data).context("invalid settings JSON")?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read settings file {}", path.display()))?;
        Self::from_json(&data).with_context(|| format!("in {}", path.display()))
    }

    fn validate(&self) -> Result<()> {
        if self.categories.is_empty() {
            bail!("at least one category color is required");
        }
        if !(0.0..=1.0).contains(&self.point_alpha) {
            bail!("point_alpha must be within 0.0..=1.0, got {}", self.point_alpha);
        }
        if self.grid_border_px <= 0.0 {
            bail!("grid_border_px must be positive");
        }
        Ok(())
    }

    pub fn category_colors(&self) -> Vec<egui::Color32> {
        self.categories.iter().map(|c| c.to_egui()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let settings = Settings::from_json("{}").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.category_colors().len(), 3);
    }

    #[test]
    fn partial_file_overrides_fields() {
        let settings = Settings::from_json(
            r#"{ "categories": [{"r": 1, "g": 2, "b": 3}, {"r": 4, "g": 5, "b": 6}, {"r": 7, "g": 8, "b": 9}, {"r": 0, "g": 0, "b": 0}],
                 "grid_border_px": 6.0 }"#,
        )
        .unwrap();
        assert_eq!(settings.categories.len(), 4);
        assert_eq!(settings.categories[1], Rgb::new(4, 5, 6));
        assert_eq!(settings.grid_border_px, 6.0);
        assert_eq!(settings.point_alpha, 0.7);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(Settings::from_json(r#"{ "categories": [] }"#).is_err());
        assert!(Settings::from_json(r#"{ "point_alpha": 1.5 }"#).is_err());
        assert!(Settings::from_json(r#"{ "grid_border_px": 0 }"#).is_err());
        assert!(Settings::from_json("not json").is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = Settings::load(Path::new("/nonexistent/clicktally.json")).unwrap_err();
        assert!(err.to_string().contains("cannot read settings file"));
    }
}
