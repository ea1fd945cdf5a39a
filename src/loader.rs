use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use image::RgbaImage;

use crate::model::Canvas;

/// Extensions offered by the open dialog.
pub const IMAGE_EXTENSIONS: &[&str] = &["bmp", "png", "gif", "jpg", "jpeg", "tif", "tiff"];

pub struct LoadedImage {
    pub path: PathBuf,
    pub pixels: RgbaImage,
}

impl LoadedImage {
    pub fn canvas(&self) -> Canvas {
        Canvas::new(self.pixels.width(), self.pixels.height())
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned()
    }
}

pub fn load_image(path: &Path) -> Result<LoadedImage> {
    let decoded = image::open(path).with_context(|| format!("Cannot open: {}", path.display()))?;
    let pixels = decoded.to_rgba8();
    if pixels.width() == 0 || pixels.height() == 0 {
        bail!("Cannot open: {} (empty image)", path.display());
    }
    log::info!(
        "loaded {} ({}x{})",
        path.display(),
        pixels.width(),
        pixels.height()
    );
    Ok(LoadedImage {
        path: path.to_path_buf(),
        pixels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("clicktally-{}-{}", std::process::id(), name))
    }

    #[test]
    fn decodes_png() {
        let path = scratch("ok.png");
        RgbaImage::from_pixel(7, 5, Rgba([1, 2, 3, 255]))
            .save(&path)
            .unwrap();

        let loaded = load_image(&path).unwrap();
        assert_eq!(loaded.canvas(), Canvas::new(7, 5));
        assert_eq!(loaded.file_name(), path.file_name().unwrap().to_string_lossy());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn garbage_is_a_decode_failure() {
        let path = scratch("bad.png");
        std::fs::write(&path, b"definitely not a png").unwrap();
        let err = load_image(&path).err().unwrap();
        assert!(err.to_string().starts_with("Cannot open:"));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_file_is_a_failure() {
        assert!(load_image(&scratch("missing.png")).is_err());
    }
}
