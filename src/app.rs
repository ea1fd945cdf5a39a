use std::path::PathBuf;

use eframe::egui;
use egui_extras::{Column, TableBuilder};

use crate::loader::{self, LoadedImage, IMAGE_EXTENSIONS};
use crate::model::CategoryId;
use crate::raster;
use crate::session::{Session, WHEEL_STEP};
use crate::settings::Settings;

pub const APP_NAME: &str = "clicktally";
pub const APP_DESC: &str = "A tally counter for images";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

const SHORTCUTS: &[(&str, &str)] = &[
    ("Left click", "Place a point of the selected color"),
    ("Right click", "Delete the point under the cursor"),
    ("Right/middle drag", "Pan the image"),
    ("Wheel", "Zoom"),
    ("Ctrl + wheel", "Resize points"),
    ("Shift + wheel", "Resize the grid"),
    ("1, 2, 3 …", "Select a color"),
    ("x", "Switch to the previous color"),
    ("g", "Toggle the grid"),
    ("c", "Copy the selected count to the clipboard"),
    ("o", "Open an image"),
    ("?", "Show this help"),
];

const MIN_ZOOM: f32 = 0.01;
const MAX_ZOOM: f32 = 50.0;
/// Scroll distance egui reports in points for one wheel notch.
const POINTS_PER_NOTCH: f32 = 50.0;
/// Quiet time after the last zoom notch before the overlay is re-rasterized.
const ZOOM_SETTLE_SECS: f64 = 0.15;

// ── App ─────────────────────────────────────────────────────────────────────

struct Picture {
    image: LoadedImage,
    texture: Option<egui::TextureHandle>,
    shown_revision: Option<u64>,
}

/// Holds back an action until input has been quiet for `delay` seconds.
struct Debounce {
    delay: f64,
    due: Option<f64>,
}

#[derive(Debug, PartialEq)]
enum Settle {
    Idle,
    Waiting(f64),
    Ready,
}

impl Debounce {
    fn new(delay: f64) -> Self {
        Self { delay, due: None }
    }

    fn touch(&mut self, now: f64) {
        self.due = Some(now + self.delay);
    }

    fn poll(&mut self, now: f64) -> Settle {
        match self.due {
            None => Settle::Idle,
            Some(due) if now < due => Settle::Waiting(due - now),
            Some(_) => {
                self.due = None;
                Settle::Ready
            }
        }
    }
}

enum Startup {
    Open(PathBuf),
    Ask,
    Done,
}

pub struct TallyApp {
    settings: Settings,
    session: Session,
    picture: Option<Picture>,
    startup: Startup,

    // pan & zoom
    pan: egui::Vec2,
    zoom: f32,
    zoom_settle: Debounce,
    fit_pending: bool,

    show_help: bool,
    status: Option<String>,
}

impl TallyApp {
    pub fn new(settings: Settings, image_path: Option<PathBuf>) -> Self {
        let session = Session::new(&settings);
        Self {
            settings,
            session,
            picture: None,
            startup: image_path.map_or(Startup::Ask, Startup::Open),
            pan: egui::Vec2::ZERO,
            zoom: 1.0,
            zoom_settle: Debounce::new(ZOOM_SETTLE_SECS),
            fit_pending: false,
            show_help: false,
            status: None,
        }
    }

    fn image_size(&self) -> (f32, f32) {
        self.session
            .canvas()
            .map(|c| (c.width as f32, c.height as f32))
            .unwrap_or((0.0, 0.0))
    }

    fn open_dialog(&mut self, ctx: &egui::Context) {
        let picked = rfd::FileDialog::new()
            .set_title("Load Image")
            .add_filter("Images", IMAGE_EXTENSIONS)
            .pick_file();
        if let Some(path) = picked {
            self.load(ctx, path);
        }
    }

    fn load(&mut self, ctx: &egui::Context, path: PathBuf) {
        match loader::load_image(&path) {
            Ok(image) => {
                self.session.load_image(Some(image.canvas()));
                ctx.send_viewport_cmd(egui::ViewportCommand::Title(format!(
                    "{APP_NAME} — {}",
                    image.file_name()
                )));
                self.picture = Some(Picture {
                    image,
                    texture: None,
                    shown_revision: None,
                });
                self.fit_pending = true;
                self.status = None;
            }
            Err(err) => {
                log::warn!("{err:#}");
                self.session.load_image(None);
                self.picture = None;
                ctx.send_viewport_cmd(egui::ViewportCommand::Title(APP_NAME.to_owned()));
                let _ = rfd::MessageDialog::new()
                    .set_level(rfd::MessageLevel::Error)
                    .set_title("Load error")
                    .set_description(format!("{err:#}"))
                    .set_buttons(rfd::MessageButtons::Ok)
                    .show();
            }
        }
    }

    /// Convert image-space coords to screen-space
    fn image_to_screen(&self, canvas_rect: egui::Rect, img_pos: egui::Pos2) -> egui::Pos2 {
        let (w, h) = self.image_size();
        canvas_rect.center() + self.pan + (img_pos.to_vec2() - egui::vec2(w, h) * 0.5) * self.zoom
    }

    /// Convert screen-space coords to image-space
    fn screen_to_image(&self, canvas_rect: egui::Rect, screen_pos: egui::Pos2) -> egui::Pos2 {
        let (w, h) = self.image_size();
        let rel = screen_pos - canvas_rect.center() - self.pan;
        egui::pos2(rel.x / self.zoom + w * 0.5, rel.y / self.zoom + h * 0.5)
    }

    fn image_rect_on_screen(&self, canvas_rect: egui::Rect) -> egui::Rect {
        let (w, h) = self.image_size();
        egui::Rect::from_min_max(
            self.image_to_screen(canvas_rect, egui::Pos2::ZERO),
            self.image_to_screen(canvas_rect, egui::pos2(w, h)),
        )
    }

    fn fit_to(&mut self, canvas_rect: egui::Rect) {
        let (w, h) = self.image_size();
        if w > 0.0 && h > 0.0 {
            let zoom = (canvas_rect.width() / w).min(canvas_rect.height() / h);
            self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
            self.pan = egui::Vec2::ZERO;
        }
    }

    /// Re-rasterizes the overlay whenever the session regenerated it.
    fn ensure_texture(&mut self, ctx: &egui::Context) {
        let revision = self.session.overlay_revision();
        let Some(picture) = self.picture.as_mut() else {
            return;
        };
        if picture.shown_revision == Some(revision) && picture.texture.is_some() {
            return;
        }
        let composed = raster::compose_overlay(&picture.image.pixels, self.session.overlay());
        let color_image = raster::to_color_image(&composed);
        match picture.texture.as_mut() {
            Some(texture) => texture.set(color_image, egui::TextureOptions::LINEAR),
            None => {
                picture.texture =
                    Some(ctx.load_texture("image", color_image, egui::TextureOptions::LINEAR));
            }
        }
        picture.shown_revision = Some(revision);
    }

    fn draw_points(&self, painter: &egui::Painter, canvas_rect: egui::Rect) {
        let store = self.session.store();
        let radius = store.hit_radius() * self.zoom;
        let alpha = (self.settings.point_alpha * 255.0).round() as u8;
        for category in store.categories() {
            let c = category.color();
            let fill = egui::Color32::from_rgba_unmultiplied(c.r(), c.g(), c.b(), alpha);
            for (_, pos) in category.points() {
                painter.circle_filled(self.image_to_screen(canvas_rect, pos), radius, fill);
            }
        }
    }

    fn on_text(&mut self, ctx: &egui::Context, text: &str) {
        let categories = self.session.store().categories().len();
        if let Ok(n) = text.parse::<usize>() {
            if (1..=categories).contains(&n) {
                self.session.select_category(CategoryId(n - 1));
            }
            return;
        }
        match text {
            "x" => self.session.swap_category(),
            "o" => self.open_dialog(ctx),
            "g" => self.session.toggle_grid(),
            "?" => self.show_help = true,
            "c" => ctx.copy_text(self.session.current_count().to_string()),
            _ => {}
        }
    }

    fn on_wheel(
        &mut self,
        delta: f32,
        modifiers: egui::Modifiers,
        cursor: Option<egui::Pos2>,
        canvas_rect: egui::Rect,
        now: f64,
    ) {
        if modifiers.ctrl || modifiers.command {
            self.session.wheel_point_size(delta);
        } else if modifiers.shift {
            self.session.wheel_grid_size(delta);
        } else {
            let new_zoom = (self.zoom * WHEEL_STEP.powf(delta)).clamp(MIN_ZOOM, MAX_ZOOM);
            if let Some(cursor) = cursor {
                let cursor_rel = cursor - canvas_rect.center() - self.pan;
                self.pan -= cursor_rel * (new_zoom / self.zoom - 1.0);
            }
            self.zoom = new_zoom;
            self.zoom_settle.touch(now);
        }
    }

    fn category_controls(&mut self, ui: &mut egui::Ui, id: CategoryId) {
        let store = self.session.store();
        let mut color = store.category(id).color();
        let count = store.count(id);
        let percent = store.percent(id);
        let selected = self.session.current() == id;
        let n = id.0 + 1;

        if ui
            .radio(selected, "")
            .on_hover_text(format!("Select color {n}"))
            .clicked()
        {
            self.session.select_category(id);
        }
        let picker = egui::color_picker::color_edit_button_srgba(
            ui,
            &mut color,
            egui::color_picker::Alpha::Opaque,
        );
        if picker.on_hover_text(format!("Change color {n}")).changed() {
            self.session.recolor(id, color);
        }
        ui.label(
            egui::RichText::new(format!("{count:4} {percent:3}%"))
                .monospace()
                .strong()
                .color(contrasting_text(color))
                .background_color(color),
        );
        if ui
            .small_button("✖")
            .on_hover_text(format!("Clear color {n}"))
            .clicked()
        {
            self.session.reset_category(id);
        }
    }

    fn toolbar(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("Open").clicked() {
                self.open_dialog(ctx);
            }
            if ui.button("Clear").clicked() {
                self.session.clear_all();
            }
            let mut grid_on = self.session.grid().visible;
            if ui.toggle_value(&mut grid_on, "Grid").changed() {
                self.session.set_grid_visible(grid_on);
            }
            let mut cell_size = self.session.grid().cell_size;
            if ui
                .add(egui::Slider::new(&mut cell_size, self.session.grid_range()).show_value(false))
                .on_hover_text("Grid size")
                .changed()
            {
                self.session.set_grid_size(cell_size);
            }
            ui.separator();
            let mut point_size = self.session.store().point_size();
            if ui
                .add(egui::Slider::new(&mut point_size, self.session.size_range()).show_value(false))
                .on_hover_text("Point size")
                .changed()
            {
                self.session.set_point_size(point_size);
            }
            let ids: Vec<CategoryId> = self.session.store().category_ids().collect();
            for id in ids {
                ui.separator();
                self.category_controls(ui, id);
            }
            ui.separator();
            ui.label(format!(" Total: {:4} ", self.session.store().total()));
            if let Some(status) = &self.status {
                ui.separator();
                ui.colored_label(ui.visuals().error_fg_color, status);
            }
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("?").on_hover_text("Help").clicked() {
                    self.show_help = true;
                }
            });
        });
    }

    fn help_window(&mut self, ctx: &egui::Context) {
        egui::Window::new("Help")
            .open(&mut self.show_help)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                ui.heading(format!("{APP_NAME} {APP_VERSION}"));
                ui.label(APP_DESC);
                ui.separator();
                TableBuilder::new(ui)
                    .striped(true)
                    .column(Column::auto())
                    .column(Column::remainder())
                    .header(20.0, |mut header| {
                        header.col(|ui| {
                            ui.strong("Input");
                        });
                        header.col(|ui| {
                            ui.strong("Action");
                        });
                    })
                    .body(|mut body| {
                        for (input, action) in SHORTCUTS {
                            body.row(18.0, |mut row| {
                                row.col(|ui| {
                                    ui.monospace(*input);
                                });
                                row.col(|ui| {
                                    ui.label(*action);
                                });
                            });
                        }
                    });
            });
    }
}

/// Black on light swatches, white on dark ones.
fn contrasting_text(bg: egui::Color32) -> egui::Color32 {
    let gray = (bg.r() as u32 * 11 + bg.g() as u32 * 16 + bg.b() as u32 * 5) / 32;
    if gray >= 127 {
        egui::Color32::BLACK
    } else {
        egui::Color32::WHITE
    }
}

fn wheel_notches(unit: egui::MouseWheelUnit, delta: egui::Vec2) -> f32 {
    let d = if delta.y != 0.0 { delta.y } else { delta.x };
    match unit {
        egui::MouseWheelUnit::Point => d / POINTS_PER_NOTCH,
        egui::MouseWheelUnit::Line | egui::MouseWheelUnit::Page => d,
    }
}

// ── eframe App impl ────────────────────────────────────────────────────────

impl eframe::App for TallyApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        match std::mem::replace(&mut self.startup, Startup::Done) {
            Startup::Open(path) => self.load(ctx, path),
            Startup::Ask => self.open_dialog(ctx),
            Startup::Done => {}
        }

        // Keyboard shortcuts
        if !ctx.wants_keyboard_input() {
            let texts: Vec<String> = ctx.input(|i| {
                i.events
                    .iter()
                    .filter_map(|e| match e {
                        egui::Event::Text(t) => Some(t.clone()),
                        _ => None,
                    })
                    .collect()
            });
            for text in texts {
                self.on_text(ctx, &text);
            }
        }

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            self.toolbar(ctx, ui);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let (response, painter) =
                ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
            let canvas_rect = response.rect;
            painter.rect_filled(canvas_rect, 0.0, egui::Color32::from_gray(40));

            if self.picture.is_none() {
                painter.text(
                    canvas_rect.center(),
                    egui::Align2::CENTER_CENTER,
                    "Press o to open an image",
                    egui::FontId::proportional(18.0),
                    egui::Color32::from_gray(160),
                );
                return;
            }

            if self.fit_pending {
                self.fit_to(canvas_rect);
                self.fit_pending = false;
            }

            // Pan with the secondary or middle button
            if response.dragged_by(egui::PointerButton::Secondary)
                || response.dragged_by(egui::PointerButton::Middle)
            {
                self.pan += response.drag_delta();
            }

            // Wheel: zoom, or resize points / grid with modifiers
            if response.hovered() {
                let wheels: Vec<(f32, egui::Modifiers)> = ctx.input(|i| {
                    i.events
                        .iter()
                        .filter_map(|e| match e {
                            egui::Event::MouseWheel {
                                unit,
                                delta,
                                modifiers,
                                ..
                            } => Some((wheel_notches(*unit, *delta), *modifiers)),
                            _ => None,
                        })
                        .collect()
                });
                let cursor = response.hover_pos();
                let now = ctx.input(|i| i.time);
                for (notches, modifiers) in wheels {
                    if notches != 0.0 {
                        self.on_wheel(notches, modifiers, cursor, canvas_rect, now);
                    }
                }
            }

            if response.clicked() {
                if let Some(pos) = response.interact_pointer_pos() {
                    let img_pos = self.screen_to_image(canvas_rect, pos);
                    self.status = match self.session.place_point(img_pos) {
                        Ok(_) => None,
                        Err(err) => Some(format!("Cannot place point: {err}")),
                    };
                }
            }
            if response.secondary_clicked() {
                if let Some(pos) = response.interact_pointer_pos() {
                    let img_pos = self.screen_to_image(canvas_rect, pos);
                    self.session.remove_point_at(img_pos);
                }
            }

            // The border stays scaled with the image while zooming, and is
            // re-rasterized at its screen thickness once the wheel rests.
            match self.zoom_settle.poll(ctx.input(|i| i.time)) {
                Settle::Waiting(left) => {
                    ctx.request_repaint_after(std::time::Duration::from_secs_f64(left));
                }
                Settle::Idle | Settle::Ready => self.session.set_view_scale(1.0 / self.zoom),
            }
            self.ensure_texture(ctx);

            if let Some(texture) = self.picture.as_ref().and_then(|p| p.texture.as_ref()) {
                painter.image(
                    texture.id(),
                    self.image_rect_on_screen(canvas_rect),
                    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    egui::Color32::WHITE,
                );
            }
            self.draw_points(&painter, canvas_rect);
        });

        self.help_window(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_contrast_follows_luminance() {
        assert_eq!(contrasting_text(egui::Color32::from_rgb(255, 0, 0)), egui::Color32::WHITE);
        assert_eq!(contrasting_text(egui::Color32::from_rgb(0, 255, 0)), egui::Color32::BLACK);
        assert_eq!(contrasting_text(egui::Color32::from_rgb(0, 0, 255)), egui::Color32::WHITE);
        assert_eq!(contrasting_text(egui::Color32::YELLOW), egui::Color32::BLACK);
    }

    #[test]
    fn zoom_settles_after_the_last_notch() {
        let mut settle = Debounce::new(0.15);
        assert_eq!(settle.poll(1.0), Settle::Idle);

        settle.touch(1.0);
        assert!(matches!(settle.poll(1.1), Settle::Waiting(left) if (left - 0.05).abs() < 1e-9));
        // another notch pushes the deadline back
        settle.touch(1.1);
        assert!(matches!(settle.poll(1.2), Settle::Waiting(_)));
        assert_eq!(settle.poll(1.3), Settle::Ready);
        assert_eq!(settle.poll(1.4), Settle::Idle);
    }

    #[test]
    fn wheel_units_map_to_notches() {
        let notches = wheel_notches(egui::MouseWheelUnit::Line, egui::vec2(0.0, -1.0));
        assert_eq!(notches, -1.0);
        let notches = wheel_notches(egui::MouseWheelUnit::Point, egui::vec2(0.0, 100.0));
        assert_eq!(notches, 2.0);
        // shift+wheel arrives as horizontal scroll on some platforms
        let notches = wheel_notches(egui::MouseWheelUnit::Line, egui::vec2(3.0, 0.0));
        assert_eq!(notches, 3.0);
    }
}
