use anyhow::{anyhow, Result};
use eframe::egui;

use clicktally::app::{TallyApp, APP_NAME, APP_VERSION};
use clicktally::cli::{self, Command, USAGE};
use clicktally::settings::Settings;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = std::env::args().collect();
    let (config, image) = match cli::parse_args(&args) {
        Ok(Command::Run { config, image }) => (config, image),
        Ok(Command::Version) => {
            println!("{APP_NAME} {APP_VERSION}");
            return Ok(());
        }
        Ok(Command::Help) => {
            println!("{USAGE}");
            return Ok(());
        }
        Err(err) => {
            eprintln!("{err}\n{USAGE}");
            std::process::exit(2);
        }
    };

    let settings = match config {
        Some(path) => Settings::load(&path).unwrap_or_else(|err| {
            log::warn!("{err:#}; using default settings");
            Settings::default()
        }),
        None => Settings::default(),
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(settings.window_size)
            .with_title(APP_NAME),
        ..Default::default()
    };

    eframe::run_native(
        APP_NAME,
        options,
        Box::new(move |_cc| Ok(Box::new(TallyApp::new(settings, image)))),
    )
    .map_err(|err| anyhow!("failed to run eframe: {err}"))
}
