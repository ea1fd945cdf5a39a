//! Click points onto an image by category and keep running counts.

pub mod app;
pub mod cli;
pub mod grid;
pub mod loader;
pub mod model;
pub mod raster;
pub mod session;
pub mod settings;
