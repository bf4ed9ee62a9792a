// THEORY:
// This file is the main entry point for the `ruler_vision` library crate.
// It exposes the pixel-boundary measurement engine: given a rasterized snapshot
// of a page and a pointer position, it reports how far the visually uniform
// surface around that position extends in each cardinal direction.
//
// The public surface is deliberately small:
// - `pipeline::MeasurementSession` owns one screenshot's derived buffers and runs
//   ray scans and area scans against them.
// - `area_task` turns an area scan into a cancellable, budgeted background task.
// - `session` wires sessions to a message-driven actor and keeps the
//   session-id -> session registry.
// All the buffer-level machinery lives in `core_modules`.

pub mod area_task;
pub mod config;
pub mod core_modules;
pub mod error;
pub mod pipeline;
pub mod session;

pub use config::RulerConfig;
pub use error::{MeasureError, MeasureResult};
pub use pipeline::MeasurementSession;
