//! Application runtime for terminal UIs.
//!
//! [`app`] holds the runtime core (state store, event bus, task manager,
//! navigator and the [`App`](app::controller::App) controller that composes
//! them). [`ui`] draws whatever the navigator mounted, and [`pages`] is the
//! demo page set the binary ships with.

pub mod app;
pub mod config;
pub mod logging;
pub mod pages;
pub mod ui;
