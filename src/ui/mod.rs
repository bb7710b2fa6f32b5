//! Ratatui front-end. Every read and write goes through [`ApiClient`], so the
//! terminal UI sees exactly what an HTTP client would.

mod app;
mod client;
mod forms;
mod helpers;
mod terminal;

pub use app::App;
pub use client::ApiClient;
pub use terminal::run_app;
