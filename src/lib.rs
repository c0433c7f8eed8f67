//! Personal Telegram channel aggregator: scrapes public channels into a SQLite
//! post store and serves tagging, feeds, bookmarks and search over HTTP.

pub mod ai;
pub mod api;
pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod scrape;

pub use app::App;
pub use config::Config;
pub use error::{AppError, Result};
