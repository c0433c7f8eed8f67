use thiserror::Error;

use crate::scrape::SourceError;

#[derive(Error, Debug)]
pub enum AppError {
    /// Missing post, tag, feed, channel or bookmark.
    #[error("{0} not found: {1}")]
    NotFound(&'static str, String),

    /// Bad input, duplicate names and writes to the virtual feed.
    #[error("{0}")]
    Validation(String),

    #[error("upstream unavailable: {0}")]
    Upstream(#[from] SourceError),

    #[error("database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("config error: {0}")]
    Config(String),
}

impl AppError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        AppError::NotFound(kind, id.to_string())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
