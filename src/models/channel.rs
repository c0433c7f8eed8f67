use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// A tracked source channel and its ingestion cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: i64,
    pub username: String,
    /// Display name
    pub name: String,
    /// Platform-side numeric id, when the source exposes one
    pub channel_id: Option<i64>,
    /// Highest message id already considered by ingestion
    pub latest_message_id: Option<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewChannel {
    pub username: String,
    pub name: String,
    pub channel_id: Option<i64>,
    pub latest_message_id: Option<i64>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelUpdate {
    pub name: Option<String>,
    pub is_active: Option<bool>,
}

static USERNAME_RE: OnceLock<Regex> = OnceLock::new();

/// Accepts `name`, `@name`, `t.me/name` and `https://t.me/s/name` and returns `name`.
pub fn normalize_username(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let without_host = trimmed
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("www.");
    let without_host = without_host
        .strip_prefix("t.me/")
        .or_else(|| without_host.strip_prefix("telegram.me/"))
        .unwrap_or(without_host);
    let without_preview = without_host.strip_prefix("s/").unwrap_or(without_host);
    let username = without_preview.trim_start_matches('@');

    let re = USERNAME_RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z][A-Za-z0-9_]{2,31}$").expect("username pattern is valid")
    });
    if re.is_match(username) {
        Ok(username.to_string())
    } else {
        Err(AppError::validation(format!("invalid channel username: {raw:?}")))
    }
}
