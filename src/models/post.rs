use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Tag;

/// Posts are keyed by `<channel_username>:<message_id>`, which doubles as the dedup key.
pub fn post_id(channel_username: &str, message_id: i64) -> String {
    format!("{}:{}", channel_username, message_id)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub channel_name: String,
    pub channel_username: String,
    pub content: String,
    pub media_urls: Vec<String>,
    pub original_url: String,
    pub published_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// Always loaded together with the post, ordered by name.
    pub tags: Vec<Tag>,
    pub is_bookmarked: bool,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub id: String,
    pub channel_name: String,
    pub channel_username: String,
    pub content: String,
    pub media_urls: Vec<String>,
    pub original_url: String,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostUpdate {
    pub content: Option<String>,
    pub media_urls: Option<Vec<String>>,
}

/// Filters for `Repository::list_posts`. Tag filters match any of the names.
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub feed_id: Option<i64>,
    pub tag_names: Option<Vec<String>>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub skip: i64,
    pub limit: i64,
}
