use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Post;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: i64,
    pub post_id: String,
    pub post: Post,
    pub created_at: DateTime<Utc>,
}
