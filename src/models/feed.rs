use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const VIRTUAL_FEED_NAME: &str = "All Posts";

/// A saved tag filter. Id 0 is the virtual "All Posts" feed, which is never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feed {
    pub id: i64,
    pub name: String,
    pub tag_filters: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Feed {
    pub fn all_posts() -> Self {
        Self {
            id: 0,
            name: VIRTUAL_FEED_NAME.to_string(),
            tag_filters: Vec::new(),
            created_at: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewFeed {
    pub name: String,
    #[serde(default)]
    pub tag_filters: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedUpdate {
    pub name: Option<String>,
    pub tag_filters: Option<Vec<String>>,
}

/// A feed id as it appears in paths and query strings: `all`, `0` or a stored id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedRef {
    All,
    Stored(i64),
}

impl FromStr for FeedRef {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(FeedRef::All);
        }
        match s.parse::<i64>() {
            Ok(0) => Ok(FeedRef::All),
            Ok(id) if id > 0 => Ok(FeedRef::Stored(id)),
            _ => Err(AppError::validation(format!("invalid feed id: {s:?}"))),
        }
    }
}
