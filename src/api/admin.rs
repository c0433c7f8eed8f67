use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::ai::TaggingSummary;
use crate::error::{AppError, Result};
use crate::models::Tag;

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct TagPostQuery {
    num_tags: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct TagPostResult {
    post_id: String,
    tags_assigned: usize,
    tags: Vec<Tag>,
}

fn default_untagged_limit() -> i64 {
    100
}

#[derive(Debug, Deserialize)]
pub struct TagUntaggedQuery {
    #[serde(default = "default_untagged_limit")]
    limit: i64,
}

/// Runs the auto-tagger on one post.
pub async fn tag_post(
    State(app): State<AppState>,
    Path(post_id): Path<String>,
    Query(query): Query<TagPostQuery>,
) -> Result<Json<TagPostResult>> {
    if let Some(n) = query.num_tags {
        if !(1..=5).contains(&n) {
            return Err(AppError::validation("num_tags must be between 1 and 5"));
        }
    }
    let tags = app.tagger.tag_post(&post_id, query.num_tags).await?;
    Ok(Json(TagPostResult {
        post_id,
        tags_assigned: tags.len(),
        tags,
    }))
}

pub async fn tag_untagged(
    State(app): State<AppState>,
    Query(query): Query<TagUntaggedQuery>,
) -> Result<Json<TaggingSummary>> {
    if !(1..=1000).contains(&query.limit) {
        return Err(AppError::validation("limit must be between 1 and 1000"));
    }
    Ok(Json(app.tagger.tag_untagged_posts(query.limit).await?))
}
