use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::{Bookmark, Page};

use super::{AppState, Pagination};

#[derive(Debug, Serialize)]
pub struct ToggleResult {
    post_id: String,
    is_bookmarked: bool,
    bookmark: Option<Bookmark>,
}

pub async fn list_bookmarks(
    State(app): State<AppState>,
    Query(page): Query<Pagination>,
) -> Result<Json<Page<Bookmark>>> {
    let page = page.validate()?;
    Ok(Json(app.repository.list_bookmarks(page.skip, page.limit).await?))
}

/// Bookmarks the post, or removes its bookmark if it already has one.
pub async fn toggle_bookmark(
    State(app): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Json<ToggleResult>> {
    let (is_bookmarked, bookmark) = app
        .repository
        .toggle_bookmark(&post_id)
        .await?
        .ok_or_else(|| AppError::not_found("post", &post_id))?;

    tracing::debug!(post_id = %post_id, is_bookmarked, "toggled bookmark");
    Ok(Json(ToggleResult {
        post_id,
        is_bookmarked,
        bookmark,
    }))
}

pub async fn delete_bookmark(
    State(app): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<StatusCode> {
    if app.repository.delete_bookmark(&post_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("bookmark", post_id))
    }
}
