use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::error::{AppError, Result};
use crate::models::{NewTag, Tag, TagWithCount};

use super::AppState;

pub async fn list_tags(State(app): State<AppState>) -> Result<Json<Vec<TagWithCount>>> {
    Ok(Json(app.repository.list_tags_with_counts().await?))
}

pub async fn create_tag(
    State(app): State<AppState>,
    Json(tag): Json<NewTag>,
) -> Result<(StatusCode, Json<Tag>)> {
    let tag = app.repository.create_tag(tag).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

pub async fn delete_tag(State(app): State<AppState>, Path(name): Path<String>) -> Result<StatusCode> {
    if app.repository.delete_tag(&name).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("tag", name))
    }
}
