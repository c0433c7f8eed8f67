use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::error::{AppError, Result};
use crate::models::{Feed, FeedRef, FeedUpdate, NewFeed};

use super::AppState;

/// The virtual "All Posts" feed first, then stored feeds newest first.
pub async fn list_feeds(State(app): State<AppState>) -> Result<Json<Vec<Feed>>> {
    let mut feeds = vec![Feed::all_posts()];
    feeds.extend(app.repository.list_feeds().await?);
    Ok(Json(feeds))
}

pub async fn get_feed(State(app): State<AppState>, Path(feed_id): Path<String>) -> Result<Json<Feed>> {
    match feed_id.parse::<FeedRef>()? {
        FeedRef::All => Ok(Json(Feed::all_posts())),
        FeedRef::Stored(id) => app
            .repository
            .get_feed(id)
            .await?
            .map(Json)
            .ok_or_else(|| AppError::not_found("feed", id)),
    }
}

pub async fn create_feed(
    State(app): State<AppState>,
    Json(feed): Json<NewFeed>,
) -> Result<(StatusCode, Json<Feed>)> {
    let feed = app.repository.create_feed(feed).await?;
    Ok((StatusCode::CREATED, Json(feed)))
}

/// The body is only read once the id names a stored feed, so the virtual feed
/// is refused whatever was sent.
pub async fn update_feed(
    State(app): State<AppState>,
    Path(feed_id): Path<String>,
    body: std::result::Result<Json<FeedUpdate>, JsonRejection>,
) -> Result<Json<Feed>> {
    let FeedRef::Stored(id) = feed_id.parse::<FeedRef>()? else {
        return Err(AppError::validation("cannot update the 'All Posts' feed"));
    };
    let Json(update) = body.map_err(|rejection| AppError::validation(rejection.body_text()))?;
    app.repository
        .update_feed(id, update)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("feed", id))
}

pub async fn delete_feed(State(app): State<AppState>, Path(feed_id): Path<String>) -> Result<StatusCode> {
    let FeedRef::Stored(id) = feed_id.parse::<FeedRef>()? else {
        return Err(AppError::validation("cannot delete the 'All Posts' feed"));
    };
    if app.repository.delete_feed(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("feed", id))
    }
}
