use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{normalize_username, Channel, ChannelUpdate};

use super::AppState;

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct CreateChannel {
    username: String,
    name: Option<String>,
    #[serde(default = "default_active")]
    is_active: bool,
}

pub async fn list_channels(State(app): State<AppState>) -> Result<Json<Vec<Channel>>> {
    Ok(Json(app.repository.list_channels().await?))
}

pub async fn get_channel(
    State(app): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Channel>> {
    let username = normalize_username(&username)?;
    app.repository
        .get_channel(&username)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("channel", username))
}

/// Adds a channel to the scraping list. Looks the channel up on the source
/// to fill in its title and pre-seed the cursor.
pub async fn create_channel(
    State(app): State<AppState>,
    Json(body): Json<CreateChannel>,
) -> Result<(StatusCode, Json<Channel>)> {
    let channel = app
        .orchestrator
        .register_channel(&body.username, body.name, body.is_active)
        .await?;
    Ok((StatusCode::CREATED, Json(channel)))
}

pub async fn update_channel(
    State(app): State<AppState>,
    Path(username): Path<String>,
    Json(update): Json<ChannelUpdate>,
) -> Result<Json<Channel>> {
    let username = normalize_username(&username)?;
    app.repository
        .update_channel(&username, update)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("channel", username))
}

/// Stops tracking a channel. Its posts stay.
pub async fn delete_channel(
    State(app): State<AppState>,
    Path(username): Path<String>,
) -> Result<StatusCode> {
    let username = normalize_username(&username)?;
    if app.repository.delete_channel(&username).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("channel", username))
    }
}
