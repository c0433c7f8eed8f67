//! HTTP JSON API.

mod admin;
mod bookmarks;
mod channels;
mod feeds;
mod health;
mod posts;
mod scrape;
mod tags;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::app::App;
use crate::error::{AppError, Result};

pub type AppState = Arc<App>;

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(..) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

/// `?skip=&limit=` query parameters.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_page_size")]
    pub limit: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    pub fn validate(self) -> Result<Self> {
        check_page(self.skip, self.limit)?;
        Ok(self)
    }
}

fn check_page(skip: i64, limit: i64) -> Result<()> {
    if skip < 0 {
        return Err(AppError::validation("skip must not be negative"));
    }
    if !(1..=MAX_PAGE_SIZE).contains(&limit) {
        return Err(AppError::validation(format!(
            "limit must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }
    Ok(())
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/posts", get(posts::list_posts))
        .route(
            "/posts/{post_id}",
            get(posts::get_post).patch(posts::update_post),
        )
        .route(
            "/posts/{post_id}/tags",
            post(posts::add_tags)
                .delete(posts::remove_tags)
                .patch(posts::replace_tags),
        )
        .route("/search", get(posts::search_posts))
        .route("/tags", get(tags::list_tags).post(tags::create_tag))
        .route("/tags/{name}", delete(tags::delete_tag))
        .route("/feeds", get(feeds::list_feeds).post(feeds::create_feed))
        .route(
            "/feeds/{feed_id}",
            get(feeds::get_feed)
                .patch(feeds::update_feed)
                .delete(feeds::delete_feed),
        )
        .route("/bookmarks", get(bookmarks::list_bookmarks))
        .route(
            "/bookmarks/{post_id}",
            post(bookmarks::toggle_bookmark).delete(bookmarks::delete_bookmark),
        )
        .route(
            "/channels",
            get(channels::list_channels).post(channels::create_channel),
        )
        .route(
            "/channels/{username}",
            get(channels::get_channel)
                .patch(channels::update_channel)
                .delete(channels::delete_channel),
        )
        .route("/scrape/all", post(scrape::scrape_all))
        .route("/scrape/{username}", post(scrape::scrape_channel))
        .route("/admin/tag-post/{post_id}", post(admin::tag_post))
        .route("/admin/tag-untagged", post(admin::tag_untagged))
}

/// Builds the full router: the API under the configured prefix plus
/// `/health` and `/` at the root.
pub fn router(app: AppState) -> Router {
    let prefix = app.config.api_prefix.trim_matches('/');
    let api = if prefix.is_empty() {
        api_routes()
    } else {
        Router::new().nest(&format!("/{prefix}"), api_routes())
    };

    api.route("/health", get(health::health))
        .route("/", get(health::root))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app)
}
