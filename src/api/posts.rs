use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{FeedRef, NewTag, Page, Post, PostFilter, PostUpdate};

use super::{check_page, default_page_size, AppState};

#[derive(Debug, Deserialize)]
pub struct PostsQuery {
    #[serde(default)]
    skip: i64,
    #[serde(default = "default_page_size")]
    limit: i64,
    /// `all`, `0` or a stored feed id.
    feed_id: Option<String>,
    /// Comma-separated tag names.
    tags: Option<String>,
    search: Option<String>,
}

fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}

pub async fn list_posts(
    State(app): State<AppState>,
    Query(query): Query<PostsQuery>,
) -> Result<Json<Page<Post>>> {
    check_page(query.skip, query.limit)?;

    let feed_id = match query.feed_id.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => match raw.parse::<FeedRef>()? {
            FeedRef::All => None,
            FeedRef::Stored(id) => Some(id),
        },
    };
    let filter = PostFilter {
        feed_id,
        tag_names: query.tags.as_deref().map(split_tags),
        search: query.search,
    };

    let page = app
        .repository
        .list_posts(filter, query.skip, query.limit)
        .await?;
    Ok(Json(page))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    q: Option<String>,
    #[serde(default)]
    skip: i64,
    #[serde(default = "default_page_size")]
    limit: i64,
}

#[derive(Debug, Serialize)]
pub struct SearchResults {
    #[serde(flatten)]
    page: Page<Post>,
    query: String,
}

pub async fn search_posts(
    State(app): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResults>> {
    check_page(query.skip, query.limit)?;
    let q = query.q.as_deref().map(str::trim).unwrap_or_default();
    if q.is_empty() {
        return Err(AppError::validation("search query cannot be empty"));
    }

    let filter = PostFilter {
        search: Some(q.to_string()),
        ..Default::default()
    };
    let page = app
        .repository
        .list_posts(filter, query.skip, query.limit)
        .await?;
    Ok(Json(SearchResults {
        page,
        query: q.to_string(),
    }))
}

pub async fn get_post(State(app): State<AppState>, Path(post_id): Path<String>) -> Result<Json<Post>> {
    app.repository
        .get_post(&post_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("post", post_id))
}

pub async fn update_post(
    State(app): State<AppState>,
    Path(post_id): Path<String>,
    Json(update): Json<PostUpdate>,
) -> Result<Json<Post>> {
    app.repository
        .update_post(&post_id, update)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("post", post_id))
}

#[derive(Debug, Deserialize)]
pub struct TagIds {
    tag_ids: Vec<i64>,
}

pub async fn add_tags(
    State(app): State<AppState>,
    Path(post_id): Path<String>,
    Json(body): Json<TagIds>,
) -> Result<Json<Post>> {
    app.repository
        .add_tags(&post_id, body.tag_ids)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("post", post_id))
}

pub async fn remove_tags(
    State(app): State<AppState>,
    Path(post_id): Path<String>,
    Json(body): Json<TagIds>,
) -> Result<Json<Post>> {
    app.repository
        .remove_tags(&post_id, body.tag_ids)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("post", post_id))
}

#[derive(Debug, Deserialize)]
pub struct TagSet {
    tags: Vec<NewTag>,
}

/// Replaces the post's tags with exactly the given set.
pub async fn replace_tags(
    State(app): State<AppState>,
    Path(post_id): Path<String>,
    Json(body): Json<TagSet>,
) -> Result<Json<Post>> {
    app.repository
        .replace_tags(&post_id, body.tags)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("post", post_id))
}
