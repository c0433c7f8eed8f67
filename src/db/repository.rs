use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::Type;
use rusqlite::{params_from_iter, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{AuthorType, Post, Tag};

use super::schema::SCHEMA;

/// Handle to the SQLite store. Cloning is cheap: every clone talks to the same
/// background connection thread, so calls are serialized.
#[derive(Clone)]
pub struct Repository {
    pub(super) conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path).await?;
        Self::init(conn).await
    }

    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            register_functions(conn)?;
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }
}

#[cfg(test)]
impl Repository {
    /// Runs raw SQL, e.g. to install failing triggers.
    pub(crate) async fn execute_batch(&self, sql: &'static str) -> Result<()> {
        self.conn.call(move |conn| Ok(conn.execute_batch(sql)?)).await?;
        Ok(())
    }
}

/// `unicode_lower(text)`: SQLite's own `lower()` only folds ASCII.
fn register_functions(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "unicode_lower",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value = ctx.get::<Option<String>>(0)?;
            Ok(value.map(|v| v.to_lowercase()))
        },
    )
}

pub(super) const POST_COLUMNS: &str = "p.id, p.channel_name, p.channel_username, p.content, \
     p.media_urls, p.original_url, p.published_at, p.created_at, \
     EXISTS(SELECT 1 FROM bookmarks b WHERE b.post_id = p.id)";

pub(super) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // Try RFC3339 first (e.g., "2026-01-11T12:34:56Z")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Try SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

pub(super) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

pub(super) fn datetime_column(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_datetime(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("invalid timestamp {raw:?}").into(),
        )
    })
}

pub(super) fn json_column<T: DeserializeOwned>(row: &Row, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Reads `id, name, author_type, created_at` starting at `offset`.
pub(super) fn tag_from_row(row: &Row, offset: usize) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get(offset)?,
        name: row.get(offset + 1)?,
        author_type: AuthorType::from_db(&row.get::<_, String>(offset + 2)?),
        created_at: datetime_column(row, offset + 3)?,
    })
}

/// Reads the `POST_COLUMNS` projection. Tags are attached separately.
pub(super) fn post_from_row(row: &Row) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        channel_name: row.get(1)?,
        channel_username: row.get(2)?,
        content: row.get(3)?,
        media_urls: json_column(row, 4)?,
        original_url: row.get(5)?,
        published_at: datetime_column(row, 6)?,
        created_at: datetime_column(row, 7)?,
        tags: Vec::new(),
        is_bookmarked: row.get(8)?,
    })
}

/// Loads one post with its tags.
pub(super) fn load_post(conn: &rusqlite::Connection, id: &str) -> rusqlite::Result<Option<Post>> {
    let post = conn
        .query_row(
            &format!("SELECT {POST_COLUMNS} FROM posts p WHERE p.id = ?1"),
            [id],
            post_from_row,
        )
        .optional()?;

    match post {
        Some(mut post) => {
            attach_tags(conn, std::slice::from_mut(&mut post))?;
            Ok(Some(post))
        }
        None => Ok(None),
    }
}

/// Loads posts with their tags, in the order of `ids`. Unknown ids are skipped.
pub(super) fn load_posts(conn: &rusqlite::Connection, ids: &[String]) -> rusqlite::Result<Vec<Post>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT {POST_COLUMNS} FROM posts p WHERE p.id IN ({})",
        placeholders(ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut by_id: HashMap<String, Post> = stmt
        .query_map(params_from_iter(ids.iter()), post_from_row)?
        .map(|post| post.map(|p| (p.id.clone(), p)))
        .collect::<rusqlite::Result<_>>()?;

    let mut posts: Vec<Post> = ids.iter().filter_map(|id| by_id.remove(id)).collect();
    attach_tags(conn, &mut posts)?;
    Ok(posts)
}

/// Fills `tags` on each post, ordered by tag name.
pub(super) fn attach_tags(conn: &rusqlite::Connection, posts: &mut [Post]) -> rusqlite::Result<()> {
    if posts.is_empty() {
        return Ok(());
    }

    let ids: Vec<String> = posts.iter().map(|p| p.id.clone()).collect();
    let sql = format!(
        r#"SELECT pt.post_id, t.id, t.name, t.author_type, t.created_at
           FROM post_tags pt
           JOIN tags t ON t.id = pt.tag_id
           WHERE pt.post_id IN ({})
           ORDER BY t.name"#,
        placeholders(ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(ids.iter()), |row| {
        Ok((row.get::<_, String>(0)?, tag_from_row(row, 1)?))
    })?;

    let mut by_post: HashMap<String, Vec<Tag>> = HashMap::new();
    for row in rows {
        let (post_id, tag) = row?;
        by_post.entry(post_id).or_default().push(tag);
    }

    for post in posts.iter_mut() {
        post.tags = by_post.remove(&post.id).unwrap_or_default();
    }
    Ok(())
}
