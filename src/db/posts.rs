use std::collections::BTreeSet;

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension};

use crate::error::{AppError, Result};
use crate::models::{AuthorType, NewPost, NewTag, Page, Post, PostFilter, PostUpdate};

use super::repository::{
    attach_tags, format_datetime, load_post, placeholders, post_from_row, Repository, POST_COLUMNS,
};

pub(super) fn post_exists(conn: &rusqlite::Connection, id: &str) -> rusqlite::Result<bool> {
    conn.query_row("SELECT EXISTS(SELECT 1 FROM posts WHERE id = ?1)", [id], |row| row.get(0))
}

fn link_tags(conn: &rusqlite::Connection, post_id: &str, tag_ids: &[i64]) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO post_tags (post_id, tag_id) SELECT ?1, id FROM tags WHERE id = ?2",
    )?;
    for tag_id in tag_ids {
        stmt.execute(params![post_id, tag_id])?;
    }
    Ok(())
}

/// `p.id IN (...)` clause matching posts that carry any of `names`.
fn any_tag_clause(names: &[String], args: &mut Vec<Value>) -> String {
    args.extend(names.iter().cloned().map(Value::Text));
    format!(
        r#"p.id IN (SELECT pt.post_id FROM post_tags pt
                    JOIN tags t ON t.id = pt.tag_id
                    WHERE t.name IN ({}))"#,
        placeholders(names.len())
    )
}

impl Repository {
    // Post store

    pub async fn post_exists(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        let exists = self.conn.call(move |conn| Ok(post_exists(conn, &id)?)).await?;
        Ok(exists)
    }

    /// Inserts a post and links any of `tag_ids` that exist. Fails if the id is taken.
    pub async fn create_post(&self, post: NewPost, tag_ids: Vec<i64>) -> Result<Post> {
        let id = post.id.clone();
        let media_urls = serde_json::to_string(&post.media_urls)?;
        let created = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                if post_exists(&tx, &post.id)? {
                    return Ok(None);
                }
                tx.execute(
                    r#"INSERT INTO posts (id, channel_name, channel_username, content, media_urls, original_url, published_at)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
                    params![
                        post.id,
                        post.channel_name,
                        post.channel_username,
                        post.content,
                        media_urls,
                        post.original_url,
                        format_datetime(&post.published_at),
                    ],
                )?;
                link_tags(&tx, &post.id, &tag_ids)?;
                let created = load_post(&tx, &post.id)?;
                tx.commit()?;
                Ok(created)
            })
            .await?;

        created.ok_or_else(|| AppError::validation(format!("post {id} already exists")))
    }

    /// Returns the post with its tags attached.
    pub async fn get_post(&self, id: &str) -> Result<Option<Post>> {
        let id = id.to_string();
        let post = self.conn.call(move |conn| Ok(load_post(conn, &id)?)).await?;
        Ok(post)
    }

    pub async fn update_post(&self, id: &str, update: PostUpdate) -> Result<Option<Post>> {
        let id = id.to_string();
        let media_urls = update
            .media_urls
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let post = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let updated = tx.execute(
                    r#"UPDATE posts SET
                           content = COALESCE(?2, content),
                           media_urls = COALESCE(?3, media_urls)
                       WHERE id = ?1"#,
                    params![id, update.content, media_urls],
                )?;
                if updated == 0 {
                    return Ok(None);
                }
                let post = load_post(&tx, &id)?;
                tx.commit()?;
                Ok(post)
            })
            .await?;
        Ok(post)
    }

    /// Filtered, paginated listing, newest first.
    ///
    /// The feed's tag filters (when the feed exists and has any) and the explicit
    /// tag names each match posts carrying *any* of the listed tags; both apply
    /// together when given. `search` is a case-insensitive substring match on
    /// content. `total` counts the filtered set before pagination.
    pub async fn list_posts(&self, filter: PostFilter, skip: i64, limit: i64) -> Result<Page<Post>> {
        let page = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let mut clauses: Vec<String> = Vec::new();
                let mut args: Vec<Value> = Vec::new();

                if let Some(feed_id) = filter.feed_id {
                    let tag_filters: Option<String> = tx
                        .query_row(
                            "SELECT tag_filters FROM feeds WHERE id = ?1",
                            [feed_id],
                            |row| row.get(0),
                        )
                        .optional()?;
                    let tag_filters: Vec<String> = tag_filters
                        .map(|raw| serde_json::from_str(&raw))
                        .transpose()
                        .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?
                        .unwrap_or_default();
                    if !tag_filters.is_empty() {
                        clauses.push(any_tag_clause(&tag_filters, &mut args));
                    }
                }

                if let Some(names) = filter.tag_names.as_deref() {
                    if !names.is_empty() {
                        clauses.push(any_tag_clause(names, &mut args));
                    }
                }

                if let Some(needle) = filter.search.as_deref().map(str::trim) {
                    if !needle.is_empty() {
                        clauses.push("instr(unicode_lower(p.content), ?) > 0".to_string());
                        args.push(Value::Text(needle.to_lowercase()));
                    }
                }

                let where_sql = if clauses.is_empty() {
                    String::new()
                } else {
                    format!(" WHERE {}", clauses.join(" AND "))
                };

                let total: i64 = tx.query_row(
                    &format!("SELECT COUNT(*) FROM posts p{where_sql}"),
                    params_from_iter(args.iter()),
                    |row| row.get(0),
                )?;

                args.push(Value::Integer(limit));
                args.push(Value::Integer(skip));
                let mut stmt = tx.prepare(&format!(
                    "SELECT {POST_COLUMNS} FROM posts p{where_sql}
                     ORDER BY p.published_at DESC, p.id DESC
                     LIMIT ? OFFSET ?"
                ))?;
                let mut items = stmt
                    .query_map(params_from_iter(args.iter()), post_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                drop(stmt);
                attach_tags(&tx, &mut items)?;
                tx.commit()?;

                Ok(Page {
                    items,
                    total,
                    skip,
                    limit,
                })
            })
            .await?;
        Ok(page)
    }

    /// Adds tags to a post. Tags already present and unknown tag ids are ignored.
    pub async fn add_tags(&self, post_id: &str, tag_ids: Vec<i64>) -> Result<Option<Post>> {
        let post_id = post_id.to_string();
        let post = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                if !post_exists(&tx, &post_id)? {
                    return Ok(None);
                }
                link_tags(&tx, &post_id, &tag_ids)?;
                let post = load_post(&tx, &post_id)?;
                tx.commit()?;
                Ok(post)
            })
            .await?;
        Ok(post)
    }

    /// Removes tags from a post. Tags that are not attached are ignored.
    pub async fn remove_tags(&self, post_id: &str, tag_ids: Vec<i64>) -> Result<Option<Post>> {
        let post_id = post_id.to_string();
        let post = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                if !post_exists(&tx, &post_id)? {
                    return Ok(None);
                }
                {
                    let mut stmt =
                        tx.prepare("DELETE FROM post_tags WHERE post_id = ?1 AND tag_id = ?2")?;
                    for tag_id in &tag_ids {
                        stmt.execute(params![post_id, tag_id])?;
                    }
                }
                let post = load_post(&tx, &post_id)?;
                tx.commit()?;
                Ok(post)
            })
            .await?;
        Ok(post)
    }

    /// Replaces the post's whole tag set with `tags`, creating missing tags.
    ///
    /// Existing tags keep their origin, except that a human-authored entry
    /// promotes an automated tag to human.
    pub async fn replace_tags(&self, post_id: &str, tags: Vec<NewTag>) -> Result<Option<Post>> {
        let post_id = post_id.to_string();
        let mut seen = BTreeSet::new();
        let tags: Vec<NewTag> = tags
            .into_iter()
            .map(|t| NewTag {
                name: t.name.trim().to_string(),
                author_type: t.author_type,
            })
            .filter(|t| !t.name.is_empty() && seen.insert(t.name.clone()))
            .collect();

        let post = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                if !post_exists(&tx, &post_id)? {
                    return Ok(None);
                }

                let mut tag_ids = Vec::with_capacity(tags.len());
                for tag in &tags {
                    tx.execute(
                        "INSERT OR IGNORE INTO tags (name, author_type) VALUES (?1, ?2)",
                        params![tag.name, tag.author_type.as_str()],
                    )?;
                    if tag.author_type == AuthorType::Human {
                        tx.execute(
                            "UPDATE tags SET author_type = 'human' WHERE name = ?1",
                            params![tag.name],
                        )?;
                    }
                    let id: i64 =
                        tx.query_row("SELECT id FROM tags WHERE name = ?1", [&tag.name], |row| {
                            row.get(0)
                        })?;
                    tag_ids.push(id);
                }

                tx.execute("DELETE FROM post_tags WHERE post_id = ?1", [&post_id])?;
                link_tags(&tx, &post_id, &tag_ids)?;
                let post = load_post(&tx, &post_id)?;
                tx.commit()?;
                Ok(post)
            })
            .await?;
        Ok(post)
    }

    /// Ids of posts without any tag, newest first.
    pub async fn list_untagged_post_ids(&self, limit: i64) -> Result<Vec<String>> {
        let ids = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT p.id FROM posts p
                       WHERE NOT EXISTS (SELECT 1 FROM post_tags pt WHERE pt.post_id = p.id)
                       ORDER BY p.published_at DESC, p.id DESC
                       LIMIT ?1"#,
                )?;
                let ids = stmt
                    .query_map([limit], |row| row.get(0))?
                    .collect::<std::result::Result<Vec<String>, _>>()?;
                Ok(ids)
            })
            .await?;
        Ok(ids)
    }

    pub async fn count_channel_posts(&self, channel_username: &str) -> Result<i64> {
        let channel_username = channel_username.to_string();
        let count = self
            .conn
            .call(move |conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM posts WHERE channel_username = ?1",
                    [&channel_username],
                    |row| row.get(0),
                )?)
            })
            .await?;
        Ok(count)
    }
}
