use std::collections::HashMap;

use rusqlite::{params, OptionalExtension};

use crate::error::Result;
use crate::models::{Bookmark, Page};

use super::posts::post_exists;
use super::repository::{datetime_column, load_post, load_posts, Repository};

fn select_bookmark(conn: &rusqlite::Connection, post_id: &str) -> rusqlite::Result<Option<Bookmark>> {
    let row = conn
        .query_row(
            "SELECT id, post_id, created_at FROM bookmarks WHERE post_id = ?1",
            [post_id],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, datetime_column(row, 2)?)),
        )
        .optional()?;

    let Some((id, post_id, created_at)) = row else {
        return Ok(None);
    };
    let Some(post) = load_post(conn, &post_id)? else {
        return Ok(None);
    };
    Ok(Some(Bookmark {
        id,
        post_id,
        post,
        created_at,
    }))
}

impl Repository {
    // Bookmarks

    pub async fn delete_bookmark(&self, post_id: &str) -> Result<bool> {
        let post_id = post_id.to_string();
        let deleted = self
            .conn
            .call(move |conn| {
                let n = conn.execute("DELETE FROM bookmarks WHERE post_id = ?1", [&post_id])?;
                Ok(n > 0)
            })
            .await?;
        Ok(deleted)
    }

    /// Flips the bookmark state of a post in one transaction.
    ///
    /// Returns `None` for an unknown post, otherwise the new state and, when
    /// bookmarked, the bookmark itself.
    pub async fn toggle_bookmark(&self, post_id: &str) -> Result<Option<(bool, Option<Bookmark>)>> {
        let post_id = post_id.to_string();
        let toggled = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                if !post_exists(&tx, &post_id)? {
                    return Ok(None);
                }
                let removed = tx.execute("DELETE FROM bookmarks WHERE post_id = ?1", [&post_id])?;
                let result = if removed > 0 {
                    (false, None)
                } else {
                    tx.execute("INSERT INTO bookmarks (post_id) VALUES (?1)", [&post_id])?;
                    (true, select_bookmark(&tx, &post_id)?)
                };
                tx.commit()?;
                Ok(Some(result))
            })
            .await?;
        Ok(toggled)
    }

    /// Bookmarks, most recent first, with their posts embedded.
    pub async fn list_bookmarks(&self, skip: i64, limit: i64) -> Result<Page<Bookmark>> {
        let page = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let total: i64 = tx.query_row("SELECT COUNT(*) FROM bookmarks", [], |row| row.get(0))?;

                let mut stmt = tx.prepare(
                    r#"SELECT id, post_id, created_at FROM bookmarks
                       ORDER BY created_at DESC, id DESC
                       LIMIT ?1 OFFSET ?2"#,
                )?;
                let rows = stmt
                    .query_map(params![limit, skip], |row| {
                        Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, datetime_column(row, 2)?))
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                drop(stmt);

                let ids: Vec<String> = rows.iter().map(|(_, post_id, _)| post_id.clone()).collect();
                let mut posts: HashMap<String, _> = load_posts(&tx, &ids)?
                    .into_iter()
                    .map(|post| (post.id.clone(), post))
                    .collect();
                let items = rows
                    .into_iter()
                    .filter_map(|(id, post_id, created_at)| {
                        let post = posts.remove(&post_id)?;
                        Some(Bookmark {
                            id,
                            post_id,
                            post,
                            created_at,
                        })
                    })
                    .collect();
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
}
