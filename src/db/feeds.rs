use rusqlite::{params, OptionalExtension, Row};

use crate::error::{AppError, Result};
use crate::models::{Feed, FeedUpdate, NewFeed};

use super::repository::{datetime_column, json_column, Repository};

const FEED_COLUMNS: &str = "id, name, tag_filters, created_at";

fn feed_from_row(row: &Row) -> rusqlite::Result<Feed> {
    Ok(Feed {
        id: row.get(0)?,
        name: row.get(1)?,
        tag_filters: json_column(row, 2)?,
        created_at: Some(datetime_column(row, 3)?),
    })
}

fn select_feed(conn: &rusqlite::Connection, id: i64) -> rusqlite::Result<Option<Feed>> {
    conn.query_row(
        &format!("SELECT {FEED_COLUMNS} FROM feeds WHERE id = ?1"),
        [id],
        feed_from_row,
    )
    .optional()
}

fn clean_filters(filters: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(filters.len());
    for name in filters {
        let name = name.trim();
        if !name.is_empty() && !cleaned.iter().any(|n| n == name) {
            cleaned.push(name.to_string());
        }
    }
    cleaned
}

fn clean_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("feed name must not be empty"));
    }
    Ok(name.to_string())
}

impl Repository {
    // Saved feeds

    pub async fn create_feed(&self, feed: NewFeed) -> Result<Feed> {
        let name = clean_name(&feed.name)?;
        let tag_filters = serde_json::to_string(&clean_filters(feed.tag_filters))?;
        let feed = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT INTO feeds (name, tag_filters) VALUES (?1, ?2)",
                    params![name, tag_filters],
                )?;
                let id = tx.last_insert_rowid();
                let feed = tx.query_row(
                    &format!("SELECT {FEED_COLUMNS} FROM feeds WHERE id = ?1"),
                    [id],
                    feed_from_row,
                )?;
                tx.commit()?;
                Ok(feed)
            })
            .await?;
        Ok(feed)
    }

    pub async fn get_feed(&self, id: i64) -> Result<Option<Feed>> {
        let feed = self.conn.call(move |conn| Ok(select_feed(conn, id)?)).await?;
        Ok(feed)
    }

    /// Stored feeds, newest first. The virtual feed is not included.
    pub async fn list_feeds(&self) -> Result<Vec<Feed>> {
        let feeds = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {FEED_COLUMNS} FROM feeds ORDER BY created_at DESC, id DESC"
                ))?;
                let feeds = stmt
                    .query_map([], feed_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(feeds)
            })
            .await?;
        Ok(feeds)
    }

    pub async fn update_feed(&self, id: i64, update: FeedUpdate) -> Result<Option<Feed>> {
        let name = update.name.as_deref().map(clean_name).transpose()?;
        let tag_filters = update
            .tag_filters
            .map(|filters| serde_json::to_string(&clean_filters(filters)))
            .transpose()?;
        let feed = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let updated = tx.execute(
                    r#"UPDATE feeds SET
                           name = COALESCE(?2, name),
                           tag_filters = COALESCE(?3, tag_filters)
                       WHERE id = ?1"#,
                    params![id, name, tag_filters],
                )?;
                if updated == 0 {
                    return Ok(None);
                }
                let feed = select_feed(&tx, id)?;
                tx.commit()?;
                Ok(feed)
            })
            .await?;
        Ok(feed)
    }

    pub async fn delete_feed(&self, id: i64) -> Result<bool> {
        let deleted = self
            .conn
            .call(move |conn| {
                let n = conn.execute("DELETE FROM feeds WHERE id = ?1", [id])?;
                Ok(n > 0)
            })
            .await?;
        Ok(deleted)
    }
}
