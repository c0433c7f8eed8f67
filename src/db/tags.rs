use rusqlite::{params, OptionalExtension};

use crate::error::{AppError, Result};
use crate::models::{AuthorType, NewTag, Tag, TagWithCount};

use super::repository::{tag_from_row, Repository};

fn select_tag(conn: &rusqlite::Connection, name: &str) -> rusqlite::Result<Option<Tag>> {
    conn.query_row(
        "SELECT id, name, author_type, created_at FROM tags WHERE name = ?1",
        [name],
        |row| tag_from_row(row, 0),
    )
    .optional()
}

impl Repository {
    // Tags

    /// Creates a tag. Names are trimmed and must be unique.
    pub async fn create_tag(&self, tag: NewTag) -> Result<Tag> {
        let name = tag.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation("tag name must not be empty"));
        }

        let lookup = name.clone();
        let created = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                if select_tag(&tx, &lookup)?.is_some() {
                    return Ok(None);
                }
                tx.execute(
                    "INSERT INTO tags (name, author_type) VALUES (?1, ?2)",
                    params![lookup, tag.author_type.as_str()],
                )?;
                let created = select_tag(&tx, &lookup)?;
                tx.commit()?;
                Ok(created)
            })
            .await?;

        created.ok_or_else(|| AppError::validation(format!("tag {name:?} already exists")))
    }

    /// Returns the tag named `name`, creating it with `author_type` if missing.
    /// An existing tag keeps its origin.
    pub async fn get_or_create_tag(&self, name: &str, author_type: AuthorType) -> Result<Tag> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation("tag name must not be empty"));
        }

        let tag = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO tags (name, author_type) VALUES (?1, ?2)",
                    params![name, author_type.as_str()],
                )?;
                let tag = tx.query_row(
                    "SELECT id, name, author_type, created_at FROM tags WHERE name = ?1",
                    [&name],
                    |row| tag_from_row(row, 0),
                )?;
                tx.commit()?;
                Ok(tag)
            })
            .await?;
        Ok(tag)
    }

    /// All tags with the number of posts carrying each, ordered by name.
    pub async fn list_tags_with_counts(&self) -> Result<Vec<TagWithCount>> {
        let tags = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT t.id, t.name, t.author_type, t.created_at, COUNT(pt.post_id)
                       FROM tags t
                       LEFT JOIN post_tags pt ON pt.tag_id = t.id
                       GROUP BY t.id
                       ORDER BY t.name"#,
                )?;
                let tags = stmt
                    .query_map([], |row| {
                        Ok(TagWithCount {
                            tag: tag_from_row(row, 0)?,
                            usage_count: row.get(4)?,
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(tags)
            })
            .await?;
        Ok(tags)
    }

    /// Deletes a tag and detaches it from every post.
    pub async fn delete_tag(&self, name: &str) -> Result<bool> {
        let name = name.trim().to_string();
        let deleted = self
            .conn
            .call(move |conn| {
                let n = conn.execute("DELETE FROM tags WHERE name = ?1", [&name])?;
                Ok(n > 0)
            })
            .await?;
        Ok(deleted)
    }
}
