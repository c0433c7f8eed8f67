use rusqlite::{params, OptionalExtension, Row};

use crate::error::{AppError, Result};
use crate::models::{Channel, ChannelUpdate, NewChannel};

use super::repository::{datetime_column, Repository};

const CHANNEL_COLUMNS: &str =
    "id, username, name, channel_id, latest_message_id, is_active, created_at, updated_at";

fn channel_from_row(row: &Row) -> rusqlite::Result<Channel> {
    Ok(Channel {
        id: row.get(0)?,
        username: row.get(1)?,
        name: row.get(2)?,
        channel_id: row.get(3)?,
        latest_message_id: row.get(4)?,
        is_active: row.get(5)?,
        created_at: datetime_column(row, 6)?,
        updated_at: datetime_column(row, 7)?,
    })
}

fn select_channel(conn: &rusqlite::Connection, username: &str) -> rusqlite::Result<Option<Channel>> {
    conn.query_row(
        &format!("SELECT {CHANNEL_COLUMNS} FROM channels WHERE username = ?1"),
        params![username],
        channel_from_row,
    )
    .optional()
}

impl Repository {
    // Channel registry

    pub async fn get_channel(&self, username: &str) -> Result<Option<Channel>> {
        let username = username.to_string();
        let channel = self
            .conn
            .call(move |conn| Ok(select_channel(conn, &username)?))
            .await?;
        Ok(channel)
    }

    /// All channels, active or not, ordered by username.
    pub async fn list_channels(&self) -> Result<Vec<Channel>> {
        self.query_channels(false).await
    }

    /// Channels eligible for batch scraping, ordered by username.
    pub async fn list_active_channels(&self) -> Result<Vec<Channel>> {
        self.query_channels(true).await
    }

    async fn query_channels(&self, active_only: bool) -> Result<Vec<Channel>> {
        let channels = self
            .conn
            .call(move |conn| {
                let filter = if active_only { "WHERE is_active = 1" } else { "" };
                let mut stmt = conn.prepare(&format!(
                    "SELECT {CHANNEL_COLUMNS} FROM channels {filter} ORDER BY username"
                ))?;
                let channels = stmt
                    .query_map([], channel_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(channels)
            })
            .await?;
        Ok(channels)
    }

    /// Inserts a new channel; fails if the username is already tracked.
    pub async fn create_channel(&self, channel: NewChannel) -> Result<Channel> {
        let username = channel.username.clone();
        let created = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                if select_channel(&tx, &channel.username)?.is_some() {
                    return Ok(None);
                }
                tx.execute(
                    r#"INSERT INTO channels (username, name, channel_id, latest_message_id, is_active)
                       VALUES (?1, ?2, ?3, ?4, ?5)"#,
                    params![
                        channel.username,
                        channel.name,
                        channel.channel_id,
                        channel.latest_message_id,
                        channel.is_active,
                    ],
                )?;
                let created = select_channel(&tx, &channel.username)?;
                tx.commit()?;
                Ok(created)
            })
            .await?;

        created.ok_or_else(|| {
            AppError::validation(format!("channel @{username} is already in the scraping list"))
        })
    }

    /// Upsert: refreshes the display name and platform id of an existing channel,
    /// or inserts a new one with no cursor.
    pub async fn get_or_create_channel(
        &self,
        username: &str,
        name: &str,
        channel_id: Option<i64>,
    ) -> Result<Channel> {
        let username = username.to_string();
        let name = name.trim().to_string();
        let channel = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let updated = tx.execute(
                    r#"UPDATE channels SET
                           name = CASE WHEN ?2 <> '' THEN ?2 ELSE name END,
                           channel_id = COALESCE(?3, channel_id),
                           updated_at = datetime('now')
                       WHERE username = ?1"#,
                    params![username, name, channel_id],
                )?;
                if updated == 0 {
                    let display_name = if name.is_empty() { &username } else { &name };
                    tx.execute(
                        "INSERT INTO channels (username, name, channel_id) VALUES (?1, ?2, ?3)",
                        params![username, display_name, channel_id],
                    )?;
                }
                let channel = tx.query_row(
                    &format!("SELECT {CHANNEL_COLUMNS} FROM channels WHERE username = ?1"),
                    params![username],
                    channel_from_row,
                )?;
                tx.commit()?;
                Ok(channel)
            })
            .await?;
        Ok(channel)
    }

    /// Moves the cursor forward to `message_id`; never moves it backwards.
    pub async fn advance_cursor(&self, username: &str, message_id: i64) -> Result<Option<Channel>> {
        let username = username.to_string();
        let channel = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute(
                    r#"UPDATE channels SET
                           latest_message_id = MAX(COALESCE(latest_message_id, ?2), ?2),
                           updated_at = datetime('now')
                       WHERE username = ?1"#,
                    params![username, message_id],
                )?;
                let channel = select_channel(&tx, &username)?;
                tx.commit()?;
                Ok(channel)
            })
            .await?;
        Ok(channel)
    }

    pub async fn update_channel(&self, username: &str, update: ChannelUpdate) -> Result<Option<Channel>> {
        let username = username.to_string();
        let channel = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let updated = tx.execute(
                    r#"UPDATE channels SET
                           name = COALESCE(?2, name),
                           is_active = COALESCE(?3, is_active),
                           updated_at = datetime('now')
                       WHERE username = ?1"#,
                    params![username, update.name, update.is_active],
                )?;
                if updated == 0 {
                    return Ok(None);
                }
                let channel = select_channel(&tx, &username)?;
                tx.commit()?;
                Ok(channel)
            })
            .await?;
        Ok(channel)
    }

    /// Stops tracking a channel. Its posts are kept.
    pub async fn delete_channel(&self, username: &str) -> Result<bool> {
        let username = username.to_string();
        let deleted = self
            .conn
            .call(move |conn| {
                let n = conn.execute("DELETE FROM channels WHERE username = ?1", params![username])?;
                Ok(n > 0)
            })
            .await?;
        Ok(deleted)
    }
}
