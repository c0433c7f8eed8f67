use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::ai::AutoTagger;
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::models::{normalize_username, post_id, Channel, NewChannel, NewPost};

use super::{SourceClient, SourceMessage};

const POST_URL_BASE: &str = "https://t.me";

/// Counts for one channel's ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScrapeOutcome {
    pub new_posts: usize,
    pub total_messages: usize,
}

/// Pulls new messages from the source into the post store.
///
/// At most one ingestion runs per channel at a time; different channels are
/// scraped independently.
pub struct Orchestrator {
    repository: Repository,
    source: Arc<dyn SourceClient>,
    tagger: Arc<AutoTagger>,
    locks: DashMap<String, Arc<Mutex<()>>>,
    concurrency: usize,
    initial_history_limit: i64,
}

impl Orchestrator {
    pub fn new(
        repository: Repository,
        source: Arc<dyn SourceClient>,
        tagger: Arc<AutoTagger>,
        concurrency: usize,
        initial_history_limit: i64,
    ) -> Self {
        Self {
            repository,
            source,
            tagger,
            locks: DashMap::new(),
            concurrency: concurrency.max(1),
            initial_history_limit: initial_history_limit.max(0),
        }
    }

    fn channel_lock(&self, username: &str) -> Arc<Mutex<()>> {
        self.locks.entry(username.to_string()).or_default().clone()
    }

    /// Registers a channel after a live lookup.
    ///
    /// The cursor is pre-seeded a few messages behind the channel's newest
    /// message so that the first scrape backfills only a short history.
    pub async fn register_channel(
        &self,
        username: &str,
        name: Option<String>,
        is_active: bool,
    ) -> Result<Channel> {
        let username = normalize_username(username)?;
        if self.repository.get_channel(&username).await?.is_some() {
            return Err(AppError::validation(format!(
                "channel @{username} is already in the scraping list"
            )));
        }

        let entity = self.source.resolve_channel(&username).await?;
        let latest = self.source.latest_message_id(&entity).await?;
        let cursor = latest.map(|id| (id - self.initial_history_limit).max(0));

        let name = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or(entity.title);
        let channel = self
            .repository
            .create_channel(NewChannel {
                username,
                name,
                channel_id: entity.platform_id,
                latest_message_id: cursor,
                is_active,
            })
            .await?;

        tracing::info!(
            channel = %channel.username,
            cursor = ?channel.latest_message_id,
            "registered channel"
        );
        Ok(channel)
    }

    /// Fetches messages newer than the channel's cursor and stores the new ones.
    ///
    /// Messages already stored are skipped. Messages without text are counted
    /// as fetched but not stored. The cursor advances to the highest id fetched,
    /// whether or not that message was stored.
    pub async fn scrape_channel(&self, username: &str, limit: usize) -> Result<ScrapeOutcome> {
        let username = normalize_username(username)?;
        let lock = self.channel_lock(&username);
        let outcome = {
            let _guard = lock.lock().await;
            self.ingest_channel(&username, limit).await
        };

        // Drop the entry once no other run holds or waits on it.
        drop(lock);
        self.locks.remove_if(&username, |_, entry| Arc::strong_count(entry) == 1);
        outcome
    }

    async fn ingest_channel(&self, username: &str, limit: usize) -> Result<ScrapeOutcome> {
        let entity = self.source.resolve_channel(username).await?;
        let channel = self
            .repository
            .get_or_create_channel(username, &entity.title, entity.platform_id)
            .await?;

        let min_id = channel.latest_message_id.map_or(0, |id| id + 1);
        let messages = self.source.fetch_messages(&entity, min_id, limit).await?;

        let mut outcome = ScrapeOutcome {
            new_posts: 0,
            total_messages: messages.len(),
        };
        let mut max_id: Option<i64> = None;

        for message in messages {
            let message_id = message.id;
            max_id = Some(max_id.map_or(message_id, |max| max.max(message_id)));

            match self.ingest_message(&channel, message).await {
                Ok(true) => outcome.new_posts += 1,
                Ok(false) => {}
                Err(e) => tracing::error!(
                    channel = %username,
                    message_id,
                    error = %e,
                    "failed to store message"
                ),
            }
        }

        if let Some(max_id) = max_id {
            self.repository.advance_cursor(username, max_id).await?;
        }

        tracing::info!(
            channel = %username,
            new_posts = outcome.new_posts,
            total_messages = outcome.total_messages,
            cursor = ?max_id.or(channel.latest_message_id),
            "scraped channel"
        );
        Ok(outcome)
    }

    /// Stores one message. Returns whether a new post was created.
    async fn ingest_message(&self, channel: &Channel, message: SourceMessage) -> Result<bool> {
        let id = post_id(&channel.username, message.id);
        let Some(content) = message.text.filter(|text| !text.trim().is_empty()) else {
            tracing::debug!(post_id = %id, "skipping message without text");
            return Ok(false);
        };

        if self.repository.post_exists(&id).await? {
            tracing::debug!(post_id = %id, "post already stored");
            return Ok(false);
        }

        let post = NewPost {
            id,
            channel_name: channel.name.clone(),
            channel_username: channel.username.clone(),
            content,
            media_urls: message.media_urls,
            original_url: format!("{POST_URL_BASE}/{}/{}", channel.username, message.id),
            published_at: message.date,
        };
        let post = match self.repository.create_post(post, Vec::new()).await {
            Ok(post) => post,
            // Already stored by a concurrent writer.
            Err(AppError::Validation(_)) => return Ok(false),
            Err(e) => return Err(e),
        };
        tracing::debug!(post_id = %post.id, "stored post");

        if let Err(e) = self.tagger.tag_post(&post.id, None).await {
            tracing::warn!(post_id = %post.id, error = %e, "auto-tagging failed");
        }
        Ok(true)
    }

    /// Scrapes every active channel. A failing channel reports `(0, 0)` and
    /// does not affect the others.
    pub async fn scrape_all_channels(&self, limit_per_channel: usize) -> Result<BTreeMap<String, ScrapeOutcome>> {
        let channels = self.repository.list_active_channels().await?;

        let results: BTreeMap<String, ScrapeOutcome> = stream::iter(channels)
            .map(|channel| async move {
                let outcome = match self.scrape_channel(&channel.username, limit_per_channel).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        tracing::error!(channel = %channel.username, error = %e, "scrape failed");
                        ScrapeOutcome::default()
                    }
                };
                (channel.username, outcome)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        Ok(results)
    }
}
