mod orchestrator;
mod telegram;

pub use orchestrator::{Orchestrator, ScrapeOutcome};
pub use telegram::TelegramWebClient;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    /// The channel is private, does not exist, or has no public preview.
    #[error("channel @{0} is private or does not exist")]
    ChannelUnavailable(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Parse(String),
}

/// A resolved channel on the source platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntity {
    pub username: String,
    pub title: String,
    pub platform_id: Option<i64>,
    /// Newest messages seen while resolving, newest first. Clients that get
    /// them for free may fill this so later calls skip a round trip.
    pub recent_messages: Vec<SourceMessage>,
}

/// One message as returned by the source. `text` is `None` for media-only
/// messages and service messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMessage {
    pub id: i64,
    pub text: Option<String>,
    pub date: DateTime<Utc>,
    pub media_urls: Vec<String>,
}

/// Read access to a messaging platform's public channels.
#[async_trait]
pub trait SourceClient: Send + Sync {
    async fn resolve_channel(&self, username: &str) -> Result<SourceEntity, SourceError>;

    /// Id of the newest message in the channel, `None` for an empty channel.
    async fn latest_message_id(&self, entity: &SourceEntity) -> Result<Option<i64>, SourceError>;

    /// Up to `limit` messages with `id >= min_id`, newest first.
    async fn fetch_messages(
        &self,
        entity: &SourceEntity,
        min_id: i64,
        limit: usize,
    ) -> Result<Vec<SourceMessage>, SourceError>;
}
