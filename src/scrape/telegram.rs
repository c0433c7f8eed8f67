use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::{Client, StatusCode};
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::config::TelegramConfig;

use super::{SourceClient, SourceEntity, SourceError, SourceMessage};

/// Reads public channels through the `t.me/s/<username>` web preview.
///
/// The preview serves roughly twenty messages per page, newest last, and pages
/// backwards with `?before=<id>`.
pub struct TelegramWebClient {
    client: Client,
    base_url: Url,
    max_pages: usize,
}

/// One parsed preview page.
#[derive(Debug, Default)]
struct PreviewPage {
    /// False when the page carries no channel header, i.e. Telegram served
    /// its generic landing page instead of a channel.
    channel_found: bool,
    title: Option<String>,
    messages: Vec<SourceMessage>,
}

struct Selectors {
    channel_info: Selector,
    channel_title: Selector,
    message: Selector,
    text: Selector,
    date: Selector,
    photo: Selector,
    video: Selector,
    document: Selector,
    service: Selector,
}

fn selectors() -> &'static Selectors {
    static SELECTORS: OnceLock<Selectors> = OnceLock::new();
    SELECTORS.get_or_init(|| {
        let parse = |css: &str| Selector::parse(css).expect("static selector is valid");
        Selectors {
            channel_info: parse(".tgme_channel_info"),
            channel_title: parse(".tgme_channel_info_header_title"),
            message: parse(".tgme_widget_message[data-post]"),
            text: parse(".tgme_widget_message_text"),
            date: parse(".tgme_widget_message_date time[datetime]"),
            photo: parse(".tgme_widget_message_photo_wrap"),
            video: parse(".tgme_widget_message_video_player, .tgme_widget_message_roundvideo_player"),
            document: parse(".tgme_widget_message_document"),
            service: parse(".service_message"),
        }
    })
}

fn background_image(style: &str) -> Option<String> {
    static BACKGROUND_RE: OnceLock<Regex> = OnceLock::new();
    let re = BACKGROUND_RE.get_or_init(|| {
        Regex::new(r#"background-image:\s*url\(['"]?([^'")]+)['"]?\)"#).expect("static pattern is valid")
    });
    re.captures(style)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
}

/// Flattens message HTML to plain text. Returns `None` for empty text.
fn message_text(element: ElementRef) -> Option<String> {
    let html = element.inner_html();
    let text = html2text::from_read(html.as_bytes(), 4096)
        .unwrap_or_else(|_| element.text().collect::<String>());
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn parse_message(element: ElementRef, username: &str) -> Option<SourceMessage> {
    let sel = selectors();
    let data_post = element.value().attr("data-post")?;
    let id: i64 = data_post.rsplit('/').next()?.parse().ok()?;

    let is_service = element.select(&sel.service).next().is_some()
        || element.value().classes().any(|c| c == "service_message");
    let text = if is_service {
        None
    } else {
        element.select(&sel.text).next().and_then(message_text)
    };

    let date = element
        .select(&sel.date)
        .next()
        .and_then(|t| t.value().attr("datetime"))
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| {
            tracing::debug!(channel = %username, message_id = id, "message without a date");
            Utc::now()
        });

    let mut media_urls: Vec<String> = element
        .select(&sel.photo)
        .filter_map(|photo| photo.value().attr("style").and_then(background_image))
        .map(|url| format!("telegram:photo:{url}"))
        .collect();
    if element.select(&sel.video).next().is_some() {
        media_urls.push(format!("telegram:video:{username}/{id}"));
    }
    if element.select(&sel.document).next().is_some() {
        media_urls.push(format!("telegram:document:{username}/{id}"));
    }

    Some(SourceMessage {
        id,
        text,
        date,
        media_urls,
    })
}

fn parse_preview(html: &str, username: &str) -> PreviewPage {
    let sel = selectors();
    let document = Html::parse_document(html);

    let channel_found = document.select(&sel.channel_info).next().is_some();
    let title = document
        .select(&sel.channel_title)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty());

    let mut messages: Vec<SourceMessage> = document
        .select(&sel.message)
        .filter_map(|element| parse_message(element, username))
        .collect();
    messages.sort_by(|a, b| b.id.cmp(&a.id));
    messages.dedup_by_key(|m| m.id);

    PreviewPage {
        channel_found,
        title,
        messages,
    }
}

impl TelegramWebClient {
    pub fn new(config: &TelegramConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(config.user_agent.as_str())
            .build()?;
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| SourceError::Parse(format!("invalid base url {:?}: {e}", config.base_url)))?;

        Ok(Self {
            client,
            base_url,
            max_pages: config.max_pages.max(1),
        })
    }

    fn preview_url(&self, username: &str, before: Option<i64>) -> Result<Url, SourceError> {
        let mut url = self
            .base_url
            .join(&format!("s/{username}"))
            .map_err(|e| SourceError::Parse(e.to_string()))?;
        if let Some(before) = before {
            url.query_pairs_mut().append_pair("before", &before.to_string());
        }
        Ok(url)
    }

    async fn fetch_page(&self, username: &str, before: Option<i64>) -> Result<PreviewPage, SourceError> {
        let url = self.preview_url(username, before)?;
        tracing::debug!(channel = %username, %url, "fetching preview page");

        let response = self.client.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(SourceError::ChannelUnavailable(username.to_string()));
        }
        // Private channels redirect from /s/<name> to the plain invite page.
        if !response.url().path().starts_with("/s/") {
            return Err(SourceError::ChannelUnavailable(username.to_string()));
        }
        let response = response.error_for_status()?;
        let html = response.text().await?;

        let page = parse_preview(&html, username);
        if !page.channel_found {
            return Err(SourceError::ChannelUnavailable(username.to_string()));
        }
        Ok(page)
    }
}

#[async_trait]
impl SourceClient for TelegramWebClient {
    async fn resolve_channel(&self, username: &str) -> Result<SourceEntity, SourceError> {
        let page = self.fetch_page(username, None).await?;
        Ok(SourceEntity {
            username: username.to_string(),
            title: page.title.unwrap_or_else(|| username.to_string()),
            platform_id: None,
            recent_messages: page.messages,
        })
    }

    async fn latest_message_id(&self, entity: &SourceEntity) -> Result<Option<i64>, SourceError> {
        if let Some(newest) = entity.recent_messages.first() {
            return Ok(Some(newest.id));
        }
        let page = self.fetch_page(&entity.username, None).await?;
        Ok(page.messages.first().map(|m| m.id))
    }

    async fn fetch_messages(
        &self,
        entity: &SourceEntity,
        min_id: i64,
        limit: usize,
    ) -> Result<Vec<SourceMessage>, SourceError> {
        let mut collected: Vec<SourceMessage> = Vec::new();
        if limit == 0 {
            return Ok(collected);
        }

        let mut before: Option<i64> = None;
        for _ in 0..self.max_pages {
            // The first page was already read by resolve_channel.
            let messages = match before {
                None if !entity.recent_messages.is_empty() => entity.recent_messages.clone(),
                _ => self.fetch_page(&entity.username, before).await?.messages,
            };
            let Some(oldest) = messages.last().map(|m| m.id) else {
                break;
            };
            if before.is_some_and(|b| oldest >= b) {
                break;
            }

            for message in messages {
                if message.id < min_id || before.is_some_and(|b| message.id >= b) {
                    continue;
                }
                collected.push(message);
                if collected.len() >= limit {
                    return Ok(collected);
                }
            }

            if oldest <= min_id || oldest <= 1 {
                break;
            }
            before = Some(oldest);
        }

        Ok(collected)
    }
}
