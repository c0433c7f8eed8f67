use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Duration, TimeZone, Utc};
use serde_json::Value;
use tower::ServiceExt;

use tg_aggregator::db::Repository;
use tg_aggregator::scrape::{SourceClient, SourceEntity, SourceError, SourceMessage};
use tg_aggregator::{api, App, Config};

/// Source with canned channels. Unknown usernames are unavailable.
#[derive(Default)]
pub struct FakeSource {
    channels: Mutex<HashMap<String, Vec<SourceMessage>>>,
}

impl FakeSource {
    pub fn add_messages(&self, username: &str, messages: Vec<SourceMessage>) {
        self.channels
            .lock()
            .unwrap()
            .entry(username.to_string())
            .or_default()
            .extend(messages);
    }
}

#[async_trait]
impl SourceClient for FakeSource {
    async fn resolve_channel(&self, username: &str) -> Result<SourceEntity, SourceError> {
        if !self.channels.lock().unwrap().contains_key(username) {
            return Err(SourceError::ChannelUnavailable(username.to_string()));
        }
        Ok(SourceEntity {
            username: username.to_string(),
            title: format!("{username} title"),
            platform_id: None,
            recent_messages: Vec::new(),
        })
    }

    async fn latest_message_id(&self, entity: &SourceEntity) -> Result<Option<i64>, SourceError> {
        let channels = self.channels.lock().unwrap();
        Ok(channels
            .get(&entity.username)
            .and_then(|messages| messages.iter().map(|m| m.id).max()))
    }

    async fn fetch_messages(
        &self,
        entity: &SourceEntity,
        min_id: i64,
        limit: usize,
    ) -> Result<Vec<SourceMessage>, SourceError> {
        let channels = self.channels.lock().unwrap();
        let mut messages: Vec<SourceMessage> = channels
            .get(&entity.username)
            .ok_or_else(|| SourceError::ChannelUnavailable(entity.username.clone()))?
            .iter()
            .filter(|m| m.id >= min_id)
            .cloned()
            .collect();
        messages.sort_by(|a, b| b.id.cmp(&a.id));
        messages.truncate(limit);
        Ok(messages)
    }
}

pub fn message(id: i64, text: Option<&str>) -> SourceMessage {
    SourceMessage {
        id,
        text: text.map(String::from),
        date: Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap() + Duration::minutes(id),
        media_urls: Vec::new(),
    }
}

pub struct TestApp {
    pub router: Router,
    pub app: Arc<App>,
    pub source: Arc<FakeSource>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(Config::default()).await
    }

    pub async fn with_config(config: Config) -> Self {
        let source = Arc::new(FakeSource::default());
        let repository = Repository::open_in_memory().await.unwrap();
        let app = Arc::new(
            App::with_source(config, repository, source.clone())
                .await
                .unwrap(),
        );
        Self {
            router: api::router(app.clone()),
            app,
            source,
        }
    }

    pub async fn request(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request("GET", uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.request("POST", uri, body).await
    }
}
