use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::normalize_username;
use crate::scrape::ScrapeOutcome;

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct ScrapeQuery {
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ScrapeAllQuery {
    limit_per_channel: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ChannelScrape {
    status: &'static str,
    channel: String,
    #[serde(flatten)]
    outcome: ScrapeOutcome,
}

#[derive(Debug, Serialize)]
pub struct BatchScrape {
    status: &'static str,
    channels_scraped: usize,
    total_new_posts: usize,
    total_messages: usize,
    results: BTreeMap<String, ScrapeOutcome>,
}

impl BatchScrape {
    fn new(results: BTreeMap<String, ScrapeOutcome>) -> Self {
        Self {
            status: "success",
            channels_scraped: results.len(),
            total_new_posts: results.values().map(|o| o.new_posts).sum(),
            total_messages: results.values().map(|o| o.total_messages).sum(),
            results,
        }
    }
}

/// Scrapes one channel synchronously, adding it to the list if unknown.
pub async fn scrape_channel(
    State(app): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<ScrapeQuery>,
) -> Result<Json<ChannelScrape>> {
    let limit = app.scrape_limit(query.limit)?;
    let channel = normalize_username(&username)?;
    let outcome = app.orchestrator.scrape_channel(&channel, limit).await?;
    Ok(Json(ChannelScrape {
        status: "success",
        channel,
        outcome,
    }))
}

pub async fn scrape_all(
    State(app): State<AppState>,
    Query(query): Query<ScrapeAllQuery>,
) -> Result<Json<BatchScrape>> {
    let limit = app.scrape_limit(query.limit_per_channel)?;
    let results = app.orchestrator.scrape_all_channels(limit).await?;
    Ok(Json(BatchScrape::new(results)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_totals_sum_channel_results() {
        let results = BTreeMap::from([
            ("a".to_string(), ScrapeOutcome { new_posts: 2, total_messages: 3 }),
            ("b".to_string(), ScrapeOutcome::default()),
        ]);
        let batch = BatchScrape::new(results);
        assert_eq!(batch.channels_scraped, 2);
        assert_eq!(batch.total_new_posts, 2);
        assert_eq!(batch.total_messages, 3);
    }
}
