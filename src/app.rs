use std::sync::Arc;

use crate::ai::AutoTagger;
use crate::config::Config;
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::models::{normalize_username, ChannelUpdate};
use crate::scrape::{Orchestrator, SourceClient, TelegramWebClient};

/// Everything a request handler or CLI command needs, built once at startup.
pub struct App {
    pub config: Config,
    pub repository: Repository,
    pub tagger: Arc<AutoTagger>,
    pub orchestrator: Orchestrator,
}

impl App {
    pub async fn new(config: Config) -> Result<Self> {
        let repository = Repository::new(&config.db_path).await?;
        let source = Arc::new(TelegramWebClient::new(&config.telegram)?);
        Self::with_source(config, repository, source).await
    }

    /// Builds the app around an already opened store and any source client.
    pub async fn with_source(
        config: Config,
        repository: Repository,
        source: Arc<dyn SourceClient>,
    ) -> Result<Self> {
        let tagger = Arc::new(AutoTagger::new(
            repository.clone(),
            config.tag_vocabulary.clone(),
        ));
        let orchestrator = Orchestrator::new(
            repository.clone(),
            source,
            tagger.clone(),
            config.scrape_concurrency,
            config.initial_history_limit,
        );

        let app = Self {
            config,
            repository,
            tagger,
            orchestrator,
        };
        app.seed_channels().await?;
        Ok(app)
    }

    /// Registers the `[[channels]]` from the config. No live lookup is made and
    /// existing cursors are left alone.
    async fn seed_channels(&self) -> Result<()> {
        for seed in &self.config.channels {
            let username = normalize_username(&seed.username)?;
            let existed = self.repository.get_channel(&username).await?.is_some();
            let name = seed.name.as_deref().unwrap_or("");
            self.repository
                .get_or_create_channel(&username, name, None)
                .await?;
            if !existed && !seed.is_active {
                self.repository
                    .update_channel(
                        &username,
                        ChannelUpdate {
                            name: None,
                            is_active: Some(false),
                        },
                    )
                    .await?;
            }
            tracing::debug!(channel = %username, existed, "seeded channel");
        }
        Ok(())
    }

    /// Resolves a requested scrape limit against the configured default and cap.
    pub fn scrape_limit(&self, requested: Option<usize>) -> Result<usize> {
        let limit = requested.unwrap_or(self.config.default_scrape_limit);
        if limit == 0 || limit > self.config.max_scrape_limit {
            return Err(AppError::validation(format!(
                "limit must be between 1 and {}",
                self.config.max_scrape_limit
            )));
        }
        Ok(limit)
    }
}
