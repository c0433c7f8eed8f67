use std::collections::HashSet;
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::models::{AuthorType, Tag};

/// Result of a bulk tagging run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaggingSummary {
    pub processed: usize,
    pub tagged: usize,
}

/// Mock tagger: attaches a random sample of a fixed vocabulary.
pub struct AutoTagger {
    repository: Repository,
    vocabulary: Vec<String>,
    rng: Mutex<StdRng>,
}

impl AutoTagger {
    pub fn new(repository: Repository, vocabulary: Vec<String>) -> Self {
        Self::with_rng(repository, vocabulary, StdRng::from_entropy())
    }

    /// Deterministic tagger for reproducible runs.
    pub fn with_seed(repository: Repository, vocabulary: Vec<String>, seed: u64) -> Self {
        Self::with_rng(repository, vocabulary, StdRng::seed_from_u64(seed))
    }

    fn with_rng(repository: Repository, vocabulary: Vec<String>, rng: StdRng) -> Self {
        let mut seen = HashSet::new();
        let vocabulary: Vec<String> = vocabulary
            .into_iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty() && seen.insert(name.clone()))
            .collect();

        Self {
            repository,
            vocabulary,
            rng: Mutex::new(rng),
        }
    }

    /// Picks `count` distinct names, or 1..=3 when unspecified.
    fn pick(&self, count: Option<usize>) -> Vec<String> {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        let count = count
            .unwrap_or_else(|| rng.gen_range(1..=3))
            .min(self.vocabulary.len());

        rand::seq::index::sample(&mut *rng, self.vocabulary.len(), count)
            .into_iter()
            .map(|i| self.vocabulary[i].clone())
            .collect()
    }

    /// Tags a post with a random sample of the vocabulary.
    ///
    /// Missing tags are created as automated; existing tags keep their origin.
    /// Only tags not already on the post are attached. Returns the tags picked
    /// for this call, not the post's full tag set.
    pub async fn tag_post(&self, post_id: &str, count: Option<usize>) -> Result<Vec<Tag>> {
        let post = self
            .repository
            .get_post(post_id)
            .await?
            .ok_or_else(|| AppError::not_found("post", post_id))?;

        let mut picked = Vec::new();
        for name in self.pick(count) {
            picked.push(
                self.repository
                    .get_or_create_tag(&name, AuthorType::Automated)
                    .await?,
            );
        }

        let missing: Vec<i64> = picked
            .iter()
            .filter(|tag| !post.tags.iter().any(|existing| existing.id == tag.id))
            .map(|tag| tag.id)
            .collect();
        if !missing.is_empty() {
            self.repository.add_tags(post_id, missing).await?;
        }

        tracing::debug!(
            post_id = %post_id,
            tags = ?picked.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            "auto-tagged post"
        );
        Ok(picked)
    }

    /// Tags up to `limit` posts that carry no tag at all, newest first.
    pub async fn tag_untagged_posts(&self, limit: i64) -> Result<TaggingSummary> {
        let mut summary = TaggingSummary::default();
        for post_id in self.repository.list_untagged_post_ids(limit).await? {
            summary.processed += 1;
            match self.tag_post(&post_id, None).await {
                Ok(tags) if !tags.is_empty() => summary.tagged += 1,
                Ok(_) => {}
                Err(e) => tracing::warn!(post_id = %post_id, error = %e, "auto-tagging failed"),
            }
        }

        tracing::info!(
            processed = summary.processed,
            tagged = summary.tagged,
            "tagged untagged posts"
        );
        Ok(summary)
    }
}
