//! Recommendation enrichment.
//!
//! After a flagged enqueue, related songs are fetched for the seed, filtered
//! against the live queue and the seed title, and fed back through the
//! ordinary enqueue path.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jukebox_types::{SearchResult, Song};
use tokio::task::JoinHandle;

use crate::playback_manager::PlaybackManager;
use crate::resolver::ResolveError;

#[derive(Debug, thiserror::Error)]
pub enum RecommendationError {
    #[error("recommendation lookup failed: {0}")]
    Lookup(#[from] ResolveError),
    #[error("recommendation lookup timed out after {0:?}")]
    Timeout(Duration),
}

/// Source of songs related to a seed.
#[async_trait]
pub trait RecommendationService: Send + Sync {
    /// Display title of the seed song.
    async fn seed_title(&self, song_id: &str) -> Result<String, ResolveError>;
    /// Up to `limit` songs related to the seed, most relevant first.
    async fn related(&self, song_id: &str, limit: usize) -> Result<Vec<SearchResult>, ResolveError>;
}

#[derive(Debug, Clone)]
pub struct RecommendationSettings {
    pub candidate_limit: usize,
    pub max_accepted: usize,
    pub title_prefix: String,
    pub timeout: Duration,
}

impl Default for RecommendationSettings {
    fn default() -> Self {
        Self {
            candidate_limit: 20,
            max_accepted: 5,
            title_prefix: "[Recommended] ".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Normalize a title for near-duplicate detection.
///
/// Lowercases, drops the token "official" and any bracketed qualifier such as
/// "(Official Video)" or "[Lyrics]", then collapses whitespace.
pub fn normalize_title(title: &str) -> String {
    let lowered = title.to_lowercase().replace("official", "");
    let mut kept = String::with_capacity(lowered.len());
    let mut depth = 0usize;
    for ch in lowered.chars() {
        match ch {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            _ if depth == 0 => kept.push(ch),
            _ => {}
        }
    }
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `true` when either normalized title contains the other.
///
/// Titles that normalize to nothing never overlap.
pub fn titles_overlap(seed: &str, candidate: &str) -> bool {
    let seed = normalize_title(seed);
    let candidate = normalize_title(candidate);
    if seed.is_empty() || candidate.is_empty() {
        return false;
    }
    seed.contains(&candidate) || candidate.contains(&seed)
}

/// Feeds related songs into the queue controller.
#[derive(Clone)]
pub struct Enricher {
    service: Arc<dyn RecommendationService>,
    manager: PlaybackManager,
    settings: RecommendationSettings,
}

impl Enricher {
    pub fn new(
        service: Arc<dyn RecommendationService>,
        manager: PlaybackManager,
        settings: RecommendationSettings,
    ) -> Self {
        Self {
            service,
            manager,
            settings,
        }
    }

    /// Run enrichment for `seed_id` in the background.
    pub fn spawn(&self, seed_id: String) -> JoinHandle<()> {
        let enricher = self.clone();
        tokio::spawn(async move {
            match enricher.enrich(&seed_id).await {
                Ok(added) => tracing::info!(seed_id = %seed_id, added, "recommendations added"),
                Err(err) => {
                    tracing::warn!(seed_id = %seed_id, error = %err, "recommendation lookup failed")
                }
            }
        })
    }

    /// Fetch, filter, and enqueue recommendations; returns how many were added.
    pub async fn enrich(&self, seed_id: &str) -> Result<usize, RecommendationError> {
        let timeout = self.settings.timeout;
        let lookup = async {
            tokio::try_join!(
                self.service.seed_title(seed_id),
                self.service.related(seed_id, self.settings.candidate_limit),
            )
        };
        let (seed_title, candidates) = tokio::time::timeout(timeout, lookup)
            .await
            .map_err(|_| RecommendationError::Timeout(timeout))??;
        tracing::debug!(
            seed_id,
            seed_title = %seed_title,
            candidates = candidates.len(),
            "filtering recommendations"
        );

        let mut added = 0;
        for candidate in candidates.into_iter().take(self.settings.candidate_limit) {
            if added >= self.settings.max_accepted {
                break;
            }
            if candidate.id == seed_id
                || self.manager.contains(&candidate.id)
                || titles_overlap(&seed_title, &candidate.title)
            {
                continue;
            }
            let thumbnail = Some(candidate.thumbnail);
            let title = format!("{}{}", self.settings.title_prefix, candidate.title);
            self.manager
                .enqueue(Song::recommended(candidate.id, title, thumbnail), false)
                .await;
            added += 1;
        }
        Ok(added)
    }
}
