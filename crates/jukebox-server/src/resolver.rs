//! Media resolver abstraction.
//!
//! Maps song identifiers to playable stream URLs and answers free-text searches.

use std::time::Duration;

use async_trait::async_trait;
use jukebox_types::SearchResult;

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("invalid song id: {0:?}")]
    InvalidId(String),
    #[error("resolver failed to start: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("resolver exited with failure: {0}")]
    Command(String),
    #[error("resolver output malformed: {0}")]
    Malformed(String),
    #[error("resolver timed out after {0:?}")]
    Timeout(Duration),
}

#[async_trait]
pub trait MediaResolver: Send + Sync {
    /// Produce a currently-valid stream URL for `song_id`.
    async fn resolve(&self, song_id: &str) -> Result<String, ResolveError>;
    /// Search for songs matching `query`, best match first.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, ResolveError>;
}
