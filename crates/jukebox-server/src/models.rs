//! API models and OpenAPI schemas.
//!
//! Defines request/response structures for the jukebox HTTP API.

use jukebox_types::PlaybackSnapshot;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Enqueue payload for `/add`.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AddRequest {
    /// Source-system song id (YouTube video id).
    pub id: String,
    /// Display title.
    pub title: String,
    /// Thumbnail URL; empty strings are treated as missing.
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Insert ahead of every pending entry instead of appending.
    #[serde(default)]
    pub insert_next: bool,
    /// Fetch related songs for this one in the background.
    #[serde(default)]
    pub recommend: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AddResponse {
    /// Always `added`.
    pub status: String,
    /// Pending queue length after the insert.
    pub queue_len: usize,
}

/// Query for `/remove`.
#[derive(Clone, Debug, Deserialize, IntoParams)]
pub struct RemoveQuery {
    /// Zero-based position in the pending queue.
    pub index: i64,
}

/// Generic `{status}` reply used by remove and control actions.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusReply {
    pub status: String,
}

impl StatusReply {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
        }
    }
}

/// Query accepted by `/control/{action}`.
#[derive(Clone, Debug, Default, Deserialize, IntoParams)]
pub struct ControlQuery {
    /// Volume level for the `volume` action; clamped to 0..=100. The reply
    /// carries the clamped level, not the requested one. Missing means 0.
    #[serde(default)]
    pub level: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct VolumeResponse {
    /// Stored volume after clamping.
    pub volume: u8,
}

/// Query for `/search`.
#[derive(Clone, Debug, Deserialize, IntoParams)]
pub struct SearchQuery {
    /// Free-text query.
    pub q: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Status response payload.
pub type StatusResponse = PlaybackSnapshot;
