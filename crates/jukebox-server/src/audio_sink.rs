//! Audio sink abstraction for dispatching playback commands.
//!
//! Implementations translate playback operations into commands for an external player.

use std::time::Duration;

use async_trait::async_trait;

/// Playback states reported by a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkState {
    /// Nothing loaded.
    Idle,
    Playing,
    Paused,
    /// Loaded media ran to completion (or failed to play).
    Ended,
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("sink unreachable: {0}")]
    Connect(#[source] std::io::Error),
    #[error("sink i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("sink rejected command: {0}")]
    Rejected(String),
    #[error("sink protocol error: {0}")]
    Protocol(String),
    #[error("sink closed the connection before replying")]
    Disconnected,
    #[error("sink call timed out after {0:?}")]
    Timeout(Duration),
}

#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Load a stream URL, replacing whatever is loaded.
    async fn load(&self, url: &str) -> Result<(), SinkError>;
    /// Start or resume playback.
    async fn play(&self) -> Result<(), SinkError>;
    async fn pause(&self) -> Result<(), SinkError>;
    /// Stop playback and unload media.
    async fn stop(&self) -> Result<(), SinkError>;
    /// Apply a volume level in 0..=100.
    async fn set_volume(&self, level: u8) -> Result<(), SinkError>;
    async fn state(&self) -> Result<SinkState, SinkError>;

    /// `true` only while audio is actively playing.
    async fn is_playing(&self) -> Result<bool, SinkError> {
        Ok(self.state().await? == SinkState::Playing)
    }
}
