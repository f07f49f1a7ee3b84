//! Shared application state.
//!
//! Holds the queue controller, resolver, and enricher handles shared by handlers.

use std::collections::VecDeque;
use std::sync::Arc;

use jukebox_types::Song;

use crate::events::EventBus;
use crate::playback_manager::PlaybackManager;
use crate::recommendations::Enricher;
use crate::resolver::MediaResolver;

/// Everything guarded by the controller's single exclusive lock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueState {
    /// Pending songs, front plays next.
    pub items: VecDeque<Song>,
    /// Song most recently committed to the sink.
    pub now_playing: Option<Song>,
    /// Playback intent as last observed or commanded.
    pub playing: bool,
    /// Volume level, 0..=100.
    pub volume: u8,
    /// Change counter reported to polling clients.
    pub version: u64,
    /// Epoch of the most recently started playback transition.
    pub epoch: u64,
    /// Epoch of the most recently finished playback transition.
    pub settled_epoch: u64,
}

impl QueueState {
    pub fn new(volume: u8) -> Self {
        Self {
            volume: volume.min(100),
            ..Self::default()
        }
    }

    /// A transition has started but not committed or drained yet.
    pub fn transition_in_flight(&self) -> bool {
        self.epoch != self.settled_epoch
    }

    pub(crate) fn bump_version(&mut self) {
        self.version = self.version.wrapping_add(1);
    }
}

/// Shared application state for Actix handlers and background workers.
pub struct AppState {
    /// Queue controller.
    pub playback: PlaybackManager,
    /// Resolver used for free-text search.
    pub resolver: Arc<dyn MediaResolver>,
    /// Recommendation enricher, when enabled.
    pub enricher: Option<Enricher>,
    /// Event bus for UI subscriptions.
    pub events: EventBus,
    /// Number of results requested per search.
    pub search_limit: usize,
}

impl AppState {
    pub fn new(
        playback: PlaybackManager,
        resolver: Arc<dyn MediaResolver>,
        enricher: Option<Enricher>,
        events: EventBus,
        search_limit: usize,
    ) -> Self {
        Self {
            playback,
            resolver,
            enricher,
            events,
            search_limit,
        }
    }
}
