//! Playback coordination for the audio sink.
//!
//! Wraps the queue service, media resolver, and sink handle. Every playback
//! transition takes an epoch from the queue service; resolver and sink I/O runs
//! outside the queue lock and only the latest epoch may commit its result.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use actix_web::HttpResponse;
use jukebox_types::{PauseState, PlaybackSnapshot, Song};
use tokio::sync::Mutex as AsyncMutex;

use crate::audio_sink::{AudioSink, SinkError, SinkState};
use crate::queue_service::{QueueService, TransitionStep};
use crate::resolver::{MediaResolver, ResolveError};

/// Errors surfaced by controller operations.
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("could not resolve {song_id}: {source}")]
    Resolve {
        song_id: String,
        #[source]
        source: ResolveError,
    },
    #[error(transparent)]
    Sink(#[from] SinkError),
}

impl PlaybackError {
    /// Convert a controller error into an HTTP response.
    pub(crate) fn into_response(self) -> HttpResponse {
        match self {
            PlaybackError::Resolve { .. } => {
                HttpResponse::BadGateway().json(serde_json::json!({ "error": self.to_string() }))
            }
            PlaybackError::Sink(_) => HttpResponse::ServiceUnavailable()
                .json(serde_json::json!({ "error": self.to_string() })),
        }
    }
}

/// How an `advance` call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// This song is now playing.
    Playing(Song),
    /// Queue exhausted; controller is idle.
    Idle,
    /// A newer transition took over.
    Superseded,
    /// Another transition was already running; nothing changed.
    Busy,
}

/// Timeouts and defaults applied by the controller.
#[derive(Debug, Clone)]
pub struct PlaybackSettings {
    pub default_volume: u8,
    pub resolve_timeout: Duration,
    pub sink_timeout: Duration,
    pub monitor_interval: Duration,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            default_volume: 80,
            resolve_timeout: Duration::from_secs(30),
            sink_timeout: Duration::from_secs(5),
            monitor_interval: Duration::from_secs(1),
        }
    }
}

/// Queue controller: owns queue mutations and drives the sink through the resolver.
#[derive(Clone)]
pub struct PlaybackManager {
    queue_service: QueueService,
    resolver: Arc<dyn MediaResolver>,
    sink: Arc<dyn AudioSink>,
    dispatch: Arc<AsyncMutex<()>>,
    settings: PlaybackSettings,
}

impl PlaybackManager {
    pub(crate) fn new(
        queue_service: QueueService,
        resolver: Arc<dyn MediaResolver>,
        sink: Arc<dyn AudioSink>,
        settings: PlaybackSettings,
    ) -> Self {
        Self {
            queue_service,
            resolver,
            sink,
            dispatch: Arc::new(AsyncMutex::new(())),
            settings,
        }
    }

    pub fn settings(&self) -> &PlaybackSettings {
        &self.settings
    }

    /// Insert a song and start playback if the controller is idle.
    ///
    /// Returns the pending queue length once any automatic start has finished.
    pub async fn enqueue(&self, song: Song, at_front: bool) -> usize {
        let sink_state = match self.sink_call(self.sink.state()).await {
            Ok(state) => Some(state),
            Err(err) => {
                tracing::warn!(error = %err, "sink state unavailable; not auto-starting");
                None
            }
        };
        tracing::info!(song_id = %song.id, title = %song.title, at_front, "enqueue");
        let outcome = self.queue_service.push(song, at_front, sink_state);
        let Some(epoch) = outcome.start_epoch else {
            return outcome.queue_len;
        };
        tracing::debug!(epoch, "controller idle; starting playback");
        let step = self.queue_service.step_transition(epoch);
        self.run_transition(epoch, step).await;
        self.queue_service.len()
    }

    /// Remove a pending entry by position.
    pub fn remove_at(&self, index: i64) -> bool {
        let removed = self.queue_service.remove_at(index);
        if !removed {
            tracing::debug!(index, "remove rejected: index out of range");
        }
        removed
    }

    /// Play the next queued song, skipping entries that fail to resolve or load.
    ///
    /// No-op while another transition is running; only `skip` preempts one.
    pub async fn advance(&self) -> AdvanceOutcome {
        let Some((epoch, step)) = self.queue_service.begin_transition_if_settled() else {
            tracing::debug!("advance ignored: transition already in flight");
            return AdvanceOutcome::Busy;
        };
        self.run_transition(epoch, step).await
    }

    /// Stop the current song and advance, regardless of playback state.
    pub async fn skip(&self) -> AdvanceOutcome {
        let (epoch, step) = self.queue_service.begin_transition();
        {
            let _dispatch = self.dispatch.lock().await;
            if let Err(err) = self.sink_call(self.sink.stop()).await {
                tracing::warn!(error = %err, "sink stop failed during skip");
            }
        }
        self.run_transition(epoch, step).await
    }

    /// Pause when the sink is actively playing, otherwise resume.
    pub async fn toggle_pause(&self) -> Result<PauseState, PlaybackError> {
        if self.sink_call(self.sink.is_playing()).await? {
            self.sink_call(self.sink.pause()).await?;
            self.queue_service.set_playing(false);
            Ok(PauseState::Paused)
        } else {
            self.sink_call(self.sink.play()).await?;
            self.queue_service.set_playing(true);
            Ok(PauseState::Playing)
        }
    }

    /// Clamp, store, and apply a volume level; returns the stored level.
    pub async fn set_volume(&self, level: i64) -> Result<u8, PlaybackError> {
        let level = level.clamp(0, 100) as u8;
        self.sink_call(self.sink.set_volume(level)).await?;
        self.queue_service.set_volume(level);
        Ok(level)
    }

    /// Push the stored volume to the sink (startup).
    pub async fn apply_volume(&self) -> Result<(), PlaybackError> {
        let level = self.queue_service.volume();
        self.sink_call(self.sink.set_volume(level)).await?;
        Ok(())
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.queue_service.snapshot()
    }

    /// Pending songs in play order.
    pub fn list(&self) -> Vec<Song> {
        self.queue_service.list()
    }

    /// Live membership check against the pending queue.
    pub fn contains(&self, song_id: &str) -> bool {
        self.queue_service.contains(song_id)
    }

    pub fn transition_in_flight(&self) -> bool {
        self.queue_service.transition_in_flight()
    }

    /// Read the sink state under the sink timeout.
    pub async fn sink_state(&self) -> Result<SinkState, PlaybackError> {
        Ok(self.sink_call(self.sink.state()).await?)
    }

    /// Align the playing flag with what the sink reports.
    pub fn reconcile(&self, state: SinkState) {
        if self.queue_service.transition_in_flight() {
            return;
        }
        match state {
            SinkState::Playing => {
                self.queue_service.set_playing(true);
            }
            SinkState::Paused | SinkState::Idle => {
                self.queue_service.set_playing(false);
            }
            SinkState::Ended => {}
        }
    }

    async fn run_transition(&self, epoch: u64, mut step: TransitionStep) -> AdvanceOutcome {
        loop {
            let song = match step {
                TransitionStep::Play(song) => song,
                TransitionStep::Drained => {
                    tracing::info!("queue drained; playback idle");
                    self.stop_if_current(epoch).await;
                    return AdvanceOutcome::Idle;
                }
                TransitionStep::Superseded => {
                    tracing::debug!(epoch, "transition superseded");
                    return AdvanceOutcome::Superseded;
                }
            };
            match self.start_song(epoch, &song).await {
                Ok(true) => {
                    tracing::info!(song_id = %song.id, title = %song.title, "now playing");
                    return AdvanceOutcome::Playing(song);
                }
                Ok(false) => {
                    tracing::info!(epoch, song_id = %song.id, "skipped before dispatch");
                    return AdvanceOutcome::Superseded;
                }
                Err(err) => {
                    tracing::warn!(song_id = %song.id, error = %err, "playback failed; trying next song");
                }
            }
            step = self.queue_service.step_transition(epoch);
        }
    }

    /// Resolve outside any lock, then dispatch to the sink while holding the
    /// dispatch lock so a superseded transition can never load media.
    async fn start_song(&self, epoch: u64, song: &Song) -> Result<bool, PlaybackError> {
        tracing::info!(song_id = %song.id, title = %song.title, "resolving");
        let url = self.resolve(&song.id).await?;

        let _dispatch = self.dispatch.lock().await;
        if !self.queue_service.is_current(epoch) {
            return Ok(false);
        }
        self.sink_call(self.sink.load(&url)).await?;
        self.sink_call(self.sink.play()).await?;
        let volume = self.queue_service.volume();
        if let Err(err) = self.sink_call(self.sink.set_volume(volume)).await {
            tracing::warn!(error = %err, volume, "failed to re-apply volume");
        }
        Ok(self.queue_service.commit_playing(epoch, song.clone()))
    }

    async fn stop_if_current(&self, epoch: u64) {
        let _dispatch = self.dispatch.lock().await;
        if !self.queue_service.is_current(epoch) {
            return;
        }
        if let Err(err) = self.sink_call(self.sink.stop()).await {
            tracing::warn!(error = %err, "sink stop failed after drain");
        }
    }

    async fn resolve(&self, song_id: &str) -> Result<String, PlaybackError> {
        let timeout = self.settings.resolve_timeout;
        let result = match tokio::time::timeout(timeout, self.resolver.resolve(song_id)).await {
            Ok(result) => result,
            Err(_) => Err(ResolveError::Timeout(timeout)),
        };
        result.map_err(|source| PlaybackError::Resolve {
            song_id: song_id.to_string(),
            source,
        })
    }

    async fn sink_call<T>(
        &self,
        call: impl Future<Output = Result<T, SinkError>>,
    ) -> Result<T, SinkError> {
        let timeout = self.settings.sink_timeout;
        match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(SinkError::Timeout(timeout)),
        }
    }
}
