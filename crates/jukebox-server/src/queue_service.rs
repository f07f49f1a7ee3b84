//! Queue management + transition bookkeeping.
//!
//! Owns every mutation of the shared queue state. Each method holds the lock only
//! for in-memory work; callers perform resolver and sink I/O between calls.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use jukebox_types::{PlaybackSnapshot, Song};

use crate::audio_sink::SinkState;
use crate::events::EventBus;
use crate::state::QueueState;

/// Next thing a playback transition should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TransitionStep {
    /// Resolve and dispatch this song.
    Play(Song),
    /// Queue was empty; playback is now idle.
    Drained,
    /// A newer transition started; stop without touching state.
    Superseded,
}

/// Result of inserting a song.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EnqueueOutcome {
    pub queue_len: usize,
    /// Epoch reserved for an automatic start, when the controller was idle.
    pub start_epoch: Option<u64>,
}

/// Whether an enqueue into a controller with no transition in flight should start playback.
pub(crate) fn sink_allows_start(sink: SinkState) -> bool {
    !matches!(sink, SinkState::Playing | SinkState::Paused)
}

#[derive(Clone)]
pub(crate) struct QueueService {
    queue: Arc<Mutex<QueueState>>,
    events: EventBus,
}

impl QueueService {
    /// Create a queue service backed by the shared queue state.
    pub(crate) fn new(queue: Arc<Mutex<QueueState>>, events: EventBus) -> Self {
        Self { queue, events }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pending songs in play order.
    pub(crate) fn list(&self) -> Vec<Song> {
        self.lock().items.iter().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// True when a pending entry has this id.
    pub(crate) fn contains(&self, song_id: &str) -> bool {
        self.lock().items.iter().any(|song| song.id == song_id)
    }

    /// Consistent copy of queue + playback state.
    pub(crate) fn snapshot(&self) -> PlaybackSnapshot {
        let q = self.lock();
        PlaybackSnapshot {
            is_playing: q.playing,
            current_song: q.now_playing.clone(),
            volume: q.volume,
            queue_len: q.items.len(),
            change_version: q.version,
        }
    }

    pub(crate) fn volume(&self) -> u8 {
        self.lock().volume
    }

    pub(crate) fn transition_in_flight(&self) -> bool {
        self.lock().transition_in_flight()
    }

    /// Insert a song at the back (or front) of the queue.
    ///
    /// When nothing is playing, no transition is in flight, and `sink` allows it,
    /// an epoch is reserved under the same lock so concurrent inserts cannot both
    /// start playback.
    pub(crate) fn push(&self, song: Song, at_front: bool, sink: Option<SinkState>) -> EnqueueOutcome {
        let mut q = self.lock();
        if at_front {
            q.items.push_front(song);
        } else {
            q.items.push_back(song);
        }
        q.bump_version();
        let idle = !q.transition_in_flight() && !q.playing;
        let start_epoch = match sink {
            Some(sink) if idle && sink_allows_start(sink) => {
                q.epoch += 1;
                Some(q.epoch)
            }
            _ => None,
        };
        let queue_len = q.items.len();
        drop(q);
        self.events.queue_changed();
        EnqueueOutcome {
            queue_len,
            start_epoch,
        }
    }

    /// Remove the pending entry at `index`; out-of-range indexes leave the queue untouched.
    pub(crate) fn remove_at(&self, index: i64) -> bool {
        let mut q = self.lock();
        let Ok(index) = usize::try_from(index) else {
            return false;
        };
        if q.items.remove(index).is_none() {
            return false;
        }
        q.bump_version();
        drop(q);
        self.events.queue_changed();
        true
    }

    /// Start a new transition, superseding any in flight, and take its first step.
    pub(crate) fn begin_transition(&self) -> (u64, TransitionStep) {
        let mut q = self.lock();
        self.open_transition(&mut q)
    }

    /// Start a new transition only when none is in flight.
    ///
    /// A running transition already owns the song it popped; superseding it from
    /// here would drop that song without playing it.
    pub(crate) fn begin_transition_if_settled(&self) -> Option<(u64, TransitionStep)> {
        let mut q = self.lock();
        if q.transition_in_flight() {
            return None;
        }
        Some(self.open_transition(&mut q))
    }

    fn open_transition(&self, q: &mut QueueState) -> (u64, TransitionStep) {
        q.epoch += 1;
        let epoch = q.epoch;
        let step = self.take_step(q);
        (epoch, step)
    }

    /// Take the next step of transition `epoch` (after a reservation or a failed attempt).
    pub(crate) fn step_transition(&self, epoch: u64) -> TransitionStep {
        let mut q = self.lock();
        if q.epoch != epoch {
            return TransitionStep::Superseded;
        }
        self.take_step(&mut q)
    }

    fn take_step(&self, q: &mut QueueState) -> TransitionStep {
        match q.items.pop_front() {
            Some(song) => {
                q.bump_version();
                self.events.queue_changed();
                TransitionStep::Play(song)
            }
            None => {
                q.now_playing = None;
                q.playing = false;
                q.settled_epoch = q.epoch;
                q.bump_version();
                self.events.status_changed();
                TransitionStep::Drained
            }
        }
    }

    /// `true` while `epoch` is the latest transition.
    pub(crate) fn is_current(&self, epoch: u64) -> bool {
        self.lock().epoch == epoch
    }

    /// Record `song` as now playing if `epoch` is still current.
    pub(crate) fn commit_playing(&self, epoch: u64, song: Song) -> bool {
        let mut q = self.lock();
        if q.epoch != epoch {
            return false;
        }
        q.now_playing = Some(song);
        q.playing = true;
        q.settled_epoch = epoch;
        q.bump_version();
        drop(q);
        self.events.status_changed();
        true
    }

    /// Update the playing flag; returns `true` when it changed.
    pub(crate) fn set_playing(&self, playing: bool) -> bool {
        let mut q = self.lock();
        let playing = playing && q.now_playing.is_some();
        if q.playing == playing {
            return false;
        }
        q.playing = playing;
        q.bump_version();
        drop(q);
        self.events.status_changed();
        true
    }

    pub(crate) fn set_volume(&self, level: u8) {
        let mut q = self.lock();
        if q.volume != level {
            q.volume = level;
            drop(q);
            self.events.status_changed();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_service() -> QueueService {
        let queue = Arc::new(Mutex::new(QueueState::new(80)));
        QueueService::new(queue, EventBus::new())
    }

    fn song(id: &str) -> Song {
        Song::new(id, format!("Song {id}"), None)
    }

    fn ids(service: &QueueService) -> Vec<String> {
        service.list().into_iter().map(|s| s.id).collect()
    }

    #[test]
    fn push_appends_and_prepends() {
        let service = make_service();
        service.push(song("a"), false, None);
        service.push(song("b"), false, None);
        let outcome = service.push(song("c"), true, None);

        assert_eq!(outcome.queue_len, 3);
        assert_eq!(ids(&service), vec!["c", "a", "b"]);
    }

    #[test]
    fn push_reserves_start_only_once() {
        let service = make_service();
        let first = service.push(song("a"), false, Some(SinkState::Idle));
        let second = service.push(song("b"), false, Some(SinkState::Idle));

        assert_eq!(first.start_epoch, Some(1));
        assert_eq!(second.start_epoch, None);
        assert!(service.transition_in_flight());
    }

    #[test]
    fn push_does_not_start_while_sink_busy() {
        let service = make_service();
        assert_eq!(service.push(song("a"), false, Some(SinkState::Playing)).start_epoch, None);
        assert_eq!(service.push(song("b"), false, Some(SinkState::Paused)).start_epoch, None);
        assert_eq!(service.push(song("c"), false, None).start_epoch, None);
        assert!(service.push(song("d"), false, Some(SinkState::Ended)).start_epoch.is_some());
    }

    #[test]
    fn push_does_not_start_while_committed_song_plays() {
        let service = make_service();
        service.push(song("a"), false, None);
        let (epoch, _) = service.begin_transition();
        service.commit_playing(epoch, song("a"));

        // A stale sink read must not restart playback over the current song.
        let outcome = service.push(song("b"), false, Some(SinkState::Idle));
        assert_eq!(outcome.start_epoch, None);
    }

    #[test]
    fn remove_at_rejects_out_of_range() {
        let service = make_service();
        service.push(song("a"), false, None);
        service.push(song("b"), false, None);
        let before = service.snapshot().change_version;

        assert!(!service.remove_at(-1));
        assert!(!service.remove_at(2));
        assert_eq!(ids(&service), vec!["a", "b"]);
        assert_eq!(service.snapshot().change_version, before);

        assert!(service.remove_at(0));
        assert_eq!(ids(&service), vec!["b"]);
        assert!(service.snapshot().change_version > before);
    }

    #[test]
    fn begin_transition_pops_front() {
        let service = make_service();
        service.push(song("a"), false, None);
        service.push(song("b"), false, None);

        let (epoch, step) = service.begin_transition();

        assert_eq!(epoch, 1);
        assert_eq!(step, TransitionStep::Play(song("a")));
        assert_eq!(ids(&service), vec!["b"]);
    }

    #[test]
    fn settled_transition_refuses_to_preempt() {
        let service = make_service();
        service.push(song("a"), false, None);
        service.push(song("b"), false, None);
        let (epoch, _) = service.begin_transition();

        assert_eq!(service.begin_transition_if_settled(), None);
        assert!(service.is_current(epoch));
        assert_eq!(ids(&service), vec!["b"]);

        assert!(service.commit_playing(epoch, song("a")));
        let (next, step) = service.begin_transition_if_settled().unwrap();
        assert_eq!(next, epoch + 1);
        assert_eq!(step, TransitionStep::Play(song("b")));
    }

    #[test]
    fn drained_transition_clears_now_playing() {
        let service = make_service();
        service.push(song("a"), false, None);
        let (epoch, _) = service.begin_transition();
        assert!(service.commit_playing(epoch, song("a")));

        let (_, step) = service.begin_transition();

        assert_eq!(step, TransitionStep::Drained);
        let snapshot = service.snapshot();
        assert_eq!(snapshot.current_song, None);
        assert!(!snapshot.is_playing);
        assert!(!service.transition_in_flight());
    }

    #[test]
    fn stale_epoch_cannot_commit_or_step() {
        let service = make_service();
        service.push(song("a"), false, None);
        service.push(song("b"), false, None);
        let (old, _) = service.begin_transition();
        let (new, _) = service.begin_transition();

        assert!(!service.is_current(old));
        assert!(!service.commit_playing(old, song("a")));
        assert_eq!(service.step_transition(old), TransitionStep::Superseded);
        assert!(service.commit_playing(new, song("b")));
        assert_eq!(service.snapshot().current_song, Some(song("b")));
    }

    #[test]
    fn version_strictly_increases_across_mutations() {
        let service = make_service();
        let mut last = service.snapshot().change_version;
        service.push(song("a"), false, None);
        for _ in 0..3 {
            let now = service.snapshot().change_version;
            assert!(now > last);
            last = now;
            service.push(song("x"), true, None);
        }
        service.remove_at(0);
        assert!(service.snapshot().change_version > last);
    }

    #[test]
    fn set_playing_requires_current_song() {
        let service = make_service();
        assert!(!service.set_playing(true));
        assert!(!service.snapshot().is_playing);

        service.push(song("a"), false, None);
        let (epoch, _) = service.begin_transition();
        service.commit_playing(epoch, song("a"));
        assert!(service.set_playing(false));
        assert!(!service.set_playing(false));
    }
}
