//! Background end-of-track monitor.
//!
//! Polls the sink at a fixed interval and advances the queue when the loaded
//! song has finished. Runs for the life of the process.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::audio_sink::SinkState;
use crate::playback_manager::{AdvanceOutcome, PlaybackManager};

/// Start the monitor loop on the current runtime.
pub fn spawn_monitor(manager: PlaybackManager, interval: Duration) -> JoinHandle<()> {
    tracing::info!(interval_ms = interval.as_millis() as u64, "playback monitor started");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            poll_once(&manager).await;
        }
    })
}

/// Run a single monitor iteration; returns the advance outcome if one was triggered.
pub async fn poll_once(manager: &PlaybackManager) -> Option<AdvanceOutcome> {
    if manager.transition_in_flight() {
        return None;
    }
    let state = match manager.sink_state().await {
        Ok(state) => state,
        Err(err) => {
            tracing::debug!(error = %err, "monitor: sink state unavailable");
            return None;
        }
    };
    if state == SinkState::Ended {
        tracing::debug!("monitor: track ended; advancing");
        return Some(manager.advance().await);
    }
    manager.reconcile(state);
    None
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::playback_manager::testing::{make_manager, song, FakeResolver, FakeSink};

    #[tokio::test]
    async fn ended_sink_triggers_advance() {
        let sink = Arc::new(FakeSink::default());
        let manager = make_manager(Arc::new(FakeResolver::default()), sink.clone());
        manager.enqueue(song("a"), false).await;
        manager.enqueue(song("b"), false).await;

        sink.set_state(SinkState::Ended);
        let outcome = poll_once(&manager).await;

        assert_eq!(outcome, Some(AdvanceOutcome::Playing(song("b"))));
        assert_eq!(manager.snapshot().current_song, Some(song("b")));
    }

    #[tokio::test]
    async fn ended_sink_with_empty_queue_goes_idle_once() {
        let sink = Arc::new(FakeSink::default());
        let manager = make_manager(Arc::new(FakeResolver::default()), sink.clone());
        manager.enqueue(song("a"), false).await;

        sink.set_state(SinkState::Ended);
        assert_eq!(poll_once(&manager).await, Some(AdvanceOutcome::Idle));
        let version = manager.snapshot().change_version;

        // Drained playback stops the sink, so later polls see it idle.
        assert_eq!(poll_once(&manager).await, None);
        assert_eq!(poll_once(&manager).await, None);
        assert_eq!(manager.snapshot().change_version, version);
    }

    #[tokio::test]
    async fn playing_sink_leaves_queue_alone() {
        let sink = Arc::new(FakeSink::default());
        let manager = make_manager(Arc::new(FakeResolver::default()), sink.clone());
        manager.enqueue(song("a"), false).await;
        manager.enqueue(song("b"), false).await;

        assert_eq!(poll_once(&manager).await, None);
        assert_eq!(manager.list(), vec![song("b")]);
    }

    #[tokio::test]
    async fn externally_paused_sink_clears_playing_flag() {
        let sink = Arc::new(FakeSink::default());
        let manager = make_manager(Arc::new(FakeResolver::default()), sink.clone());
        manager.enqueue(song("a"), false).await;

        sink.set_state(SinkState::Paused);
        poll_once(&manager).await;

        assert!(!manager.snapshot().is_playing);
    }

    #[tokio::test]
    async fn sink_errors_do_not_stop_polling() {
        let sink = Arc::new(FakeSink::default());
        let manager = make_manager(Arc::new(FakeResolver::default()), sink.clone());
        sink.inner.lock().unwrap().fail_state = true;

        assert_eq!(poll_once(&manager).await, None);
        sink.inner.lock().unwrap().fail_state = false;
        assert_eq!(poll_once(&manager).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_monitor_advances_on_tick() {
        let sink = Arc::new(FakeSink::with_state(SinkState::Playing));
        let manager = make_manager(Arc::new(FakeResolver::default()), sink.clone());
        manager.enqueue(song("a"), false).await;

        let handle = spawn_monitor(manager.clone(), Duration::from_secs(1));
        sink.set_state(SinkState::Ended);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(manager.snapshot().current_song, Some(song("a")));
        handle.abort();
    }
}
