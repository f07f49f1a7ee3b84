//! Server-sent event streams.

use std::collections::VecDeque;
use std::time::Instant;

use actix_web::http::header;
use actix_web::web::Bytes;
use actix_web::{get, web, Error, HttpResponse, Responder};
use futures_util::{stream::unfold, Stream};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{Duration, Interval, MissedTickBehavior};

use crate::events::JukeboxEvent;
use crate::state::AppState;

const PING_INTERVAL: Duration = Duration::from_secs(15);

struct StatusStreamState {
    state: web::Data<AppState>,
    receiver: broadcast::Receiver<JukeboxEvent>,
    interval: Interval,
    pending: VecDeque<Bytes>,
    last_version: Option<u64>,
    last_volume: Option<u8>,
    last_ping: Instant,
}

fn sse_event(event: &str, data: &str) -> Bytes {
    let mut payload = String::new();
    payload.push_str("event: ");
    payload.push_str(event);
    payload.push('\n');
    for line in data.lines() {
        payload.push_str("data: ");
        payload.push_str(line);
        payload.push('\n');
    }
    payload.push('\n');
    Bytes::from(payload)
}

fn push_ping_if_needed(pending: &mut VecDeque<Bytes>, last_ping: &mut Instant) {
    if pending.is_empty() && last_ping.elapsed() >= PING_INTERVAL {
        *last_ping = Instant::now();
        pending.push_back(Bytes::from(": ping\n\n"));
    }
}

fn sse_response<S>(stream: S) -> HttpResponse
where
    S: Stream<Item = Result<Bytes, Error>> + 'static,
{
    HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, "text/event-stream"))
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .insert_header((header::CONNECTION, "keep-alive"))
        .streaming(stream)
}

impl StatusStreamState {
    /// Queue a `status` event when the snapshot moved since the last one sent.
    fn refresh(&mut self) {
        let snapshot = self.state.playback.snapshot();
        if self.last_version == Some(snapshot.change_version)
            && self.last_volume == Some(snapshot.volume)
        {
            return;
        }
        self.last_version = Some(snapshot.change_version);
        self.last_volume = Some(snapshot.volume);
        let json = serde_json::to_string(&snapshot).unwrap_or_else(|_| "null".to_string());
        self.pending.push_back(sse_event("status", &json));
    }
}

#[utoipa::path(
    get,
    path = "/status/stream",
    responses(
        (status = 200, description = "Status event stream")
    )
)]
#[get("/status/stream")]
/// Stream playback snapshots via server-sent events.
pub async fn status_stream(state: web::Data<AppState>) -> impl Responder {
    let receiver = state.events.subscribe();
    let mut interval = tokio::time::interval(Duration::from_secs(5));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut ctx = StatusStreamState {
        state: state.clone(),
        receiver,
        interval,
        pending: VecDeque::new(),
        last_version: None,
        last_volume: None,
        last_ping: Instant::now(),
    };
    ctx.refresh();

    let stream = unfold(ctx, |mut ctx| async move {
        loop {
            if let Some(bytes) = ctx.pending.pop_front() {
                return Some((Ok::<Bytes, Error>(bytes), ctx));
            }

            let refresh = tokio::select! {
                _ = ctx.interval.tick() => true,
                result = ctx.receiver.recv() => match result {
                    Ok(JukeboxEvent::StatusChanged | JukeboxEvent::QueueChanged) => true,
                    Err(RecvError::Lagged(_)) => true,
                    Err(RecvError::Closed) => return None,
                },
            };
            if refresh {
                ctx.refresh();
            }

            push_ping_if_needed(&mut ctx.pending, &mut ctx.last_ping);
        }
    });

    sse_response(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sse_event_prefixes_each_line() {
        let bytes = sse_event("status", "{\"a\":1}\n{\"b\":2}");
        assert_eq!(
            std::str::from_utf8(&bytes).unwrap(),
            "event: status\ndata: {\"a\":1}\ndata: {\"b\":2}\n\n"
        );
    }

    #[test]
    fn ping_only_when_idle_and_due() {
        let mut pending = VecDeque::new();
        let mut last_ping = Instant::now();
        push_ping_if_needed(&mut pending, &mut last_ping);
        assert!(pending.is_empty());

        let mut stale = Instant::now() - PING_INTERVAL;
        push_ping_if_needed(&mut pending, &mut stale);
        assert_eq!(pending.len(), 1);
    }
}
