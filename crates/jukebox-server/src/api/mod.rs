//! HTTP API handlers.
//!
//! Defines the Actix routes for queue mutation, playback control, search, and status.

pub mod health;
pub mod playback;
pub mod queue;
pub mod search;
pub mod streams;

pub use health::HealthResponse;
pub use playback::control;
pub use queue::{add_song, queue_list, remove_song, status};
pub use streams::status_stream;

/// Register every API route on an Actix service config.
pub fn configure(cfg: &mut actix_web::web::ServiceConfig) {
    cfg.service(health::health)
        .service(add_song)
        .service(remove_song)
        .service(status)
        .service(queue_list)
        .service(control)
        .service(search::search)
        .service(status_stream);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::{test, web, App};
    use jukebox_types::{PlaybackSnapshot, SearchResult, Song};
    use serde_json::{json, Value};

    use crate::api;
    use crate::audio_sink::SinkState;
    use crate::events::EventBus;
    use crate::models::{AddResponse, StatusReply, VolumeResponse};
    use crate::playback_manager::testing::{make_manager, FakeResolver, FakeSink};
    use crate::state::AppState;

    fn make_state(sink: Arc<FakeSink>) -> web::Data<AppState> {
        let resolver = Arc::new(FakeResolver::default());
        let manager = make_manager(resolver.clone(), sink);
        web::Data::new(AppState::new(manager, resolver, None, EventBus::new(), 10))
    }

    fn add_body(id: &str) -> Value {
        json!({ "id": id, "title": format!("Song {id}"), "thumbnail": "" })
    }

    #[actix_web::test]
    async fn add_into_idle_controller_starts_playback() {
        let state = make_state(Arc::new(FakeSink::default()));
        let app = test::init_service(App::new().app_data(state.clone()).configure(api::configure))
            .await;

        let req = test::TestRequest::post().uri("/add").set_json(add_body("a")).to_request();
        let resp: AddResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp.status, "added");
        assert_eq!(resp.queue_len, 0);

        let req = test::TestRequest::get().uri("/status").to_request();
        let status: PlaybackSnapshot = test::call_and_read_body_json(&app, req).await;
        assert!(status.is_playing);
        assert_eq!(status.current_song.map(|s| s.id), Some("a".to_string()));
        assert_eq!(status.volume, 80);
    }

    #[actix_web::test]
    async fn add_honors_insert_next_and_lists_queue() {
        let state = make_state(Arc::new(FakeSink::with_state(SinkState::Playing)));
        let app = test::init_service(App::new().app_data(state.clone()).configure(api::configure))
            .await;

        for body in [
            add_body("a"),
            add_body("b"),
            json!({ "id": "c", "title": "Song c", "insert_next": true }),
        ] {
            let req = test::TestRequest::post().uri("/add").set_json(body).to_request();
            assert!(test::call_service(&app, req).await.status().is_success());
        }

        let req = test::TestRequest::get().uri("/queue").to_request();
        let queue: Vec<Song> = test::call_and_read_body_json(&app, req).await;
        let ids: Vec<&str> = queue.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
        assert_eq!(queue[1].thumbnail, None);
    }

    #[actix_web::test]
    async fn add_accepts_blank_id_and_recovers_on_resolve_failure() {
        let resolver = Arc::new(FakeResolver::default());
        resolver.fail("");
        let sink = Arc::new(FakeSink::default());
        let manager = make_manager(resolver.clone(), sink.clone());
        let state = web::Data::new(AppState::new(manager, resolver, None, EventBus::new(), 10));
        let app = test::init_service(App::new().app_data(state.clone()).configure(api::configure))
            .await;

        let req = test::TestRequest::post()
            .uri("/add")
            .set_json(json!({ "id": "  ", "title": "x" }))
            .to_request();
        let resp: AddResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp.status, "added");
        assert_eq!(resp.queue_len, 0);
        assert_eq!(state.playback.snapshot().current_song, None);
        assert!(sink.loaded().is_empty());

        let req = test::TestRequest::post().uri("/add").set_json(add_body("b")).to_request();
        test::call_service(&app, req).await;
        assert_eq!(state.playback.snapshot().current_song.map(|s| s.id), Some("b".to_string()));
    }

    #[actix_web::test]
    async fn remove_reports_failure_for_bad_index() {
        let state = make_state(Arc::new(FakeSink::with_state(SinkState::Playing)));
        let app = test::init_service(App::new().app_data(state.clone()).configure(api::configure))
            .await;
        let req = test::TestRequest::post().uri("/add").set_json(add_body("a")).to_request();
        test::call_service(&app, req).await;

        for (uri, expected) in [
            ("/remove?index=-1", "failed"),
            ("/remove?index=1", "failed"),
            ("/remove?index=0", "removed"),
        ] {
            let req = test::TestRequest::post().uri(uri).to_request();
            let resp: StatusReply = test::call_and_read_body_json(&app, req).await;
            assert_eq!(resp.status, expected, "{uri}");
        }
        assert!(state.playback.list().is_empty());
    }

    #[actix_web::test]
    async fn control_actions() {
        let state = make_state(Arc::new(FakeSink::default()));
        let app = test::init_service(App::new().app_data(state.clone()).configure(api::configure))
            .await;
        for id in ["a", "b"] {
            let req = test::TestRequest::post().uri("/add").set_json(add_body(id)).to_request();
            test::call_service(&app, req).await;
        }

        let req = test::TestRequest::post().uri("/control/pause").to_request();
        let resp: StatusReply = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp.status, "paused");

        let req = test::TestRequest::post().uri("/control/pause").to_request();
        let resp: StatusReply = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp.status, "playing");

        let req = test::TestRequest::post().uri("/control/volume?level=150").to_request();
        let resp: VolumeResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp.volume, 100);

        let req = test::TestRequest::post().uri("/control/skip").to_request();
        let resp: StatusReply = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp.status, "skipped");
        assert_eq!(
            state.playback.snapshot().current_song.map(|s| s.id),
            Some("b".to_string())
        );

        let req = test::TestRequest::post().uri("/control/rewind").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({ "error": "invalid action" }));
    }

    #[actix_web::test]
    async fn control_reports_unreachable_sink() {
        let sink = Arc::new(FakeSink::default());
        sink.inner.lock().unwrap().fail_state = true;
        let state = make_state(sink);
        let app = test::init_service(App::new().app_data(state.clone()).configure(api::configure))
            .await;

        let req = test::TestRequest::post().uri("/control/pause").to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[actix_web::test]
    async fn search_and_health() {
        let state = make_state(Arc::new(FakeSink::default()));
        let app = test::init_service(App::new().app_data(state.clone()).configure(api::configure))
            .await;

        let req = test::TestRequest::get().uri("/search?q=lofi").to_request();
        let results: Vec<SearchResult> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "lofi-0");

        let req = test::TestRequest::get().uri("/health").to_request();
        let health: api::HealthResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
    }
}
