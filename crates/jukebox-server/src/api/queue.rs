//! Queue-related API handlers.

use actix_web::{get, post, web, HttpResponse, Responder};
use jukebox_types::Song;

use crate::models::{AddRequest, AddResponse, RemoveQuery, StatusReply, StatusResponse};
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/add",
    request_body = AddRequest,
    responses(
        (status = 200, description = "Song queued", body = AddResponse)
    )
)]
#[post("/add")]
/// Queue a song, starting playback when the controller is idle.
pub async fn add_song(state: web::Data<AppState>, body: web::Json<AddRequest>) -> impl Responder {
    let AddRequest {
        id,
        title,
        thumbnail,
        insert_next,
        recommend,
    } = body.into_inner();
    // Unplayable ids are accepted here and dropped when they fail to resolve.
    let id = id.trim().to_string();
    let title = match title.trim() {
        "" => id.clone(),
        title => title.to_string(),
    };

    let queue_len = state
        .playback
        .enqueue(Song::new(id.clone(), title, thumbnail), insert_next)
        .await;
    if recommend {
        match state.enricher.as_ref() {
            Some(enricher) => {
                enricher.spawn(id);
            }
            None => tracing::debug!(song_id = %id, "recommendations disabled; ignoring flag"),
        }
    }
    HttpResponse::Ok().json(AddResponse {
        status: "added".to_string(),
        queue_len,
    })
}

#[utoipa::path(
    post,
    path = "/remove",
    params(RemoveQuery),
    responses(
        (status = 200, description = "`removed`, or `failed` for an out-of-range index", body = StatusReply)
    )
)]
#[post("/remove")]
/// Remove a pending entry by position.
pub async fn remove_song(state: web::Data<AppState>, query: web::Query<RemoveQuery>) -> impl Responder {
    let outcome = if state.playback.remove_at(query.index) {
        "removed"
    } else {
        "failed"
    };
    HttpResponse::Ok().json(StatusReply::new(outcome))
}

#[utoipa::path(
    get,
    path = "/status",
    responses(
        (status = 200, description = "Playback snapshot", body = StatusResponse)
    )
)]
#[get("/status")]
/// Return a consistent snapshot of playback state.
pub async fn status(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.playback.snapshot())
}

#[utoipa::path(
    get,
    path = "/queue",
    responses(
        (status = 200, description = "Pending songs, next first", body = [Song])
    )
)]
#[get("/queue")]
/// Return the pending queue.
pub async fn queue_list(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.playback.list())
}
