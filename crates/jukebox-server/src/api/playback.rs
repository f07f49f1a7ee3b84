//! Playback control handlers.

use actix_web::{post, web, HttpResponse, Responder};

use crate::models::{ControlQuery, ErrorResponse, StatusReply, VolumeResponse};
use crate::playback_manager::AdvanceOutcome;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/control/{action}",
    params(
        ("action" = String, Path, description = "`pause`, `skip`, or `volume`"),
        ControlQuery
    ),
    responses(
        (status = 200, description = "Action applied", body = StatusReply),
        (status = 400, description = "Unknown action", body = ErrorResponse),
        (status = 503, description = "Audio sink unavailable", body = ErrorResponse)
    )
)]
#[post("/control/{action}")]
/// Pause/resume, skip, or set the volume.
pub async fn control(
    state: web::Data<AppState>,
    action: web::Path<String>,
    query: web::Query<ControlQuery>,
) -> impl Responder {
    let action = action.into_inner();
    tracing::info!(action = %action, "control request");
    match action.as_str() {
        "pause" => match state.playback.toggle_pause().await {
            Ok(pause) => HttpResponse::Ok().json(StatusReply::new(pause.as_str())),
            Err(err) => err.into_response(),
        },
        "skip" => {
            if let AdvanceOutcome::Playing(song) = state.playback.skip().await {
                tracing::debug!(song_id = %song.id, "skipped to next song");
            }
            HttpResponse::Ok().json(StatusReply::new("skipped"))
        }
        "volume" => match state.playback.set_volume(query.level).await {
            Ok(volume) => HttpResponse::Ok().json(VolumeResponse { volume }),
            Err(err) => err.into_response(),
        },
        _ => HttpResponse::BadRequest().json(ErrorResponse::new("invalid action")),
    }
}
