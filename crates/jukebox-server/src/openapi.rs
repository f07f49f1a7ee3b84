use jukebox_types::{PlaybackSnapshot, SearchResult, Song, SongOrigin};
use utoipa::OpenApi;

use crate::api;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::health::health,
        api::queue::add_song,
        api::queue::remove_song,
        api::queue::status,
        api::queue::queue_list,
        api::playback::control,
        api::search::search,
        api::streams::status_stream,
    ),
    components(
        schemas(
            Song,
            SongOrigin,
            PlaybackSnapshot,
            SearchResult,
            models::AddRequest,
            models::AddResponse,
            models::StatusReply,
            models::VolumeResponse,
            models::ErrorResponse,
            api::HealthResponse,
        )
    ),
    tags(
        (name = "jukebox-server", description = "Household audio queue API")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in ["/add", "/remove", "/status", "/queue", "/control/{action}", "/search", "/health"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
