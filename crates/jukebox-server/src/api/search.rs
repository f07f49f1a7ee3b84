use actix_web::{get, web, HttpResponse, Responder};
use jukebox_types::SearchResult;

use crate::models::SearchQuery;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matches, best first; empty when the lookup fails", body = [SearchResult])
    )
)]
#[get("/search")]
/// Free-text song search.
pub async fn search(state: web::Data<AppState>, query: web::Query<SearchQuery>) -> impl Responder {
    let timeout = state.playback.settings().resolve_timeout;
    let lookup = state.resolver.search(&query.q, state.search_limit);
    let results = match tokio::time::timeout(timeout, lookup).await {
        Ok(Ok(results)) => results,
        Ok(Err(err)) => {
            tracing::warn!(query = %query.q, error = %err, "search failed");
            Vec::new()
        }
        Err(_) => {
            tracing::warn!(query = %query.q, ?timeout, "search timed out");
            Vec::new()
        }
    };
    HttpResponse::Ok().json(results)
}
