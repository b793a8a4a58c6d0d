use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::AppState;
use crate::middleware::request_id::{make_span_with_request_id, request_id_middleware};
use crate::router::ROUTES;

/// Creates the main router: view paths, the action API and the health check
pub fn create_router(state: AppState) -> Router {
    let mut router: Router<AppState> = Router::new().route("/health", get(handlers::health_check));

    for (path, _) in ROUTES {
        router = router.route(path, get(handlers::view));
    }

    router
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Action routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/state", get(handlers::get_state))
        // Catalog
        .route("/genres", post(handlers::fetch_genres))
        .route("/movies/trending", post(handlers::fetch_trending))
        .route("/movies/genre/:genre_id", post(handlers::fetch_by_genre))
        .route("/movies/search", post(handlers::search))
        .route("/filters/year", put(handlers::set_year))
        // Favorites
        .route("/favorites", post(handlers::fetch_favorites))
        .route("/favorites/:movie_id", put(handlers::save_favorite))
        .route("/favorites/:movie_id", delete(handlers::delete_favorite))
        // Playlists
        .route("/playlists/refresh", post(handlers::fetch_playlists))
        .route("/playlists", post(handlers::create_playlist))
        .route("/playlists/:playlist_id", delete(handlers::delete_playlist))
        // Session
        .route("/session", get(handlers::get_session))
        .route("/session", post(handlers::sign_in))
        .route("/session", delete(handlers::sign_out))
}
