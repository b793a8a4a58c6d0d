use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    identity::IdentityState,
    middleware::request_id::RequestId,
    models::{GenreId, MovieId, User},
    router::Route,
    store::{ActionResult, Settled, StoreState},
};

use super::AppState;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "first_page")]
    pub page: u32,
}

fn first_page() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct YearRequest {
    #[serde(default)]
    pub year: String,
}

#[derive(Debug, Deserialize)]
pub struct CreatePlaylistRequest {
    pub name: String,
}

/// Result of an action together with the state it left behind
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub outcome: Settled,
    pub state: StoreState,
}

#[derive(Debug, Serialize)]
pub struct ViewResponse {
    #[serde(flatten)]
    pub route: Route,
    pub state: StoreState,
}

async fn respond(state: &AppState, result: ActionResult) -> AppResult<Json<ActionResponse>> {
    let outcome = result?;
    Ok(Json(ActionResponse {
        outcome,
        state: state.store.snapshot().await,
    }))
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Resolves a view path and returns it with the current state; nothing is fetched
pub async fn view(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
) -> AppResult<Json<ViewResponse>> {
    let route = Route::resolve(uri.path())
        .ok_or_else(|| AppError::NotFound(format!("No view for {}", uri.path())))?;

    Ok(Json(ViewResponse {
        route,
        state: state.store.snapshot().await,
    }))
}

/// Current state snapshot
pub async fn get_state(State(state): State<AppState>) -> Json<StoreState> {
    Json(state.store.snapshot().await)
}

pub async fn fetch_genres(State(state): State<AppState>) -> AppResult<Json<ActionResponse>> {
    let result = state.store.fetch_genres().await;
    respond(&state, result).await
}

pub async fn fetch_trending(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<ActionResponse>> {
    tracing::info!(request_id = %request_id, page = query.page, "Fetching trending movies");

    let result = state.store.fetch_trending_movies(query.page).await;
    respond(&state, result).await
}

pub async fn fetch_by_genre(
    State(state): State<AppState>,
    Path(genre_id): Path<GenreId>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<ActionResponse>> {
    let result = state.store.fetch_movies_by_genre(genre_id, query.page).await;
    respond(&state, result).await
}

pub async fn search(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<SearchRequest>,
) -> AppResult<Json<ActionResponse>> {
    if request.query.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "Search query cannot be empty".to_string(),
        ));
    }

    tracing::info!(request_id = %request_id, query = %request.query, "Searching movies");

    let result = state.store.search_movies(&request.query).await;
    respond(&state, result).await
}

/// Sets or clears (empty string) the release year filter
pub async fn set_year(
    State(state): State<AppState>,
    Json(request): Json<YearRequest>,
) -> AppResult<Json<StoreState>> {
    let year = request.year.trim();
    if !year.is_empty() && !year.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::InvalidInput(format!("Invalid year: {}", year)));
    }

    state.store.set_year(year).await;
    Ok(Json(state.store.snapshot().await))
}

pub async fn fetch_favorites(State(state): State<AppState>) -> AppResult<Json<ActionResponse>> {
    let result = state.store.fetch_favorites().await;
    respond(&state, result).await
}

pub async fn save_favorite(
    State(state): State<AppState>,
    Path(movie_id): Path<MovieId>,
) -> AppResult<Json<ActionResponse>> {
    let result = state.store.save_favorite(movie_id).await;
    respond(&state, result).await
}

pub async fn delete_favorite(
    State(state): State<AppState>,
    Path(movie_id): Path<MovieId>,
) -> AppResult<Json<ActionResponse>> {
    let result = state.store.delete_favorite(movie_id).await;
    respond(&state, result).await
}

pub async fn fetch_playlists(State(state): State<AppState>) -> AppResult<Json<ActionResponse>> {
    let result = state.store.fetch_playlists().await;
    respond(&state, result).await
}

pub async fn create_playlist(
    State(state): State<AppState>,
    Json(request): Json<CreatePlaylistRequest>,
) -> AppResult<(StatusCode, Json<ActionResponse>)> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidInput(
            "Playlist name cannot be empty".to_string(),
        ));
    }

    let result = state.store.create_playlist(name).await;
    let response = respond(&state, result).await?;
    Ok((StatusCode::CREATED, response))
}

/// Deletes a playlist by document id
///
/// The delete is not checked against the session user; ownership enforcement is left
/// to the deployment (document store rules or an auth layer in front of this route).
/// Without a session the delete still happens and the follow-up refetch answers 401.
pub async fn delete_playlist(
    State(state): State<AppState>,
    Path(playlist_id): Path<String>,
) -> AppResult<Json<ActionResponse>> {
    let result = state.store.delete_playlist(&playlist_id).await;
    respond(&state, result).await
}

/// Current identity resolution
pub async fn get_session(State(state): State<AppState>) -> Json<IdentityState> {
    Json(state.identity.borrow().clone())
}

/// Forwards a sign-in reported by the identity provider
pub async fn sign_in(State(state): State<AppState>, Json(user): Json<User>) -> AppResult<StatusCode> {
    if user.uid.trim().is_empty() {
        return Err(AppError::InvalidInput("User id cannot be empty".to_string()));
    }

    publish(&state, Some(user))
}

/// Forwards a sign-out reported by the identity provider
pub async fn sign_out(State(state): State<AppState>) -> AppResult<StatusCode> {
    publish(&state, None)
}

fn publish(state: &AppState, user: Option<User>) -> AppResult<StatusCode> {
    if state.identity_hub.publish(user) {
        Ok(StatusCode::ACCEPTED)
    } else {
        Err(AppError::Internal("Identity observer is not running".to_string()))
    }
}
