//! URL path to view table
//!
//! Purely declarative: no guards, no redirects, no data loading on entry.

use serde::Serialize;

use crate::models::{GenreId, MovieId};

/// Path patterns in axum syntax, paired with their view names
pub const ROUTES: &[(&str, &str)] = &[
    ("/", "home"),
    ("/genre/:id", "genre"),
    ("/favorites", "favorites"),
    ("/playlists", "playlists"),
    ("/playlist/:id", "playlist-detail"),
    ("/movie/:id", "movie-detail"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", content = "params", rename_all = "kebab-case")]
pub enum Route {
    Home,
    Genre { id: GenreId },
    Favorites,
    Playlists,
    PlaylistDetail { id: String },
    MovieDetail { id: MovieId },
}

impl Route {
    /// Matches a URL path against the route table
    pub fn resolve(path: &str) -> Option<Route> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        let segments: Vec<&str> = if trimmed.is_empty() {
            Vec::new()
        } else {
            trimmed.trim_start_matches('/').split('/').collect()
        };

        match segments.as_slice() {
            [] => Some(Route::Home),
            ["favorites"] => Some(Route::Favorites),
            ["playlists"] => Some(Route::Playlists),
            ["genre", id] => id.parse().ok().map(|id| Route::Genre { id }),
            ["movie", id] => id.parse().ok().map(|id| Route::MovieDetail { id }),
            ["playlist", id] if !id.is_empty() => Some(Route::PlaylistDetail {
                id: id.to_string(),
            }),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Route::Home => "home",
            Route::Genre { .. } => "genre",
            Route::Favorites => "favorites",
            Route::Playlists => "playlists",
            Route::PlaylistDetail { .. } => "playlist-detail",
            Route::MovieDetail { .. } => "movie-detail",
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Genre { id } => format!("/genre/{}", id),
            Route::Favorites => "/favorites".to_string(),
            Route::Playlists => "/playlists".to_string(),
            Route::PlaylistDetail { id } => format!("/playlist/{}", id),
            Route::MovieDetail { id } => format!("/movie/{}", id),
        }
    }
}
