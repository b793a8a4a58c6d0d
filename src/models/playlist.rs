use serde::{Deserialize, Serialize};

use super::MovieId;

/// A favorite document: `{userId, movieId}` plus its store-assigned id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub id: String,
    pub user_id: String,
    pub movie_id: MovieId,
}

/// A playlist document with its store-assigned id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub movies: Vec<MovieId>,
}

/// Playlist document before the store has assigned an id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewPlaylist {
    pub user_id: String,
    pub name: String,
    pub movies: Vec<MovieId>,
}

impl NewPlaylist {
    /// A playlist is created empty
    pub fn empty(user_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            movies: Vec::new(),
        }
    }

    pub fn with_id(self, id: String) -> Playlist {
        Playlist {
            id,
            user_id: self.user_id,
            name: self.name,
            movies: self.movies,
        }
    }
}
