//! Per-user document collections: favorites and playlists

use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::DocumentStoreError,
    models::{Favorite, MovieId, NewPlaylist, Playlist},
};

pub type DocumentResult<T> = Result<T, DocumentStoreError>;

/// Trait for the remote document store holding favorites and playlists
///
/// Every query filters by exact user id. Document ids are assigned by the store.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// All favorite documents belonging to the user
    async fn favorites_for(&self, user_id: &str) -> DocumentResult<Vec<Favorite>>;

    /// Inserts `{userId, movieId}` and returns the new document id.
    /// No uniqueness check is made against existing documents.
    async fn insert_favorite(&self, user_id: &str, movie_id: MovieId) -> DocumentResult<String>;

    /// Deletes every favorite document of the user for that movie, returning how many
    async fn delete_favorites(&self, user_id: &str, movie_id: MovieId) -> DocumentResult<u64>;

    /// All playlist documents belonging to the user
    async fn playlists_for(&self, user_id: &str) -> DocumentResult<Vec<Playlist>>;

    /// Inserts a playlist document and returns its id
    async fn insert_playlist(&self, playlist: NewPlaylist) -> DocumentResult<String>;

    /// Deletes a playlist document by id; deleting a missing id is not an error
    async fn delete_playlist(&self, playlist_id: &str) -> DocumentResult<()>;
}

#[derive(Default)]
struct Collections {
    favorites: Vec<Favorite>,
    playlists: Vec<Playlist>,
}

/// In-process document store, used when no database is configured
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    inner: Arc<RwLock<Collections>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn favorites_for(&self, user_id: &str) -> DocumentResult<Vec<Favorite>> {
        let inner = self.inner.read().await;
        Ok(inner
            .favorites
            .iter()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert_favorite(&self, user_id: &str, movie_id: MovieId) -> DocumentResult<String> {
        let id = Uuid::new_v4().to_string();
        let mut inner = self.inner.write().await;
        inner.favorites.push(Favorite {
            id: id.clone(),
            user_id: user_id.to_string(),
            movie_id,
        });
        Ok(id)
    }

    async fn delete_favorites(&self, user_id: &str, movie_id: MovieId) -> DocumentResult<u64> {
        let mut inner = self.inner.write().await;
        let before = inner.favorites.len();
        inner
            .favorites
            .retain(|f| !(f.user_id == user_id && f.movie_id == movie_id));
        Ok((before - inner.favorites.len()) as u64)
    }

    async fn playlists_for(&self, user_id: &str) -> DocumentResult<Vec<Playlist>> {
        let inner = self.inner.read().await;
        Ok(inner
            .playlists
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert_playlist(&self, playlist: NewPlaylist) -> DocumentResult<String> {
        let id = Uuid::new_v4().to_string();
        let mut inner = self.inner.write().await;
        inner.playlists.push(playlist.with_id(id.clone()));
        Ok(id)
    }

    async fn delete_playlist(&self, playlist_id: &str) -> DocumentResult<()> {
        let mut inner = self.inner.write().await;
        inner.playlists.retain(|p| p.id != playlist_id);
        Ok(())
    }
}
