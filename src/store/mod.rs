//! Application state store
//!
//! A single state container mediating between the movie catalog and the per-user
//! document store. Mutations are synchronous assignments on [`StoreState`]; actions
//! are async orchestrations on [`MovieStore`] that call the remote services and commit
//! the results.
//!
//! Favorites and playlists are never patched locally after a remote write: each write
//! is followed by a full re-fetch. Every remote response is tagged with a per-channel
//! generation and a response that is no longer the latest is discarded.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::{
    catalog::{CatalogClient, MovieRequest},
    db::{CacheKey, DocumentStore, KeyValueCache},
    error::ActionError,
    models::{Genre, GenreId, MovieId, NewPlaylist, User},
};

mod state;

pub use state::{Channel, StoreState};

/// How a successful action settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Settled {
    /// Remote data was committed to state
    Committed,
    /// Served from the local cache without network access
    FromCache,
    /// A newer request on the same channel started first; this response was dropped
    Superseded,
}

pub type ActionResult = Result<Settled, ActionError>;

/// Logs a failed action and hands the error back
fn failed(action: &'static str, err: ActionError) -> ActionError {
    match &err {
        ActionError::NoUser => {
            tracing::warn!(action = action, "No user logged in, skipping");
        }
        _ => {
            tracing::error!(action = action, error = %err, "Action failed");
        }
    }
    err
}

/// Clears `loading` when a movie action is dropped before it settles
///
/// Only the request that is still current may clear the flag; a newer request owns it.
struct LoadingGuard {
    state: Arc<RwLock<StoreState>>,
    action: &'static str,
    tag: u64,
    armed: bool,
}

impl LoadingGuard {
    fn new(state: Arc<RwLock<StoreState>>, action: &'static str, tag: u64) -> Self {
        Self {
            state,
            action,
            tag,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        tracing::debug!(action = self.action, tag = self.tag, "Movie action dropped before settling");

        let tag = self.tag;
        let clear = move |state: &mut StoreState| {
            if state.is_current(Channel::Movies, tag) {
                state.set_loading(false);
            }
        };

        match self.state.try_write() {
            Ok(mut state) => clear(&mut state),
            Err(_) => {
                // Lock is busy; finish the cleanup on the runtime
                if let Ok(handle) = tokio::runtime::Handle::try_current() {
                    let state = self.state.clone();
                    handle.spawn(async move {
                        clear(&mut *state.write().await);
                    });
                }
            }
        }
    }
}

/// Handle to the application state and the services its actions orchestrate
///
/// Cloning is cheap; all clones share the same state.
#[derive(Clone)]
pub struct MovieStore {
    state: Arc<RwLock<StoreState>>,
    catalog: Arc<dyn CatalogClient>,
    documents: Arc<dyn DocumentStore>,
    cache: Arc<dyn KeyValueCache>,
}

impl MovieStore {
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        documents: Arc<dyn DocumentStore>,
        cache: Arc<dyn KeyValueCache>,
    ) -> Self {
        Self {
            state: Arc::new(RwLock::new(StoreState::default())),
            catalog,
            documents,
            cache,
        }
    }

    /// Copy of the current state
    pub async fn snapshot(&self) -> StoreState {
        self.state.read().await.clone()
    }

    /// Applies a mutation under the write lock
    pub async fn commit<R>(&self, mutation: impl FnOnce(&mut StoreState) -> R) -> R {
        let mut state = self.state.write().await;
        mutation(&mut state)
    }

    pub async fn set_user(&self, user: Option<User>) {
        self.commit(|state| state.set_user(user)).await
    }

    pub async fn set_year(&self, year: impl Into<String>) {
        let year = year.into();
        self.commit(|state| state.set_year(year)).await
    }

    /// Loads genres from the local cache, falling back to the catalog on a miss
    pub async fn fetch_genres(&self) -> ActionResult {
        match self.cache.get_from_cache::<Vec<Genre>>(&CacheKey::Genres).await {
            Ok(Some(genres)) => {
                tracing::debug!(genres = genres.len(), "Genres served from cache");
                self.commit(|state| state.set_genres(genres)).await;
                return Ok(Settled::FromCache);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Genre cache unreadable, fetching from catalog");
            }
        }

        let genres = self
            .catalog
            .genres()
            .await
            .map_err(|e| failed("fetch_genres", e.into()))?;

        if let Err(e) = self.cache.set_in_cache(&CacheKey::Genres, &genres).await {
            tracing::warn!(error = %e, "Failed to cache genres");
        }

        self.commit(|state| state.set_genres(genres)).await;
        Ok(Settled::Committed)
    }

    /// Trending movies of the week, or the discover endpoint when a year filter is set
    pub async fn fetch_trending_movies(&self, page: u32) -> ActionResult {
        self.load_movies("fetch_trending_movies", |year| match year {
            Some(year) => MovieRequest::Discover {
                genre: None,
                year: Some(year),
                page,
            },
            None => MovieRequest::Trending { page },
        })
        .await
    }

    /// Movies of one genre, narrowed by the year filter when set
    pub async fn fetch_movies_by_genre(&self, genre_id: GenreId, page: u32) -> ActionResult {
        self.load_movies("fetch_movies_by_genre", |year| MovieRequest::Discover {
            genre: Some(genre_id),
            year,
            page,
        })
        .await
    }

    /// Title search, narrowed by the year filter when set; always lands on page 1
    pub async fn search_movies(&self, query: &str) -> ActionResult {
        let query = query.to_string();
        self.load_movies("search_movies", |year| MovieRequest::Search { query, year })
            .await
    }

    async fn load_movies(
        &self,
        action: &'static str,
        build: impl FnOnce(Option<String>) -> MovieRequest,
    ) -> ActionResult {
        let (tag, request) = {
            let mut state = self.state.write().await;
            state.set_loading(true);
            let tag = state.begin(Channel::Movies);
            (tag, build(state.year_filter()))
        };
        let guard = LoadingGuard::new(self.state.clone(), action, tag);

        let result = self.catalog.movies(&request).await;

        let mut state = self.state.write().await;
        guard.disarm();
        if !state.is_current(Channel::Movies, tag) {
            tracing::debug!(action = action, tag = tag, "Discarding superseded movie response");
            return Ok(Settled::Superseded);
        }

        state.set_loading(false);
        match result {
            Ok(page) => {
                state.set_movies(page.results);
                state.set_page(request.page());
                Ok(Settled::Committed)
            }
            Err(e) => Err(failed(action, e.into())),
        }
    }

    /// Replaces the local favorites with the movie ids stored for the current user
    pub async fn fetch_favorites(&self) -> ActionResult {
        let (tag, user_id) = self
            .begin_for_user(Channel::Favorites)
            .await
            .map_err(|e| failed("fetch_favorites", e))?;

        let result = self.documents.favorites_for(&user_id).await;

        let mut state = self.state.write().await;
        if !state.is_current(Channel::Favorites, tag) || state.user_id() != Some(user_id.as_str())
        {
            tracing::debug!(tag = tag, "Discarding superseded favorites response");
            return Ok(Settled::Superseded);
        }

        let favorites = result.map_err(|e| failed("fetch_favorites", e.into()))?;
        let movie_ids: Vec<MovieId> = favorites.into_iter().map(|f| f.movie_id).collect();

        tracing::info!(user_id = %user_id, count = movie_ids.len(), "Fetched favorites");

        state.set_favorites(movie_ids);
        Ok(Settled::Committed)
    }

    /// Replaces the local playlists with the documents stored for the current user
    pub async fn fetch_playlists(&self) -> ActionResult {
        let (tag, user_id) = self
            .begin_for_user(Channel::Playlists)
            .await
            .map_err(|e| failed("fetch_playlists", e))?;

        let result = self.documents.playlists_for(&user_id).await;

        let mut state = self.state.write().await;
        if !state.is_current(Channel::Playlists, tag) || state.user_id() != Some(user_id.as_str())
        {
            tracing::debug!(tag = tag, "Discarding superseded playlists response");
            return Ok(Settled::Superseded);
        }

        let playlists = result.map_err(|e| failed("fetch_playlists", e.into()))?;

        tracing::info!(user_id = %user_id, count = playlists.len(), "Fetched playlists");

        state.set_playlists(playlists);
        Ok(Settled::Committed)
    }

    /// Creates an empty playlist for the current user, then re-fetches all playlists
    pub async fn create_playlist(&self, name: &str) -> ActionResult {
        let user_id = self
            .current_user_id()
            .await
            .map_err(|e| failed("create_playlist", e))?;

        let id = self
            .documents
            .insert_playlist(NewPlaylist::empty(user_id, name))
            .await
            .map_err(|e| failed("create_playlist", e.into()))?;

        tracing::info!(playlist_id = %id, name = %name, "Created playlist");

        self.fetch_playlists().await
    }

    /// Deletes a playlist by id, then re-fetches all playlists
    pub async fn delete_playlist(&self, playlist_id: &str) -> ActionResult {
        self.documents
            .delete_playlist(playlist_id)
            .await
            .map_err(|e| failed("delete_playlist", e.into()))?;

        tracing::info!(playlist_id = %playlist_id, "Deleted playlist");

        self.fetch_playlists().await
    }

    /// Stores a favorite for the current user, then re-fetches all favorites
    ///
    /// A movie already in the local list is not inserted again.
    pub async fn save_favorite(&self, movie_id: MovieId) -> ActionResult {
        let (user_id, already_saved) = {
            let state = self.state.read().await;
            let user_id = state
                .user_id()
                .map(str::to_string)
                .ok_or_else(|| failed("save_favorite", ActionError::NoUser))?;
            (user_id, state.favorites.contains(&movie_id))
        };

        if already_saved {
            tracing::debug!(movie_id = movie_id, "Movie already in favorites");
        } else {
            let id = self
                .documents
                .insert_favorite(&user_id, movie_id)
                .await
                .map_err(|e| failed("save_favorite", e.into()))?;
            tracing::info!(favorite_id = %id, movie_id = movie_id, "Saved favorite");
        }

        self.fetch_favorites().await
    }

    /// Removes the current user's favorite records for the movie, then re-fetches
    pub async fn delete_favorite(&self, movie_id: MovieId) -> ActionResult {
        let user_id = self
            .current_user_id()
            .await
            .map_err(|e| failed("delete_favorite", e))?;

        let removed = self
            .documents
            .delete_favorites(&user_id, movie_id)
            .await
            .map_err(|e| failed("delete_favorite", e.into()))?;

        tracing::info!(movie_id = movie_id, removed = removed, "Deleted favorite");

        self.fetch_favorites().await
    }

    async fn current_user_id(&self) -> Result<String, ActionError> {
        self.state
            .read()
            .await
            .user_id()
            .map(str::to_string)
            .ok_or(ActionError::NoUser)
    }

    async fn begin_for_user(&self, channel: Channel) -> Result<(u64, String), ActionError> {
        let mut state = self.state.write().await;
        let user_id = state
            .user_id()
            .map(str::to_string)
            .ok_or(ActionError::NoUser)?;
        Ok((state.begin(channel), user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::MockCatalogClient,
        db::{
            documents::{DocumentResult, MockDocumentStore},
            MemoryCache, MemoryDocumentStore,
        },
        error::{CatalogError, DocumentStoreError},
        models::{Favorite, Movie, MoviePage, Playlist},
    };
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };
    use tokio::sync::{oneshot, Mutex};

    fn movie(id: MovieId, title: &str) -> Movie {
        serde_json::from_value(serde_json::json!({ "id": id, "title": title })).unwrap()
    }

    fn page_of(movies: Vec<Movie>) -> MoviePage {
        MoviePage {
            page: 1,
            results: movies,
            total_pages: Some(1),
            total_results: None,
        }
    }

    fn drama() -> Vec<Genre> {
        vec![Genre {
            id: 18,
            name: "Drama".to_string(),
        }]
    }

    fn store_with(
        catalog: impl CatalogClient + 'static,
        documents: impl DocumentStore + 'static,
    ) -> MovieStore {
        MovieStore::new(
            Arc::new(catalog),
            Arc::new(documents),
            Arc::new(MemoryCache::new()),
        )
    }

    async fn signed_in(store: &MovieStore) {
        store.set_user(Some(User::new("alice"))).await;
    }

    #[tokio::test]
    async fn test_fetch_genres_twice_hits_network_once() {
        let mut catalog = MockCatalogClient::new();
        catalog.expect_genres().times(1).returning(|| Ok(drama()));
        let store = store_with(catalog, MockDocumentStore::new());

        assert_eq!(store.fetch_genres().await.unwrap(), Settled::Committed);
        assert_eq!(store.fetch_genres().await.unwrap(), Settled::FromCache);
        assert_eq!(store.snapshot().await.genres, drama());
    }

    #[tokio::test]
    async fn test_fetch_genres_cache_hit_skips_catalog() {
        let cache = MemoryCache::new();
        let cache_handle: Arc<dyn KeyValueCache> = Arc::new(cache.clone());
        cache_handle
            .set_in_cache(&CacheKey::Genres, &drama())
            .await
            .unwrap();

        let store = MovieStore::new(
            Arc::new(MockCatalogClient::new()),
            Arc::new(MockDocumentStore::new()),
            Arc::new(cache),
        );

        assert_eq!(store.fetch_genres().await.unwrap(), Settled::FromCache);
        assert_eq!(store.snapshot().await.genres, drama());
    }

    #[tokio::test]
    async fn test_fetch_genres_missing_key_is_noop() {
        let mut catalog = MockCatalogClient::new();
        catalog
            .expect_genres()
            .times(2)
            .returning(|| Err(CatalogError::MissingApiKey));
        let store = store_with(catalog, MockDocumentStore::new());

        let result = store.fetch_genres().await;
        assert!(matches!(result, Err(ActionError::MissingApiKey)));
        assert!(store.snapshot().await.genres.is_empty());

        // Nothing was cached, so the catalog is asked again
        assert!(store.fetch_genres().await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_genres_failure_leaves_state() {
        let mut catalog = MockCatalogClient::new();
        catalog.expect_genres().returning(|| {
            Err(CatalogError::Status {
                status: 503,
                body: "unavailable".to_string(),
            })
        });
        let store = store_with(catalog, MockDocumentStore::new());
        store.commit(|state| state.set_genres(drama())).await;

        let result = store.fetch_genres().await;
        assert!(matches!(result, Err(ActionError::Catalog(_))));
        assert_eq!(store.snapshot().await.genres, drama());
    }

    #[tokio::test]
    async fn test_trending_with_year_uses_discover() {
        let mut catalog = MockCatalogClient::new();
        catalog
            .expect_movies()
            .withf(|request: &MovieRequest| {
                *request
                    == MovieRequest::Discover {
                        genre: None,
                        year: Some("1999".to_string()),
                        page: 2,
                    }
            })
            .times(1)
            .returning(|_| Ok(page_of(vec![movie(603, "The Matrix")])));
        let store = store_with(catalog, MockDocumentStore::new());
        store.set_year("1999").await;

        assert_eq!(store.fetch_trending_movies(2).await.unwrap(), Settled::Committed);

        let state = store.snapshot().await;
        assert_eq!(state.movies.len(), 1);
        assert_eq!(state.movies[0].title, "The Matrix");
        assert_eq!(state.page, 2);
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn test_trending_without_year_uses_trending() {
        let mut catalog = MockCatalogClient::new();
        catalog
            .expect_movies()
            .withf(|request: &MovieRequest| *request == MovieRequest::Trending { page: 1 })
            .times(1)
            .returning(|_| Ok(page_of(vec![movie(27205, "Inception")])));
        let store = store_with(catalog, MockDocumentStore::new());

        tokio_test::assert_ok!(store.fetch_trending_movies(1).await);
        assert_eq!(store.snapshot().await.movies[0].id, 27205);
    }

    #[tokio::test]
    async fn test_genre_movies_add_year_filter() {
        let mut catalog = MockCatalogClient::new();
        catalog
            .expect_movies()
            .withf(|request: &MovieRequest| {
                *request
                    == MovieRequest::Discover {
                        genre: Some(28),
                        year: Some("2010".to_string()),
                        page: 3,
                    }
            })
            .times(1)
            .returning(|_| Ok(page_of(vec![movie(27205, "Inception")])));
        let store = store_with(catalog, MockDocumentStore::new());
        store.set_year("2010").await;

        tokio_test::assert_ok!(store.fetch_movies_by_genre(28, 3).await);
        assert_eq!(store.snapshot().await.page, 3);
    }

    #[tokio::test]
    async fn test_search_resets_page() {
        let mut catalog = MockCatalogClient::new();
        catalog
            .expect_movies()
            .withf(|request: &MovieRequest| {
                matches!(request, MovieRequest::Search { query, year: None } if query == "matrix")
            })
            .times(1)
            .returning(|_| Ok(page_of(vec![movie(603, "The Matrix")])));
        let store = store_with(catalog, MockDocumentStore::new());
        store.commit(|state| state.set_page(7)).await;

        tokio_test::assert_ok!(store.search_movies("matrix").await);
        assert_eq!(store.snapshot().await.page, 1);
    }

    #[tokio::test]
    async fn test_movie_failure_clears_loading_and_keeps_data() {
        let mut catalog = MockCatalogClient::new();
        catalog.expect_movies().times(3).returning(|_| {
            Err(CatalogError::Status {
                status: 500,
                body: "boom".to_string(),
            })
        });
        let store = store_with(catalog, MockDocumentStore::new());
        let before = vec![movie(11, "Star Wars")];
        store
            .commit(|state| {
                state.set_movies(before.clone());
                state.set_page(4);
            })
            .await;

        assert!(store.fetch_trending_movies(5).await.is_err());
        assert!(store.fetch_movies_by_genre(12, 1).await.is_err());
        assert!(store.search_movies("x").await.is_err());

        let state = store.snapshot().await;
        assert!(!state.loading);
        assert_eq!(state.movies, before);
        assert_eq!(state.page, 4);
    }

    #[tokio::test]
    async fn test_fetch_favorites_without_user_makes_no_calls() {
        // The mock has no expectations: any call would panic
        let store = store_with(MockCatalogClient::new(), MockDocumentStore::new());
        store.commit(|state| state.set_favorites(vec![603])).await;

        assert!(matches!(store.fetch_favorites().await, Err(ActionError::NoUser)));
        assert!(matches!(store.fetch_playlists().await, Err(ActionError::NoUser)));
        assert!(matches!(store.create_playlist("x").await, Err(ActionError::NoUser)));
        assert!(matches!(store.save_favorite(1).await, Err(ActionError::NoUser)));

        let state = store.snapshot().await;
        assert_eq!(state.favorites, vec![603]);
        assert!(state.playlists.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_favorites_extracts_movie_ids() {
        let documents = MemoryDocumentStore::new();
        documents.insert_favorite("alice", 603).await.unwrap();
        documents.insert_favorite("alice", 27205).await.unwrap();
        documents.insert_favorite("bob", 11).await.unwrap();
        let store = store_with(MockCatalogClient::new(), documents);
        signed_in(&store).await;

        assert_eq!(store.fetch_favorites().await.unwrap(), Settled::Committed);
        assert_eq!(store.snapshot().await.favorites, vec![603, 27205]);
    }

    #[tokio::test]
    async fn test_fetch_favorites_failure_keeps_list() {
        let mut documents = MockDocumentStore::new();
        documents
            .expect_favorites_for()
            .returning(|_| Err(DocumentStoreError::Database(sqlx::Error::PoolTimedOut)));
        let store = store_with(MockCatalogClient::new(), documents);
        signed_in(&store).await;
        store.commit(|state| state.set_favorites(vec![1, 2])).await;

        assert!(matches!(
            store.fetch_favorites().await,
            Err(ActionError::Documents(_))
        ));
        assert_eq!(store.snapshot().await.favorites, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_create_playlist_then_refetch() {
        let store = store_with(MockCatalogClient::new(), MemoryDocumentStore::new());
        signed_in(&store).await;

        assert_eq!(
            store.create_playlist("Noir").await.unwrap(),
            Settled::Committed
        );

        let state = store.snapshot().await;
        assert_eq!(state.playlists.len(), 1);
        assert!(!state.playlists[0].id.is_empty());
        assert_eq!(state.playlists[0].name, "Noir");
        assert_eq!(state.playlists[0].user_id, "alice");
        assert!(state.playlists[0].movies.is_empty());
    }

    #[tokio::test]
    async fn test_delete_playlist_then_refetch() {
        let store = store_with(MockCatalogClient::new(), MemoryDocumentStore::new());
        signed_in(&store).await;
        store.create_playlist("Noir").await.unwrap();
        store.create_playlist("Heist").await.unwrap();

        let noir = store.snapshot().await.playlists[0].id.clone();
        tokio_test::assert_ok!(store.delete_playlist(&noir).await);

        let state = store.snapshot().await;
        assert_eq!(state.playlists.len(), 1);
        assert_eq!(state.playlists[0].name, "Heist");
    }

    #[tokio::test]
    async fn test_create_playlist_insert_failure_skips_refetch() {
        let mut documents = MockDocumentStore::new();
        documents
            .expect_insert_playlist()
            .times(1)
            .returning(|_| Err(DocumentStoreError::Database(sqlx::Error::PoolClosed)));
        documents.expect_playlists_for().times(0);
        let store = store_with(MockCatalogClient::new(), documents);
        signed_in(&store).await;

        assert!(store.create_playlist("Noir").await.is_err());
        assert!(store.snapshot().await.playlists.is_empty());
    }

    #[tokio::test]
    async fn test_save_favorite_inserts_once() {
        let documents = MemoryDocumentStore::new();
        let store = store_with(MockCatalogClient::new(), documents.clone());
        signed_in(&store).await;

        tokio_test::assert_ok!(store.save_favorite(603).await);
        tokio_test::assert_ok!(store.save_favorite(603).await);

        assert_eq!(documents.favorites_for("alice").await.unwrap().len(), 1);
        assert_eq!(store.snapshot().await.favorites, vec![603]);

        tokio_test::assert_ok!(store.delete_favorite(603).await);
        assert!(store.snapshot().await.favorites.is_empty());
    }

    /// Catalog whose first movie request blocks until released
    struct GatedCatalog {
        calls: AtomicUsize,
        gate: Mutex<Option<oneshot::Receiver<()>>>,
    }

    #[async_trait::async_trait]
    impl CatalogClient for GatedCatalog {
        async fn genres(&self) -> Result<Vec<Genre>, CatalogError> {
            Ok(Vec::new())
        }

        async fn movies(&self, _request: &MovieRequest) -> Result<MoviePage, CatalogError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call == 0 {
                let gate = self.gate.lock().await.take();
                if let Some(gate) = gate {
                    let _ = gate.await;
                }
                Ok(page_of(vec![movie(1, "Stale")]))
            } else {
                Ok(page_of(vec![movie(2, "Fresh")]))
            }
        }
    }

    #[tokio::test]
    async fn test_superseded_response_is_discarded() {
        let (release, gate) = oneshot::channel();
        let catalog = Arc::new(GatedCatalog {
            calls: AtomicUsize::new(0),
            gate: Mutex::new(Some(gate)),
        });
        let store = MovieStore::new(
            catalog.clone(),
            Arc::new(MockDocumentStore::new()),
            Arc::new(MemoryCache::new()),
        );

        let slow = {
            let store = store.clone();
            tokio::spawn(async move { store.fetch_trending_movies(1).await })
        };
        while catalog.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        assert_eq!(store.search_movies("fresh").await.unwrap(), Settled::Committed);
        release.send(()).unwrap();
        assert_eq!(slow.await.unwrap().unwrap(), Settled::Superseded);

        let state = store.snapshot().await;
        assert_eq!(state.movies[0].title, "Fresh");
        assert!(!state.loading);
    }

    /// Catalog whose movie requests never resolve
    #[derive(Default)]
    struct PendingCatalog {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl CatalogClient for PendingCatalog {
        async fn genres(&self) -> Result<Vec<Genre>, CatalogError> {
            Ok(Vec::new())
        }

        async fn movies(&self, _request: &MovieRequest) -> Result<MoviePage, CatalogError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_dropped_movie_action_clears_loading() {
        let store = store_with(PendingCatalog::default(), MockDocumentStore::new());

        let timed_out =
            tokio::time::timeout(Duration::from_millis(20), store.fetch_trending_movies(1)).await;
        assert!(timed_out.is_err());

        let state = store.snapshot().await;
        assert!(!state.loading);
        assert!(state.movies.is_empty());
    }

    #[tokio::test]
    async fn test_dropped_stale_action_keeps_newer_loading() {
        let catalog = Arc::new(PendingCatalog::default());
        let store = MovieStore::new(
            catalog.clone(),
            Arc::new(MockDocumentStore::new()),
            Arc::new(MemoryCache::new()),
        );

        let first = {
            let store = store.clone();
            tokio::spawn(async move { store.fetch_trending_movies(1).await })
        };
        while catalog.calls.load(Ordering::SeqCst) < 1 {
            tokio::task::yield_now().await;
        }
        let second = {
            let store = store.clone();
            tokio::spawn(async move { store.fetch_movies_by_genre(28, 1).await })
        };
        while catalog.calls.load(Ordering::SeqCst) < 2 {
            tokio::task::yield_now().await;
        }

        first.abort();
        assert!(first.await.unwrap_err().is_cancelled());
        assert!(store.snapshot().await.loading);

        second.abort();
        assert!(second.await.unwrap_err().is_cancelled());
        assert!(!store.snapshot().await.loading);
    }

    /// Document store whose first read answers from data taken before it blocks
    struct GatedDocuments {
        inner: MemoryDocumentStore,
        reads: AtomicUsize,
        gate: Mutex<Option<oneshot::Receiver<()>>>,
    }

    impl GatedDocuments {
        fn new(inner: MemoryDocumentStore) -> (Self, oneshot::Sender<()>) {
            let (release, gate) = oneshot::channel();
            let documents = Self {
                inner,
                reads: AtomicUsize::new(0),
                gate: Mutex::new(Some(gate)),
            };
            (documents, release)
        }

        async fn hold_first_read(&self) {
            if self.reads.fetch_add(1, Ordering::SeqCst) == 0 {
                let gate = self.gate.lock().await.take();
                if let Some(gate) = gate {
                    let _ = gate.await;
                }
            }
        }

        async fn wait_for_read(&self) {
            while self.reads.load(Ordering::SeqCst) == 0 {
                tokio::task::yield_now().await;
            }
        }
    }

    #[async_trait::async_trait]
    impl DocumentStore for GatedDocuments {
        async fn favorites_for(&self, user_id: &str) -> DocumentResult<Vec<Favorite>> {
            let result = self.inner.favorites_for(user_id).await;
            self.hold_first_read().await;
            result
        }

        async fn insert_favorite(&self, user_id: &str, movie_id: MovieId) -> DocumentResult<String> {
            self.inner.insert_favorite(user_id, movie_id).await
        }

        async fn delete_favorites(&self, user_id: &str, movie_id: MovieId) -> DocumentResult<u64> {
            self.inner.delete_favorites(user_id, movie_id).await
        }

        async fn playlists_for(&self, user_id: &str) -> DocumentResult<Vec<Playlist>> {
            let result = self.inner.playlists_for(user_id).await;
            self.hold_first_read().await;
            result
        }

        async fn insert_playlist(&self, playlist: NewPlaylist) -> DocumentResult<String> {
            self.inner.insert_playlist(playlist).await
        }

        async fn delete_playlist(&self, playlist_id: &str) -> DocumentResult<()> {
            self.inner.delete_playlist(playlist_id).await
        }
    }

    async fn favorites_discarded_after(next_user: Option<User>) {
        let inner = MemoryDocumentStore::new();
        inner.insert_favorite("alice", 603).await.unwrap();
        let (documents, release) = GatedDocuments::new(inner);
        let documents = Arc::new(documents);
        let store = MovieStore::new(
            Arc::new(MockCatalogClient::new()),
            documents.clone(),
            Arc::new(MemoryCache::new()),
        );
        signed_in(&store).await;
        store.commit(|state| state.set_favorites(vec![11])).await;

        let pending = {
            let store = store.clone();
            tokio::spawn(async move { store.fetch_favorites().await })
        };
        documents.wait_for_read().await;

        store.set_user(next_user).await;
        release.send(()).unwrap();

        assert_eq!(pending.await.unwrap().unwrap(), Settled::Superseded);
        assert_eq!(store.snapshot().await.favorites, vec![11]);
    }

    #[tokio::test]
    async fn test_favorites_response_discarded_after_sign_out() {
        favorites_discarded_after(None).await;
    }

    #[tokio::test]
    async fn test_favorites_response_discarded_after_user_switch() {
        favorites_discarded_after(Some(User::new("bob"))).await;
    }

    #[tokio::test]
    async fn test_latest_playlists_fetch_wins() {
        let inner = MemoryDocumentStore::new();
        inner
            .insert_playlist(NewPlaylist::empty("alice", "Noir"))
            .await
            .unwrap();
        let (documents, release) = GatedDocuments::new(inner.clone());
        let documents = Arc::new(documents);
        let store = MovieStore::new(
            Arc::new(MockCatalogClient::new()),
            documents.clone(),
            Arc::new(MemoryCache::new()),
        );
        signed_in(&store).await;

        let first = {
            let store = store.clone();
            tokio::spawn(async move { store.fetch_playlists().await })
        };
        documents.wait_for_read().await;

        inner
            .insert_playlist(NewPlaylist::empty("alice", "Heist"))
            .await
            .unwrap();
        assert_eq!(store.fetch_playlists().await.unwrap(), Settled::Committed);

        release.send(()).unwrap();
        assert_eq!(first.await.unwrap().unwrap(), Settled::Superseded);

        let names: Vec<String> = store
            .snapshot()
            .await
            .playlists
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"Heist".to_string()));
    }
}
