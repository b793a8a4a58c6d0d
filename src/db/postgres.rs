use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};

use crate::{
    db::documents::{DocumentResult, DocumentStore},
    models::{Favorite, MovieId, NewPlaylist, Playlist},
};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Database row for the favorites table
#[derive(Debug, FromRow)]
struct FavoriteRow {
    id: String,
    user_id: String,
    movie_id: i64,
}

impl From<FavoriteRow> for Favorite {
    fn from(row: FavoriteRow) -> Self {
        Favorite {
            id: row.id,
            user_id: row.user_id,
            movie_id: row.movie_id as MovieId,
        }
    }
}

/// Database row for the playlists table
#[derive(Debug, FromRow)]
struct PlaylistRow {
    id: String,
    user_id: String,
    name: String,
    movies: Vec<i64>,
}

impl From<PlaylistRow> for Playlist {
    fn from(row: PlaylistRow) -> Self {
        Playlist {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            movies: row.movies.into_iter().map(|id| id as MovieId).collect(),
        }
    }
}

/// Favorites and playlists stored in PostgreSQL; ids come from `gen_random_uuid()`
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded schema migrations
    pub async fn migrate(&self) -> DocumentResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Document store migrations applied");
        Ok(())
    }
}

#[async_trait::async_trait]
impl DocumentStore for PgDocumentStore {
    async fn favorites_for(&self, user_id: &str) -> DocumentResult<Vec<Favorite>> {
        let rows: Vec<FavoriteRow> = sqlx::query_as(
            "SELECT id, user_id, movie_id FROM favorites WHERE user_id = $1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Favorite::from).collect())
    }

    async fn insert_favorite(&self, user_id: &str, movie_id: MovieId) -> DocumentResult<String> {
        let id: String = sqlx::query_scalar(
            "INSERT INTO favorites (user_id, movie_id) VALUES ($1, $2) RETURNING id",
        )
        .bind(user_id)
        .bind(movie_id as i64)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn delete_favorites(&self, user_id: &str, movie_id: MovieId) -> DocumentResult<u64> {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND movie_id = $2")
            .bind(user_id)
            .bind(movie_id as i64)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn playlists_for(&self, user_id: &str) -> DocumentResult<Vec<Playlist>> {
        let rows: Vec<PlaylistRow> = sqlx::query_as(
            "SELECT id, user_id, name, movies FROM playlists WHERE user_id = $1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Playlist::from).collect())
    }

    async fn insert_playlist(&self, playlist: NewPlaylist) -> DocumentResult<String> {
        let movies: Vec<i64> = playlist.movies.iter().map(|id| *id as i64).collect();

        let id: String = sqlx::query_scalar(
            "INSERT INTO playlists (user_id, name, movies) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&playlist.user_id)
        .bind(&playlist.name)
        .bind(movies)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn delete_playlist(&self, playlist_id: &str) -> DocumentResult<()> {
        let result = sqlx::query("DELETE FROM playlists WHERE id = $1")
            .bind(playlist_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            tracing::debug!(playlist_id = %playlist_id, "Playlist already absent");
        }

        Ok(())
    }
}
