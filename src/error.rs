use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Failures of the movie catalog client
#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("Catalog API key is missing")]
    MissingApiKey,

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Catalog API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode catalog response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Failures of the favorites/playlists document store
#[derive(thiserror::Error, Debug)]
pub enum DocumentStoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Failures of the local key-value cache
#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    #[error("Cache error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Why a store action did not commit
#[derive(thiserror::Error, Debug)]
pub enum ActionError {
    #[error("Catalog API key is missing")]
    MissingApiKey,

    #[error("No user signed in")]
    NoUser,

    #[error(transparent)]
    Catalog(CatalogError),

    #[error(transparent)]
    Documents(#[from] DocumentStoreError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl From<CatalogError> for ActionError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::MissingApiKey => ActionError::MissingApiKey,
            other => ActionError::Catalog(other),
        }
    }
}

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Action(#[from] ActionError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Action(action) => match action {
                ActionError::MissingApiKey => StatusCode::SERVICE_UNAVAILABLE,
                ActionError::NoUser => StatusCode::UNAUTHORIZED,
                ActionError::Catalog(_) | ActionError::Documents(_) => StatusCode::BAD_GATEWAY,
                ActionError::Cache(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
