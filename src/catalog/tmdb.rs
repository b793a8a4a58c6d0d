/// TMDB catalog client
///
/// Endpoints used:
/// 1. Genres: /genre/movie/list → `{ "genres": [...] }`
/// 2. Trending: /trending/movie/week → `{ "results": [...] }`
/// 3. Discover: /discover/movie → `{ "results": [...] }`
/// 4. Search: /search/movie → `{ "results": [...] }`
///
/// The API key is resolved on every call, so a key added to the environment after
/// startup is picked up without a restart.
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;

use crate::{
    catalog::{CatalogClient, MovieRequest},
    error::CatalogError,
    models::{Genre, GenreList, MoviePage},
};

const GENRES_ENDPOINT: &str = "/genre/movie/list";

/// Where the catalog API key comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiKeySource {
    /// Read the named environment variable at call time
    Env(String),
    /// A fixed key
    Static(String),
}

impl ApiKeySource {
    /// Returns the key, or `None` when it is absent or blank
    pub fn resolve(&self) -> Option<String> {
        let key = match self {
            ApiKeySource::Env(var) => std::env::var(var).ok()?,
            ApiKeySource::Static(key) => key.clone(),
        };

        if key.trim().is_empty() {
            None
        } else {
            Some(key)
        }
    }
}

#[derive(Clone)]
pub struct TmdbClient {
    http_client: HttpClient,
    api_url: String,
    api_key: ApiKeySource,
}

impl TmdbClient {
    pub fn new(api_url: impl Into<String>, api_key: ApiKeySource) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.api_url, endpoint)
    }

    /// Issues a GET against the catalog and decodes the JSON envelope
    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&'static str, String)],
    ) -> Result<T, CatalogError> {
        let api_key = self.api_key.resolve().ok_or_else(|| {
            tracing::error!(endpoint = %endpoint, "Catalog API key is missing");
            CatalogError::MissingApiKey
        })?;

        let response = self
            .http_client
            .get(self.url(endpoint))
            .query(&[("api_key", api_key.as_str())])
            .query(params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Status { status, body });
        }

        let response_text = response.text().await?;
        decode(endpoint, &response_text)
    }
}

fn decode<T: DeserializeOwned>(endpoint: &str, body: &str) -> Result<T, CatalogError> {
    serde_json::from_str(body).map_err(|e| {
        tracing::error!(
            error = %e,
            endpoint = %endpoint,
            "Failed to deserialize catalog response"
        );
        CatalogError::Decode(e)
    })
}

#[async_trait::async_trait]
impl CatalogClient for TmdbClient {
    async fn genres(&self) -> Result<Vec<Genre>, CatalogError> {
        let list: GenreList = self.get(GENRES_ENDPOINT, &[]).await?;

        tracing::info!(genres = list.genres.len(), "Genre list fetched");

        Ok(list.genres)
    }

    async fn movies(&self, request: &MovieRequest) -> Result<MoviePage, CatalogError> {
        let page: MoviePage = self
            .get(request.endpoint(), &request.query_params())
            .await?;

        tracing::info!(
            endpoint = %request.endpoint(),
            year = request.year().unwrap_or("-"),
            page = page.page,
            results = page.results.len(),
            "Movie page fetched"
        );

        Ok(page)
    }
}
