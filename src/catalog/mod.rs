//! Movie catalog client abstraction
//!
//! The catalog is a read-only remote service. Requests are described by
//! [`MovieRequest`] values so the endpoint a store action hits is decided by data,
//! not by which method was called.

use crate::{
    error::CatalogError,
    models::{Genre, GenreId, MoviePage},
};

pub mod tmdb;

pub use tmdb::{ApiKeySource, TmdbClient};

/// A movie list query against the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MovieRequest {
    /// Trending movies of the week
    Trending { page: u32 },
    /// Discover by filters; genre and release year are both optional
    Discover {
        genre: Option<GenreId>,
        year: Option<String>,
        page: u32,
    },
    /// Title search, optionally narrowed by release year
    Search { query: String, year: Option<String> },
}

impl MovieRequest {
    /// Catalog endpoint path, relative to the API base URL
    pub fn endpoint(&self) -> &'static str {
        match self {
            MovieRequest::Trending { .. } => "/trending/movie/week",
            MovieRequest::Discover { .. } => "/discover/movie",
            MovieRequest::Search { .. } => "/search/movie",
        }
    }

    /// Query parameters, excluding the API key
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        match self {
            MovieRequest::Trending { page } => {
                params.push(("page", page.to_string()));
            }
            MovieRequest::Discover { genre, year, page } => {
                if let Some(genre) = genre {
                    params.push(("with_genres", genre.to_string()));
                }
                if let Some(year) = year {
                    params.push(("primary_release_year", year.clone()));
                }
                params.push(("page", page.to_string()));
            }
            MovieRequest::Search { query, year } => {
                params.push(("query", query.clone()));
                if let Some(year) = year {
                    params.push(("primary_release_year", year.clone()));
                }
            }
        }
        params
    }

    /// Page this request asks for; search always reads the first page
    pub fn page(&self) -> u32 {
        match self {
            MovieRequest::Trending { page } | MovieRequest::Discover { page, .. } => *page,
            MovieRequest::Search { .. } => 1,
        }
    }

    pub fn year(&self) -> Option<&str> {
        match self {
            MovieRequest::Trending { .. } => None,
            MovieRequest::Discover { year, .. } | MovieRequest::Search { year, .. } => {
                year.as_deref()
            }
        }
    }
}

/// Trait for movie catalog clients
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogClient: Send + Sync {
    /// Fetch the full genre list
    async fn genres(&self) -> Result<Vec<Genre>, CatalogError>;

    /// Fetch one page of movies for the given request
    async fn movies(&self, request: &MovieRequest) -> Result<MoviePage, CatalogError>;
}
