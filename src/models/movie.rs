use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type MovieId = u64;
pub type GenreId = u64;

/// A movie record as returned by the catalog API
///
/// Only `id` and `title` are validated. Every other field the catalog sends is kept
/// verbatim in `extra`, so the record is passed through to callers unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub genre_ids: Vec<GenreId>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Genre {
    pub id: GenreId,
    pub name: String,
}

/// `results` envelope used by the trending, discover and search endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct MoviePage {
    #[serde(default = "first_page")]
    pub page: u32,
    pub results: Vec<Movie>,
    #[serde(default)]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub total_results: Option<u64>,
}

fn first_page() -> u32 {
    1
}

/// `genres` envelope returned by the genre list endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct GenreList {
    pub genres: Vec<Genre>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movie_keeps_unknown_fields() {
        let json = r#"{
            "id": 27205,
            "title": "Inception",
            "overview": "Cobb steals secrets",
            "release_date": "2010-07-15",
            "genre_ids": [28, 878],
            "original_language": "en",
            "popularity": 83.9
        }"#;

        let movie: Movie = serde_json::from_str(json).unwrap();
        assert_eq!(movie.id, 27205);
        assert_eq!(movie.title, "Inception");
        assert_eq!(movie.genre_ids, vec![28, 878]);
        assert_eq!(movie.extra["original_language"], "en");
        assert!(movie.extra.contains_key("popularity"));

        let back = serde_json::to_value(&movie).unwrap();
        assert_eq!(back["original_language"], "en");
        assert_eq!(back["release_date"], "2010-07-15");
    }

    #[test]
    fn test_movie_without_title_is_rejected() {
        let json = r#"{ "id": 1, "overview": "no title" }"#;
        assert!(serde_json::from_str::<Movie>(json).is_err());
    }

    #[test]
    fn test_movie_page_defaults_page_number() {
        let json = r#"{ "results": [] }"#;
        let page: MoviePage = serde_json::from_str(json).unwrap();
        assert_eq!(page.page, 1);
        assert!(page.results.is_empty());
        assert_eq!(page.total_pages, None);
    }

    #[test]
    fn test_genre_list_requires_genres_array() {
        let ok: GenreList =
            serde_json::from_str(r#"{ "genres": [{ "id": 28, "name": "Action" }] }"#).unwrap();
        assert_eq!(
            ok.genres,
            vec![Genre {
                id: 28,
                name: "Action".to_string()
            }]
        );

        assert!(serde_json::from_str::<GenreList>(r#"{ "results": [] }"#).is_err());
    }
}
