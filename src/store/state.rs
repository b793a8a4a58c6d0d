use serde::Serialize;

use crate::models::{Genre, Movie, MovieId, Playlist, User};

/// Collections whose remote responses are tagged with a request generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Movies,
    Favorites,
    Playlists,
}

#[derive(Debug, Clone, Default)]
struct Generations {
    movies: u64,
    favorites: u64,
    playlists: u64,
}

impl Generations {
    fn slot(&mut self, channel: Channel) -> &mut u64 {
        match channel {
            Channel::Movies => &mut self.movies,
            Channel::Favorites => &mut self.favorites,
            Channel::Playlists => &mut self.playlists,
        }
    }

    fn current(&self, channel: Channel) -> u64 {
        match channel {
            Channel::Movies => self.movies,
            Channel::Favorites => self.favorites,
            Channel::Playlists => self.playlists,
        }
    }
}

/// Application state
///
/// Every mutation replaces its field wholesale, except `add_favorite` and
/// `remove_favorite` which edit the favorites list in place.
#[derive(Debug, Clone, Serialize)]
pub struct StoreState {
    pub movies: Vec<Movie>,
    pub genres: Vec<Genre>,
    pub page: u32,
    pub loading: bool,
    pub user: Option<User>,
    pub favorites: Vec<MovieId>,
    pub playlists: Vec<Playlist>,
    /// Release year filter; empty means unfiltered
    pub year: String,
    #[serde(skip)]
    generations: Generations,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            movies: Vec::new(),
            genres: Vec::new(),
            page: 1,
            loading: false,
            user: None,
            favorites: Vec::new(),
            playlists: Vec::new(),
            year: String::new(),
            generations: Generations::default(),
        }
    }
}

impl StoreState {
    pub fn set_movies(&mut self, movies: Vec<Movie>) {
        self.movies = movies;
    }

    pub fn set_genres(&mut self, genres: Vec<Genre>) {
        self.genres = genres;
    }

    pub fn set_page(&mut self, page: u32) {
        self.page = page;
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn set_user(&mut self, user: Option<User>) {
        self.user = user;
    }

    pub fn set_favorites(&mut self, favorites: Vec<MovieId>) {
        self.favorites = favorites;
    }

    /// Appends the id unless it is already present
    pub fn add_favorite(&mut self, movie_id: MovieId) {
        if !self.favorites.contains(&movie_id) {
            self.favorites.push(movie_id);
        }
    }

    /// Removes every occurrence of the id
    pub fn remove_favorite(&mut self, movie_id: MovieId) {
        self.favorites.retain(|id| *id != movie_id);
    }

    pub fn set_playlists(&mut self, playlists: Vec<Playlist>) {
        self.playlists = playlists;
    }

    pub fn set_year(&mut self, year: impl Into<String>) {
        self.year = year.into();
    }

    /// The active year filter, if any
    pub fn year_filter(&self) -> Option<String> {
        let year = self.year.trim();
        if year.is_empty() {
            None
        } else {
            Some(year.to_string())
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.uid.as_str())
    }

    /// Starts a new request on the channel and returns its tag
    pub(crate) fn begin(&mut self, channel: Channel) -> u64 {
        let slot = self.generations.slot(channel);
        *slot += 1;
        *slot
    }

    /// Whether a response tagged `tag` is still the latest on the channel
    pub(crate) fn is_current(&self, channel: Channel, tag: u64) -> bool {
        self.generations.current(channel) == tag
    }
}
