mod movie;
mod playlist;
mod user;

pub use movie::{Genre, GenreId, GenreList, Movie, MovieId, MoviePage};
pub use playlist::{Favorite, NewPlaylist, Playlist};
pub use user::User;
