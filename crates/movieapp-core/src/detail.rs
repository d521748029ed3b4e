//! Movie detail screen state
//!
//! The detail screen receives the movie through navigation arguments, which
//! carry primitives only: a missing id is `-1` and a missing vote average is
//! `-1.0`.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::favorites::FavoritesStore;
use crate::types::{vote_average_from_sentinel, vote_average_to_sentinel, Movie, MovieId, VOTE_AVERAGE_SENTINEL};

/// Id carried when the navigation arguments have none
pub const INVALID_MOVIE_ID: i64 = -1;

/// State of the detail screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDetailState {
    pub movie_id: i64,
    pub title: Option<String>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub release_date: Option<String>,
    /// Average vote, [`VOTE_AVERAGE_SENTINEL`] when unknown
    pub vote_average: f32,
    pub genre_ids: Vec<u32>,
    pub is_favorite: bool,
}

impl Default for MovieDetailState {
    fn default() -> Self {
        Self {
            movie_id: INVALID_MOVIE_ID,
            title: None,
            overview: None,
            poster_path: None,
            release_date: None,
            vote_average: VOTE_AVERAGE_SENTINEL,
            genre_ids: Vec::new(),
            is_favorite: false,
        }
    }
}

impl MovieDetailState {
    /// Navigation arguments for `movie`
    pub fn from_movie(movie: &Movie) -> Self {
        Self {
            movie_id: i64::from(movie.id),
            title: movie.title.clone(),
            overview: movie.overview.clone(),
            poster_path: movie.poster_path.clone(),
            release_date: movie.release_date.clone(),
            vote_average: vote_average_to_sentinel(movie.vote_average),
            genre_ids: movie.genre_ids.clone(),
            is_favorite: false,
        }
    }

    pub fn has_valid_id(&self) -> bool {
        self.movie_id > 0 && self.movie_id <= i64::from(MovieId::MAX)
    }

    /// The movie described by the arguments, `None` without a valid id
    pub fn to_movie(&self) -> Option<Movie> {
        if !self.has_valid_id() {
            return None;
        }
        let id = MovieId::try_from(self.movie_id).ok()?;
        Some(Movie {
            id,
            title: self.title.clone(),
            overview: self.overview.clone(),
            poster_path: self.poster_path.clone(),
            release_date: self.release_date.clone(),
            vote_average: vote_average_from_sentinel(self.vote_average),
            genre_ids: self.genre_ids.clone(),
        })
    }

    /// Read the favorite flag from `store`.
    ///
    /// A failed read leaves the movie shown as not favorite.
    pub async fn load_favorite_flag(&mut self, store: &dyn FavoritesStore) {
        let Some(movie) = self.to_movie() else {
            return;
        };
        self.is_favorite = match store.is_favorite(movie.id).await {
            Ok(is_favorite) => is_favorite,
            Err(error) => {
                warn!(movie_id = movie.id, %error, "reading favorite flag failed");
                false
            }
        };
    }

    /// Add the movie to or remove it from `store`.
    ///
    /// Returns the new flag, or `None` without a valid id.
    pub async fn toggle_favorite(&mut self, store: &dyn FavoritesStore) -> Result<Option<bool>> {
        let Some(movie) = self.to_movie() else {
            debug!(movie_id = self.movie_id, "toggle ignored without a valid id");
            return Ok(None);
        };
        let is_favorite = store.toggle(movie).await?;
        self.is_favorite = is_favorite;
        Ok(Some(is_favorite))
    }
}
