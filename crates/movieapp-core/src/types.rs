//! Data types for movieapp
//!
//! This module contains the domain structures shared by the fetcher, the
//! paging engine and the favorites store. All types implement Serialize and
//! Deserialize for JSON persistence and the Tauri bridge.

use serde::{Deserialize, Serialize};

/// Stable TMDB movie identifier
pub type MovieId = u32;

/// Base URL for poster images
pub const IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p";

/// Poster width used in list and grid cells
pub const THUMBNAIL_WIDTH: u32 = 342;

/// Poster width used on the detail screen
pub const DETAIL_WIDTH: u32 = 780;

/// Stored in place of an absent vote average by the detail screen arguments
pub const VOTE_AVERAGE_SENTINEL: f32 = -1.0;

/// A movie as listed by TMDB.
///
/// Identity is `id`; equality is structural so list diffing notices content
/// changes of an already-listed movie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    /// TMDB identifier
    pub id: MovieId,
    /// Display title
    #[serde(default)]
    pub title: Option<String>,
    /// Plot summary
    #[serde(default)]
    pub overview: Option<String>,
    /// Relative poster path (e.g. "/abc.jpg")
    #[serde(default)]
    pub poster_path: Option<String>,
    /// Release date as sent by TMDB (e.g. "2024-03-01")
    #[serde(default)]
    pub release_date: Option<String>,
    /// Average vote (0.0 - 10.0), None if unknown
    #[serde(default)]
    pub vote_average: Option<f32>,
    /// Genre identifiers in API order
    #[serde(default)]
    pub genre_ids: Vec<u32>,
}

impl Movie {
    /// Create a movie with only an id set
    pub fn new(id: MovieId) -> Self {
        Self {
            id,
            title: None,
            overview: None,
            poster_path: None,
            release_date: None,
            vote_average: None,
            genre_ids: Vec::new(),
        }
    }

    /// Full poster URL for the given image width.
    ///
    /// # Examples
    /// ```
    /// use movieapp_core::Movie;
    ///
    /// let mut movie = Movie::new(1);
    /// movie.poster_path = Some("/poster.jpg".to_string());
    /// assert_eq!(
    ///     movie.poster_url(342).as_deref(),
    ///     Some("https://image.tmdb.org/t/p/w342/poster.jpg")
    /// );
    /// ```
    pub fn poster_url(&self, width: u32) -> Option<String> {
        let path = self.poster_path.as_deref()?.trim();
        if path.is_empty() {
            return None;
        }
        Some(format!("{}/w{}{}", IMAGE_BASE_URL, width, path))
    }

    /// Release year taken from the leading part of the release date
    pub fn release_year(&self) -> Option<&str> {
        let date = self.release_date.as_deref()?;
        let year = date.get(..4)?;
        year.chars().all(|c| c.is_ascii_digit()).then_some(year)
    }
}

/// Convert a sentinel-encoded vote average into an optional value.
///
/// Negative values mean "no vote average".
pub fn vote_average_from_sentinel(value: f32) -> Option<f32> {
    if value.is_nan() || value < 0.0 {
        None
    } else {
        Some(value)
    }
}

/// Encode an optional vote average with the `-1.0` sentinel.
pub fn vote_average_to_sentinel(value: Option<f32>) -> f32 {
    value.unwrap_or(VOTE_AVERAGE_SENTINEL)
}

/// One fetched page of a movie listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoviePage {
    /// Page number (1-based)
    pub page: u32,
    /// Movies on this page in API order
    pub movies: Vec<Movie>,
    /// Total number of pages reported by the API (0 when unknown)
    pub total_pages: u32,
}

impl MoviePage {
    /// Create a new page
    pub fn new(page: u32, movies: Vec<Movie>, total_pages: u32) -> Self {
        Self {
            page,
            movies,
            total_pages,
        }
    }

    /// An empty page, used when the server sends no body
    pub fn empty(page: u32) -> Self {
        Self::new(page, Vec::new(), 0)
    }
}

/// Movie grouping shown on its own screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Popular movies
    Popular,
    /// Highest rated movies
    TopRated,
    /// Movies currently in cinemas
    NowPlaying,
    /// Locally stored favorites
    Favorite,
}

impl Category {
    /// Categories backed by the remote API
    pub const REMOTE: [Category; 3] = [Category::TopRated, Category::Popular, Category::NowPlaying];

    /// Stable identifier used in navigation arguments
    pub fn id(self) -> &'static str {
        match self {
            Category::Popular => "popular",
            Category::TopRated => "top_rated",
            Category::NowPlaying => "now_playing",
            Category::Favorite => "favorite",
        }
    }

    /// Parse an identifier, falling back to `Popular` for unknown values
    pub fn from_id(id: &str) -> Self {
        match id {
            "top_rated" => Category::TopRated,
            "now_playing" => Category::NowPlaying,
            "favorite" => Category::Favorite,
            _ => Category::Popular,
        }
    }

    /// Whether the category is listed by the remote API
    pub fn is_remote(self) -> bool {
        self != Category::Favorite
    }

    /// API path for remote categories
    pub fn api_path(self) -> Option<&'static str> {
        match self {
            Category::Popular => Some("/movie/popular"),
            Category::TopRated => Some("/movie/top_rated"),
            Category::NowPlaying => Some("/movie/now_playing"),
            Category::Favorite => None,
        }
    }

    /// Section heading
    pub fn title(self) -> &'static str {
        match self {
            Category::Popular => "Popular Movies",
            Category::TopRated => "Rated Movies",
            Category::NowPlaying => "Newest Movies",
            Category::Favorite => "Favorites",
        }
    }
}
