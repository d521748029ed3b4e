//! TMDB response decoding
//!
//! Wire shapes of the TMDB listing endpoints and their conversion into
//! domain types. Every field the API may omit is optional here, and stays
//! optional in the domain.

use serde::Deserialize;

use crate::error::Result;
use crate::types::{Movie, MoviePage};

/// One entry of a listing's `results` array
#[derive(Debug, Clone, Deserialize)]
pub struct MovieDto {
    pub id: u32,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f32>,
    #[serde(default)]
    pub genre_ids: Option<Vec<u32>>,
}

/// Envelope shared by `/movie/{category}` and `/search/movie`
#[derive(Debug, Clone, Deserialize)]
pub struct MovieResponseDto {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub results: Vec<MovieDto>,
    #[serde(default)]
    pub total_results: u32,
    #[serde(default)]
    pub total_pages: u32,
}

impl From<MovieDto> for Movie {
    fn from(dto: MovieDto) -> Self {
        Movie {
            id: dto.id,
            title: dto.title,
            overview: dto.overview,
            poster_path: dto.poster_path,
            release_date: dto.release_date,
            vote_average: dto.vote_average,
            genre_ids: dto.genre_ids.unwrap_or_default(),
        }
    }
}

impl MovieResponseDto {
    /// Convert into a domain page; `requested_page` fills in a missing `page`
    pub fn into_page(self, requested_page: u32) -> MoviePage {
        MoviePage {
            page: self.page.unwrap_or(requested_page),
            movies: self.results.into_iter().map(Movie::from).collect(),
            total_pages: self.total_pages,
        }
    }
}

/// Decode a listing body.
///
/// An empty or `null` body from a successful response is an empty page
/// rather than an error.
///
/// # Arguments
/// * `body` - Raw response body
/// * `requested_page` - Page number that was requested
///
/// # Errors
/// Returns `MovieError::Decode` if the body is present but malformed.
pub fn parse_movie_page(body: &str, requested_page: u32) -> Result<MoviePage> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Ok(MoviePage::empty(requested_page));
    }

    let dto: Option<MovieResponseDto> = serde_json::from_str(trimmed)?;
    Ok(dto
        .map(|dto| dto.into_page(requested_page))
        .unwrap_or_else(|| MoviePage::empty(requested_page)))
}

/// Decode a search body into its movies
pub fn parse_search_results(body: &str) -> Result<Vec<Movie>> {
    Ok(parse_movie_page(body, 1)?.movies)
}
