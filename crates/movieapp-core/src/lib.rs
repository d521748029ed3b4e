//! Movieapp Core Library
//!
//! This crate provides the data layer of a TMDB (The Movie Database)
//! movie browser.
//!
//! # Features
//! - Rate-limited TMDB client and `MovieFetcher` for listings and search
//! - Incremental paged loading with retry and invalidation (`paging`)
//! - Category screen controller with locally stored favorites
//! - JSON file favorites store with atomic writes
//! - Search, home sections and detail-screen state

pub mod client;
pub mod controller;
pub mod detail;
pub mod dto;
pub mod error;
pub mod favorites;
pub mod fetcher;
pub mod home;
pub mod paging;
pub mod search;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use client::{ClientConfig, RateLimiter, TmdbClient};
pub use controller::{CategoryContent, CategoryController};
pub use detail::MovieDetailState;
pub use error::{MovieError, Result};
pub use favorites::{FavoritesStore, JsonFavoritesStore};
pub use fetcher::{MovieFetcher, TmdbFetcher};
pub use home::{load_section, load_sections, Section};
pub use search::{SearchController, SearchPolicy, SearchState};
pub use types::{Category, Movie, MovieId, MoviePage};
