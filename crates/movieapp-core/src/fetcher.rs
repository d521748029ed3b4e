//! Remote movie listings
//!
//! `MovieFetcher` is the seam between the paging machinery and the network.
//! `TmdbFetcher` combines the HTTP client with response decoding to serve
//! category pages and single-page searches.

use async_trait::async_trait;
use tracing::debug;

use crate::client::{ClientConfig, TmdbClient};
use crate::dto::{parse_movie_page, parse_search_results};
use crate::error::{MovieError, Result};
use crate::types::{Category, Movie, MoviePage};

/// Performs one remote request per call; no caching, no retry.
#[async_trait]
pub trait MovieFetcher: Send + Sync {
    /// Fetch one page of a remote category.
    ///
    /// # Errors
    /// - `MovieError::MissingApiKey` - credential absent (not retryable)
    /// - `MovieError::Http` - non-success status
    /// - `MovieError::Transport` - connectivity or timeout
    /// - `MovieError::UnsupportedCategory` - `Category::Favorite`
    async fn fetch(&self, category: Category, page: u32) -> Result<MoviePage>;

    /// Search movies by title. Only the first page of results is returned.
    ///
    /// A blank query returns an empty list without contacting the network.
    async fn search(&self, query: &str) -> Result<Vec<Movie>>;
}

/// `MovieFetcher` backed by the TMDB REST API
///
/// # Example
/// ```no_run
/// use movieapp_core::{Category, ClientConfig, MovieFetcher, TmdbFetcher};
///
/// # async fn example() -> Result<(), movieapp_core::MovieError> {
/// let fetcher = TmdbFetcher::with_config(ClientConfig::from_env())?;
/// let page = fetcher.fetch(Category::Popular, 1).await?;
/// println!("{} of {} pages", page.page, page.total_pages);
/// # Ok(())
/// # }
/// ```
pub struct TmdbFetcher {
    client: TmdbClient,
}

impl TmdbFetcher {
    /// Create a fetcher with a custom client.
    ///
    /// # Arguments
    /// * `client` - Pre-configured TmdbClient instance
    pub fn with_client(client: TmdbClient) -> Self {
        Self { client }
    }

    /// Create a fetcher from a client configuration.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        Ok(Self::with_client(TmdbClient::with_config(config)?))
    }
}

#[async_trait]
impl MovieFetcher for TmdbFetcher {
    async fn fetch(&self, category: Category, page: u32) -> Result<MoviePage> {
        let api_path = category
            .api_path()
            .ok_or_else(|| MovieError::UnsupportedCategory(category.id().to_string()))?;
        if page == 0 {
            return Err(MovieError::InvalidPage(page));
        }

        let body = self
            .client
            .get(&format!("{}?page={}", api_path, page))
            .await?;
        let result = parse_movie_page(&body, page)?;

        debug!(
            category = category.id(),
            page = result.page,
            total_pages = result.total_pages,
            count = result.movies.len(),
            "fetched category page"
        );
        Ok(result)
    }

    async fn search(&self, query: &str) -> Result<Vec<Movie>> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let encoded_query = urlencoding::encode(trimmed);
        let body = self
            .client
            .get(&format!("/search/movie?query={}&page=1", encoded_query))
            .await?;
        let movies = parse_search_results(&body)?;

        debug!(count = movies.len(), "search finished");
        Ok(movies)
    }
}
