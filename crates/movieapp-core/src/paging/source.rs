//! Page-number keyed page source
//!
//! Bridges the `MovieFetcher` page-number API and the paging engine: one
//! `load` call fetches one page and computes its neighbour keys.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::state::{LoadDirection, LoadedPage, PageKey, PagingState};
use crate::error::MovieError;
use crate::fetcher::MovieFetcher;
use crate::types::Category;

/// First page of every listing
pub const FIRST_PAGE: PageKey = 1;

/// Outcome of one page load; failures are values, never panics
pub type LoadResult = Result<LoadedPage, MovieError>;

/// Arguments of one page load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadParams {
    /// Page to load; `None` means the default first page
    pub key: Option<PageKey>,
    /// Why the page is loaded
    pub direction: LoadDirection,
    /// Requested item count (advisory; TMDB pages have a fixed size)
    pub load_size: usize,
}

/// Source of pages for the paging engine.
///
/// Implementations do not retry; the engine re-invokes `load` with the
/// same key when the consumer asks for a retry.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Load the page for `params.key`
    async fn load(&self, params: LoadParams) -> LoadResult;

    /// Key to reload first after an invalidation, chosen so the page
    /// holding the anchor position comes back first. `None` means start at
    /// the default page.
    fn refresh_key(&self, state: &PagingState) -> Option<PageKey>;
}

/// Neighbour keys of `page` in a listing of `total_pages` pages.
///
/// # Examples
/// ```
/// use movieapp_core::paging::page_keys;
///
/// assert_eq!(page_keys(1, 5), (None, Some(2)));
/// assert_eq!(page_keys(3, 5), (Some(2), Some(4)));
/// assert_eq!(page_keys(5, 5), (Some(4), None));
/// ```
pub fn page_keys(page: PageKey, total_pages: u32) -> (Option<PageKey>, Option<PageKey>) {
    let prev_key = (page > FIRST_PAGE).then(|| page - 1);
    let next_key = (page < total_pages).then(|| page + 1);
    (prev_key, next_key)
}

/// Refresh key derived from the page nearest the anchor position
pub fn refresh_key_for(state: &PagingState) -> Option<PageKey> {
    let anchor = state.anchor_position?;
    let page = state.closest_page_to_position(anchor)?;
    page.prev_key
        .map(|prev| prev + 1)
        .or_else(|| page.next_key.map(|next| next - 1))
}

/// Pages of one remote category
pub struct CategoryPageSource {
    fetcher: Arc<dyn MovieFetcher>,
    category: Category,
}

impl CategoryPageSource {
    pub fn new(fetcher: Arc<dyn MovieFetcher>, category: Category) -> Self {
        Self { fetcher, category }
    }

    pub fn category(&self) -> Category {
        self.category
    }
}

#[async_trait]
impl PageSource for CategoryPageSource {
    async fn load(&self, params: LoadParams) -> LoadResult {
        let page = params.key.unwrap_or(FIRST_PAGE);
        let movie_page = self.fetcher.fetch(self.category, page).await?;
        let (prev_key, next_key) = page_keys(page, movie_page.total_pages);

        debug!(
            category = self.category.id(),
            page,
            ?prev_key,
            ?next_key,
            "page loaded"
        );
        Ok(LoadedPage::new(movie_page.movies, prev_key, next_key))
    }

    fn refresh_key(&self, state: &PagingState) -> Option<PageKey> {
        refresh_key_for(state)
    }
}
