//! Home screen sections
//!
//! The home screen shows the first page of every remote category side by
//! side. Sections load concurrently and fail independently.

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, warn};

use crate::fetcher::MovieFetcher;
use crate::paging::FIRST_PAGE;
use crate::types::{Category, Movie};

/// One horizontally scrolling row of the home screen
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub title: String,
    pub category: Category,
    pub movies: Vec<Movie>,
    /// User-facing message when the section failed to load
    pub error: Option<String>,
}

/// Load the first page of `category` into a section
pub async fn load_section(fetcher: &dyn MovieFetcher, category: Category) -> Section {
    let (movies, error) = match fetcher.fetch(category, FIRST_PAGE).await {
        Ok(page) => {
            debug!(category = category.id(), count = page.movies.len(), "section loaded");
            (page.movies, None)
        }
        Err(error) => {
            warn!(category = category.id(), %error, "section failed to load");
            (Vec::new(), Some(error.user_message()))
        }
    };

    Section {
        title: category.title().to_string(),
        category,
        movies,
        error,
    }
}

/// Load every remote category concurrently, in display order
pub async fn load_sections(fetcher: &dyn MovieFetcher) -> Vec<Section> {
    join_all(
        Category::REMOTE
            .into_iter()
            .map(|category| load_section(fetcher, category)),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MovieError;
    use crate::testing::FakeFetcher;

    #[tokio::test]
    async fn test_sections_in_display_order() {
        let fetcher = FakeFetcher::new(3, 20);
        let sections = load_sections(&fetcher).await;

        let titles: Vec<&str> = sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Rated Movies", "Popular Movies", "Newest Movies"]);
        assert!(sections.iter().all(|s| s.movies.len() == 20 && s.error.is_none()));

        let mut calls = fetcher.calls();
        calls.sort_by_key(|(category, _)| category.id());
        assert_eq!(
            calls,
            vec![
                (Category::NowPlaying, 1),
                (Category::Popular, 1),
                (Category::TopRated, 1)
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_section_keeps_others() {
        let fetcher = FakeFetcher::new(3, 20);
        // one-shot failure: exactly one of the three sections fails
        fetcher.fail_page(1, MovieError::Http { status: 503 });
        let sections = load_sections(&fetcher).await;

        let failed: Vec<&Section> = sections.iter().filter(|s| s.error.is_some()).collect();
        assert_eq!(failed.len(), 1);
        assert!(failed[0].movies.is_empty());
        assert_eq!(
            failed[0].error,
            Some(MovieError::Http { status: 503 }.user_message())
        );
        assert_eq!(sections.iter().filter(|s| s.movies.len() == 20).count(), 2);
    }

    #[tokio::test]
    async fn test_single_section_reload() {
        let fetcher = FakeFetcher::new(3, 20);
        let section = load_section(&fetcher, Category::Popular).await;
        assert_eq!(section.title, "Popular Movies");
        assert_eq!(section.category, Category::Popular);
        assert_eq!(section.movies.len(), 20);
    }
}
