//! In-process fakes shared by unit tests

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::error::{MovieError, Result};
use crate::fetcher::MovieFetcher;
use crate::types::{Category, Movie, MoviePage};

/// Deterministic `MovieFetcher`: page `p` of size `n` holds ids
/// `(p-1)*n+1 ..= p*n`. Failures and blocking are scripted per test.
pub struct FakeFetcher {
    total_pages: u32,
    page_size: u32,
    calls: Mutex<Vec<(Category, u32)>>,
    search_calls: Mutex<Vec<String>>,
    failures: Mutex<HashMap<u32, MovieError>>,
    search_results: Mutex<Vec<Movie>>,
    gate: watch::Sender<bool>,
}

impl FakeFetcher {
    pub fn new(total_pages: u32, page_size: u32) -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            total_pages,
            page_size,
            calls: Mutex::new(Vec::new()),
            search_calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            search_results: Mutex::new(Vec::new()),
            gate,
        }
    }

    /// Ids on `page`
    pub fn ids_on(&self, page: u32) -> Vec<u32> {
        let start = (page - 1) * self.page_size + 1;
        (start..start + self.page_size).collect()
    }

    /// Next fetch of `page` fails with `error`, later fetches succeed
    pub fn fail_page(&self, page: u32, error: MovieError) {
        self.failures.lock().insert(page, error);
    }

    /// Hold every fetch until `open` is called
    pub fn close_gate(&self) {
        self.gate.send_replace(false);
    }

    pub fn open_gate(&self) {
        self.gate.send_replace(true);
    }

    pub fn set_search_results(&self, movies: Vec<Movie>) {
        *self.search_results.lock() = movies;
    }

    pub fn calls(&self) -> Vec<(Category, u32)> {
        self.calls.lock().clone()
    }

    pub fn search_calls(&self) -> Vec<String> {
        self.search_calls.lock().clone()
    }

    async fn wait_for_gate(&self) {
        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;
    }
}

#[async_trait]
impl MovieFetcher for FakeFetcher {
    async fn fetch(&self, category: Category, page: u32) -> Result<MoviePage> {
        self.calls.lock().push((category, page));
        self.wait_for_gate().await;

        if let Some(error) = self.failures.lock().remove(&page) {
            return Err(error);
        }
        if !category.is_remote() {
            return Err(MovieError::UnsupportedCategory(category.id().to_string()));
        }

        let movies = self.ids_on(page).into_iter().map(Movie::new).collect();
        Ok(MoviePage::new(page, movies, self.total_pages))
    }

    async fn search(&self, query: &str) -> Result<Vec<Movie>> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }
        self.search_calls.lock().push(trimmed.to_string());
        self.wait_for_gate().await;

        let results = self.search_results.lock().clone();
        Ok(results)
    }
}

/// Wait until `rx` holds a value matching `predicate`, failing the test
/// after two seconds.
pub async fn wait_until<T, F>(rx: &mut watch::Receiver<T>, predicate: F) -> T
where
    T: Clone,
    F: FnMut(&T) -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), rx.wait_for(predicate))
        .await
        .expect("timed out waiting for state")
        .expect("sender dropped")
        .clone()
}
