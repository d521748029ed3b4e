//! Movie search screen state
//!
//! Each submitted query supersedes the previous one: its task is aborted
//! and any result it still delivers is ignored.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::fetcher::MovieFetcher;
use crate::types::Movie;

/// Debounce used by [`SearchPolicy::debounced`]
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// When a submitted query hits the network
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchPolicy {
    /// Wait this long before searching; a newer query within the window
    /// replaces the pending one. `None` searches immediately.
    pub debounce: Option<Duration>,
}

impl SearchPolicy {
    /// Search immediately on submit
    pub fn immediate() -> Self {
        Self { debounce: None }
    }

    /// Search after [`DEFAULT_DEBOUNCE`] of quiet
    pub fn debounced() -> Self {
        Self {
            debounce: Some(DEFAULT_DEBOUNCE),
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = Some(debounce);
        self
    }
}

/// What the search screen renders
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchState {
    /// Trimmed query of the latest search
    pub query: String,
    pub results: Vec<Movie>,
    pub is_loading: bool,
    /// User-facing message of the last failure, until consumed
    pub error: Option<String>,
    /// Nothing searched yet
    pub show_instructions: bool,
}

impl Default for SearchState {
    fn default() -> Self {
        Self {
            query: String::new(),
            results: Vec::new(),
            is_loading: false,
            error: None,
            show_instructions: true,
        }
    }
}

impl SearchState {
    /// A search completed without results
    pub fn show_empty_state(&self) -> bool {
        !self.show_instructions && !self.is_loading && self.error.is_none() && self.results.is_empty()
    }
}

/// Controller of the search screen
pub struct SearchController {
    fetcher: Arc<dyn MovieFetcher>,
    policy: SearchPolicy,
    state: Arc<watch::Sender<SearchState>>,
    epoch: Arc<AtomicU64>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SearchController {
    pub fn new(fetcher: Arc<dyn MovieFetcher>, policy: SearchPolicy) -> Self {
        let (state, _) = watch::channel(SearchState::default());
        Self {
            fetcher,
            policy,
            state: Arc::new(state),
            epoch: Arc::new(AtomicU64::new(0)),
            task: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> SearchState {
        self.state.borrow().clone()
    }

    /// Search for `query`.
    ///
    /// A blank query resets the screen without touching the network.
    ///
    /// # Panics
    /// Must be called within a tokio runtime, as the search is spawned.
    pub fn submit(&self, query: &str) {
        let mut task = self.task.lock();
        if let Some(previous) = task.take() {
            previous.abort();
        }
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;

        let query = query.trim().to_string();
        if query.is_empty() {
            debug!("blank query, resetting search");
            self.state.send_replace(SearchState::default());
            return;
        }

        self.state.send_modify(|state| {
            state.query = query.clone();
            state.is_loading = true;
            state.error = None;
        });

        let fetcher = Arc::clone(&self.fetcher);
        let state = Arc::clone(&self.state);
        let current_epoch = Arc::clone(&self.epoch);
        let debounce = self.policy.debounce;

        *task = Some(tokio::spawn(async move {
            if let Some(debounce) = debounce {
                tokio::time::sleep(debounce).await;
            }
            debug!(query = %query, "searching");
            let result = fetcher.search(&query).await;

            state.send_if_modified(|state| {
                if current_epoch.load(Ordering::SeqCst) != epoch {
                    return false;
                }
                state.is_loading = false;
                match result {
                    Ok(movies) => {
                        debug!(query = %query, count = movies.len(), "search finished");
                        state.results = movies;
                        state.show_instructions = false;
                        state.error = None;
                    }
                    Err(error) => {
                        warn!(query = %query, %error, "search failed");
                        state.error = Some(error.user_message());
                    }
                }
                true
            });
        }));
    }

    /// The error message was shown
    pub fn clear_error(&self) {
        self.state.send_if_modified(|state| state.error.take().is_some());
    }
}

impl Drop for SearchController {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}
