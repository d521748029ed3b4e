//! Paging engine
//!
//! Turns repeated `PageSource::load` calls into one growing, de-duplicated
//! list published through a `watch` channel. Loads run on spawned tokio
//! tasks; at most one load per direction is in flight, and loads started
//! before an invalidation can never publish into the new window.

use std::collections::HashMap;
use std::sync::Arc;

use futures::Stream;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::merge::{merge_pages, raw_position};
use super::source::{LoadParams, LoadResult, PageSource};
use super::state::{LoadDirection, LoadState, LoadStates, LoadedPage, PageKey, PagingState};
use crate::types::{Movie, MovieId};

/// Default number of items per page (TMDB pages hold 20 results)
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Tuning of the paging engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingConfig {
    /// Expected items per page, passed to the source as the load size
    pub page_size: usize,
    /// Distance from either end of the list, in items, at which an access
    /// hint triggers loading the neighbouring page
    pub prefetch_distance: usize,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            prefetch_distance: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PagingConfig {
    pub fn with_prefetch_distance(mut self, prefetch_distance: usize) -> Self {
        self.prefetch_distance = prefetch_distance;
        self
    }
}

/// Everything a list UI needs to render one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PagingSnapshot {
    /// Merged items, each movie id at most once
    pub items: Vec<Movie>,
    /// Per-direction load status
    pub load_states: LoadStates,
    /// Incremented by every invalidation
    pub generation: u64,
}

/// Engine for one paged listing
///
/// The cached window lives as long as the engine: UI components may drop
/// and re-create their subscriptions freely (e.g. on rotation) and pick up
/// the latest snapshot. Dropping the engine aborts in-flight loads.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use futures::StreamExt;
/// use movieapp_core::paging::{CategoryPageSource, PagingConfig, PagingEngine};
/// use movieapp_core::{Category, ClientConfig, TmdbFetcher};
///
/// # async fn example() -> Result<(), movieapp_core::MovieError> {
/// let fetcher = Arc::new(TmdbFetcher::with_config(ClientConfig::from_env())?);
/// let source = Arc::new(CategoryPageSource::new(fetcher, Category::Popular));
/// let engine = PagingEngine::new(source, PagingConfig::default());
///
/// let mut stream = Box::pin(engine.stream());
/// while let Some(snapshot) = stream.next().await {
///     println!("{} movies", snapshot.items.len());
///     if snapshot.load_states.append.end_of_pagination_reached() {
///         break;
///     }
///     engine.request_more();
/// }
/// # Ok(())
/// # }
/// ```
pub struct PagingEngine {
    shared: Arc<Shared>,
}

struct Shared {
    source: Arc<dyn PageSource>,
    config: PagingConfig,
    state: Mutex<EngineState>,
    snapshots: watch::Sender<PagingSnapshot>,
}

struct EngineState {
    pages: Vec<LoadedPage>,
    load_states: LoadStates,
    in_flight: HashMap<LoadDirection, JoinHandle<()>>,
    /// Key of the failed load, per direction in Error
    failed_keys: HashMap<LoadDirection, Option<PageKey>>,
    /// Index into the merged item list
    anchor_position: Option<usize>,
    generation: u64,
    /// Refresh to run on the next subscription
    pending_refresh: Option<Option<PageKey>>,
    closed: bool,
}

impl PagingEngine {
    /// Create an idle engine. Nothing is loaded until the first subscription.
    pub fn new(source: Arc<dyn PageSource>, config: PagingConfig) -> Self {
        let (snapshots, _) = watch::channel(PagingSnapshot::default());
        let state = EngineState {
            pages: Vec::new(),
            load_states: LoadStates::default(),
            in_flight: HashMap::new(),
            failed_keys: HashMap::new(),
            anchor_position: None,
            generation: 0,
            pending_refresh: Some(None),
            closed: false,
        };
        Self {
            shared: Arc::new(Shared {
                source,
                config,
                state: Mutex::new(state),
                snapshots,
            }),
        }
    }

    /// Attach to the snapshot channel.
    ///
    /// The receiver holds the latest snapshot immediately; earlier
    /// snapshots are not replayed. The first attachment (and the first one
    /// after an invalidation without subscribers) starts the refresh load.
    ///
    /// # Panics
    /// Must be called within a tokio runtime, as loads are spawned.
    pub fn subscribe(&self) -> watch::Receiver<PagingSnapshot> {
        let rx = self.shared.snapshots.subscribe();
        self.shared.start_pending_refresh();
        rx
    }

    /// Snapshot stream: the latest snapshot first, then every update.
    ///
    /// The stream ends when the engine is dropped.
    pub fn stream(&self) -> impl Stream<Item = PagingSnapshot> + Send + 'static {
        let rx = self.subscribe();
        futures::stream::unfold((rx, true), |(mut rx, first)| async move {
            if !first {
                rx.changed().await.ok()?;
            }
            let snapshot = rx.borrow_and_update().clone();
            Some((snapshot, (rx, false)))
        })
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> PagingSnapshot {
        self.shared.snapshots.borrow().clone()
    }

    /// Load the page after the last loaded page.
    ///
    /// Returns `false` without loading when the end of the listing was
    /// reached, an append is already in flight, the last append failed (see
    /// [`retry`](Self::retry)) or the initial load has not completed.
    pub fn request_more(&self) -> bool {
        let mut state = self.shared.state.lock();
        self.shared.try_load_next(&mut state, LoadDirection::Append)
    }

    /// Load the page before the first loaded page, under the same rules as
    /// [`request_more`](Self::request_more).
    pub fn request_previous(&self) -> bool {
        let mut state = self.shared.state.lock();
        self.shared.try_load_next(&mut state, LoadDirection::Prepend)
    }

    /// Record the index into the published items nearest the viewport and
    /// load neighbouring
    /// pages when it is within `prefetch_distance` of either end.
    pub fn access_hint(&self, index: usize) {
        let mut state = self.shared.state.lock();
        state.anchor_position = Some(index);
        self.shared.prefetch(&mut state);
    }

    /// Re-issue every failed load with its original key.
    ///
    /// Returns `false` when no direction is in the error state.
    pub fn retry(&self) -> bool {
        let mut state = self.shared.state.lock();
        if state.closed {
            return false;
        }
        let failed: Vec<(LoadDirection, Option<PageKey>)> = LoadDirection::ALL
            .into_iter()
            .filter(|direction| state.load_states.get(*direction).error().is_some())
            .filter(|direction| !state.in_flight.contains_key(direction))
            .filter_map(|direction| {
                state
                    .failed_keys
                    .get(&direction)
                    .map(|key| (direction, *key))
            })
            .collect();

        for (direction, key) in &failed {
            info!(?direction, ?key, "retrying failed page load");
            self.shared.launch(&mut state, *direction, *key);
        }
        !failed.is_empty()
    }

    /// Discard the loaded window and reload starting at the page that held
    /// the anchor position.
    ///
    /// In-flight loads are aborted. With subscribers attached the reload
    /// starts now, otherwise on the next subscription.
    pub fn invalidate(&self) {
        let mut state = self.shared.state.lock();
        if state.closed {
            return;
        }

        let anchor = state
            .anchor_position
            .map(|index| raw_position(&state.pages, index));
        let window = PagingState::new(std::mem::take(&mut state.pages), anchor);
        let refresh_key = self.shared.source.refresh_key(&window);

        abort_all(&mut state);
        state.generation += 1;
        state.failed_keys.clear();
        state.load_states = LoadStates::default();
        state.anchor_position = None;
        info!(generation = state.generation, ?refresh_key, "paging window invalidated");

        if self.shared.snapshots.receiver_count() > 0 {
            self.shared.launch(&mut state, LoadDirection::Refresh, refresh_key);
        } else {
            state.pending_refresh = Some(refresh_key);
            self.shared.publish(&state);
        }
    }

    /// Abort in-flight loads and stop accepting new ones
    pub fn close(&self) {
        let mut state = self.shared.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        state.generation += 1;
        abort_all(&mut state);
        debug!("paging engine closed");
    }
}

impl Drop for PagingEngine {
    fn drop(&mut self) {
        self.close();
    }
}

impl Shared {
    fn start_pending_refresh(self: &Arc<Self>) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        if let Some(key) = state.pending_refresh.take() {
            self.launch(&mut state, LoadDirection::Refresh, key);
        }
    }

    fn can_launch(&self, state: &EngineState, direction: LoadDirection) -> bool {
        !state.closed
            && state.pending_refresh.is_none()
            && !state.in_flight.contains_key(&LoadDirection::Refresh)
            && !state.in_flight.contains_key(&direction)
            && state.load_states.get(direction).error().is_none()
    }

    fn try_load_next(self: &Arc<Self>, state: &mut EngineState, direction: LoadDirection) -> bool {
        if !self.can_launch(state, direction) {
            trace!(?direction, "load request ignored");
            return false;
        }
        let key = match direction {
            LoadDirection::Append => state.pages.last().and_then(|p| p.next_key),
            LoadDirection::Prepend => state.pages.first().and_then(|p| p.prev_key),
            LoadDirection::Refresh => return false,
        };
        match key {
            Some(key) => {
                self.launch(state, direction, Some(key));
                true
            }
            None => false,
        }
    }

    fn prefetch(self: &Arc<Self>, state: &mut EngineState) {
        let Some(anchor) = state.anchor_position else {
            return;
        };
        let loaded = self.snapshots.borrow().items.len();
        if loaded == 0 {
            return;
        }
        let distance = self.config.prefetch_distance;
        if anchor.saturating_add(distance) >= loaded.saturating_sub(1) {
            self.try_load_next(state, LoadDirection::Append);
        }
        if anchor <= distance {
            self.try_load_next(state, LoadDirection::Prepend);
        }
    }

    fn launch(self: &Arc<Self>, state: &mut EngineState, direction: LoadDirection, key: Option<PageKey>) {
        state.load_states.set(direction, LoadState::Loading);
        state.failed_keys.remove(&direction);

        let params = LoadParams {
            key,
            direction,
            load_size: self.config.page_size,
        };
        let generation = state.generation;
        let shared = Arc::clone(self);
        debug!(?direction, ?key, generation, "starting page load");

        let handle = tokio::spawn(async move {
            let result = shared.source.load(params).await;
            shared.complete(params, generation, result);
        });
        state.in_flight.insert(direction, handle);
        self.publish(state);
    }

    fn complete(self: &Arc<Self>, params: LoadParams, generation: u64, result: LoadResult) {
        let mut state = self.state.lock();
        if state.closed || state.generation != generation {
            debug!(direction = ?params.direction, key = ?params.key, "discarding stale page load");
            return;
        }
        state.in_flight.remove(&params.direction);

        match result {
            Ok(page) => {
                state.failed_keys.remove(&params.direction);
                match params.direction {
                    LoadDirection::Refresh => {
                        state.load_states = LoadStates {
                            refresh: LoadState::IDLE,
                            prepend: boundary_state(page.prev_key),
                            append: boundary_state(page.next_key),
                        };
                        state.failed_keys.clear();
                        state.pages = vec![page];
                    }
                    LoadDirection::Append => {
                        state.load_states.append = boundary_state(page.next_key);
                        state.pages.push(page);
                    }
                    LoadDirection::Prepend => {
                        state.load_states.prepend = boundary_state(page.prev_key);
                        let anchored = self.anchored_movie(&state);
                        state.pages.insert(0, page);
                        self.publish(&state);
                        self.follow_anchor(&mut state, anchored);
                        self.prefetch(&mut state);
                        return;
                    }
                }
                self.publish(&state);
                self.prefetch(&mut state);
            }
            Err(error) => {
                warn!(
                    direction = ?params.direction,
                    key = ?params.key,
                    retryable = error.is_retryable(),
                    %error,
                    "page load failed"
                );
                state.load_states.set(params.direction, LoadState::Error { error });
                state.failed_keys.insert(params.direction, params.key);
                self.publish(&state);
            }
        }
    }

    /// Movie id at the anchor and the merged length, taken before a prepend
    fn anchored_movie(&self, state: &EngineState) -> Option<(Option<MovieId>, usize)> {
        let anchor = state.anchor_position?;
        let snapshot = self.snapshots.borrow();
        Some((snapshot.items.get(anchor).map(|m| m.id), snapshot.items.len()))
    }

    /// Move the anchor so it stays on the same movie after a prepend
    fn follow_anchor(&self, state: &mut EngineState, anchored: Option<(Option<MovieId>, usize)>) {
        let (Some(anchor), Some((movie_id, len_before))) = (state.anchor_position, anchored) else {
            return;
        };
        let snapshot = self.snapshots.borrow();
        let moved = movie_id.and_then(|id| snapshot.items.iter().position(|m| m.id == id));
        state.anchor_position =
            Some(moved.unwrap_or_else(|| anchor + snapshot.items.len().saturating_sub(len_before)));
        trace!(from = anchor, to = ?state.anchor_position, "anchor shifted by prepend");
    }

    fn publish(&self, state: &EngineState) {
        self.snapshots.send_replace(PagingSnapshot {
            items: merge_pages(&state.pages),
            load_states: state.load_states.clone(),
            generation: state.generation,
        });
    }
}

fn boundary_state(key: Option<PageKey>) -> LoadState {
    if key.is_some() {
        LoadState::IDLE
    } else {
        LoadState::END
    }
}

fn abort_all(state: &mut EngineState) {
    for (direction, handle) in state.in_flight.drain() {
        trace!(?direction, "aborting in-flight page load");
        handle.abort();
    }
}
