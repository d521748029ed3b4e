//! Category screen controller
//!
//! Owns the feed of the selected category and republishes it as one
//! `CategoryContent` stream. Remote categories are paged through a
//! `PagingEngine`; the favorites category is read from the `FavoritesStore`
//! in one shot and reloaded whenever the screen becomes visible again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::favorites::FavoritesStore;
use crate::fetcher::MovieFetcher;
use crate::paging::{CategoryPageSource, LoadState, LoadStates, PagingConfig, PagingEngine, PagingSnapshot};
use crate::types::{Category, Movie};

/// What the category screen renders
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryContent {
    /// Selected category, `None` before the first selection
    pub category: Option<Category>,
    /// Items of the selected category, each movie id at most once
    pub items: Vec<Movie>,
    pub load_states: LoadStates,
}

impl CategoryContent {
    fn loading(category: Category) -> Self {
        Self {
            category: Some(category),
            items: Vec::new(),
            load_states: LoadStates {
                refresh: LoadState::Loading,
                ..LoadStates::default()
            },
        }
    }

    fn from_snapshot(category: Category, snapshot: PagingSnapshot) -> Self {
        Self {
            category: Some(category),
            items: snapshot.items,
            load_states: snapshot.load_states,
        }
    }
}

/// Publishing side shared with the tasks of the active feed.
///
/// Every feed start takes a new epoch; updates carrying an older epoch are
/// dropped, so a torn-down feed can never overwrite its successor.
#[derive(Clone)]
struct Publisher {
    content: Arc<watch::Sender<CategoryContent>>,
    epoch: Arc<AtomicU64>,
}

impl Publisher {
    fn begin(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn update<F>(&self, epoch: u64, change: F) -> bool
    where
        F: FnOnce(&mut CategoryContent),
    {
        self.content.send_if_modified(|current| {
            if self.epoch.load(Ordering::SeqCst) != epoch {
                return false;
            }
            let before = current.clone();
            change(current);
            *current != before
        })
    }
}

enum Feed {
    Remote {
        engine: PagingEngine,
        forwarder: JoinHandle<()>,
    },
    Favorites {
        loader: JoinHandle<()>,
    },
}

struct ActiveFeed {
    category: Category,
    feed: Feed,
}

impl ActiveFeed {
    fn shut_down(self) {
        match self.feed {
            Feed::Remote { engine, forwarder } => {
                forwarder.abort();
                engine.close();
            }
            Feed::Favorites { loader } => loader.abort(),
        }
    }
}

/// Controller of the category screen
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use movieapp_core::{Category, CategoryController, ClientConfig, JsonFavoritesStore, TmdbFetcher};
/// use movieapp_core::paging::PagingConfig;
///
/// # async fn example() -> Result<(), movieapp_core::MovieError> {
/// let fetcher = Arc::new(TmdbFetcher::with_config(ClientConfig::from_env())?);
/// let favorites = Arc::new(JsonFavoritesStore::open("favorites.json")?);
/// let controller = CategoryController::new(fetcher, favorites, PagingConfig::default());
///
/// let mut content = controller.subscribe();
/// controller.select(Category::TopRated);
/// content.changed().await.ok();
/// println!("{} movies", content.borrow().items.len());
/// # Ok(())
/// # }
/// ```
pub struct CategoryController {
    fetcher: Arc<dyn MovieFetcher>,
    favorites: Arc<dyn FavoritesStore>,
    config: PagingConfig,
    publisher: Publisher,
    active: Mutex<Option<ActiveFeed>>,
}

impl CategoryController {
    pub fn new(
        fetcher: Arc<dyn MovieFetcher>,
        favorites: Arc<dyn FavoritesStore>,
        config: PagingConfig,
    ) -> Self {
        let (content, _) = watch::channel(CategoryContent::default());
        Self {
            fetcher,
            favorites,
            config,
            publisher: Publisher {
                content: Arc::new(content),
                epoch: Arc::new(AtomicU64::new(0)),
            },
            active: Mutex::new(None),
        }
    }

    /// Attach to the content stream; the receiver holds the latest content
    pub fn subscribe(&self) -> watch::Receiver<CategoryContent> {
        self.publisher.content.subscribe()
    }

    /// Latest published content
    pub fn current(&self) -> CategoryContent {
        self.publisher.content.borrow().clone()
    }

    /// Currently selected category
    pub fn selected(&self) -> Option<Category> {
        self.active.lock().as_ref().map(|active| active.category)
    }

    /// Show `category`.
    ///
    /// Re-selecting the current category keeps its loaded items. Selecting
    /// another one tears down the current feed, aborting its loads.
    ///
    /// # Panics
    /// Must be called within a tokio runtime, as loads are spawned.
    pub fn select(&self, category: Category) {
        let mut active = self.active.lock();
        if active.as_ref().map(|a| a.category) == Some(category) {
            debug!(category = category.id(), "category already selected");
            return;
        }
        if let Some(previous) = active.take() {
            debug!(category = previous.category.id(), "closing category feed");
            previous.shut_down();
        }

        let epoch = self.publisher.begin();
        self.publisher.content.send_replace(CategoryContent::loading(category));
        info!(category = category.id(), epoch, "category selected");

        let feed = if category.is_remote() {
            self.start_remote(category, epoch)
        } else {
            Feed::Favorites {
                loader: self.spawn_favorites_load(epoch),
            }
        };
        *active = Some(ActiveFeed { category, feed });
    }

    /// Load the next page of a remote category.
    ///
    /// Favorites are loaded all at once, so this is a no-op there.
    pub fn load_more(&self) -> bool {
        match self.active.lock().as_ref().map(|a| &a.feed) {
            Some(Feed::Remote { engine, .. }) => engine.request_more(),
            _ => false,
        }
    }

    /// Re-issue failed loads.
    ///
    /// Returns `false` when nothing had failed.
    pub fn retry(&self) -> bool {
        let mut active = self.active.lock();
        match active.as_mut().map(|a| &mut a.feed) {
            Some(Feed::Remote { engine, .. }) => engine.retry(),
            Some(Feed::Favorites { loader }) => {
                if self.current().load_states.refresh.error().is_none() {
                    return false;
                }
                self.reload_favorites(loader);
                true
            }
            None => false,
        }
    }

    /// Drop what is loaded and load again, keeping the scroll position for
    /// remote categories.
    pub fn invalidate(&self) {
        let mut active = self.active.lock();
        match active.as_mut().map(|a| &mut a.feed) {
            Some(Feed::Remote { engine, .. }) => engine.invalidate(),
            Some(Feed::Favorites { loader }) => self.reload_favorites(loader),
            None => {}
        }
    }

    /// Report the item index nearest the viewport
    pub fn access_hint(&self, index: usize) {
        if let Some(Feed::Remote { engine, .. }) = self.active.lock().as_ref().map(|a| &a.feed) {
            engine.access_hint(index);
        }
    }

    /// The screen became visible again; favorites may have changed
    /// elsewhere, so the favorites category is reloaded.
    pub fn resume(&self) {
        let mut active = self.active.lock();
        if let Some(Feed::Favorites { loader }) = active.as_mut().map(|a| &mut a.feed) {
            self.reload_favorites(loader);
        }
    }

    fn start_remote(&self, category: Category, epoch: u64) -> Feed {
        let source = Arc::new(CategoryPageSource::new(Arc::clone(&self.fetcher), category));
        let engine = PagingEngine::new(source, self.config);
        let mut snapshots = engine.subscribe();
        let publisher = self.publisher.clone();

        let forwarder = tokio::spawn(async move {
            loop {
                let snapshot = snapshots.borrow_and_update().clone();
                publisher.update(epoch, |content| {
                    *content = CategoryContent::from_snapshot(category, snapshot);
                });
                if snapshots.changed().await.is_err() {
                    break;
                }
            }
        });
        Feed::Remote { engine, forwarder }
    }

    fn reload_favorites(&self, loader: &mut JoinHandle<()>) {
        loader.abort();
        let epoch = self.publisher.begin();
        debug!(epoch, "reloading favorites");
        *loader = self.spawn_favorites_load(epoch);
    }

    fn spawn_favorites_load(&self, epoch: u64) -> JoinHandle<()> {
        self.publisher.update(epoch, |content| {
            content.load_states.refresh = LoadState::Loading;
        });

        let favorites = Arc::clone(&self.favorites);
        let publisher = self.publisher.clone();
        tokio::spawn(async move {
            match favorites.get_all().await {
                Ok(movies) => {
                    debug!(count = movies.len(), "favorites loaded");
                    publisher.update(epoch, |content| {
                        content.items = movies;
                        content.load_states = LoadStates::complete();
                    });
                }
                Err(error) => {
                    warn!(%error, "loading favorites failed");
                    publisher.update(epoch, |content| {
                        content.load_states.refresh = LoadState::Error { error };
                    });
                }
            }
        })
    }
}

impl Drop for CategoryController {
    fn drop(&mut self) {
        if let Some(active) = self.active.get_mut().take() {
            active.shut_down();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{MovieError, Result};
    use crate::favorites::JsonFavoritesStore;
    use crate::testing::{wait_until, FakeFetcher};
    use crate::types::MovieId;
    use async_trait::async_trait;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Fixture {
        fetcher: Arc<FakeFetcher>,
        favorites: Arc<JsonFavoritesStore>,
        controller: CategoryController,
        _dir: TempDir,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(FakeFetcher::new(5, 20));
        let favorites = Arc::new(JsonFavoritesStore::open(dir.path().join("favorites.json")).unwrap());
        let config = PagingConfig::default().with_prefetch_distance(0);
        let controller = CategoryController::new(fetcher.clone(), favorites.clone(), config);
        Fixture {
            fetcher,
            favorites,
            controller,
            _dir: dir,
        }
    }

    fn movie(id: MovieId, title: &str) -> Movie {
        let mut movie = Movie::new(id);
        movie.title = Some(title.to_string());
        movie
    }

    fn settled(content: &CategoryContent) -> bool {
        let states = &content.load_states;
        !states.refresh.is_loading() && !states.append.is_loading() && !states.prepend.is_loading()
    }

    async fn settle(
        rx: &mut watch::Receiver<CategoryContent>,
        category: Category,
        len: usize,
    ) -> CategoryContent {
        wait_until(rx, |c| c.category == Some(category) && c.items.len() == len && settled(c)).await
    }

    #[tokio::test]
    async fn test_remote_category_pages() {
        let f = fixture();
        let mut rx = f.controller.subscribe();
        assert_eq!(rx.borrow().category, None);

        f.controller.select(Category::Popular);
        assert_eq!(f.controller.selected(), Some(Category::Popular));
        let content = settle(&mut rx, Category::Popular, 20).await;
        assert_eq!(content.load_states.prepend, LoadState::END);

        assert!(f.controller.load_more());
        let content = settle(&mut rx, Category::Popular, 40).await;
        let ids: Vec<u32> = content.items.iter().map(|m| m.id).collect();
        let mut expected = f.fetcher.ids_on(1);
        expected.extend(f.fetcher.ids_on(2));
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn test_reselecting_keeps_loaded_items() {
        let f = fixture();
        let mut rx = f.controller.subscribe();
        f.controller.select(Category::Popular);
        settle(&mut rx, Category::Popular, 20).await;
        f.controller.load_more();
        settle(&mut rx, Category::Popular, 40).await;

        f.controller.select(Category::Popular);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(f.controller.current().items.len(), 40);
        assert_eq!(f.fetcher.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_switching_category_discards_old_loads() {
        let f = fixture();
        let mut rx = f.controller.subscribe();
        f.controller.select(Category::Popular);
        settle(&mut rx, Category::Popular, 20).await;

        f.fetcher.close_gate();
        assert!(f.controller.load_more());
        f.controller.select(Category::TopRated);
        f.fetcher.open_gate();

        let content = settle(&mut rx, Category::TopRated, 20).await;
        assert_eq!(content.load_states.refresh, LoadState::IDLE);

        tokio::time::sleep(Duration::from_millis(20)).await;
        let content = f.controller.current();
        assert_eq!(content.category, Some(Category::TopRated));
        assert_eq!(content.items.len(), 20);
        assert!(f.fetcher.calls().contains(&(Category::TopRated, 1)));
    }

    #[tokio::test]
    async fn test_favorites_bypass_fetcher() {
        let f = fixture();
        f.favorites.add(movie(7, "Seven")).await.unwrap();
        f.favorites.add(movie(3, "Three")).await.unwrap();

        let mut rx = f.controller.subscribe();
        f.controller.select(Category::Favorite);
        let content = settle(&mut rx, Category::Favorite, 2).await;

        let ids: Vec<u32> = content.items.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![3, 7]);
        assert_eq!(content.load_states, LoadStates::complete());
        assert!(!f.controller.load_more());
        assert!(f.fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_resume_reloads_favorites() {
        let f = fixture();
        let mut rx = f.controller.subscribe();
        f.controller.select(Category::Favorite);
        settle(&mut rx, Category::Favorite, 0).await;

        f.favorites.add(movie(42, "Answer")).await.unwrap();
        f.controller.resume();

        let content = settle(&mut rx, Category::Favorite, 1).await;
        assert_eq!(content.items[0].id, 42);
    }

    #[tokio::test]
    async fn test_resume_ignores_remote_category() {
        let f = fixture();
        let mut rx = f.controller.subscribe();
        f.controller.select(Category::NowPlaying);
        settle(&mut rx, Category::NowPlaying, 20).await;

        f.controller.resume();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(f.fetcher.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_reloads_remote_category() {
        let f = fixture();
        let mut rx = f.controller.subscribe();
        f.controller.select(Category::Popular);
        settle(&mut rx, Category::Popular, 20).await;
        f.controller.load_more();
        settle(&mut rx, Category::Popular, 40).await;

        f.controller.access_hint(30);
        f.controller.invalidate();

        let content = settle(&mut rx, Category::Popular, 20).await;
        let ids: Vec<u32> = content.items.iter().map(|m| m.id).collect();
        assert_eq!(ids, f.fetcher.ids_on(2));
    }

    #[tokio::test]
    async fn test_retry_after_failed_first_page() {
        let f = fixture();
        f.fetcher.fail_page(1, MovieError::Transport("offline".to_string()));
        let mut rx = f.controller.subscribe();
        f.controller.select(Category::Popular);

        let content = wait_until(&mut rx, |c| c.load_states.refresh.error().is_some()).await;
        assert!(content.items.is_empty());

        assert!(f.controller.retry());
        settle(&mut rx, Category::Popular, 20).await;
        assert!(!f.controller.retry());
    }

    #[tokio::test]
    async fn test_nothing_selected_is_inert() {
        let f = fixture();
        assert!(!f.controller.load_more());
        assert!(!f.controller.retry());
        f.controller.invalidate();
        f.controller.resume();
        f.controller.access_hint(3);
        assert_eq!(f.controller.current(), CategoryContent::default());
    }

    /// Store whose first `get_all` fails
    struct FlakyStore {
        failed: Mutex<bool>,
        favorites: watch::Sender<Vec<Movie>>,
    }

    impl FlakyStore {
        fn new() -> Self {
            let (favorites, _) = watch::channel(Vec::new());
            Self {
                failed: Mutex::new(false),
                favorites,
            }
        }
    }

    #[async_trait]
    impl FavoritesStore for FlakyStore {
        async fn add(&self, _movie: Movie) -> Result<()> {
            Ok(())
        }

        async fn remove(&self, _movie_id: MovieId) -> Result<()> {
            Ok(())
        }

        async fn is_favorite(&self, _movie_id: MovieId) -> Result<bool> {
            Ok(false)
        }

        async fn get_all(&self) -> Result<Vec<Movie>> {
            let mut failed = self.failed.lock();
            if !*failed {
                *failed = true;
                return Err(MovieError::Storage("disk unavailable".to_string()));
            }
            Ok(vec![movie(1, "One")])
        }

        fn observe(&self) -> watch::Receiver<Vec<Movie>> {
            self.favorites.subscribe()
        }
    }

    #[tokio::test]
    async fn test_favorites_failure_then_retry() {
        let fetcher = Arc::new(FakeFetcher::new(1, 20));
        let controller = CategoryController::new(fetcher, Arc::new(FlakyStore::new()), PagingConfig::default());
        let mut rx = controller.subscribe();
        controller.select(Category::Favorite);

        let content = wait_until(&mut rx, |c| c.load_states.refresh.error().is_some()).await;
        assert_eq!(
            content.load_states.refresh.error(),
            Some(&MovieError::Storage("disk unavailable".to_string()))
        );

        assert!(controller.retry());
        let content = settle(&mut rx, Category::Favorite, 1).await;
        assert_eq!(content.load_states, LoadStates::complete());
    }
}
