//! Movieapp Tauri Integration
//!
//! This crate provides Tauri commands for integrating the movieapp data
//! layer into Tauri 2.0 applications.
//!
//! # Usage
//!
//! ```rust,ignore
//! use movieapp_tauri::MovieAppState;
//! use tauri::Manager;
//!
//! fn main() {
//!     movieapp_tauri::init();
//!
//!     tauri::Builder::default()
//!         .setup(|app| {
//!             let favorites = app.path().app_data_dir()?.join("favorites.json");
//!             let state = MovieAppState::from_env(favorites)?;
//!             movieapp_tauri::forward_content(app.handle().clone(), &state);
//!             app.manage(state);
//!             Ok(())
//!         })
//!         .invoke_handler(tauri::generate_handler![
//!             movieapp_tauri::commands::select_category,
//!             movieapp_tauri::commands::category_content,
//!             movieapp_tauri::commands::load_more,
//!             movieapp_tauri::commands::retry,
//!             movieapp_tauri::commands::invalidate,
//!             movieapp_tauri::commands::resume,
//!             movieapp_tauri::commands::access_hint,
//!             movieapp_tauri::commands::search_movies,
//!             movieapp_tauri::commands::search_state,
//!             movieapp_tauri::commands::home_sections,
//!             movieapp_tauri::commands::is_favorite,
//!             movieapp_tauri::commands::add_favorite,
//!             movieapp_tauri::commands::remove_favorite,
//!             movieapp_tauri::commands::toggle_favorite,
//!             movieapp_tauri::commands::get_favorites,
//!         ])
//!         .run(tauri::generate_context!())
//!         .expect("error while running tauri application");
//! }
//! ```
//!
//! # Events
//! - `category-content` - Emitted with every `CategoryContent` change
//! - `search-state` - Emitted with every `SearchState` change

pub mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use tauri::{AppHandle, Emitter, Runtime};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use movieapp_core::paging::PagingConfig;
use movieapp_core::{
    CategoryController, ClientConfig, FavoritesStore, JsonFavoritesStore, MovieFetcher,
    SearchController, SearchPolicy, TmdbFetcher,
};

/// Event carrying the category screen content
pub const CATEGORY_CONTENT_EVENT: &str = "category-content";

/// Event carrying the search screen state
pub const SEARCH_STATE_EVENT: &str = "search-state";

/// Load `.env` and install the tracing subscriber.
///
/// `RUST_LOG` overrides the default filter. Calling this twice is harmless.
pub fn init() {
    dotenvy::dotenv().ok();

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "movieapp_core=info,movieapp_tauri=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Application state shared by all commands.
///
/// One fetcher and one favorites store exist per process; the controllers
/// hold references to them.
pub struct MovieAppState {
    fetcher: Arc<dyn MovieFetcher>,
    favorites: Arc<dyn FavoritesStore>,
    controller: Arc<CategoryController>,
    search: Arc<SearchController>,
}

impl MovieAppState {
    /// Create the state with the given client configuration, storing
    /// favorites at `favorites_path`.
    ///
    /// # Errors
    /// Returns an error string if the HTTP client cannot be built or the
    /// favorites file is unreadable.
    pub fn new(config: ClientConfig, favorites_path: impl Into<PathBuf>) -> Result<Self, String> {
        if config.api_key.as_deref().map_or(true, |key| key.trim().is_empty()) {
            warn!("TMDB API key not configured, remote listings will fail");
        }
        let fetcher: Arc<dyn MovieFetcher> =
            Arc::new(TmdbFetcher::with_config(config).map_err(|e| e.to_string())?);
        let favorites: Arc<dyn FavoritesStore> =
            Arc::new(JsonFavoritesStore::open(favorites_path).map_err(|e| e.to_string())?);

        Ok(Self::with_parts(fetcher, favorites))
    }

    /// Create the state from `TMDB_*` environment variables
    pub fn from_env(favorites_path: impl Into<PathBuf>) -> Result<Self, String> {
        Self::new(ClientConfig::from_env(), favorites_path)
    }

    /// Create the state around existing collaborators
    pub fn with_parts(fetcher: Arc<dyn MovieFetcher>, favorites: Arc<dyn FavoritesStore>) -> Self {
        let controller = CategoryController::new(
            Arc::clone(&fetcher),
            Arc::clone(&favorites),
            PagingConfig::default(),
        );
        let search = SearchController::new(Arc::clone(&fetcher), SearchPolicy::debounced());
        info!("movieapp state created");
        Self {
            fetcher,
            favorites,
            controller: Arc::new(controller),
            search: Arc::new(search),
        }
    }

    pub fn fetcher(&self) -> &Arc<dyn MovieFetcher> {
        &self.fetcher
    }

    pub fn favorites(&self) -> &Arc<dyn FavoritesStore> {
        &self.favorites
    }

    pub fn controller(&self) -> &Arc<CategoryController> {
        &self.controller
    }

    pub fn search(&self) -> &Arc<SearchController> {
        &self.search
    }
}

/// Emit category content and search state changes to the frontend until
/// the state is dropped.
pub fn forward_content<R: Runtime>(app: AppHandle<R>, state: &MovieAppState) {
    let mut content = state.controller.subscribe();
    let content_app = app.clone();
    tauri::async_runtime::spawn(async move {
        while content.changed().await.is_ok() {
            let payload = content.borrow_and_update().clone();
            if let Err(e) = content_app.emit(CATEGORY_CONTENT_EVENT, payload) {
                warn!(error = %e, "emitting category content failed");
            }
        }
    });

    let mut search = state.search.subscribe();
    tauri::async_runtime::spawn(async move {
        while search.changed().await.is_ok() {
            let payload = search.borrow_and_update().clone();
            if let Err(e) = app.emit(SEARCH_STATE_EVENT, payload) {
                warn!(error = %e, "emitting search state failed");
            }
        }
    });
}
