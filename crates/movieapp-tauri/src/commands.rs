//! Tauri commands for movieapp
//!
//! This module contains all Tauri commands that can be invoked from the frontend.
//! Commands are async so they run on the Tauri async runtime, where the
//! controllers spawn their loads.

use tauri::State;

use crate::MovieAppState;
use movieapp_core::{
    load_sections, Category, CategoryContent, FavoritesStore, Movie, MovieId, SearchState, Section,
};

/// Show a category on the category screen.
///
/// Content arrives through the `category-content` event.
///
/// # Arguments
/// * `category` - One of `popular`, `top_rated`, `now_playing`, `favorite`
#[tauri::command]
pub async fn select_category(state: State<'_, MovieAppState>, category: Category) -> Result<(), String> {
    state.controller().select(category);
    Ok(())
}

/// Get the latest category screen content.
#[tauri::command]
pub async fn category_content(state: State<'_, MovieAppState>) -> Result<CategoryContent, String> {
    Ok(state.controller().current())
}

/// Load the next page of the selected category.
///
/// # Returns
/// * `true` if a load was started
#[tauri::command]
pub async fn load_more(state: State<'_, MovieAppState>) -> Result<bool, String> {
    Ok(state.controller().load_more())
}

/// Re-issue failed loads of the selected category.
///
/// # Returns
/// * `true` if a failed load was re-issued
#[tauri::command]
pub async fn retry(state: State<'_, MovieAppState>) -> Result<bool, String> {
    Ok(state.controller().retry())
}

/// Reload the selected category around the current scroll position.
#[tauri::command]
pub async fn invalidate(state: State<'_, MovieAppState>) -> Result<(), String> {
    state.controller().invalidate();
    Ok(())
}

/// Notify that the category screen is visible again.
#[tauri::command]
pub async fn resume(state: State<'_, MovieAppState>) -> Result<(), String> {
    state.controller().resume();
    Ok(())
}

/// Report the item index nearest the viewport.
///
/// # Arguments
/// * `index` - Position in the current item list
#[tauri::command]
pub async fn access_hint(state: State<'_, MovieAppState>, index: usize) -> Result<(), String> {
    state.controller().access_hint(index);
    Ok(())
}

/// Search movies by title.
///
/// Results arrive through the `search-state` event; a blank query resets
/// the search screen.
///
/// # Arguments
/// * `query` - Search query string
#[tauri::command]
pub async fn search_movies(state: State<'_, MovieAppState>, query: String) -> Result<(), String> {
    state.search().submit(&query);
    Ok(())
}

/// Get the latest search screen state.
#[tauri::command]
pub async fn search_state(state: State<'_, MovieAppState>) -> Result<SearchState, String> {
    Ok(state.search().current())
}

/// Load the first page of every remote category.
///
/// # Returns
/// * Sections in display order; failed sections carry an error message
#[tauri::command]
pub async fn home_sections(state: State<'_, MovieAppState>) -> Result<Vec<Section>, String> {
    Ok(load_sections(state.fetcher().as_ref()).await)
}

/// Check whether a movie is a favorite.
///
/// # Arguments
/// * `movie_id` - TMDB ID of the movie
///
/// # Returns
/// * `Ok(bool)` with the favorite flag
/// * `Err(String)` with error message if the store fails
#[tauri::command]
pub async fn is_favorite(state: State<'_, MovieAppState>, movie_id: MovieId) -> Result<bool, String> {
    state
        .favorites()
        .is_favorite(movie_id)
        .await
        .map_err(|e| e.to_string())
}

/// Add a movie to the favorites.
///
/// # Returns
/// * `Err(String)` with error message if the store fails
#[tauri::command]
pub async fn add_favorite(state: State<'_, MovieAppState>, movie: Movie) -> Result<(), String> {
    state.favorites().add(movie).await.map_err(|e| e.to_string())
}

/// Remove a movie from the favorites.
///
/// # Arguments
/// * `movie_id` - TMDB ID of the movie
///
/// # Returns
/// * `Err(String)` with error message if the store fails
#[tauri::command]
pub async fn remove_favorite(state: State<'_, MovieAppState>, movie_id: MovieId) -> Result<(), String> {
    state
        .favorites()
        .remove(movie_id)
        .await
        .map_err(|e| e.to_string())
}

/// Add a movie to the favorites or remove it.
///
/// # Returns
/// * `Ok(bool)` with the favorite flag afterwards
/// * `Err(String)` with error message if the store fails
#[tauri::command]
pub async fn toggle_favorite(state: State<'_, MovieAppState>, movie: Movie) -> Result<bool, String> {
    state.favorites().toggle(movie).await.map_err(|e| e.to_string())
}

/// Get all favorites ordered by id.
#[tauri::command]
pub async fn get_favorites(state: State<'_, MovieAppState>) -> Result<Vec<Movie>, String> {
    state.favorites().get_all().await.map_err(|e| e.to_string())
}
