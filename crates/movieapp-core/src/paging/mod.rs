//! Incremental paged loading
//!
//! This module contains the paging pipeline for remote listings:
//! - `source`: one page per call, neighbour keys and refresh keys
//! - `engine`: in-flight tracking, retry, invalidation, snapshots
//! - `merge`: de-duplicating concatenation of loaded pages
//! - `state`: load states and the loaded-page window

pub mod engine;
pub mod merge;
pub mod source;
pub mod state;

// Re-export main paging types
pub use engine::{PagingConfig, PagingEngine, PagingSnapshot, DEFAULT_PAGE_SIZE};
pub use merge::merge_pages;
pub use source::{
    page_keys, refresh_key_for, CategoryPageSource, LoadParams, LoadResult, PageSource,
    FIRST_PAGE,
};
pub use state::{LoadDirection, LoadState, LoadStates, LoadedPage, PageKey, PagingState};
