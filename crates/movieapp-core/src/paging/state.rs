//! Load states and the loaded-page window

use serde::Serialize;

use crate::error::MovieError;
use crate::types::Movie;

/// Page number used as the paging cursor
pub type PageKey = u32;

/// Direction of a page load relative to what is already loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadDirection {
    /// Initial load or reload after invalidation
    Refresh,
    /// Page before the first loaded page
    Prepend,
    /// Page after the last loaded page
    Append,
}

impl LoadDirection {
    /// All directions, in the order loads are retried
    pub const ALL: [LoadDirection; 3] = [
        LoadDirection::Refresh,
        LoadDirection::Prepend,
        LoadDirection::Append,
    ];
}

/// Status of one paging direction
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoadState {
    /// A load is in flight
    Loading,
    /// The last load failed; loading in this direction is halted until retry
    Error {
        /// Failure cause
        error: MovieError,
    },
    /// Idle
    NotLoading {
        /// No further page exists in this direction
        end_of_pagination_reached: bool,
    },
}

impl LoadState {
    /// Idle, more pages may follow
    pub const IDLE: LoadState = LoadState::NotLoading {
        end_of_pagination_reached: false,
    };

    /// Idle at a pagination boundary
    pub const END: LoadState = LoadState::NotLoading {
        end_of_pagination_reached: true,
    };

    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn error(&self) -> Option<&MovieError> {
        match self {
            LoadState::Error { error } => Some(error),
            _ => None,
        }
    }

    pub fn end_of_pagination_reached(&self) -> bool {
        matches!(
            self,
            LoadState::NotLoading {
                end_of_pagination_reached: true
            }
        )
    }
}

impl Default for LoadState {
    fn default() -> Self {
        LoadState::IDLE
    }
}

/// One `LoadState` per direction
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct LoadStates {
    pub refresh: LoadState,
    pub prepend: LoadState,
    pub append: LoadState,
}

impl LoadStates {
    pub fn get(&self, direction: LoadDirection) -> &LoadState {
        match direction {
            LoadDirection::Refresh => &self.refresh,
            LoadDirection::Prepend => &self.prepend,
            LoadDirection::Append => &self.append,
        }
    }

    pub fn set(&mut self, direction: LoadDirection, state: LoadState) {
        match direction {
            LoadDirection::Refresh => self.refresh = state,
            LoadDirection::Prepend => self.prepend = state,
            LoadDirection::Append => self.append = state,
        }
    }

    /// States after everything loaded at once with no neighbours
    pub fn complete() -> Self {
        Self {
            refresh: LoadState::IDLE,
            prepend: LoadState::END,
            append: LoadState::END,
        }
    }

    /// First error across directions, refresh first
    pub fn first_error(&self) -> Option<(LoadDirection, &MovieError)> {
        LoadDirection::ALL
            .into_iter()
            .find_map(|direction| self.get(direction).error().map(|e| (direction, e)))
    }
}

/// A page as held by the paging engine
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedPage {
    /// Items in source order
    pub items: Vec<Movie>,
    /// Key of the previous page, `None` at the start of the sequence
    pub prev_key: Option<PageKey>,
    /// Key of the next page, `None` at the end of the sequence
    pub next_key: Option<PageKey>,
}

impl LoadedPage {
    pub fn new(items: Vec<Movie>, prev_key: Option<PageKey>, next_key: Option<PageKey>) -> Self {
        Self {
            items,
            prev_key,
            next_key,
        }
    }
}

/// Loaded pages plus the item position nearest the user's viewport.
///
/// Positions count every loaded item across pages in load order, repeated
/// ids included.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PagingState {
    pub pages: Vec<LoadedPage>,
    pub anchor_position: Option<usize>,
}

impl PagingState {
    pub fn new(pages: Vec<LoadedPage>, anchor_position: Option<usize>) -> Self {
        Self {
            pages,
            anchor_position,
        }
    }

    /// Page holding `position`.
    ///
    /// Positions past the loaded range resolve to the last page; `None` only
    /// when nothing is loaded.
    pub fn closest_page_to_position(&self, position: usize) -> Option<&LoadedPage> {
        let mut start = 0;
        for page in &self.pages {
            let end = start + page.items.len();
            if position < end {
                return Some(page);
            }
            start = end;
        }
        self.pages.last()
    }

    /// Total item count before de-duplication
    pub fn item_count(&self) -> usize {
        self.pages.iter().map(|p| p.items.len()).sum()
    }
}
