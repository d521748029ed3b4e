//! Merging loaded pages into one list

use std::collections::{HashMap, HashSet};

use super::state::LoadedPage;
use crate::types::{Movie, MovieId};

/// Concatenate pages in order, keeping each movie id once.
///
/// A movie keeps the position where its id first appeared, while its
/// content is taken from the last page that listed it. Lists that shift
/// between requests (e.g. "now playing") can repeat a movie on two pages.
pub fn merge_pages(pages: &[LoadedPage]) -> Vec<Movie> {
    let capacity = pages.iter().map(|p| p.items.len()).sum();
    let mut merged: Vec<Movie> = Vec::with_capacity(capacity);
    let mut positions: HashMap<MovieId, usize> = HashMap::with_capacity(capacity);

    for movie in pages.iter().flat_map(|p| p.items.iter()) {
        match positions.get(&movie.id) {
            Some(&index) => merged[index] = movie.clone(),
            None => {
                positions.insert(movie.id, merged.len());
                merged.push(movie.clone());
            }
        }
    }

    merged
}

/// Convert an index into the merged list to a position counting every
/// loaded item, so it can be resolved against page boundaries.
///
/// Indexes past the merged list map past the last loaded item.
pub fn raw_position(pages: &[LoadedPage], merged_index: usize) -> usize {
    let mut seen: HashSet<MovieId> = HashSet::new();
    let mut raw = 0;
    for movie in pages.iter().flat_map(|p| p.items.iter()) {
        if seen.insert(movie.id) && seen.len() == merged_index + 1 {
            return raw;
        }
        raw += 1;
    }
    raw
}
