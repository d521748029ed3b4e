//! Locally stored favorite movies
//!
//! `FavoritesStore` is the contract the rest of the crate depends on; one
//! instance is created at startup and shared by reference. The JSON file
//! implementation keeps a single named record mapping stringified movie id
//! to movie, serialises every operation behind an async mutex and replaces
//! the file atomically on each write.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info};

use crate::error::{MovieError, Result};
use crate::types::{Movie, MovieId};

/// Name of the record holding the favorites map
pub const FAVORITES_RECORD: &str = "movies_map";

/// Persistent set of favorite movies
#[async_trait]
pub trait FavoritesStore: Send + Sync {
    /// Store `movie`, replacing any stored movie with the same id
    async fn add(&self, movie: Movie) -> Result<()>;

    /// Forget the movie with `movie_id`; absent ids are ignored
    async fn remove(&self, movie_id: MovieId) -> Result<()>;

    async fn is_favorite(&self, movie_id: MovieId) -> Result<bool>;

    /// All favorites ordered by id
    async fn get_all(&self) -> Result<Vec<Movie>>;

    /// Receiver updated after every successful write
    fn observe(&self) -> watch::Receiver<Vec<Movie>>;

    /// Add `movie` if it is not a favorite, remove it otherwise.
    ///
    /// Returns whether the movie is a favorite afterwards.
    async fn toggle(&self, movie: Movie) -> Result<bool> {
        if self.is_favorite(movie.id).await? {
            self.remove(movie.id).await?;
            Ok(false)
        } else {
            self.add(movie).await?;
            Ok(true)
        }
    }
}

type FavoritesMap = BTreeMap<MovieId, Movie>;

/// Contents of the backing file; records other than the favorites map are
/// kept and written back untouched
#[derive(Debug, Default)]
struct StoreFile {
    movies: FavoritesMap,
    other: serde_json::Map<String, serde_json::Value>,
}

/// `FavoritesStore` persisted as a JSON file
///
/// # Example
/// ```no_run
/// use movieapp_core::{FavoritesStore, JsonFavoritesStore, Movie};
///
/// # async fn example() -> Result<(), movieapp_core::MovieError> {
/// let store = JsonFavoritesStore::open("favorites.json")?;
/// store.add(Movie::new(42)).await?;
/// assert!(store.is_favorite(42).await?);
/// # Ok(())
/// # }
/// ```
pub struct JsonFavoritesStore {
    path: PathBuf,
    file: Mutex<StoreFile>,
    favorites: watch::Sender<Vec<Movie>>,
}

impl JsonFavoritesStore {
    /// Open the store at `path`, reading existing favorites.
    ///
    /// A missing or blank file is an empty store.
    ///
    /// # Errors
    /// `MovieError::Storage` if the file cannot be read or is malformed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = match std::fs::read_to_string(&path) {
            Ok(contents) => parse_store(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreFile::default(),
            Err(e) => return Err(storage_error(&path, e)),
        };
        debug!(path = %path.display(), count = file.movies.len(), "favorites loaded");

        let (favorites, _) = watch::channel(file.movies.values().cloned().collect());
        Ok(Self {
            path,
            file: Mutex::new(file),
            favorites,
        })
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `change` to a copy of the map, persist it, then publish it.
    ///
    /// The in-memory map is only replaced once the file write succeeded.
    async fn update<F>(&self, change: F) -> Result<()>
    where
        F: FnOnce(&mut FavoritesMap) + Send,
    {
        let mut file = self.file.lock().await;
        let mut movies = file.movies.clone();
        change(&mut movies);

        let contents = render_store(&movies, &file.other)?;
        write_atomically(&self.path, &contents).await?;

        file.movies = movies;
        self.favorites
            .send_replace(file.movies.values().cloned().collect());
        Ok(())
    }
}

#[async_trait]
impl FavoritesStore for JsonFavoritesStore {
    async fn add(&self, movie: Movie) -> Result<()> {
        let id = movie.id;
        self.update(move |movies| {
            movies.insert(movie.id, movie);
        })
        .await?;
        info!(movie_id = id, "favorite added");
        Ok(())
    }

    async fn remove(&self, movie_id: MovieId) -> Result<()> {
        self.update(move |movies| {
            movies.remove(&movie_id);
        })
        .await?;
        info!(movie_id, "favorite removed");
        Ok(())
    }

    async fn is_favorite(&self, movie_id: MovieId) -> Result<bool> {
        Ok(self.file.lock().await.movies.contains_key(&movie_id))
    }

    async fn get_all(&self) -> Result<Vec<Movie>> {
        Ok(self.file.lock().await.movies.values().cloned().collect())
    }

    fn observe(&self) -> watch::Receiver<Vec<Movie>> {
        self.favorites.subscribe()
    }

    async fn toggle(&self, movie: Movie) -> Result<bool> {
        // Decided and written under one lock acquisition
        let mut now_favorite = false;
        self.update(|movies| {
            if movies.remove(&movie.id).is_none() {
                movies.insert(movie.id, movie);
                now_favorite = true;
            }
        })
        .await?;
        Ok(now_favorite)
    }
}

fn parse_store(contents: &str) -> Result<StoreFile> {
    if contents.trim().is_empty() {
        return Ok(StoreFile::default());
    }

    let mut other: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(contents).map_err(|e| MovieError::Storage(e.to_string()))?;
    let movies = match other.remove(FAVORITES_RECORD) {
        None | Some(serde_json::Value::Null) => FavoritesMap::new(),
        Some(record) => {
            let by_key: BTreeMap<String, Movie> = serde_json::from_value(record)
                .map_err(|e| MovieError::Storage(e.to_string()))?;
            by_key
                .into_iter()
                .map(|(key, movie)| {
                    key.parse::<MovieId>()
                        .map(|id| (id, movie))
                        .map_err(|_| MovieError::Storage(format!("invalid movie id key: {}", key)))
                })
                .collect::<Result<FavoritesMap>>()?
        }
    };

    Ok(StoreFile { movies, other })
}

fn render_store(
    movies: &FavoritesMap,
    other: &serde_json::Map<String, serde_json::Value>,
) -> Result<String> {
    let mut record = serde_json::Map::new();
    for (id, movie) in movies {
        let value = serde_json::to_value(movie).map_err(|e| MovieError::Storage(e.to_string()))?;
        record.insert(id.to_string(), value);
    }

    let mut records = other.clone();
    records.insert(
        FAVORITES_RECORD.to_string(),
        serde_json::Value::Object(record),
    );
    serde_json::to_string_pretty(&records).map_err(|e| MovieError::Storage(e.to_string()))
}

fn storage_error(path: &Path, err: std::io::Error) -> MovieError {
    MovieError::Storage(format!("{}: {}", path.display(), err))
}

/// Write to a sibling temp file and rename it over `path`, so readers see
/// either the old or the new contents.
async fn write_atomically(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| storage_error(parent, e))?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, contents)
        .await
        .map_err(|e| storage_error(&tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| storage_error(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn movie(id: MovieId, title: &str) -> Movie {
        let mut movie = Movie::new(id);
        movie.title = Some(title.to_string());
        movie.vote_average = Some(7.0);
        movie
    }

    fn store_in(dir: &TempDir) -> JsonFavoritesStore {
        JsonFavoritesStore::open(dir.path().join("favorites.json")).unwrap()
    }

    #[tokio::test]
    async fn test_add_then_remove() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.add(movie(42, "Answer")).await.unwrap();
        assert!(store.is_favorite(42).await.unwrap());

        store.remove(42).await.unwrap();
        assert!(!store.is_favorite(42).await.unwrap());
        assert!(store.get_all().await.unwrap().iter().all(|m| m.id != 42));
    }

    #[tokio::test]
    async fn test_remove_absent_is_ok() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.remove(7).await.unwrap();
        assert!(store.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_all_ordered_by_id() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        for id in [100, 9, 42] {
            store.add(movie(id, "m")).await.unwrap();
        }
        let ids: Vec<_> = store.get_all().await.unwrap().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![9, 42, 100]);
    }

    #[tokio::test]
    async fn test_persists_as_named_record() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.add(movie(42, "Answer")).await.unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["movies_map"]["42"]["title"], "Answer");

        let reopened = store_in(&dir);
        assert_eq!(reopened.get_all().await.unwrap(), vec![movie(42, "Answer")]);
    }

    #[tokio::test]
    async fn test_other_records_are_preserved() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("favorites.json");
        std::fs::write(&path, r#"{"theme": "dark", "movies_map": {}}"#).unwrap();

        let store = JsonFavoritesStore::open(&path).unwrap();
        store.add(movie(1, "One")).await.unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["theme"], "dark");
        assert_eq!(json["movies_map"]["1"]["id"], 1);
    }

    #[test]
    fn test_open_missing_and_blank_files() {
        let dir = TempDir::new().unwrap();
        let missing = JsonFavoritesStore::open(dir.path().join("absent.json"));
        assert!(missing.is_ok());

        let blank = dir.path().join("blank.json");
        std::fs::write(&blank, "  ").unwrap();
        assert!(JsonFavoritesStore::open(&blank).is_ok());
    }

    #[test]
    fn test_open_corrupted_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("favorites.json");
        std::fs::write(&path, "{\"movies_map\": [1, 2").unwrap();

        let result = JsonFavoritesStore::open(&path);
        assert!(matches!(result, Err(MovieError::Storage(_))));
    }

    #[tokio::test]
    async fn test_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let store = JsonFavoritesStore::open(dir.path().join("nested/app/favorites.json")).unwrap();
        store.add(movie(5, "Five")).await.unwrap();
        assert!(store.path().exists());
    }

    #[tokio::test]
    async fn test_toggle() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert!(store.toggle(movie(3, "Three")).await.unwrap());
        assert!(store.is_favorite(3).await.unwrap());
        assert!(!store.toggle(movie(3, "Three")).await.unwrap());
        assert!(!store.is_favorite(3).await.unwrap());
    }

    #[tokio::test]
    async fn test_observe_sees_writes() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let mut rx = store.observe();
        assert!(rx.borrow_and_update().is_empty());

        store.add(movie(8, "Eight")).await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_add_remove_stays_consistent() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(store_in(&dir));
        let first = movie(42, "first");
        let second = movie(42, "second");

        let mut handles = Vec::new();
        for i in 0..32 {
            let store = store.clone();
            let candidate = if i % 2 == 0 { first.clone() } else { second.clone() };
            handles.push(tokio::spawn(async move {
                if i % 3 == 0 {
                    store.remove(42).await
                } else {
                    store.add(candidate).await
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let in_memory = store.get_all().await.unwrap();
        let reopened = store_in(&dir).get_all().await.unwrap();
        assert_eq!(in_memory, reopened);
        match in_memory.as_slice() {
            [] => {}
            [m] => assert!(*m == first || *m == second),
            other => panic!("unexpected favorites: {:?}", other),
        }
    }
}
