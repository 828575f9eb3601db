//! The process-wide store handle.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use super::backend::Backend;
use super::collection::{Collection, EngineKind};
use super::entity::{Entity, Photo, Strip};
use super::error::StoreError;
use super::fallback::JsonListBackend;
use super::sqlite::{SqliteBackend, DB_FILE_NAME};

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Hands out time-derived ids that strictly increase within a process,
/// even when several are requested in the same millisecond.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: AtomicU64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> u64 {
        let now = now_millis().max(0) as u64;
        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(last + 1);
            match self
                .last
                .compare_exchange_weak(last, candidate, Ordering::SeqCst, Ordering::Relaxed)
            {
                Ok(_) => return candidate,
                Err(actual) => last = actual,
            }
        }
    }
}

/// Counts and active engines, for status output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSummary {
    pub photos: usize,
    pub strips: usize,
    pub photo_engine: EngineKind,
    pub strip_engine: EngineKind,
}

/// Durable storage for photos and strips.
///
/// Construct once at startup and pass by reference to the capture loop and
/// the strip composer.
pub struct EntityStore {
    photos: Collection<Photo>,
    strips: Collection<Strip>,
    ids: IdGenerator,
    data_dir: Option<PathBuf>,
}

impl EntityStore {
    /// Open the store in `data_dir`, creating the directory if needed.
    ///
    /// If the database cannot be opened, that collection starts on the JSON
    /// fallback instead of failing.
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(data_dir)?;
        let db_path = data_dir.join(DB_FILE_NAME);
        log::info!("Opening store at {}", data_dir.display());

        Ok(Self {
            photos: Collection::new(
                open_primary::<Photo>(&db_path),
                Box::new(JsonListBackend::<Photo>::new(data_dir)),
            ),
            strips: Collection::new(
                open_primary::<Strip>(&db_path),
                Box::new(JsonListBackend::<Strip>::new(data_dir)),
            ),
            ids: IdGenerator::new(),
            data_dir: Some(data_dir.to_path_buf()),
        })
    }

    /// Store with in-memory primary engines and fallback lists in
    /// `fallback_dir`.
    pub fn open_in_memory(fallback_dir: &Path) -> Result<Self, StoreError> {
        Ok(Self::from_collections(
            Collection::new(
                Some(Box::new(SqliteBackend::<Photo>::open_in_memory()?)),
                Box::new(JsonListBackend::<Photo>::new(fallback_dir)),
            ),
            Collection::new(
                Some(Box::new(SqliteBackend::<Strip>::open_in_memory()?)),
                Box::new(JsonListBackend::<Strip>::new(fallback_dir)),
            ),
        ))
    }

    /// Assemble a store from prepared collections.
    pub fn from_collections(photos: Collection<Photo>, strips: Collection<Strip>) -> Self {
        Self {
            photos,
            strips,
            ids: IdGenerator::new(),
            data_dir: None,
        }
    }

    pub fn photos(&self) -> &Collection<Photo> {
        &self.photos
    }

    pub fn strips(&self) -> &Collection<Strip> {
        &self.strips
    }

    /// A fresh time-derived id for a new photo or strip.
    pub fn next_id(&self) -> u64 {
        self.ids.next_id()
    }

    /// Directory the store was opened in, if it is file-backed.
    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    pub async fn summary(&self) -> Result<StoreSummary, StoreError> {
        Ok(StoreSummary {
            photos: self.photos.count().await?,
            strips: self.strips.count().await?,
            photo_engine: self.photos.active_engine().await,
            strip_engine: self.strips.active_engine().await,
        })
    }
}

fn open_primary<E: Entity>(db_path: &Path) -> Option<Box<dyn Backend<E>>> {
    match SqliteBackend::<E>::open(db_path) {
        Ok(backend) => Some(Box::new(backend)),
        Err(e) => {
            log::warn!(
                "Database {} unavailable for {} ({}); using fallback storage",
                db_path.display(),
                E::TABLE,
                e
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ids_strictly_increase() {
        let ids = IdGenerator::new();
        let mut prev = ids.next_id();
        for _ in 0..1000 {
            let next = ids.next_id();
            assert!(next > prev);
            prev = next;
        }
    }

    #[test]
    fn test_ids_are_time_derived() {
        let before = now_millis() as u64;
        let id = IdGenerator::new().next_id();
        assert!(id >= before);
    }

    #[tokio::test]
    async fn test_open_creates_database() {
        let dir = TempDir::new().unwrap();
        let data_dir = dir.path().join("data");
        let store = EntityStore::open(&data_dir).unwrap();
        assert!(data_dir.join(DB_FILE_NAME).exists());
        assert_eq!(store.data_dir(), Some(data_dir.as_path()));

        let summary = store.summary().await.unwrap();
        assert_eq!(summary.photos, 0);
        assert_eq!(summary.strips, 0);
        assert_eq!(summary.photo_engine, EngineKind::Primary);
        assert_eq!(summary.strip_engine, EngineKind::Primary);
    }

    #[tokio::test]
    async fn test_unusable_database_starts_on_fallback() {
        let dir = TempDir::new().unwrap();
        // A directory where the database file should be
        std::fs::create_dir_all(dir.path().join(DB_FILE_NAME)).unwrap();

        let store = EntityStore::open(dir.path()).unwrap();
        assert_eq!(store.photos().active_engine().await, EngineKind::Fallback);

        store
            .photos()
            .put(Photo::new(1, vec![], 1, Default::default()))
            .await
            .unwrap();
        assert_eq!(store.photos().count().await.unwrap(), 1);
    }
}
