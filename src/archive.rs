//! Photo export and import.
//!
//! The archive is a JSON document `{version, exportDate, photos}` in the same
//! shape the browser camera exports, so archives move freely between the two.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::{EntityStore, Photo, StoreError};

/// Version string written into new archives.
pub const ARCHIVE_VERSION: &str = "1.0.0";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Malformed import: {0}")]
    MalformedImport(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub version: String,
    pub export_date: DateTime<Utc>,
    pub photos: Vec<Photo>,
}

/// Snapshot every stored photo, newest first.
pub async fn export_photos(store: &EntityStore) -> Result<ExportDocument, ArchiveError> {
    let photos = store.photos().get_all().await?;
    Ok(ExportDocument {
        version: ARCHIVE_VERSION.to_string(),
        export_date: Utc::now(),
        photos,
    })
}

/// Export every stored photo to `path` as pretty-printed JSON.
///
/// Returns the number of photos written.
pub async fn export_to_file(store: &EntityStore, path: &Path) -> Result<usize, ArchiveError> {
    let document = export_photos(store).await?;
    let json = serde_json::to_string_pretty(&document)?;
    tokio::fs::write(path, json).await?;

    log::info!(
        "Exported {} photos to {}",
        document.photos.len(),
        path.display()
    );
    Ok(document.photos.len())
}

/// Import the photos in an archive document.
///
/// The whole document is validated before anything is written: it must have
/// a `photos` array and every entry must be a well-formed photo. Photos are
/// then stored one at a time. A duplicate id stops the import with
/// `StoreError::DuplicateId`; photos stored before it stay stored.
///
/// Returns the number of photos stored.
///
/// # Errors
/// * `ArchiveError::MalformedImport` - If `photos` is missing, not an array, or holds an invalid entry
/// * `ArchiveError::Json` - If `text` is not JSON at all
/// * `ArchiveError::Store` - If a photo cannot be stored
pub async fn import_document(store: &EntityStore, text: &str) -> Result<usize, ArchiveError> {
    let document: serde_json::Value = serde_json::from_str(text)?;

    let entries = document
        .get("photos")
        .ok_or_else(|| ArchiveError::MalformedImport("missing \"photos\" field".to_string()))?
        .as_array()
        .ok_or_else(|| ArchiveError::MalformedImport("\"photos\" is not an array".to_string()))?;

    let photos = entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            Photo::deserialize(entry).map_err(|e| {
                ArchiveError::MalformedImport(format!("photo at index {}: {}", index, e))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let total = photos.len();
    for photo in photos {
        store.photos().put(photo).await?;
    }

    log::info!("Imported {} photos", total);
    Ok(total)
}

/// Read an archive from `path` and import it.
pub async fn import_from_file(store: &EntityStore, path: &Path) -> Result<usize, ArchiveError> {
    let text = tokio::fs::read_to_string(path).await?;
    import_document(store, &text).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::PaletteMode;
    use serde_json::json;
    use tempfile::TempDir;

    fn photo(id: u64, filter: PaletteMode) -> Photo {
        Photo::new(id, vec![0x89, b'P', b'N', b'G'], id as i64, filter)
    }

    #[tokio::test]
    async fn test_export_shape() {
        let dir = TempDir::new().unwrap();
        let store = EntityStore::open_in_memory(dir.path()).unwrap();
        store.photos().put(photo(1, PaletteMode::GameBoy)).await.unwrap();

        let document = export_photos(&store).await.unwrap();
        let value = serde_json::to_value(&document).unwrap();

        assert_eq!(value["version"], "1.0.0");
        assert!(value["exportDate"].is_string());
        assert_eq!(value["photos"][0]["id"], 1);
        assert_eq!(value["photos"][0]["filter"], "gameboy");
        assert!(value["photos"][0]["dataURL"]
            .as_str()
            .unwrap()
            .starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_missing_photos_field_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let store = EntityStore::open_in_memory(dir.path()).unwrap();

        let result = import_document(&store, r#"{"version": "1.0.0"}"#).await;
        assert!(matches!(result, Err(ArchiveError::MalformedImport(_))));

        let result = import_document(&store, r#"{"photos": {"id": 1}}"#).await;
        assert!(matches!(result, Err(ArchiveError::MalformedImport(_))));

        assert_eq!(store.photos().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_bad_entry_rejected_before_writes() {
        let dir = TempDir::new().unwrap();
        let store = EntityStore::open_in_memory(dir.path()).unwrap();

        let good = serde_json::to_value(photo(1, PaletteMode::TwoBit)).unwrap();
        let text = json!({ "photos": [good, { "id": "nope" }] }).to_string();

        let result = import_document(&store, &text).await;
        assert!(matches!(result, Err(ArchiveError::MalformedImport(_))));
        assert_eq!(store.photos().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_stops_without_rollback() {
        let dir = TempDir::new().unwrap();
        let store = EntityStore::open_in_memory(dir.path()).unwrap();
        store.photos().put(photo(2, PaletteMode::TwoBit)).await.unwrap();

        let photos: Vec<_> = [1, 2, 3]
            .into_iter()
            .map(|id| serde_json::to_value(photo(id, PaletteMode::TwoBit)).unwrap())
            .collect();
        let text = json!({ "version": "1.0.0", "photos": photos }).to_string();

        let result = import_document(&store, &text).await;
        assert!(matches!(
            result,
            Err(ArchiveError::Store(StoreError::DuplicateId(2)))
        ));

        // Photo 1 was written before the duplicate and stays
        let ids: Vec<u64> = store
            .photos()
            .get_all()
            .await
            .unwrap()
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_file_roundtrip_between_stores() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("export.json");

        let source = EntityStore::open_in_memory(&dir.path().join("a")).unwrap();
        source.photos().put(photo(1, PaletteMode::None)).await.unwrap();
        source.photos().put(photo(2, PaletteMode::GameBoy)).await.unwrap();
        assert_eq!(export_to_file(&source, &path).await.unwrap(), 2);

        let target = EntityStore::open_in_memory(&dir.path().join("b")).unwrap();
        assert_eq!(import_from_file(&target, &path).await.unwrap(), 2);
        assert_eq!(
            target.photos().get_all().await.unwrap(),
            source.photos().get_all().await.unwrap()
        );
    }
}
