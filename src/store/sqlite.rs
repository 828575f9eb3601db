//! SQLite primary engine.

use rusqlite::{params, Connection, OptionalExtension};
use std::marker::PhantomData;
use std::path::Path;

use super::backend::Backend;
use super::entity::Entity;
use super::error::StoreError;

/// Database file name inside the data directory.
pub const DB_FILE_NAME: &str = "gameboy_camera.db";

/// Keyed table with a timestamp index, one per entity kind.
///
/// Rows hold the entity's JSON form next to the indexed `id` and `timestamp`
/// columns, so both kinds share one schema.
pub struct SqliteBackend<E> {
    conn: Connection,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> SqliteBackend<E> {
    /// Open (or create) the database at `path` and initialize the schema.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        log::debug!("Opened {} table in {}", E::TABLE, path.display());
        Self::with_connection(conn)
    }

    /// Private in-memory database, for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        let backend = Self {
            conn,
            _entity: PhantomData,
        };
        backend.init_schema()?;
        Ok(backend)
    }

    /// Create the table and its timestamp index if they don't exist.
    fn init_schema(&self) -> Result<(), StoreError> {
        self.conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    id          INTEGER PRIMARY KEY,
                    timestamp   INTEGER NOT NULL,
                    body        TEXT NOT NULL
                )",
                E::TABLE
            ),
            [],
        )?;

        self.conn.execute(
            &format!(
                "CREATE INDEX IF NOT EXISTS idx_{0}_timestamp ON {0}(timestamp DESC)",
                E::TABLE
            ),
            [],
        )?;

        Ok(())
    }
}

/// SQLite keys are signed; ids above `i64::MAX` cannot be stored.
fn sql_id(id: u64) -> Result<i64, StoreError> {
    i64::try_from(id).map_err(|_| StoreError::InvalidEntity(format!("id {} out of range", id)))
}

impl<E: Entity> Backend<E> for SqliteBackend<E> {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn put(&mut self, entity: &E) -> Result<(), StoreError> {
        let id = sql_id(entity.id())?;
        let body = serde_json::to_string(entity)?;

        // Check and insert in one transaction: either the row is fully
        // written or nothing is.
        let tx = self.conn.transaction()?;
        let existing: Option<i64> = tx
            .query_row(
                &format!("SELECT id FROM {} WHERE id = ?1", E::TABLE),
                [id],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Err(StoreError::DuplicateId(entity.id()));
        }

        tx.execute(
            &format!(
                "INSERT INTO {} (id, timestamp, body) VALUES (?1, ?2, ?3)",
                E::TABLE
            ),
            params![id, entity.timestamp(), body],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn get_all(&mut self) -> Result<Vec<E>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT body FROM {} ORDER BY timestamp DESC, id DESC",
            E::TABLE
        ))?;

        let bodies = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        // A row the engine cannot read back is an engine failure
        bodies
            .iter()
            .map(|body| {
                serde_json::from_str(body).map_err(|e| {
                    StoreError::EngineUnavailable(format!("unreadable row in {}: {}", E::TABLE, e))
                })
            })
            .collect()
    }

    fn delete(&mut self, id: u64) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", E::TABLE),
            [sql_id(id)?],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.conn
            .execute(&format!("DELETE FROM {}", E::TABLE), [])?;
        Ok(())
    }

    fn count(&mut self) -> Result<usize, StoreError> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", E::TABLE),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::PaletteMode;
    use crate::store::{Photo, Strip};
    use tempfile::TempDir;

    fn photo(id: u64, ts: i64) -> Photo {
        Photo::new(id, vec![id as u8], ts, PaletteMode::TwoBit)
    }

    #[test]
    fn test_put_and_get_all() {
        let mut db = SqliteBackend::<Photo>::open_in_memory().unwrap();
        let p = photo(1, 100);
        db.put(&p).unwrap();
        assert_eq!(db.get_all().unwrap(), vec![p]);
        assert_eq!(db.count().unwrap(), 1);
    }

    #[test]
    fn test_get_all_newest_first() {
        let mut db = SqliteBackend::<Photo>::open_in_memory().unwrap();
        db.put(&photo(1, 100)).unwrap();
        db.put(&photo(2, 300)).unwrap();
        db.put(&photo(3, 200)).unwrap();
        let stamps: Vec<i64> = db.get_all().unwrap().iter().map(|p| p.captured_at).collect();
        assert_eq!(stamps, vec![300, 200, 100]);
    }

    #[test]
    fn test_duplicate_put_leaves_original() {
        let mut db = SqliteBackend::<Photo>::open_in_memory().unwrap();
        db.put(&photo(1, 100)).unwrap();
        let dup = Photo::new(1, vec![9, 9], 500, PaletteMode::GameBoy);
        assert!(matches!(db.put(&dup), Err(StoreError::DuplicateId(1))));
        assert_eq!(db.get_all().unwrap(), vec![photo(1, 100)]);
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let mut db = SqliteBackend::<Photo>::open_in_memory().unwrap();
        assert!(matches!(db.delete(5), Err(StoreError::NotFound(5))));
        db.put(&photo(5, 1)).unwrap();
        db.delete(5).unwrap();
        assert_eq!(db.count().unwrap(), 0);
    }

    #[test]
    fn test_clear() {
        let mut db = SqliteBackend::<Photo>::open_in_memory().unwrap();
        db.put(&photo(1, 1)).unwrap();
        db.put(&photo(2, 2)).unwrap();
        db.clear().unwrap();
        assert_eq!(db.count().unwrap(), 0);
        assert!(db.get_all().unwrap().is_empty());
    }

    #[test]
    fn test_unreadable_row_is_engine_failure() {
        let mut db = SqliteBackend::<Photo>::open_in_memory().unwrap();
        db.conn
            .execute(
                "INSERT INTO photos (id, timestamp, body) VALUES (1, 1, 'not json')",
                [],
            )
            .unwrap();
        assert!(matches!(
            db.get_all(),
            Err(StoreError::EngineUnavailable(_))
        ));
    }

    #[test]
    fn test_id_out_of_range() {
        let mut db = SqliteBackend::<Photo>::open_in_memory().unwrap();
        assert!(matches!(
            db.put(&photo(u64::MAX, 1)),
            Err(StoreError::InvalidEntity(_))
        ));
    }

    #[test]
    fn test_photos_and_strips_share_a_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DB_FILE_NAME);
        let mut photos = SqliteBackend::<Photo>::open(&path).unwrap();
        let mut strips = SqliteBackend::<Strip>::open(&path).unwrap();

        photos.put(&photo(1, 1)).unwrap();
        strips.put(&Strip::new(1, vec![], 2, vec![1]).unwrap()).unwrap();

        assert_eq!(photos.count().unwrap(), 1);
        assert_eq!(strips.count().unwrap(), 1);
        strips.clear().unwrap();
        assert_eq!(photos.count().unwrap(), 1);
    }

    #[test]
    fn test_data_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DB_FILE_NAME);
        {
            let mut db = SqliteBackend::<Photo>::open(&path).unwrap();
            db.put(&photo(1, 1)).unwrap();
        }
        let mut db = SqliteBackend::<Photo>::open(&path).unwrap();
        assert_eq!(db.get_all().unwrap(), vec![photo(1, 1)]);
    }
}
