//! Durable storage for photos and strips.
//!
//! Each entity kind lives in its own [`Collection`], backed by a SQLite table
//! with a timestamp index. If SQLite fails, the collection switches to a JSON
//! list file for the rest of the session.

mod backend;
mod collection;
mod entity;
mod error;
mod fallback;
mod handle;
mod sqlite;

pub use backend::Backend;
pub use collection::{Collection, EngineKind};
pub use entity::{Entity, Photo, Strip, MAX_STRIP_PHOTOS};
pub use error::StoreError;
pub use fallback::JsonListBackend;
pub use handle::{now_millis, EntityStore, IdGenerator, StoreSummary};
pub use sqlite::{SqliteBackend, DB_FILE_NAME};
