//! Fallback engine: the whole collection as one JSON list under a fixed key.
//!
//! Each operation reads the list, changes it, and writes it back. There is no
//! atomicity across entries; this path only exists so the camera keeps
//! working when the primary engine is gone.

use std::fs;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use super::backend::{sort_newest_first, Backend};
use super::entity::Entity;
use super::error::StoreError;

pub struct JsonListBackend<E> {
    path: PathBuf,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> JsonListBackend<E> {
    /// Store the list at `<dir>/<FALLBACK_KEY>.json`.
    /// The directory is created on first write.
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(format!("{}.json", E::FALLBACK_KEY)),
            _entity: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where an unreadable list is moved before it can be overwritten.
    pub fn quarantine_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".corrupt");
        PathBuf::from(name)
    }

    /// A missing file reads as an empty list. A corrupt one is moved to
    /// `quarantine_path` first, so the next write cannot destroy it.
    fn load(&self) -> Result<Vec<E>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(entities) => Ok(entities),
                Err(e) => {
                    let aside = self.quarantine_path();
                    fs::rename(&self.path, &aside)?;
                    log::warn!(
                        "Corrupt fallback list {} moved to {}: {}",
                        self.path.display(),
                        aside.display(),
                        e
                    );
                    Ok(Vec::new())
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, entities: &[E]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_vec(entities)?)?;
        Ok(())
    }
}

impl<E: Entity> Backend<E> for JsonListBackend<E> {
    fn name(&self) -> &'static str {
        "json-fallback"
    }

    fn put(&mut self, entity: &E) -> Result<(), StoreError> {
        let mut entities = self.load()?;
        if entities.iter().any(|e| e.id() == entity.id()) {
            return Err(StoreError::DuplicateId(entity.id()));
        }
        entities.push(entity.clone());
        self.save(&entities)
    }

    fn get_all(&mut self) -> Result<Vec<E>, StoreError> {
        let mut entities = self.load()?;
        sort_newest_first(&mut entities);
        Ok(entities)
    }

    fn delete(&mut self, id: u64) -> Result<(), StoreError> {
        let mut entities = self.load()?;
        let index = entities
            .iter()
            .position(|e| e.id() == id)
            .ok_or(StoreError::NotFound(id))?;
        entities.remove(index);
        self.save(&entities)
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn count(&mut self) -> Result<usize, StoreError> {
        Ok(self.load()?.len())
    }
}
