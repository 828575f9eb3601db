//! Per-collection engine selection and operation serialization.

use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::backend::Backend;
use super::entity::Entity;
use super::error::StoreError;

/// Which engine a collection is currently using.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    Primary,
    Fallback,
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineKind::Primary => write!(f, "primary"),
            EngineKind::Fallback => write!(f, "fallback"),
        }
    }
}

struct Engines<E: Entity> {
    primary: Option<Box<dyn Backend<E>>>,
    fallback: Box<dyn Backend<E>>,
    active: EngineKind,
}

/// All entities of one kind.
///
/// Operations run one at a time behind an async mutex, so concurrent
/// `put`/`delete`/`clear` calls never interleave inside an engine.
///
/// The first time the primary engine fails, the collection switches to the
/// fallback and stays there for the rest of the session. Data already in the
/// primary is not copied over, and nothing written to the fallback is moved
/// back.
pub struct Collection<E: Entity> {
    engines: Arc<Mutex<Engines<E>>>,
}

impl<E: Entity> Collection<E> {
    /// Build a collection. With no primary engine, the fallback is active
    /// from the start.
    pub fn new(primary: Option<Box<dyn Backend<E>>>, fallback: Box<dyn Backend<E>>) -> Self {
        let active = if primary.is_some() {
            EngineKind::Primary
        } else {
            EngineKind::Fallback
        };

        Self {
            engines: Arc::new(Mutex::new(Engines {
                primary,
                fallback,
                active,
            })),
        }
    }

    pub async fn active_engine(&self) -> EngineKind {
        self.engines.lock().await.active
    }

    /// Run `op` against the active engine, degrading to the fallback if the
    /// primary reports `EngineUnavailable`.
    ///
    /// Engines do blocking file and database IO, so `op` runs on the blocking
    /// pool. The lock travels with it and is released when `op` returns.
    async fn run<T, F>(&self, op_name: &'static str, mut op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnMut(&mut dyn Backend<E>) -> Result<T, StoreError> + Send + 'static,
    {
        let mut guard = Arc::clone(&self.engines).lock_owned().await;

        tokio::task::spawn_blocking(move || {
            let engines = &mut *guard;

            if engines.active == EngineKind::Primary {
                if let Some(primary) = engines.primary.as_mut() {
                    match op(primary.as_mut()) {
                        Err(StoreError::EngineUnavailable(reason)) => {
                            log::warn!(
                                "{} {} failed on {} ({}); switching to {}",
                                E::TABLE,
                                op_name,
                                primary.name(),
                                reason,
                                engines.fallback.name()
                            );
                        }
                        result => return result,
                    }
                }
                engines.active = EngineKind::Fallback;
            }

            op(engines.fallback.as_mut())
        })
        .await
        .map_err(|e| StoreError::TaskFailed(e.to_string()))?
    }

    /// Store a new entity.
    ///
    /// # Errors
    /// * `StoreError::DuplicateId` - If an entity with the same id exists
    pub async fn put(&self, entity: E) -> Result<E, StoreError> {
        let stored = entity.clone();
        self.run("put", move |engine| engine.put(&stored)).await?;
        log::debug!("Stored {} {}", E::TABLE, entity.id());
        Ok(entity)
    }

    /// All entities, newest first. Empty if there are none.
    pub async fn get_all(&self) -> Result<Vec<E>, StoreError> {
        self.run("get_all", |engine| engine.get_all()).await
    }

    /// Look up one entity by id (linear scan of `get_all`).
    ///
    /// # Errors
    /// * `StoreError::NotFound` - If no entity has this id
    pub async fn get(&self, id: u64) -> Result<E, StoreError> {
        self.get_all()
            .await?
            .into_iter()
            .find(|e| e.id() == id)
            .ok_or(StoreError::NotFound(id))
    }

    /// Remove one entity.
    ///
    /// # Errors
    /// * `StoreError::NotFound` - If no entity has this id
    pub async fn delete(&self, id: u64) -> Result<(), StoreError> {
        self.run("delete", move |engine| engine.delete(id)).await?;
        log::info!("Deleted {} {}", E::TABLE, id);
        Ok(())
    }

    /// Remove every entity of this kind.
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.run("clear", |engine| engine.clear()).await?;
        log::info!("Cleared all {}", E::TABLE);
        Ok(())
    }

    pub async fn count(&self) -> Result<usize, StoreError> {
        self.run("count", |engine| engine.count()).await
    }
}
