//! Storage strategy shared by the primary engine and the fallback.

use super::entity::Entity;
use super::error::StoreError;

/// One storage engine for one entity kind.
///
/// Implementations report engine failures as [`StoreError::EngineUnavailable`];
/// contract violations (`DuplicateId`, `NotFound`) are reported as such and
/// never trigger a switch to the fallback.
pub trait Backend<E: Entity>: Send {
    /// Short engine name for logs and status output.
    fn name(&self) -> &'static str;

    /// Store a new entity. Fails with `DuplicateId` if the id is taken.
    fn put(&mut self, entity: &E) -> Result<(), StoreError>;

    /// All entities, newest timestamp first.
    fn get_all(&mut self) -> Result<Vec<E>, StoreError>;

    /// Remove one entity. Fails with `NotFound` if the id is absent.
    fn delete(&mut self, id: u64) -> Result<(), StoreError>;

    /// Remove every entity.
    fn clear(&mut self) -> Result<(), StoreError>;

    fn count(&mut self) -> Result<usize, StoreError>;
}

/// Sort newest first. Ties keep the higher id first so ordering is stable
/// across engines.
pub(crate) fn sort_newest_first<E: Entity>(entities: &mut [E]) {
    entities.sort_by(|a, b| {
        b.timestamp()
            .cmp(&a.timestamp())
            .then_with(|| b.id().cmp(&a.id()))
    });
}
