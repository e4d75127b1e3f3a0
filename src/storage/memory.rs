//! In-memory graph store for tests.

use crate::models::{Entity, EntityId, Relationship};
use crate::storage::{GraphStore, Neighbor, StoreStats};
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory [`GraphStore`] backed by a `RwLock`.
///
/// Unlike the Neo4j backend, relationship writes are strict: an edge
/// whose endpoint has not been written yet fails the whole batch. That
/// makes write-ordering mistakes visible in tests instead of silently
/// dropping edges.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

#[derive(Debug, Default)]
struct State {
    entities: BTreeMap<EntityId, Entity>,
    relationships: Vec<Relationship>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every stored entity, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn all_entities(&self) -> Result<Vec<Entity>> {
        Ok(self.read_state()?.entities.values().cloned().collect())
    }

    /// Returns every stored relationship in write order.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn all_relationships(&self) -> Result<Vec<Relationship>> {
        Ok(self.read_state()?.relationships.clone())
    }

    fn read_state(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state.read().map_err(|_| Error::OperationFailed {
            operation: "read memory store".to_string(),
            cause: "lock poisoned".to_string(),
        })
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state.write().map_err(|_| Error::OperationFailed {
            operation: "write memory store".to_string(),
            cause: "lock poisoned".to_string(),
        })
    }
}

impl GraphStore for MemoryStore {
    fn ping(&self) -> Result<()> {
        self.read_state().map(|_| ())
    }

    fn clear(&self) -> Result<()> {
        let mut state = self.write_state()?;
        state.entities.clear();
        state.relationships.clear();
        Ok(())
    }

    fn write_entities(&self, entities: &[Entity]) -> Result<()> {
        let mut state = self.write_state()?;
        for entity in entities {
            state.entities.insert(entity.id.clone(), entity.clone());
        }
        Ok(())
    }

    fn write_relationships(&self, relationships: &[Relationship]) -> Result<()> {
        let mut state = self.write_state()?;
        // Validate the whole batch before applying any of it
        for relationship in relationships {
            for endpoint in [&relationship.source, &relationship.target] {
                if !state.entities.contains_key(endpoint) {
                    return Err(Error::OperationFailed {
                        operation: "write relationship".to_string(),
                        cause: format!("endpoint {endpoint} not found"),
                    });
                }
            }
        }
        state.relationships.extend_from_slice(relationships);
        Ok(())
    }

    fn stats(&self) -> Result<StoreStats> {
        let state = self.read_state()?;
        Ok(StoreStats {
            entities: state.entities.len(),
            relationships: state.relationships.len(),
        })
    }

    fn find_entities_by_name(&self, needle: &str, limit: usize) -> Result<Vec<Entity>> {
        let needle = needle.to_lowercase();
        let state = self.read_state()?;
        Ok(state
            .entities
            .values()
            .filter(|entity| entity.name.to_lowercase().contains(&needle))
            .take(limit)
            .cloned()
            .collect())
    }

    fn neighbors(&self, id: &EntityId) -> Result<Vec<Neighbor>> {
        let state = self.read_state()?;
        let mut neighbors = Vec::new();
        for relationship in &state.relationships {
            let other = if &relationship.source == id {
                &relationship.target
            } else if &relationship.target == id {
                &relationship.source
            } else {
                continue;
            };
            if let Some(entity) = state.entities.get(other) {
                neighbors.push(Neighbor {
                    relationship: relationship.clone(),
                    entity: entity.clone(),
                });
            }
        }
        Ok(neighbors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entities() -> Vec<Entity> {
        vec![
            Entity::new("Person", "Trần Hưng Đạo"),
            Entity::new("Event", "trận Bạch Đằng"),
        ]
    }

    #[test]
    fn test_write_and_count() {
        let store = MemoryStore::new();
        let entities = sample_entities();
        store.write_entities(&entities).expect("write entities");
        let rel = Relationship::new(entities[0].id.clone(), entities[1].id.clone(), "chỉ huy");
        store.write_relationships(&[rel]).expect("write relationships");

        let stats = store.stats().expect("stats");
        assert_eq!(stats.entities, 2);
        assert_eq!(stats.relationships, 1);
    }

    #[test]
    fn test_relationship_before_entity_fails_whole_batch() {
        let store = MemoryStore::new();
        let entities = sample_entities();
        let rel = Relationship::new(entities[0].id.clone(), entities[1].id.clone(), "chỉ huy");

        let err = store.write_relationships(&[rel]).expect_err("must fail");
        assert!(err.to_string().contains("not found"));
        assert_eq!(store.stats().expect("stats").relationships, 0);
    }

    #[test]
    fn test_clear_removes_everything() {
        let store = MemoryStore::new();
        store.write_entities(&sample_entities()).expect("write");
        store.clear().expect("clear");
        assert_eq!(store.stats().expect("stats"), StoreStats::default());
    }

    #[test]
    fn test_find_entities_by_name_is_case_insensitive() {
        let store = MemoryStore::new();
        store.write_entities(&sample_entities()).expect("write");

        let found = store
            .find_entities_by_name("bạch đằng", 10)
            .expect("find");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "trận Bạch Đằng");
    }

    #[test]
    fn test_neighbors_includes_both_directions() {
        let store = MemoryStore::new();
        let entities = sample_entities();
        store.write_entities(&entities).expect("write");
        let rel = Relationship::new(entities[0].id.clone(), entities[1].id.clone(), "chỉ huy");
        store.write_relationships(&[rel]).expect("write");

        let out = store.neighbors(&entities[0].id).expect("neighbors");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].entity.name, "trận Bạch Đằng");

        let incoming = store.neighbors(&entities[1].id).expect("neighbors");
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].entity.name, "Trần Hưng Đạo");
    }
}
