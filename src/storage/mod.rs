//! Graph store backends.
//!
//! This module provides implementations of the [`GraphStore`] trait for
//! persisting and querying the normalized knowledge graph.
//!
//! # Available Backends
//!
//! | Backend | Use Case | Features |
//! |---------|----------|----------|
//! | [`Neo4jStore`] | Default; production | Cypher, batched transactions |
//! | [`MemoryStore`] | Testing | Fast, no persistence |
//!
//! # Example
//!
//! ```rust,ignore
//! use suhoc::storage::{GraphStore, MemoryStore};
//!
//! let store = MemoryStore::new();
//! store.clear()?;
//! store.write_entities(&snapshot.entities)?;
//! store.write_relationships(&snapshot.relationships)?;
//! let stats = store.stats()?;
//! ```

pub mod cypher;
mod memory;
mod neo4j;

pub use memory::MemoryStore;
pub use neo4j::Neo4jStore;

use crate::Result;
use crate::models::{Entity, EntityId, Relationship};

/// Node and relationship counts for a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of nodes.
    pub entities: usize,
    /// Number of relationships.
    pub relationships: usize,
}

/// One edge incident to a focus entity, together with the entity at the
/// other end. The relationship keeps its stored direction.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    /// The connecting relationship.
    pub relationship: Relationship,
    /// The entity at the other end of the edge.
    pub entity: Entity,
}

/// Trait for graph store backends.
///
/// Stores hold the loaded knowledge graph and answer the traversal
/// queries used during retrieval.
///
/// # Implementor Notes
///
/// - Methods use `&self` to enable sharing; use interior mutability
///   (or a driver's own pooling) for mutable state
/// - Write methods treat the given slice as one batch: either every
///   item is written or the batch fails as a whole
/// - Read-back entities carry at least id, name, and labels; stored
///   scalar properties may be omitted by backends that cannot
///   round-trip them cheaply
pub trait GraphStore: Send + Sync {
    // ========================================================================
    // Connectivity and lifecycle
    // ========================================================================

    /// Verifies the store answers queries.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable.
    fn ping(&self) -> Result<()>;

    /// Removes every node and relationship.
    ///
    /// # Errors
    ///
    /// Returns an error if the deletion fails.
    fn clear(&self) -> Result<()>;

    // ========================================================================
    // Batched writes
    // ========================================================================

    /// Writes a batch of entities.
    ///
    /// # Errors
    ///
    /// Returns an error if any write in the batch fails; the batch is
    /// not partially applied.
    fn write_entities(&self, entities: &[Entity]) -> Result<()>;

    /// Writes a batch of relationships.
    ///
    /// Endpoints are matched by entity id, so entities must be written
    /// first.
    ///
    /// # Errors
    ///
    /// Returns an error if any write in the batch fails; the batch is
    /// not partially applied.
    fn write_relationships(&self, relationships: &[Relationship]) -> Result<()>;

    // ========================================================================
    // Queries
    // ========================================================================

    /// Counts nodes and relationships.
    ///
    /// # Errors
    ///
    /// Returns an error if the count queries fail.
    fn stats(&self) -> Result<StoreStats>;

    /// Finds entities whose lowercased name contains the lowercased
    /// needle, up to `limit`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn find_entities_by_name(&self, needle: &str, limit: usize) -> Result<Vec<Entity>>;

    /// Returns the edges incident to an entity, each with the entity at
    /// the other end.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn neighbors(&self, id: &EntityId) -> Result<Vec<Neighbor>>;
}
