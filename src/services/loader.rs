//! Snapshot loading into a graph store.
//!
//! The loader owns the write protocol: clear the store, write every
//! entity, then write every relationship. Writes go out in fixed-size
//! batches; the first failing batch aborts the load with the stage,
//! batch index, and item range in the error. Because a load always
//! starts from a cleared store, reloading the same snapshot reproduces
//! the same graph.

use crate::models::GraphSnapshot;
use crate::storage::GraphStore;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Default number of items per write batch.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Counters describing one completed load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    /// Entities written.
    pub entities: usize,
    /// Relationships written.
    pub relationships: usize,
    /// Entity batches committed.
    pub entity_batches: usize,
    /// Relationship batches committed.
    pub relationship_batches: usize,
    /// Wall-clock duration of the load in milliseconds.
    pub duration_ms: u64,
}

/// Loads normalized snapshots into a [`GraphStore`].
#[derive(Debug)]
pub struct GraphLoader<S: GraphStore> {
    store: S,
    batch_size: usize,
}

impl<S: GraphStore> GraphLoader<S> {
    /// Creates a loader with the default batch size.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Sets the number of items per write batch.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Borrows the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Consumes the loader, returning the store.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Clears the store and writes the snapshot, entities first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a zero batch size,
    /// [`Error::BatchWrite`] when a batch fails (the load stops there),
    /// or the store's own error when clearing fails.
    pub fn load(&self, snapshot: &GraphSnapshot) -> Result<LoadReport> {
        if self.batch_size == 0 {
            return Err(Error::InvalidInput(
                "batch size must be at least 1".to_string(),
            ));
        }

        let started = Instant::now();
        self.store.clear()?;

        let mut report = LoadReport::default();
        for (batch, items) in snapshot.entities.chunks(self.batch_size).enumerate() {
            self.store
                .write_entities(items)
                .map_err(|e| self.batch_error("entities", batch, items.len(), &e))?;
            report.entities += items.len();
            report.entity_batches += 1;
            debug!(batch, items = items.len(), "entity batch written");
            metrics::counter!("load_entities_written_total").increment(items.len() as u64);
        }

        for (batch, items) in snapshot.relationships.chunks(self.batch_size).enumerate() {
            self.store
                .write_relationships(items)
                .map_err(|e| self.batch_error("relationships", batch, items.len(), &e))?;
            report.relationships += items.len();
            report.relationship_batches += 1;
            debug!(batch, items = items.len(), "relationship batch written");
            metrics::counter!("load_relationships_written_total").increment(items.len() as u64);
        }

        report.duration_ms = duration_ms(started);
        metrics::histogram!("load_duration_ms").record(started.elapsed().as_secs_f64() * 1000.0);
        info!(
            entities = report.entities,
            relationships = report.relationships,
            entity_batches = report.entity_batches,
            relationship_batches = report.relationship_batches,
            duration_ms = report.duration_ms,
            "load complete"
        );
        Ok(report)
    }

    fn batch_error(&self, stage: &str, batch: usize, batch_len: usize, cause: &Error) -> Error {
        let start = batch * self.batch_size;
        let end = start + batch_len.saturating_sub(1);
        Error::BatchWrite {
            stage: stage.to_string(),
            batch,
            range: format!("{start}-{end}"),
            cause: cause.to_string(),
        }
    }
}

fn duration_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
