//! Neo4j graph store.
//!
//! Persists the normalized graph over bolt. Works with both local Neo4j
//! (`bolt://localhost:7687`) and managed AuraDB (`neo4j+s://...`).
//!
//! Write shape follows the loader protocol: entities are `CREATE`d with
//! their sanitized labels and `SET` properties, relationships `MATCH`
//! both endpoints by `id` and `CREATE` the typed edge. Labels, property
//! keys, and relationship types cannot be query parameters, so they are
//! sanitized and backtick-quoted; all values travel as parameters.
//!
//! A relationship whose endpoint id matches nothing creates no edge and
//! no error; the loader never produces such an edge because the
//! normalizer drops dangling references first.

use crate::config::StoreConfig;
use crate::models::{Entity, EntityId, PropertyMap, PropertyValue, Relationship};
use crate::storage::cypher::{quote, rel_type_safe, sanitize_identifier};
use crate::storage::{GraphStore, Neighbor, StoreStats};
use crate::{Error, Result};
use neo4rs::{BoltType, ConfigBuilder, Graph, Query, query};
use secrecy::ExposeSecret;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Neo4j-backed [`GraphStore`].
///
/// The driver is async; this store owns a current-thread Tokio runtime
/// and drives every call to completion synchronously. Do not call its
/// methods from inside another Tokio runtime.
pub struct Neo4jStore {
    graph: Graph,
    runtime: tokio::runtime::Runtime,
    uri: String,
}

impl std::fmt::Debug for Neo4jStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Neo4jStore").field("uri", &self.uri).finish()
    }
}

impl Neo4jStore {
    /// Connects to the store and verifies it answers queries.
    ///
    /// Retries up to `reconnect_attempts` times with a linear backoff
    /// before giving up.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreUnavailable`] when every attempt fails.
    pub fn connect(config: &StoreConfig, reconnect_attempts: u32) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::OperationFailed {
                operation: "build store runtime".to_string(),
                cause: e.to_string(),
            })?;

        let attempts = reconnect_attempts.max(1);
        let mut last_cause = String::new();
        for attempt in 1..=attempts {
            match runtime.block_on(try_connect(config)) {
                Ok(graph) => {
                    info!(uri = %config.uri, attempt, "connected to graph store");
                    return Ok(Self {
                        graph,
                        runtime,
                        uri: config.uri.clone(),
                    });
                },
                Err(cause) => {
                    warn!(uri = %config.uri, attempt, error = %cause, "store connection failed");
                    last_cause = cause;
                    if attempt < attempts {
                        std::thread::sleep(Duration::from_millis(500 * u64::from(attempt)));
                    }
                },
            }
        }
        Err(Error::StoreUnavailable {
            uri: config.uri.clone(),
            cause: last_cause,
        })
    }

    /// The bolt URI this store is connected to.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    fn run(&self, operation: &str, q: Query) -> Result<()> {
        self.runtime
            .block_on(self.graph.run(q))
            .map_err(|e| Error::OperationFailed {
                operation: operation.to_string(),
                cause: e.to_string(),
            })
    }

    fn run_batch(&self, operation: &str, queries: Vec<Query>) -> Result<()> {
        self.runtime.block_on(async {
            let mut txn = self
                .graph
                .start_txn()
                .await
                .map_err(|e| Error::OperationFailed {
                    operation: operation.to_string(),
                    cause: format!("begin transaction: {e}"),
                })?;
            txn.run_queries(queries)
                .await
                .map_err(|e| Error::OperationFailed {
                    operation: operation.to_string(),
                    cause: e.to_string(),
                })?;
            txn.commit().await.map_err(|e| Error::OperationFailed {
                operation: operation.to_string(),
                cause: format!("commit: {e}"),
            })
        })
    }

    fn count(&self, cypher: &str) -> Result<usize> {
        self.runtime.block_on(async {
            let mut stream =
                self.graph
                    .execute(query(cypher))
                    .await
                    .map_err(|e| Error::OperationFailed {
                        operation: "count".to_string(),
                        cause: e.to_string(),
                    })?;
            let row = stream.next().await.map_err(|e| Error::OperationFailed {
                operation: "count".to_string(),
                cause: e.to_string(),
            })?;
            let count = row
                .and_then(|r| r.get::<i64>("count").ok())
                .unwrap_or_default();
            Ok(usize::try_from(count).unwrap_or_default())
        })
    }

    fn collect_neighbor_rows(
        &self,
        cypher: &str,
        id: &EntityId,
        outgoing: bool,
    ) -> Result<Vec<Neighbor>> {
        self.runtime.block_on(async {
            let mut stream = self
                .graph
                .execute(query(cypher).param("id", id.as_str()))
                .await
                .map_err(|e| Error::OperationFailed {
                    operation: "query neighbors".to_string(),
                    cause: e.to_string(),
                })?;
            let mut neighbors = Vec::new();
            while let Some(row) = stream.next().await.map_err(|e| Error::OperationFailed {
                operation: "query neighbors".to_string(),
                cause: e.to_string(),
            })? {
                let (Ok(rel_type), Ok(other_id), Ok(name)) = (
                    row.get::<String>("rel_type"),
                    row.get::<String>("id"),
                    row.get::<String>("name"),
                ) else {
                    continue;
                };
                let labels = row.get::<Vec<String>>("labels").unwrap_or_default();
                let entity = row_entity(&other_id, &name, labels);
                let relationship = if outgoing {
                    Relationship::new(id.clone(), entity.id.clone(), rel_type)
                } else {
                    Relationship::new(entity.id.clone(), id.clone(), rel_type)
                };
                neighbors.push(Neighbor {
                    relationship,
                    entity,
                });
            }
            Ok(neighbors)
        })
    }
}

impl GraphStore for Neo4jStore {
    fn ping(&self) -> Result<()> {
        self.runtime
            .block_on(async {
                let mut stream = self.graph.execute(query("RETURN 1 AS ok")).await?;
                stream.next().await.map(|_| ())
            })
            .map_err(|e| Error::StoreUnavailable {
                uri: self.uri.clone(),
                cause: e.to_string(),
            })
    }

    fn clear(&self) -> Result<()> {
        debug!("clearing graph store");
        self.run("clear store", query("MATCH (n) DETACH DELETE n"))
    }

    fn write_entities(&self, entities: &[Entity]) -> Result<()> {
        let queries: Vec<Query> = entities.iter().map(entity_query).collect();
        self.run_batch("write entity batch", queries)
    }

    fn write_relationships(&self, relationships: &[Relationship]) -> Result<()> {
        let queries: Vec<Query> = relationships.iter().map(relationship_query).collect();
        self.run_batch("write relationship batch", queries)
    }

    fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            entities: self.count("MATCH (n) RETURN count(n) AS count")?,
            relationships: self.count("MATCH ()-[r]->() RETURN count(r) AS count")?,
        })
    }

    fn find_entities_by_name(&self, needle: &str, limit: usize) -> Result<Vec<Entity>> {
        let cypher = "MATCH (n) WHERE n.name IS NOT NULL AND toLower(n.name) CONTAINS $needle \
                      RETURN n.id AS id, n.name AS name, labels(n) AS labels \
                      ORDER BY n.name LIMIT $limit";
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.runtime.block_on(async {
            let mut stream = self
                .graph
                .execute(
                    query(cypher)
                        .param("needle", needle.to_lowercase())
                        .param("limit", limit),
                )
                .await
                .map_err(|e| Error::OperationFailed {
                    operation: "find entities".to_string(),
                    cause: e.to_string(),
                })?;
            let mut entities = Vec::new();
            while let Some(row) = stream.next().await.map_err(|e| Error::OperationFailed {
                operation: "find entities".to_string(),
                cause: e.to_string(),
            })? {
                let (Ok(id), Ok(name)) = (row.get::<String>("id"), row.get::<String>("name"))
                else {
                    continue;
                };
                let labels = row.get::<Vec<String>>("labels").unwrap_or_default();
                entities.push(row_entity(&id, &name, labels));
            }
            Ok(entities)
        })
    }

    fn neighbors(&self, id: &EntityId) -> Result<Vec<Neighbor>> {
        let outgoing = "MATCH (a {id: $id})-[r]->(b) WHERE b.id IS NOT NULL \
                        RETURN type(r) AS rel_type, b.id AS id, b.name AS name, labels(b) AS labels";
        let incoming = "MATCH (a {id: $id})<-[r]-(b) WHERE b.id IS NOT NULL \
                        RETURN type(r) AS rel_type, b.id AS id, b.name AS name, labels(b) AS labels";
        let mut neighbors = self.collect_neighbor_rows(outgoing, id, true)?;
        neighbors.extend(self.collect_neighbor_rows(incoming, id, false)?);
        Ok(neighbors)
    }
}

async fn try_connect(config: &StoreConfig) -> std::result::Result<Graph, String> {
    let driver_config = ConfigBuilder::default()
        .uri(&config.uri)
        .user(&config.username)
        .password(config.password.expose_secret())
        .db(config.database.as_str())
        .fetch_size(config.fetch_size)
        .max_connections(config.max_connections)
        .build()
        .map_err(|e| format!("build driver config: {e}"))?;
    let graph = Graph::connect(driver_config)
        .await
        .map_err(|e| e.to_string())?;
    // Round-trip one query so a bad password fails here, not mid-load
    let mut stream = graph
        .execute(query("RETURN 1 AS ok"))
        .await
        .map_err(|e| e.to_string())?;
    stream.next().await.map_err(|e| e.to_string())?;
    Ok(graph)
}

fn row_entity(id: &str, name: &str, labels: Vec<String>) -> Entity {
    let mut entity = Entity::new("Entity", name).with_id(EntityId::new(id));
    entity.labels = if labels.is_empty() {
        vec!["Entity".to_string()]
    } else {
        labels
    };
    entity
}

/// Builds the `CREATE`+`SET` statement for one entity.
fn entity_query(entity: &Entity) -> Query {
    let mut labels: Vec<String> = entity
        .labels
        .iter()
        .map(|label| sanitize_identifier(label))
        .filter(|label| !label.is_empty())
        .collect();
    if labels.is_empty() {
        labels.push("Entity".to_string());
    }
    let label_part: String = labels
        .iter()
        .map(|label| format!(":{}", quote(label)))
        .collect();

    let props = safe_properties(&entity.properties);
    let mut cypher = format!("CREATE (n{label_part}) SET n.id = $id, n.name = $name");
    for (i, (key, _)) in props.iter().enumerate() {
        cypher.push_str(&format!(", n.{} = $p_{i}", quote(key)));
    }
    if !entity.source_chunks.is_empty() {
        cypher.push_str(", n.source_chunks = $source_chunks");
    }

    let mut q = query(cypher.as_str())
        .param("id", entity.id.as_str())
        .param("name", entity.name.as_str());
    for (i, (_, value)) in props.iter().enumerate() {
        q = q.param(format!("p_{i}").as_str(), to_bolt(value));
    }
    if !entity.source_chunks.is_empty() {
        q = q.param("source_chunks", entity.source_chunks.clone());
    }
    q
}

/// Builds the `MATCH`+`CREATE` statement for one relationship.
fn relationship_query(relationship: &Relationship) -> Query {
    let rel_type = rel_type_safe(&relationship.rel_type);
    let props = safe_properties(&relationship.properties);

    let mut cypher = format!(
        "MATCH (a {{id: $source}}) MATCH (b {{id: $target}}) CREATE (a)-[r:{}]->(b)",
        quote(&rel_type)
    );
    let mut assignments: Vec<String> = props
        .iter()
        .enumerate()
        .map(|(i, (key, _))| format!("r.{} = $p_{i}", quote(key)))
        .collect();
    if !relationship.source_chunks.is_empty() {
        assignments.push("r.source_chunks = $source_chunks".to_string());
    }
    if !assignments.is_empty() {
        cypher.push_str(" SET ");
        cypher.push_str(&assignments.join(", "));
    }

    let mut q = query(cypher.as_str())
        .param("source", relationship.source.as_str())
        .param("target", relationship.target.as_str());
    for (i, (_, value)) in props.iter().enumerate() {
        q = q.param(format!("p_{i}").as_str(), to_bolt(value));
    }
    if !relationship.source_chunks.is_empty() {
        q = q.param("source_chunks", relationship.source_chunks.clone());
    }
    q
}

/// Sanitizes property keys, dropping keys that sanitize to nothing.
fn safe_properties(properties: &PropertyMap) -> Vec<(String, &PropertyValue)> {
    properties
        .iter()
        .filter_map(|(key, value)| {
            let safe = sanitize_identifier(key);
            if safe.is_empty() {
                None
            } else {
                Some((safe, value))
            }
        })
        .collect()
}

fn to_bolt(value: &PropertyValue) -> BoltType {
    match value {
        PropertyValue::Bool(b) => (*b).into(),
        PropertyValue::Integer(i) => (*i).into(),
        PropertyValue::Float(x) => (*x).into(),
        PropertyValue::Text(s) => s.clone().into(),
        PropertyValue::List(items) => items.iter().map(to_bolt).collect::<Vec<BoltType>>().into(),
    }
}
