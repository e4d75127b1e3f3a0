//! Graph-grounded context retrieval.
//!
//! Retrieval seeds entities by matching question n-grams against stored
//! entity names (longest match first), then expands the neighborhood
//! breadth-first into subject-predicate-object triples. An optional
//! embedder reranks seed candidates; without one the lexical order
//! stands.

use crate::Result;
use crate::config::RetrievalConfig;
use crate::embedding::{Embedder, cosine_similarity};
use crate::models::{Entity, NormalizationKey, PropertyValue};
use crate::storage::GraphStore;
use serde::Serialize;
use std::collections::BTreeSet;

/// Question words that never identify an entity on their own.
const QUESTION_STOPWORDS: [&str; 28] = [
    "ai", "gì", "nào", "là", "của", "và", "có", "không", "ở", "đã", "được", "như", "thế", "vì",
    "sao", "bao", "nhiêu", "khi", "những", "các", "một", "trong", "với", "đến", "từ", "cho", "về",
    "ra",
];

/// Longest question n-gram tried during seed matching.
const MAX_SEED_NGRAM: usize = 4;

/// Retrieved context for one question, ready for prompt rendering.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RankedContext {
    /// Seed entities matched from the question.
    pub seeds: Vec<Entity>,
    /// Rendered triple lines from the neighborhood expansion.
    pub triples: Vec<String>,
    /// Source chunk ids backing the retrieved subgraph.
    pub chunk_ids: Vec<String>,
}

impl RankedContext {
    /// True when nothing was retrieved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seeds.is_empty() && self.triples.is_empty()
    }

    /// Renders the context block passed to the answer prompt.
    #[must_use]
    pub fn context_block(&self) -> String {
        if self.is_empty() {
            return "No matching entities were found in the graph.".to_string();
        }

        let mut block = String::from("Entities:\n");
        for seed in &self.seeds {
            block.push_str(&format!("- {} ({})", seed.name, seed.primary_label()));
            if let Some(description) = entity_description(seed) {
                block.push_str(&format!(": {description}"));
            }
            block.push('\n');
        }

        if !self.triples.is_empty() {
            block.push_str("\nRelations:\n");
            for triple in &self.triples {
                block.push_str(triple);
                block.push('\n');
            }
        }

        block
    }
}

/// Returns the descriptive property of an entity, when present.
fn entity_description(entity: &Entity) -> Option<&str> {
    entity
        .properties
        .get("description")
        .or_else(|| entity.properties.get("original_text"))
        .and_then(PropertyValue::as_text)
}

/// Retrieves graph context for questions.
pub struct RetrievalService<S: GraphStore> {
    /// Backing graph store.
    store: S,
    /// Optional embedder for seed reranking.
    embedder: Option<Box<dyn Embedder>>,
    /// Neighborhood expansion depth.
    max_depth: usize,
    /// Cap on collected triples.
    max_triples: usize,
    /// Cap on seed entities.
    max_seeds: usize,
}

impl<S: GraphStore> RetrievalService<S> {
    /// Default expansion depth.
    pub const DEFAULT_MAX_DEPTH: usize = 2;

    /// Default triple cap.
    pub const DEFAULT_MAX_TRIPLES: usize = 40;

    /// Default seed cap.
    pub const DEFAULT_MAX_SEEDS: usize = 8;

    /// Creates a retrieval service with default limits.
    pub fn new(store: S) -> Self {
        Self {
            store,
            embedder: None,
            max_depth: Self::DEFAULT_MAX_DEPTH,
            max_triples: Self::DEFAULT_MAX_TRIPLES,
            max_seeds: Self::DEFAULT_MAX_SEEDS,
        }
    }

    /// Creates a retrieval service with limits from configuration.
    pub fn from_config(store: S, config: &RetrievalConfig) -> Self {
        Self::new(store)
            .with_max_depth(config.max_depth)
            .with_max_triples(config.max_triples)
            .with_max_seeds(config.max_seeds)
    }

    /// Sets the expansion depth.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    /// Sets the triple cap.
    #[must_use]
    pub fn with_max_triples(mut self, max_triples: usize) -> Self {
        self.max_triples = max_triples.max(1);
        self
    }

    /// Sets the seed cap.
    #[must_use]
    pub fn with_max_seeds(mut self, max_seeds: usize) -> Self {
        self.max_seeds = max_seeds.max(1);
        self
    }

    /// Sets an embedder for seed reranking.
    #[must_use]
    pub fn with_embedder(mut self, embedder: Box<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Returns the backing store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Retrieves context for a question.
    ///
    /// An unmatched question yields an empty context, not an error; the
    /// answer stage decides how to respond to an empty graph.
    ///
    /// # Errors
    ///
    /// Returns an error if a store query fails.
    pub fn retrieve(&self, question: &str) -> Result<RankedContext> {
        let mut seeds = self.seed_entities(question)?;
        if let Some(embedder) = &self.embedder
            && embedder.dimensions() > 0
        {
            seeds = rerank_seeds(embedder.as_ref(), question, seeds);
        }

        let (triples, chunk_ids) = self.expand(&seeds)?;

        metrics::counter!("retrieval_queries_total").increment(1);
        metrics::histogram!("retrieval_triples").record(triples.len() as f64);
        tracing::debug!(
            seeds = seeds.len(),
            triples = triples.len(),
            "Retrieved graph context"
        );

        Ok(RankedContext {
            seeds,
            triples,
            chunk_ids,
        })
    }

    /// Matches question n-grams against stored entity names.
    ///
    /// Longer n-grams are tried first so "trần hưng đạo" wins over a
    /// bare "trần" match. Stopword-only n-grams are skipped.
    fn seed_entities(&self, question: &str) -> Result<Vec<Entity>> {
        let folded = NormalizationKey::fold(question);
        let words: Vec<String> = folded
            .split(' ')
            .map(|w| w.chars().filter(|c| c.is_alphanumeric()).collect::<String>())
            .filter(|w| !w.is_empty())
            .collect();

        let mut seeds: Vec<Entity> = Vec::new();
        let mut seen: BTreeSet<String> = BTreeSet::new();

        let longest = words.len().min(MAX_SEED_NGRAM);
        for len in (1..=longest).rev() {
            for window in words.windows(len) {
                if window.iter().all(|w| is_stopword(w)) {
                    continue;
                }
                let needle = window.join(" ");
                for entity in self.store.find_entities_by_name(&needle, self.max_seeds)? {
                    if seeds.len() >= self.max_seeds {
                        return Ok(seeds);
                    }
                    if seen.insert(entity.id.as_str().to_string()) {
                        seeds.push(entity);
                    }
                }
            }
        }

        Ok(seeds)
    }

    /// Expands the seed neighborhood breadth-first into triple lines.
    fn expand(&self, seeds: &[Entity]) -> Result<(Vec<String>, Vec<String>)> {
        let mut triples: Vec<String> = Vec::new();
        let mut seen_edges: BTreeSet<(String, String, String)> = BTreeSet::new();
        let mut visited: BTreeSet<String> = BTreeSet::new();
        let mut chunk_ids: BTreeSet<String> = BTreeSet::new();

        for seed in seeds {
            visited.insert(seed.id.as_str().to_string());
            chunk_ids.extend(seed.source_chunks.iter().cloned());
        }

        let mut frontier: Vec<Entity> = seeds.to_vec();
        for _ in 0..self.max_depth {
            if frontier.is_empty() || triples.len() >= self.max_triples {
                break;
            }

            let mut next_frontier: Vec<Entity> = Vec::new();
            for focus in &frontier {
                for neighbor in self.store.neighbors(&focus.id)? {
                    if triples.len() >= self.max_triples {
                        break;
                    }

                    let rel = &neighbor.relationship;
                    if !seen_edges.insert(rel.dedup_key()) {
                        continue;
                    }

                    let line = if rel.source == focus.id {
                        format!("- {} -[{}]-> {}", focus.name, rel.rel_type, neighbor.entity.name)
                    } else {
                        format!("- {} -[{}]-> {}", neighbor.entity.name, rel.rel_type, focus.name)
                    };
                    triples.push(line);
                    chunk_ids.extend(rel.source_chunks.iter().cloned());

                    if visited.insert(neighbor.entity.id.as_str().to_string()) {
                        next_frontier.push(neighbor.entity);
                    }
                }
            }
            frontier = next_frontier;
        }

        Ok((triples, chunk_ids.into_iter().collect()))
    }
}

/// True for words too generic to seed an entity lookup.
fn is_stopword(word: &str) -> bool {
    word.chars().count() < 2 || QUESTION_STOPWORDS.contains(&word)
}

/// Reorders seeds by cosine similarity between question and name vectors.
///
/// Any embedding failure keeps the lexical order. Sorting is stable, so
/// equal scores preserve longest-match ranking.
fn rerank_seeds(embedder: &dyn Embedder, question: &str, seeds: Vec<Entity>) -> Vec<Entity> {
    let question_vec = match embedder.embed(question) {
        Ok(v) if !v.is_empty() => v,
        Ok(_) => return seeds,
        Err(e) => {
            tracing::warn!(error = %e, "Question embedding failed, keeping lexical seed order");
            return seeds;
        },
    };

    let mut scored: Vec<(f32, Entity)> = Vec::with_capacity(seeds.len());
    for seed in seeds {
        let score = match embedder.embed(&seed.name) {
            Ok(v) => cosine_similarity(&question_vec, &v),
            Err(e) => {
                tracing::warn!(error = %e, name = %seed.name, "Seed embedding failed");
                0.0
            },
        };
        scored.push((score, seed));
    }
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.into_iter().map(|(_, seed)| seed).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Entity, Relationship};
    use crate::storage::MemoryStore;

    fn history_store() -> MemoryStore {
        let store = MemoryStore::new();

        let commander = Entity::new("Person", "Trần Hưng Đạo")
            .with_property("description", "Tổng chỉ huy quân đội nhà Trần")
            .with_source_chunk("chunk_0001");
        let army = Entity::new("Organization", "Quân đội nhà Trần");
        let dynasty = Entity::new("Dynasty", "Nhà Trần");

        let command = Relationship::new(commander.id.clone(), army.id.clone(), "chỉ huy")
            .with_source_chunk("chunk_0001");
        let belongs = Relationship::new(army.id.clone(), dynasty.id.clone(), "thuộc");

        store
            .write_entities(&[commander, army, dynasty])
            .expect("entities");
        store
            .write_relationships(&[command, belongs])
            .expect("relationships");
        store
    }

    #[test]
    fn test_retrieve_seeds_and_expands() {
        let service = RetrievalService::new(history_store());
        // "Hưng Đạo" matches only the commander, so the dynasty is
        // reachable only through the army.
        let context = service
            .retrieve("Hưng Đạo là ai?")
            .expect("retrieval should succeed");

        assert!(!context.is_empty());
        assert_eq!(context.seeds.len(), 1);
        assert_eq!(context.seeds[0].name, "Trần Hưng Đạo");
        // Depth 2 reaches the dynasty through the army.
        assert_eq!(context.triples.len(), 2);
        assert!(context.triples[0].contains("chỉ huy"));
        assert!(context.triples.iter().any(|t| t.contains("Nhà Trần")));
        assert_eq!(context.chunk_ids, vec!["chunk_0001".to_string()]);
    }

    #[test]
    fn test_depth_one_stops_at_direct_neighbors() {
        let service = RetrievalService::new(history_store()).with_max_depth(1);
        let context = service
            .retrieve("Hưng Đạo là ai?")
            .expect("retrieval should succeed");

        assert_eq!(context.triples.len(), 1);
        assert!(context.triples[0].contains("Quân đội nhà Trần"));
    }

    #[test]
    fn test_short_ngram_seeds_every_matching_entity() {
        let service = RetrievalService::new(history_store());
        // The unigram "trần" is a substring of all three stored names.
        let context = service
            .retrieve("Trần Hưng Đạo là ai?")
            .expect("retrieval should succeed");

        assert_eq!(context.seeds.len(), 3);
        assert_eq!(context.seeds[0].name, "Trần Hưng Đạo");
    }

    #[test]
    fn test_triple_cap_applies() {
        let service = RetrievalService::new(history_store()).with_max_triples(1);
        let context = service
            .retrieve("Trần Hưng Đạo là ai?")
            .expect("retrieval should succeed");
        assert_eq!(context.triples.len(), 1);
    }

    #[test]
    fn test_unmatched_question_yields_empty_context() {
        let service = RetrievalService::new(history_store());
        let context = service
            .retrieve("Thành phố New York ở đâu?")
            .expect("retrieval should succeed");

        assert!(context.is_empty());
        assert!(context.context_block().contains("No matching entities"));
    }

    #[test]
    fn test_stopword_only_question_finds_nothing() {
        let service = RetrievalService::new(history_store());
        let context = service.retrieve("là ai?").expect("retrieval should succeed");
        assert!(context.seeds.is_empty());
    }

    #[test]
    fn test_context_block_renders_description() {
        let service = RetrievalService::new(history_store());
        let context = service
            .retrieve("Trần Hưng Đạo là ai?")
            .expect("retrieval should succeed");

        let block = context.context_block();
        assert!(block.contains("Trần Hưng Đạo (Person): Tổng chỉ huy quân đội nhà Trần"));
        assert!(block.contains("-[chỉ huy]->"));
    }
}
