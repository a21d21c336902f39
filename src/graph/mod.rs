//! Intelligence graph: identity-resolved entities and deduplicated relationships
//!
//! The graph is a single-writer structure. Nothing here takes a lock: callers
//! must keep at most one mutation in flight, because the check-then-insert in
//! [`IntelligenceGraph::add_entity`] and [`IntelligenceGraph::add_relationship`]
//! would race and create duplicates under concurrent writers.

mod document;
mod entity;
mod relationship;

pub use document::{connection_count, GraphDocument, GraphStats};
pub use entity::{normalize, Entity, EntityType, Metadata};
pub use relationship::{is_valid_confidence, Relationship};

use crate::error::{Result, ThreatGraphError};
use ahash::{HashMap, HashMapExt};
use chrono::Utc;

/// Source label of the seeded root entity
pub const ROOT_SOURCE: &str = "user_input";

/// Entity/relationship store for one target
#[derive(Debug, Clone)]
pub struct IntelligenceGraph {
    target: String,
    root_id: String,
    /// Entities in insertion order
    entities: Vec<Entity>,
    /// Entity id -> position in `entities`
    entity_slots: HashMap<String, usize>,
    /// (type, normalized value) -> position in `entities`
    identity_index: HashMap<(EntityType, String), usize>,
    /// Relationships in insertion order
    relationships: Vec<Relationship>,
    /// Relationship id -> position in `relationships`
    relationship_slots: HashMap<String, usize>,
    /// (source id, target id, type) -> position in `relationships`
    edge_index: HashMap<(String, String, String), usize>,
    next_entity_seq: u64,
    next_relationship_seq: u64,
}

impl IntelligenceGraph {
    /// Create a graph seeded with the root `domain` entity for `target`
    pub fn new(target: &str) -> Result<Self> {
        let mut graph = Self::empty(target.trim());
        let mut metadata = Metadata::new();
        metadata.insert("is_root".to_string(), serde_json::Value::Bool(true));
        graph.root_id = graph.add_entity(EntityType::Domain, target, ROOT_SOURCE, Some(metadata))?;
        Ok(graph)
    }

    fn empty(target: &str) -> Self {
        Self {
            target: target.to_string(),
            root_id: String::new(),
            entities: Vec::new(),
            entity_slots: HashMap::new(),
            identity_index: HashMap::new(),
            relationships: Vec::new(),
            relationship_slots: HashMap::new(),
            edge_index: HashMap::new(),
            next_entity_seq: 0,
            next_relationship_seq: 0,
        }
    }

    /// Scan target this graph was built for
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Id of the root domain entity
    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    /// Add an entity, or resolve it to the existing one with the same identity
    ///
    /// Identity is `(type, normalize(value))`. When the identity already exists
    /// the metadata is merged into it (incoming keys win) and its id is returned;
    /// id, source and timestamp of the existing entity never change. A new
    /// entity stores `value` with surrounding whitespace trimmed.
    pub fn add_entity(
        &mut self,
        entity_type: EntityType,
        value: &str,
        source: &str,
        metadata: Option<Metadata>,
    ) -> Result<String> {
        let key = (entity_type, normalize(value));
        if key.1.is_empty() {
            return Err(ThreatGraphError::Validation(format!(
                "{} value cannot be empty",
                entity_type
            )));
        }

        if let Some(&slot) = self.identity_index.get(&key) {
            let existing = &mut self.entities[slot];
            if let Some(metadata) = metadata {
                existing.merge_metadata(metadata);
            }
            return Ok(existing.id.clone());
        }

        let id = format!("{}_{}", entity_type, self.next_entity_seq);
        self.next_entity_seq = advance(self.next_entity_seq)?;

        let slot = self.entities.len();
        self.entities.push(Entity {
            id: id.clone(),
            entity_type,
            value: value.trim().to_string(),
            source: source.to_string(),
            timestamp: Utc::now(),
            metadata: metadata.unwrap_or_default(),
        });
        self.entity_slots.insert(id.clone(), slot);
        self.identity_index.insert(key, slot);

        Ok(id)
    }

    /// Add a directed relationship, or resolve it to the existing edge with the
    /// same `(source, target, type)` triple
    ///
    /// A repeated add merges metadata and keeps the first writer's confidence.
    /// Unknown endpoints and out-of-range confidence fail without touching the graph.
    pub fn add_relationship(
        &mut self,
        source_id: &str,
        target_id: &str,
        relationship_type: &str,
        confidence: f64,
        metadata: Option<Metadata>,
    ) -> Result<String> {
        for id in [source_id, target_id] {
            if !self.entity_slots.contains_key(id) {
                return Err(ThreatGraphError::UnknownEntity { id: id.to_string() });
            }
        }
        if !is_valid_confidence(confidence) {
            return Err(ThreatGraphError::Validation(format!(
                "confidence must be within [0.0, 1.0], got {}",
                confidence
            )));
        }
        if relationship_type.trim().is_empty() {
            return Err(ThreatGraphError::Validation(
                "relationship type cannot be empty".to_string(),
            ));
        }

        let key = (
            source_id.to_string(),
            target_id.to_string(),
            relationship_type.to_string(),
        );
        if let Some(&slot) = self.edge_index.get(&key) {
            let existing = &mut self.relationships[slot];
            if let Some(metadata) = metadata {
                existing.metadata.extend(metadata);
            }
            return Ok(existing.id.clone());
        }

        let id = format!("rel_{}", self.next_relationship_seq);
        self.next_relationship_seq = advance(self.next_relationship_seq)?;

        let slot = self.relationships.len();
        self.relationships.push(Relationship {
            id: id.clone(),
            source_id: key.0.clone(),
            target_id: key.1.clone(),
            relationship_type: key.2.clone(),
            confidence,
            metadata: metadata.unwrap_or_default(),
        });
        self.relationship_slots.insert(id.clone(), slot);
        self.edge_index.insert(key, slot);

        Ok(id)
    }

    /// Merge metadata into an existing entity
    pub fn merge_entity_metadata(&mut self, entity_id: &str, metadata: Metadata) -> Result<()> {
        let slot = *self
            .entity_slots
            .get(entity_id)
            .ok_or_else(|| ThreatGraphError::UnknownEntity {
                id: entity_id.to_string(),
            })?;
        self.entities[slot].merge_metadata(metadata);
        Ok(())
    }

    /// Find an entity by value
    ///
    /// With a type this is an index lookup. Without one, entities are scanned in
    /// insertion order and the first whose normalized value matches is returned.
    pub fn find_by_value(&self, value: &str, entity_type: Option<EntityType>) -> Option<&Entity> {
        let normalized = normalize(value);
        match entity_type {
            Some(entity_type) => self
                .identity_index
                .get(&(entity_type, normalized))
                .map(|&slot| &self.entities[slot]),
            None => self
                .entities
                .iter()
                .find(|e| normalize(&e.value) == normalized),
        }
    }

    /// Entities one edge away from `entity_id`, in relationship insertion order
    ///
    /// An entity linked by several edges appears once per edge.
    pub fn connected_entities(&self, entity_id: &str) -> Vec<&Entity> {
        self.relationships
            .iter()
            .filter_map(|rel| rel.other_end(entity_id))
            .filter_map(|id| self.entity(id))
            .collect()
    }

    /// Look up an entity by id
    pub fn entity(&self, entity_id: &str) -> Option<&Entity> {
        self.entity_slots
            .get(entity_id)
            .map(|&slot| &self.entities[slot])
    }

    /// Look up a relationship by id
    pub fn relationship(&self, relationship_id: &str) -> Option<&Relationship> {
        self.relationship_slots
            .get(relationship_id)
            .map(|&slot| &self.relationships[slot])
    }

    /// All entities in insertion order
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    /// Entities of one type in insertion order
    pub fn entities_of_type(&self, entity_type: EntityType) -> impl Iterator<Item = &Entity> {
        self.entities
            .iter()
            .filter(move |e| e.entity_type == entity_type)
    }

    /// All relationships in insertion order
    pub fn relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.iter()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    /// Snapshot the graph as the persisted document
    pub fn to_document(&self) -> GraphDocument {
        GraphDocument::new(
            self.target.clone(),
            self.entities.clone(),
            self.relationships.clone(),
        )
    }

    /// Rebuild a graph from a persisted document
    ///
    /// Every stored entity and relationship is kept as-is, including entities
    /// sharing an identity key (artifacts written by other producers may hold
    /// such duplicates). The identity index resolves to the first of them.
    /// New ids never reuse a stored id.
    pub fn from_document(document: GraphDocument) -> Result<Self> {
        let mut graph = Self::empty(document.target.trim());

        for entity in document.entities {
            if graph.entity_slots.contains_key(&entity.id) {
                return Err(ThreatGraphError::Validation(format!(
                    "duplicate entity id '{}'",
                    entity.id
                )));
            }
            if normalize(&entity.value).is_empty() {
                return Err(ThreatGraphError::Validation(format!(
                    "entity '{}' has an empty value",
                    entity.id
                )));
            }
            graph.next_entity_seq = graph.next_entity_seq.max(next_sequence(&entity.id)?);

            let slot = graph.entities.len();
            graph.entity_slots.insert(entity.id.clone(), slot);
            graph.identity_index.entry(entity.identity_key()).or_insert(slot);
            graph.entities.push(entity);
        }
        graph.next_entity_seq = graph.next_entity_seq.max(graph.entities.len() as u64);

        for rel in document.relationships {
            for id in [&rel.source_id, &rel.target_id] {
                if !graph.entity_slots.contains_key(id) {
                    return Err(ThreatGraphError::UnknownEntity { id: id.clone() });
                }
            }
            if !is_valid_confidence(rel.confidence) {
                return Err(ThreatGraphError::Validation(format!(
                    "relationship '{}' has confidence {} outside [0.0, 1.0]",
                    rel.id, rel.confidence
                )));
            }
            if graph.relationship_slots.contains_key(&rel.id) {
                return Err(ThreatGraphError::Validation(format!(
                    "duplicate relationship id '{}'",
                    rel.id
                )));
            }
            graph.next_relationship_seq = graph.next_relationship_seq.max(next_sequence(&rel.id)?);

            let slot = graph.relationships.len();
            graph.relationship_slots.insert(rel.id.clone(), slot);
            graph
                .edge_index
                .entry((
                    rel.source_id.clone(),
                    rel.target_id.clone(),
                    rel.relationship_type.clone(),
                ))
                .or_insert(slot);
            graph.relationships.push(rel);
        }
        graph.next_relationship_seq = graph
            .next_relationship_seq
            .max(graph.relationships.len() as u64);

        let root_key = (EntityType::Domain, normalize(&graph.target));
        let root_slot = graph.identity_index.get(&root_key).copied().ok_or_else(|| {
            ThreatGraphError::Validation(format!(
                "document has no root domain entity for '{}'",
                graph.target
            ))
        })?;
        graph.root_id = graph.entities[root_slot].id.clone();

        Ok(graph)
    }
}

/// Sequence number following the numeric suffix of an id like `email_12`
fn next_sequence(id: &str) -> Result<u64> {
    match id.rsplit('_').next().and_then(|suffix| suffix.parse::<u64>().ok()) {
        Some(n) => advance(n),
        None => Ok(0),
    }
}

fn advance(seq: u64) -> Result<u64> {
    seq.checked_add(1)
        .ok_or_else(|| ThreatGraphError::Validation("id sequence exhausted".to_string()))
}
