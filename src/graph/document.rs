//! Persisted form of the intelligence graph

use super::entity::Entity;
use super::relationship::Relationship;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The graph artifact read by risk scoring and visualization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    pub target: String,
    pub entities: Vec<Entity>,
    pub relationships: Vec<Relationship>,
    pub stats: GraphStats,
}

/// Totals and per-type histograms
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub total_entities: usize,
    pub total_relationships: usize,
    pub entity_types: BTreeMap<String, usize>,
    pub relationship_types: BTreeMap<String, usize>,
}

impl GraphDocument {
    /// Build a document, computing stats from the given entities and relationships
    pub fn new(target: String, entities: Vec<Entity>, relationships: Vec<Relationship>) -> Self {
        let stats = GraphStats::compute(&entities, &relationships);
        Self {
            target,
            entities,
            relationships,
            stats,
        }
    }

    /// Entities flagged by the high-value pass, most connected first
    pub fn high_value_targets(&self) -> Vec<&Entity> {
        let mut flagged: Vec<&Entity> = self
            .entities
            .iter()
            .filter(|e| {
                e.metadata
                    .get("high_value_target")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false)
            })
            .collect();
        flagged.sort_by_key(|e| std::cmp::Reverse(connection_count(e)));
        flagged
    }
}

/// `connection_count` metadata of an entity, 0 when absent
pub fn connection_count(entity: &Entity) -> u64 {
    entity
        .metadata
        .get("connection_count")
        .and_then(|v| v.as_u64())
        .unwrap_or(0)
}

impl GraphStats {
    pub fn compute(entities: &[Entity], relationships: &[Relationship]) -> Self {
        let mut entity_types = BTreeMap::new();
        for entity in entities {
            *entity_types
                .entry(entity.entity_type.to_string())
                .or_insert(0) += 1;
        }

        let mut relationship_types = BTreeMap::new();
        for rel in relationships {
            *relationship_types
                .entry(rel.relationship_type.clone())
                .or_insert(0) += 1;
        }

        Self {
            total_entities: entities.len(),
            total_relationships: relationships.len(),
            entity_types,
            relationship_types,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::{EntityType, IntelligenceGraph, Metadata};
    use serde_json::json;

    fn sample_graph() -> IntelligenceGraph {
        let mut graph = IntelligenceGraph::new("example.com").unwrap();
        let root = graph.root_id().to_string();
        for host in ["www.example.com", "vpn.example.com"] {
            let id = graph
                .add_entity(EntityType::Subdomain, host, "subfinder", None)
                .unwrap();
            graph
                .add_relationship(&id, &root, "subdomain_of", 1.0, None)
                .unwrap();
        }
        let email = graph
            .add_entity(
                EntityType::Email,
                "admin@example.com",
                "whois",
                Some(Metadata::from([("domain".to_string(), json!("example.com"))])),
            )
            .unwrap();
        graph
            .add_relationship(&email, &root, "registered_to", 0.9, None)
            .unwrap();
        graph
    }

    #[test]
    fn test_stats() {
        let document = sample_graph().to_document();
        assert_eq!(document.stats.total_entities, 4);
        assert_eq!(document.stats.total_relationships, 3);
        assert_eq!(document.stats.entity_types["subdomain"], 2);
        assert_eq!(document.stats.entity_types["domain"], 1);
        assert_eq!(document.stats.relationship_types["subdomain_of"], 2);
        assert_eq!(document.stats.relationship_types["registered_to"], 1);
    }

    #[test]
    fn test_field_names() {
        let value = serde_json::to_value(sample_graph().to_document()).unwrap();
        let entity = &value["entities"][0];
        for field in ["id", "type", "value", "source", "timestamp", "metadata"] {
            assert!(entity.get(field).is_some(), "entity missing {}", field);
        }
        let rel = &value["relationships"][0];
        for field in [
            "id",
            "source_id",
            "target_id",
            "relationship_type",
            "confidence",
            "metadata",
        ] {
            assert!(rel.get(field).is_some(), "relationship missing {}", field);
        }
        for field in [
            "total_entities",
            "total_relationships",
            "entity_types",
            "relationship_types",
        ] {
            assert!(value["stats"].get(field).is_some(), "stats missing {}", field);
        }
        assert_eq!(value["target"], json!("example.com"));
        assert_eq!(entity["type"], json!("domain"));
    }

    #[test]
    fn test_json_roundtrip_preserves_everything() {
        let graph = sample_graph();
        let document = graph.to_document();
        let encoded = serde_json::to_string_pretty(&document).unwrap();
        let decoded: super::GraphDocument = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, document);

        let restored = IntelligenceGraph::from_document(decoded).unwrap();
        assert_eq!(restored.entity_count(), graph.entity_count());
        assert_eq!(restored.relationship_count(), graph.relationship_count());
        assert_eq!(restored.root_id(), graph.root_id());
        for (a, b) in restored.entities().zip(graph.entities()) {
            assert_eq!(a, b);
        }
        for (a, b) in restored.relationships().zip(graph.relationships()) {
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_restored_graph_does_not_reuse_ids() {
        let graph = sample_graph();
        let mut restored = IntelligenceGraph::from_document(graph.to_document()).unwrap();
        let id = restored
            .add_entity(EntityType::Username, "admin", "theharvester_derived", None)
            .unwrap();
        assert!(graph.entity(&id).is_none());
        let root = restored.root_id().to_string();
        let rel = restored
            .add_relationship(&id, &root, "linked", 0.5, None)
            .unwrap();
        assert!(graph.relationship(&rel).is_none());
    }

    #[test]
    fn test_document_with_dangling_edge_rejected() {
        let mut document = sample_graph().to_document();
        document.relationships[0].target_id = "domain_404".to_string();
        assert!(IntelligenceGraph::from_document(document).is_err());
    }
}
