//! Identity resolution and edge invariants of the intelligence graph

use serde_json::json;
use threatgraph::graph::{EntityType, GraphDocument, IntelligenceGraph, Metadata};
use threatgraph::ThreatGraphError;

const ALL_TYPES: [EntityType; 11] = [
    EntityType::Domain,
    EntityType::Subdomain,
    EntityType::IpAddress,
    EntityType::MailServer,
    EntityType::Nameserver,
    EntityType::TxtRecord,
    EntityType::DnsRecord,
    EntityType::Email,
    EntityType::Username,
    EntityType::Url,
    EntityType::SocialProfile,
];

fn graph() -> IntelligenceGraph {
    IntelligenceGraph::new("example.com").unwrap()
}

#[test]
fn test_add_entity_twice_returns_same_id_for_every_type() {
    let mut graph = graph();
    let values = ["Value.Example.com", "admin@EXAMPLE.com", "93.184.216.34"];

    for entity_type in ALL_TYPES {
        for value in values {
            let first = graph.add_entity(entity_type, value, "first", None).unwrap();
            let count = graph.entity_count();

            let variant = format!("  {}  ", value.to_uppercase());
            let second = graph.add_entity(entity_type, &variant, "second", None).unwrap();

            assert_eq!(first, second, "{} {}", entity_type, value);
            assert_eq!(graph.entity_count(), count);
            assert_eq!(graph.entity(&first).unwrap().source, "first");
        }
    }
}

#[test]
fn test_entity_count_grows_with_distinct_pairs() {
    let mut graph = graph();
    let mut previous = graph.entity_count();
    for i in 0..50 {
        graph
            .add_entity(EntityType::Subdomain, &format!("host{}.example.com", i), "subfinder", None)
            .unwrap();
        assert_eq!(graph.entity_count(), previous + 1);
        previous = graph.entity_count();
    }
}

#[test]
fn test_metadata_merge_on_readd() {
    let mut graph = graph();
    let id = graph
        .add_entity(
            EntityType::Url,
            "https://www.example.com",
            "httpx",
            Some(Metadata::from([
                ("title".to_string(), json!("Old")),
                ("server".to_string(), json!("nginx")),
            ])),
        )
        .unwrap();
    graph
        .add_entity(
            EntityType::Url,
            "https://www.example.com",
            "httpx",
            Some(Metadata::from([("title".to_string(), json!("New"))])),
        )
        .unwrap();

    let entity = graph.entity(&id).unwrap();
    assert_eq!(entity.metadata["title"], json!("New"));
    assert_eq!(entity.metadata["server"], json!("nginx"));
}

#[test]
fn test_add_relationship_twice_returns_same_id() {
    let mut graph = graph();
    let root = graph.root_id().to_string();
    let mut ids = vec![root.clone()];
    for host in ["a.example.com", "b.example.com"] {
        ids.push(
            graph
                .add_entity(EntityType::Subdomain, host, "subfinder", None)
                .unwrap(),
        );
    }

    for source in &ids {
        for target in &ids {
            for rel_type in ["subdomain_of", "hosted_on"] {
                let first = graph
                    .add_relationship(source, target, rel_type, 0.5, None)
                    .unwrap();
                let count = graph.relationship_count();
                let second = graph
                    .add_relationship(source, target, rel_type, 0.9, None)
                    .unwrap();
                assert_eq!(first, second);
                assert_eq!(graph.relationship_count(), count);
                assert_eq!(graph.relationship(&first).unwrap().confidence, 0.5);
            }
        }
    }
    assert_eq!(graph.relationship_count(), 18);
}

#[test]
fn test_unknown_endpoint_always_reference_error() {
    let mut graph = graph();
    let root = graph.root_id().to_string();
    let before = graph.relationship_count();

    for (source, target) in [
        (root.as_str(), "ghost_1"),
        ("ghost_1", root.as_str()),
        ("ghost_1", "ghost_2"),
    ] {
        let result = graph.add_relationship(source, target, "subdomain_of", 1.0, None);
        assert!(matches!(result, Err(ThreatGraphError::UnknownEntity { .. })));
        assert_eq!(graph.relationship_count(), before);
    }
}

#[test]
fn test_unknown_endpoint_reported_before_bad_confidence() {
    let mut graph = graph();
    let root = graph.root_id().to_string();
    let result = graph.add_relationship(&root, "ghost", "subdomain_of", 7.0, None);
    assert!(matches!(result, Err(ThreatGraphError::UnknownEntity { .. })));
}

#[test]
fn test_confidence_outside_unit_interval_is_validation_error() {
    let mut graph = graph();
    let root = graph.root_id().to_string();
    let sub = graph
        .add_entity(EntityType::Subdomain, "www.example.com", "subfinder", None)
        .unwrap();

    for confidence in [1.5, -0.1] {
        let result = graph.add_relationship(&sub, &root, "subdomain_of", confidence, None);
        assert!(matches!(result, Err(ThreatGraphError::Validation(_))));
    }
    assert_eq!(graph.relationship_count(), 0);

    for confidence in [0.0, 1.0] {
        graph
            .add_relationship(&sub, &root, &format!("edge_{}", confidence), confidence, None)
            .unwrap();
    }
    assert_eq!(graph.relationship_count(), 2);
}

#[test]
fn test_connected_entities_restartable() {
    let mut graph = graph();
    let root = graph.root_id().to_string();
    for host in ["a.example.com", "b.example.com", "c.example.com"] {
        let id = graph
            .add_entity(EntityType::Subdomain, host, "subfinder", None)
            .unwrap();
        graph
            .add_relationship(&id, &root, "subdomain_of", 1.0, None)
            .unwrap();
    }

    let first: Vec<String> = graph
        .connected_entities(&root)
        .into_iter()
        .map(|e| e.value.clone())
        .collect();
    let second: Vec<String> = graph
        .connected_entities(&root)
        .into_iter()
        .map(|e| e.value.clone())
        .collect();

    assert_eq!(first, vec!["a.example.com", "b.example.com", "c.example.com"]);
    assert_eq!(first, second);
}

#[test]
fn test_serialize_deserialize_roundtrip() {
    let mut graph = graph();
    let root = graph.root_id().to_string();
    let email = graph
        .add_entity(
            EntityType::Email,
            "admin@example.com",
            "whois",
            Some(Metadata::from([("domain".to_string(), json!("example.com"))])),
        )
        .unwrap();
    let user = graph
        .add_entity(EntityType::Username, "admin", "whois_derived", None)
        .unwrap();
    graph
        .add_relationship(&email, &root, "registered_to", 0.9, None)
        .unwrap();
    graph
        .add_relationship(
            &user,
            &email,
            "username_of",
            0.9,
            Some(Metadata::from([("method".to_string(), json!("local_part"))])),
        )
        .unwrap();

    let document = graph.to_document();
    let encoded = serde_json::to_string(&document).unwrap();
    let decoded: GraphDocument = serde_json::from_str(&encoded).unwrap();

    assert_eq!(decoded.entities.len(), graph.entity_count());
    assert_eq!(decoded.relationships.len(), graph.relationship_count());
    assert_eq!(decoded, document);
}
