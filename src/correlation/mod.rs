//! Correlation engine: post-parse passes that infer edges and flag hubs
//!
//! Runs once over the fully parsed graph. The email/subdomain and username
//! passes read the entities present when the engine starts; neither consumes
//! the other's output. High-value flagging runs last and counts every edge,
//! including the ones the earlier passes added.
//!
//! The email/subdomain and username passes are quadratic in the number of
//! entities of the involved types. Group sizes are not capped.

use crate::config::CorrelationConfig;
use crate::error::Result;
use crate::graph::{normalize, Entity, EntityType, IntelligenceGraph, Metadata};
use crate::parser::split_email;
use ahash::{HashMap, HashMapExt};
use serde::Serialize;
use serde_json::json;

/// Counts produced by one correlation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CorrelationReport {
    pub email_subdomain_links: usize,
    pub username_links: usize,
    pub high_value_targets: usize,
}

/// Runs the correlation passes over a graph
#[derive(Debug, Clone)]
pub struct Correlator {
    high_value_threshold: usize,
}

impl Correlator {
    pub fn new(config: &CorrelationConfig) -> Self {
        Self {
            high_value_threshold: config.high_value_threshold,
        }
    }

    /// Run the linking passes over one entity snapshot, then flag hubs by final degree
    pub fn correlate(&self, graph: &mut IntelligenceGraph) -> Result<CorrelationReport> {
        let emails = snapshot(graph, EntityType::Email);
        let subdomains = snapshot(graph, EntityType::Subdomain);
        let usernames = snapshot(graph, EntityType::Username);

        let email_subdomain_links = correlate_emails_and_subdomains(graph, &emails, &subdomains)?;
        let username_links = correlate_usernames(graph, &usernames)?;
        let degrees = degree_counts(graph);

        let report = CorrelationReport {
            email_subdomain_links,
            username_links,
            high_value_targets: self.flag_high_value_targets(graph, &degrees)?,
        };

        tracing::info!(
            email_subdomain = report.email_subdomain_links,
            usernames = report.username_links,
            high_value = report.high_value_targets,
            relationships = graph.relationship_count(),
            "Correlation complete"
        );

        Ok(report)
    }

    /// Mark every entity whose degree reaches the threshold
    fn flag_high_value_targets(
        &self,
        graph: &mut IntelligenceGraph,
        degrees: &[(String, usize)],
    ) -> Result<usize> {
        let mut flagged = 0;
        for (entity_id, degree) in degrees {
            if *degree < self.high_value_threshold {
                continue;
            }
            let mut metadata = Metadata::new();
            metadata.insert("high_value_target".to_string(), json!(true));
            metadata.insert("connection_count".to_string(), json!(degree));
            graph.merge_entity_metadata(entity_id, metadata)?;
            flagged += 1;
        }
        tracing::info!("Identified {} high-value targets", flagged);
        Ok(flagged)
    }
}

/// Entities of one type as (id, value), cloned out of the graph
fn snapshot(graph: &IntelligenceGraph, entity_type: EntityType) -> Vec<(String, String)> {
    graph
        .entities_of_type(entity_type)
        .map(|e: &Entity| (e.id.clone(), e.value.clone()))
        .collect()
}

/// Edge endpoint occurrences per entity, in entity insertion order
///
/// A relationship counts once for its source and once for its target.
pub fn degree_counts(graph: &IntelligenceGraph) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for rel in graph.relationships() {
        *counts.entry(rel.source_id.as_str()).or_insert(0) += 1;
        *counts.entry(rel.target_id.as_str()).or_insert(0) += 1;
    }
    graph
        .entities()
        .filter_map(|e| counts.get(e.id.as_str()).map(|&n| (e.id.clone(), n)))
        .collect()
}

/// Link an email to every subdomain whose value contains the email's domain,
/// or is contained in it
///
/// Plain substring matching: short fragments can produce false positives.
fn correlate_emails_and_subdomains(
    graph: &mut IntelligenceGraph,
    emails: &[(String, String)],
    subdomains: &[(String, String)],
) -> Result<usize> {
    tracing::info!("Finding email-subdomain connections");
    let mut links = 0;

    for (email_id, email) in emails {
        let Some((_, domain)) = split_email(email) else {
            continue;
        };
        let domain = normalize(domain);
        if domain.is_empty() {
            continue;
        }

        for (subdomain_id, subdomain) in subdomains {
            let subdomain = normalize(subdomain);
            if subdomain.contains(&domain) || domain.contains(&subdomain) {
                let mut metadata = Metadata::new();
                metadata.insert("correlation_type".to_string(), json!("domain_match"));
                graph.add_relationship(
                    email_id,
                    subdomain_id,
                    "email_from_subdomain",
                    0.8,
                    Some(metadata),
                )?;
                links += 1;
            }
        }
    }

    tracing::info!("Found {} email-subdomain correlations", links);
    Ok(links)
}

/// Connect every pair of username entities sharing a normalized value
fn correlate_usernames(graph: &mut IntelligenceGraph, usernames: &[(String, String)]) -> Result<usize> {
    tracing::info!("Correlating usernames across sources");

    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<&str>> = HashMap::new();
    for (id, value) in usernames {
        let key = normalize(value);
        let group = groups.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            Vec::new()
        });
        group.push(id.as_str());
    }

    let mut links = 0;
    for key in &order {
        let group = &groups[key];
        if group.len() < 2 {
            continue;
        }
        for (i, first) in group.iter().enumerate() {
            for second in &group[i + 1..] {
                graph.add_relationship(first, second, "same_username", 1.0, None)?;
                links += 1;
            }
        }
    }

    tracing::info!("Found {} username correlations", links);
    Ok(links)
}
