//! Relationships: directed, typed, weighted edges between entities

use super::entity::Metadata;
use serde::{Deserialize, Serialize};

/// A directed edge between two entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Unique identifier
    pub id: String,
    /// Entity the edge starts from
    pub source_id: String,
    /// Entity the edge points to
    pub target_id: String,
    /// Open vocabulary: `subdomain_of`, `hosted_on`, `same_username`...
    pub relationship_type: String,
    /// Certainty of the link in [0.0, 1.0]
    pub confidence: f64,
    /// Provenance of the inference
    #[serde(default)]
    pub metadata: Metadata,
}

impl Relationship {
    /// The endpoint opposite to `entity_id`, if the edge touches it
    pub fn other_end(&self, entity_id: &str) -> Option<&str> {
        if self.source_id == entity_id {
            Some(&self.target_id)
        } else if self.target_id == entity_id {
            Some(&self.source_id)
        } else {
            None
        }
    }
}

/// Check that a confidence value lies in [0.0, 1.0]; NaN is rejected
pub fn is_valid_confidence(confidence: f64) -> bool {
    (0.0..=1.0).contains(&confidence)
}
