//! Entities: discovered assets with identity-resolved values

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Open key/value bag attached to entities and relationships
///
/// Key conventions per entity type:
/// - `domain`: `is_root`, `registrar`, `creation_date`, `expiration_date`
/// - `subdomain`: `parent_domain`, `risk_keywords`
/// - DNS types: `record_type`
/// - `email`: `domain`
/// - `username`: `derived_from`
/// - `url`: `status_code`, `title`, `server`, `technologies`, `content_length`
/// - `social_profile`: `platform`, `username`
/// - any type after correlation: `high_value_target`, `connection_count`
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Fixed vocabulary of entity kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Domain,
    Subdomain,
    IpAddress,
    MailServer,
    Nameserver,
    TxtRecord,
    DnsRecord,
    Email,
    Username,
    Url,
    SocialProfile,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Domain => "domain",
            EntityType::Subdomain => "subdomain",
            EntityType::IpAddress => "ip_address",
            EntityType::MailServer => "mail_server",
            EntityType::Nameserver => "nameserver",
            EntityType::TxtRecord => "txt_record",
            EntityType::DnsRecord => "dns_record",
            EntityType::Email => "email",
            EntityType::Username => "username",
            EntityType::Url => "url",
            EntityType::SocialProfile => "social_profile",
        }
    }

    /// Entity type for a DNS record type; unknown record types fall back to `dns_record`
    pub fn from_dns_record(record_type: &str) -> Self {
        match record_type.trim().to_ascii_uppercase().as_str() {
            "A" => EntityType::IpAddress,
            "MX" => EntityType::MailServer,
            "NS" => EntityType::Nameserver,
            "TXT" => EntityType::TxtRecord,
            _ => EntityType::DnsRecord,
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A discovered asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier, stable for the lifetime of the graph
    pub id: String,
    /// Kind of asset
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    /// Representation as reported by the collector (domain name, email
    /// address, URL...) with surrounding whitespace trimmed; case is kept
    pub value: String,
    /// Collector that produced the entity
    pub source: String,
    /// Creation time, never updated
    pub timestamp: DateTime<Utc>,
    /// Type-specific attributes
    #[serde(default)]
    pub metadata: Metadata,
}

impl Entity {
    /// Identity key used for deduplication
    pub fn identity_key(&self) -> (EntityType, String) {
        (self.entity_type, normalize(&self.value))
    }

    /// Merge metadata into this entity; incoming keys win
    pub fn merge_metadata(&mut self, metadata: Metadata) {
        self.metadata.extend(metadata);
    }
}

/// Normalize a value for identity comparison: trim whitespace, case-fold
pub fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}
