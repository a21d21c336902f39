//! Reconnaissance bundle produced by the collection layer
//!
//! Every category is optional; an absent category deserializes as empty.

use crate::error::{Result, ThreatGraphError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Materialized output of all collectors for one target
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconBundle {
    pub target: String,
    #[serde(default, deserialize_with = "nullable")]
    pub subdomains: Vec<String>,
    /// Record type (`A`, `MX`, `NS`, `TXT`, ...) -> values
    #[serde(default, deserialize_with = "nullable")]
    pub dns_records: BTreeMap<String, Vec<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub whois_data: WhoisRecord,
    #[serde(default, deserialize_with = "nullable")]
    pub emails: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub web_endpoints: Vec<WebEndpoint>,
    #[serde(default, deserialize_with = "nullable")]
    pub social_profiles: Vec<String>,
}

/// Registration data for the target domain
///
/// Date fields stay as raw JSON: registrars report either a single value or a list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WhoisRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registrar: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "nullable")]
    pub emails: Vec<String>,
}

impl WhoisRecord {
    /// Registration fields that carry a value, keyed by their metadata name
    pub fn registration_fields(&self) -> Vec<(&'static str, serde_json::Value)> {
        [
            ("registrar", &self.registrar),
            ("creation_date", &self.creation_date),
            ("expiration_date", &self.expiration_date),
        ]
        .into_iter()
        .filter_map(|(key, value)| match value {
            Some(v) if !v.is_null() => Some((key, v.clone())),
            _ => None,
        })
        .collect()
    }
}

/// One web probe result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebEndpoint {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub content_length: Option<u64>,
}

/// Treat an explicit `null` the same as a missing field
fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl ReconBundle {
    /// Load a bundle from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ThreatGraphError::Io {
            source: e,
            context: format!("Failed to read bundle: {}", path.display()),
        })?;
        Self::from_json(&content)
    }

    /// Parse a bundle from JSON text
    pub fn from_json(content: &str) -> Result<Self> {
        let bundle: ReconBundle =
            serde_json::from_str(content).map_err(|e| ThreatGraphError::Json {
                source: e,
                context: "Failed to parse reconnaissance bundle".to_string(),
            })?;

        if bundle.target.trim().is_empty() {
            return Err(ThreatGraphError::Validation(
                "bundle target cannot be empty".to_string(),
            ));
        }

        Ok(bundle)
    }
}
