//! threatgraph - Intelligence graph engine for domain reconnaissance
//!
//! Assembles subdomains, DNS records, WHOIS data, emails, social profiles and
//! probed web endpoints into one identity-resolved entity/relationship graph,
//! runs correlation passes over it and persists it as a JSON artifact for
//! risk scoring and visualization.

pub mod bundle;
pub mod cli;
pub mod config;
pub mod correlation;
pub mod error;
pub mod graph;
pub mod parser;
pub mod persistence;
pub mod pipeline;

pub use error::{Result, ThreatGraphError};
