//! Source parsers: turn each category of the reconnaissance bundle into graph primitives
//!
//! Parsers only call `add_entity` / `add_relationship`, so running one twice on
//! the same input changes metadata at most, never the entity or edge counts.
//! Dirty records (bad emails, non-200 probes, non-HTTP profile URLs, blank
//! values) are skipped and counted. Graph errors propagate.

mod patterns;
mod risk;

pub use patterns::{platform_name, profile_username, split_email, ReconPatterns};
pub use risk::RiskTagger;

use crate::bundle::{ReconBundle, WebEndpoint, WhoisRecord};
use crate::config::Config;
use crate::error::Result;
use crate::graph::{normalize, EntityType, IntelligenceGraph, Metadata};
use serde::Serialize;
use serde_json::json;

pub const SUBDOMAIN_SOURCE: &str = "subfinder";
pub const DNS_SOURCE: &str = "dns_lookup";
pub const WHOIS_SOURCE: &str = "whois";
pub const WEB_SOURCE: &str = "httpx";
pub const SOCIAL_SOURCE: &str = "sherlock";

/// Outcome of one parser run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ParseReport {
    /// Records turned into entities
    pub admitted: usize,
    /// Records dropped as dirty input
    pub skipped: usize,
}

impl ParseReport {
    fn admit(&mut self) {
        self.admitted += 1;
    }

    fn skip(&mut self) {
        self.skipped += 1;
    }
}

/// Per-category reports of a full bundle parse
#[derive(Debug, Clone, Default, Serialize)]
pub struct BundleReport {
    pub subdomains: ParseReport,
    pub dns_records: ParseReport,
    pub whois: ParseReport,
    pub web_endpoints: ParseReport,
    pub emails: ParseReport,
    pub social_profiles: ParseReport,
}

impl BundleReport {
    pub fn total_skipped(&self) -> usize {
        [
            self.subdomains,
            self.dns_records,
            self.whois,
            self.web_endpoints,
            self.emails,
            self.social_profiles,
        ]
        .iter()
        .map(|r| r.skipped)
        .sum()
    }
}

/// Converts raw collector output into entities and relationships
#[derive(Debug, Clone)]
pub struct SourceParser {
    tagger: RiskTagger,
    patterns: ReconPatterns,
    email_source: String,
}

impl SourceParser {
    /// Create a parser from the risk lexicon and parsing settings of `config`
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            tagger: RiskTagger::new(&config.risk_keywords),
            patterns: ReconPatterns::new()?,
            email_source: config.parsing.email_source.clone(),
        })
    }

    /// Run every parser over the bundle in the fixed order:
    /// subdomains, DNS, WHOIS, web endpoints, emails, social profiles
    pub fn parse_bundle(
        &self,
        graph: &mut IntelligenceGraph,
        bundle: &ReconBundle,
    ) -> Result<BundleReport> {
        // WHOIS contacts and harvested addresses are both registrant evidence
        let registrant_emails: Vec<String> = bundle
            .whois_data
            .emails
            .iter()
            .chain(bundle.emails.iter())
            .cloned()
            .collect();

        let report = BundleReport {
            subdomains: self.parse_subdomains(graph, &bundle.subdomains)?,
            dns_records: self.parse_dns_records(graph, &bundle.dns_records)?,
            whois: self.parse_whois(graph, &bundle.whois_data, &registrant_emails)?,
            web_endpoints: self.parse_web_endpoints(graph, &bundle.web_endpoints)?,
            emails: self.parse_emails(graph, &bundle.emails)?,
            social_profiles: self.parse_social_profiles(graph, &bundle.social_profiles)?,
        };

        tracing::info!(
            entities = graph.entity_count(),
            relationships = graph.relationship_count(),
            skipped = report.total_skipped(),
            "Parsing complete"
        );

        Ok(report)
    }

    /// Subdomains become `subdomain` entities linked `subdomain_of` the root
    pub fn parse_subdomains(
        &self,
        graph: &mut IntelligenceGraph,
        subdomains: &[String],
    ) -> Result<ParseReport> {
        tracing::info!("Processing {} subdomains", subdomains.len());
        let mut report = ParseReport::default();
        let root_id = graph.root_id().to_string();
        let target = normalize(graph.target());

        for subdomain in subdomains {
            let normalized = normalize(subdomain);
            if normalized.is_empty() || normalized == target {
                report.skip();
                continue;
            }

            let mut metadata = Metadata::new();
            metadata.insert("parent_domain".to_string(), json!(graph.target()));
            metadata.insert("risk_keywords".to_string(), json!(self.tagger.tags(subdomain)));

            let id = graph.add_entity(
                EntityType::Subdomain,
                subdomain,
                SUBDOMAIN_SOURCE,
                Some(metadata),
            )?;
            graph.add_relationship(&id, &root_id, "subdomain_of", 1.0, None)?;
            report.admit();
        }

        log_skipped("subdomains", &report);
        Ok(report)
    }

    /// DNS values become typed record entities linked `dns_<type>_for` the root
    pub fn parse_dns_records<'a, I>(
        &self,
        graph: &mut IntelligenceGraph,
        records: I,
    ) -> Result<ParseReport>
    where
        I: IntoIterator<Item = (&'a String, &'a Vec<String>)>,
    {
        tracing::info!("Processing DNS records");
        let mut report = ParseReport::default();
        let root_id = graph.root_id().to_string();

        for (record_type, values) in records {
            let record_type = record_type.trim().to_uppercase();
            let entity_type = EntityType::from_dns_record(&record_type);
            let relationship_type = format!("dns_{}_for", record_type.to_lowercase());

            for value in values {
                if value.trim().is_empty() {
                    report.skip();
                    continue;
                }

                let mut metadata = Metadata::new();
                metadata.insert("record_type".to_string(), json!(record_type));

                let id = graph.add_entity(entity_type, value, DNS_SOURCE, Some(metadata))?;
                graph.add_relationship(&id, &root_id, &relationship_type, 1.0, None)?;
                report.admit();
            }
        }

        log_skipped("DNS records", &report);
        Ok(report)
    }

    /// Registration fields land on the root entity; contact emails become
    /// `email` entities `registered_to` the root
    pub fn parse_whois(
        &self,
        graph: &mut IntelligenceGraph,
        whois: &WhoisRecord,
        emails: &[String],
    ) -> Result<ParseReport> {
        tracing::info!("Processing WHOIS data");
        let mut report = ParseReport::default();
        let root_id = graph.root_id().to_string();

        let registration: Metadata = whois
            .registration_fields()
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect();
        if !registration.is_empty() {
            graph.merge_entity_metadata(&root_id, registration)?;
        }

        for email in emails {
            let Some(domain) = self.email_domain(email) else {
                report.skip();
                continue;
            };

            let mut metadata = Metadata::new();
            metadata.insert("domain".to_string(), json!(domain));

            let id = graph.add_entity(EntityType::Email, email, WHOIS_SOURCE, Some(metadata))?;
            graph.add_relationship(&id, &root_id, "registered_to", 0.9, None)?;
            report.admit();
        }

        log_skipped("WHOIS emails", &report);
        Ok(report)
    }

    /// Live (HTTP 200) probes become `url` entities `hosted_on` their host entity
    pub fn parse_web_endpoints(
        &self,
        graph: &mut IntelligenceGraph,
        endpoints: &[WebEndpoint],
    ) -> Result<ParseReport> {
        tracing::info!("Processing {} web endpoints", endpoints.len());
        let mut report = ParseReport::default();

        for endpoint in endpoints {
            if endpoint.url.trim().is_empty() || endpoint.status_code != Some(200) {
                report.skip();
                continue;
            }

            let mut metadata = Metadata::new();
            metadata.insert("status_code".to_string(), json!(200));
            metadata.insert(
                "title".to_string(),
                json!(endpoint.title.clone().unwrap_or_default()),
            );
            metadata.insert(
                "server".to_string(),
                json!(endpoint.server.clone().unwrap_or_default()),
            );
            metadata.insert("technologies".to_string(), json!(endpoint.technologies));
            metadata.insert(
                "content_length".to_string(),
                json!(endpoint.content_length.unwrap_or(0)),
            );

            let url_id = graph.add_entity(EntityType::Url, &endpoint.url, WEB_SOURCE, Some(metadata))?;
            report.admit();

            let host_id = self.patterns.url_host(&endpoint.url).and_then(|host| {
                graph
                    .find_by_value(host, Some(EntityType::Subdomain))
                    .or_else(|| graph.find_by_value(host, Some(EntityType::Domain)))
                    .map(|e| e.id.clone())
            });
            match host_id {
                Some(host_id) => {
                    graph.add_relationship(&url_id, &host_id, "hosted_on", 1.0, None)?;
                }
                None => tracing::debug!("No host entity for {}", endpoint.url),
            }
        }

        log_skipped("web endpoints", &report);
        Ok(report)
    }

    /// Emails labelled with the configured default source
    pub fn parse_emails(
        &self,
        graph: &mut IntelligenceGraph,
        emails: &[String],
    ) -> Result<ParseReport> {
        self.parse_emails_from(graph, emails, &self.email_source)
    }

    /// Emails become `email` entities `associated_with` the root; their local
    /// part becomes a `username` linked `username_of` the email
    pub fn parse_emails_from(
        &self,
        graph: &mut IntelligenceGraph,
        emails: &[String],
        source: &str,
    ) -> Result<ParseReport> {
        tracing::info!("Processing {} emails from {}", emails.len(), source);
        let mut report = ParseReport::default();
        let root_id = graph.root_id().to_string();
        let derived_source = format!("{}_derived", source);

        for email in emails {
            let Some(domain) = self.email_domain(email) else {
                report.skip();
                continue;
            };
            let Some((username, _)) = split_email(email) else {
                report.skip();
                continue;
            };

            let mut metadata = Metadata::new();
            metadata.insert("domain".to_string(), json!(domain));
            let email_id = graph.add_entity(EntityType::Email, email, source, Some(metadata))?;
            graph.add_relationship(&email_id, &root_id, "associated_with", 0.8, None)?;

            let mut metadata = Metadata::new();
            metadata.insert("derived_from".to_string(), json!("email"));
            let username_id =
                graph.add_entity(EntityType::Username, username, &derived_source, Some(metadata))?;
            graph.add_relationship(&username_id, &email_id, "username_of", 0.9, None)?;

            report.admit();
        }

        log_skipped("emails", &report);
        Ok(report)
    }

    /// Profile URLs become `social_profile` entities, linked `profile_of` an
    /// existing `username` with the same handle
    pub fn parse_social_profiles(
        &self,
        graph: &mut IntelligenceGraph,
        profiles: &[String],
    ) -> Result<ParseReport> {
        tracing::info!("Processing {} social profiles", profiles.len());
        let mut report = ParseReport::default();

        for profile_url in profiles {
            let profile_url = profile_url.trim();
            if !profile_url.to_lowercase().starts_with("http") {
                report.skip();
                continue;
            }

            let username = profile_username(profile_url);

            let mut metadata = Metadata::new();
            metadata.insert("platform".to_string(), json!(platform_name(profile_url)));
            metadata.insert("username".to_string(), json!(username.unwrap_or("unknown")));

            let profile_id = graph.add_entity(
                EntityType::SocialProfile,
                profile_url,
                SOCIAL_SOURCE,
                Some(metadata),
            )?;
            report.admit();

            let username_id = username
                .and_then(|name| graph.find_by_value(name, Some(EntityType::Username)))
                .map(|e| e.id.clone());
            if let Some(username_id) = username_id {
                graph.add_relationship(&profile_id, &username_id, "profile_of", 0.95, None)?;
            }
        }

        log_skipped("social profiles", &report);
        Ok(report)
    }

    /// Domain part of a valid email, `None` for anything failing the format check
    fn email_domain<'a>(&self, email: &'a str) -> Option<&'a str> {
        if !self.patterns.is_valid_email(email) {
            tracing::debug!("Dropping invalid email {:?}", email);
            return None;
        }
        split_email(email).map(|(_, domain)| domain)
    }
}

fn log_skipped(category: &str, report: &ParseReport) {
    if report.skipped > 0 {
        tracing::warn!(
            "Skipped {} of {} {}",
            report.skipped,
            report.skipped + report.admitted,
            category
        );
    }
}
