use crate::config::Config;
use crate::error::{ConfigIssue, Result, ThreatGraphError};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration, collecting every issue before failing
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_storage(config, &mut errors);
        Self::validate_risk_keywords(config, &mut errors);
        Self::validate_parsing(config, &mut errors);
        Self::validate_correlation(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ThreatGraphError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ConfigIssue>) {
        let version = &config.meta.schema_version;
        if version != "1.0.0" {
            errors.push(ConfigIssue::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_storage(config: &Config, errors: &mut Vec<ConfigIssue>) {
        if config.storage.data_dir.as_os_str().is_empty() {
            errors.push(ConfigIssue::new(
                "storage.data_dir",
                "Data directory cannot be empty",
            ));
        }
    }

    fn validate_risk_keywords(config: &Config, errors: &mut Vec<ConfigIssue>) {
        for (tier, keywords) in config.risk_keywords.tiers() {
            // A blank keyword would match every subdomain
            if let Some(idx) = keywords.iter().position(|k| k.trim().is_empty()) {
                errors.push(ConfigIssue::new(
                    format!("risk_keywords.{}[{}]", tier, idx),
                    "Keyword cannot be blank",
                ));
            }
        }
    }

    fn validate_parsing(config: &Config, errors: &mut Vec<ConfigIssue>) {
        if config.parsing.email_source.trim().is_empty() {
            errors.push(ConfigIssue::new(
                "parsing.email_source",
                "Email source label cannot be empty",
            ));
        }
    }

    fn validate_correlation(config: &Config, errors: &mut Vec<ConfigIssue>) {
        if config.correlation.high_value_threshold == 0 {
            errors.push(ConfigIssue::new(
                "correlation.high_value_threshold",
                "High-value threshold must be greater than 0",
            ));
        }
    }
}
