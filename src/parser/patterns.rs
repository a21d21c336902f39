//! Record-level extraction helpers: email validity, URL hosts, profile usernames

use crate::error::{Result, ThreatGraphError};
use regex::Regex;

/// Social platforms recognized in profile URLs, matched by substring
const PLATFORMS: &[(&str, &str)] = &[
    ("twitter", "Twitter"),
    ("github", "GitHub"),
    ("linkedin", "LinkedIn"),
    ("facebook", "Facebook"),
    ("instagram", "Instagram"),
    ("reddit", "Reddit"),
    ("youtube", "YouTube"),
    ("tiktok", "TikTok"),
];

/// Pre-compiled patterns shared by the source parsers
#[derive(Debug, Clone)]
pub struct ReconPatterns {
    email: Regex,
    url_host: Regex,
}

impl ReconPatterns {
    pub fn new() -> Result<Self> {
        Ok(Self {
            email: compile("email", r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")?,
            url_host: compile("url_host", r"(?i)^https?://([^/?#]+)")?,
        })
    }

    /// `local@domain.tld` with an alphabetic TLD of two or more letters, ASCII only
    pub fn is_valid_email(&self, email: &str) -> bool {
        self.email.is_match(email.trim())
    }

    /// Host part of an http(s) URL, without userinfo or port
    pub fn url_host<'a>(&self, url: &'a str) -> Option<&'a str> {
        let authority = self.url_host.captures(url.trim())?.get(1)?.as_str();
        let host = authority.rsplit('@').next().unwrap_or(authority);
        let host = match host.rsplit_once(':') {
            Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
            _ => host,
        };
        (!host.is_empty()).then_some(host)
    }
}

fn compile(name: &str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| ThreatGraphError::Config(format!("Invalid regex for '{}': {}", name, e)))
}

/// Split an email into (local part, domain part)
pub fn split_email(email: &str) -> Option<(&str, &str)> {
    email.trim().split_once('@')
}

/// Platform name for a profile URL, `Unknown` when unrecognized
pub fn platform_name(url: &str) -> &'static str {
    let lowered = url.to_lowercase();
    PLATFORMS
        .iter()
        .find(|(key, _)| lowered.contains(key))
        .map_or("Unknown", |(_, name)| *name)
}

/// Last path segment of a profile URL, ignoring query, fragment and trailing slashes
pub fn profile_username(url: &str) -> Option<&str> {
    let url = url.trim();
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let path = rest.split(['?', '#']).next().unwrap_or_default();
    let mut segments = path.trim_end_matches('/').split('/');
    // first segment is the host
    segments.next();
    let segment = segments.last()?.trim_start_matches('@');
    (!segment.is_empty()).then_some(segment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_validity() {
        let patterns = ReconPatterns::new().unwrap();
        assert!(patterns.is_valid_email("admin@example.com"));
        assert!(patterns.is_valid_email("first.last+tag@mail.example.co.uk"));
        assert!(patterns.is_valid_email(" dev@test.example.com "));
        assert!(!patterns.is_valid_email("not-an-email"));
        assert!(!patterns.is_valid_email("admin@localhost"));
        assert!(!patterns.is_valid_email("admin@example.c0m"));
        assert!(!patterns.is_valid_email("\"quoted\"@example.com"));
        assert!(!patterns.is_valid_email("josé@example.com"));
    }

    #[test]
    fn test_url_host() {
        let patterns = ReconPatterns::new().unwrap();
        assert_eq!(
            patterns.url_host("https://www.example.com/login?next=/"),
            Some("www.example.com")
        );
        assert_eq!(
            patterns.url_host("HTTP://api.example.com:8443"),
            Some("api.example.com")
        );
        assert_eq!(
            patterns.url_host("https://user@portal.example.com/"),
            Some("portal.example.com")
        );
        assert_eq!(patterns.url_host("ftp://files.example.com"), None);
    }

    #[test]
    fn test_split_email() {
        assert_eq!(
            split_email("dev@sales.example.com"),
            Some(("dev", "sales.example.com"))
        );
        assert_eq!(split_email("nobody"), None);
    }

    #[test]
    fn test_platform_and_username() {
        assert_eq!(platform_name("https://GitHub.com/admin"), "GitHub");
        assert_eq!(platform_name("https://mastodon.social/@admin"), "Unknown");
        assert_eq!(profile_username("https://github.com/admin/"), Some("admin"));
        assert_eq!(
            profile_username("https://www.tiktok.com/@security?lang=en"),
            Some("security")
        );
        assert_eq!(profile_username("https://github.com"), None);
        assert_eq!(profile_username("https://"), None);
    }
}
