//! Risk keyword tagging for subdomains

use crate::config::RiskKeywords;

/// Tags subdomains with `<keyword>_<tier>` for every configured keyword they contain
#[derive(Debug, Clone)]
pub struct RiskTagger {
    /// (tier, lowercased keyword) in tagging order
    keywords: Vec<(&'static str, String)>,
}

impl RiskTagger {
    pub fn new(lexicon: &RiskKeywords) -> Self {
        let keywords = lexicon
            .tiers()
            .into_iter()
            .flat_map(|(tier, words)| {
                words
                    .iter()
                    .map(|w| w.trim().to_lowercase())
                    .filter(|w| !w.is_empty())
                    .map(move |w| (tier, w))
            })
            .collect();
        Self { keywords }
    }

    /// Every matching tag, tier order first then keyword order
    pub fn tags(&self, subdomain: &str) -> Vec<String> {
        let lowered = subdomain.to_lowercase();
        self.keywords
            .iter()
            .filter(|(_, keyword)| lowered.contains(keyword.as_str()))
            .map(|(tier, keyword)| format!("{}_{}", keyword, tier))
            .collect()
    }
}
