use super::{list_of, normalize_list, Channel, ChannelRules, Weights};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UrlRules {
    pub weights: Weights,
    /// Stored without the leading dot.
    pub suspicious_tlds: BTreeSet<String>,
    pub trusted_domains: BTreeSet<String>,
    pub phishing_keywords: BTreeSet<String>,
    /// Subdomain labels that do not count towards the subdomain check.
    pub standard_subdomains: BTreeSet<String>,
    pub detect_ip_urls: bool,
    pub long_url_length: usize,
    pub entropy_threshold: f64,
    /// Maximum edit distance still classified as a typosquat.
    pub typo_distance: usize,
    pub long_token_length: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct UrlRulesOverride {
    pub weights: Option<BTreeMap<String, f64>>,
    pub suspicious_tlds: Option<Vec<String>>,
    pub trusted_domains: Option<Vec<String>>,
    pub phishing_keywords: Option<Vec<String>>,
    pub standard_subdomains: Option<Vec<String>>,
    pub detect_ip_urls: Option<bool>,
    pub long_url_length: Option<usize>,
    pub entropy_threshold: Option<f64>,
    pub typo_distance: Option<usize>,
    pub long_token_length: Option<usize>,
}

impl Default for UrlRules {
    fn default() -> Self {
        Self {
            weights: Weights::from_pairs(&[
                ("ip_in_host", 25.0),
                ("suspicious_tld", 18.0),
                ("long_url", 6.0),
                ("many_subdomains", 8.0),
                ("hyphen_in_domain", 6.0),
                ("punycode", 20.0),
                ("suspicious_chars", 6.0),
                ("suspicious_path_tokens", 6.0),
                ("url_length_entropy", 5.0),
                ("trusted_suffix", -20.0),
                ("known_whitelist", -40.0),
                ("typosquatting", 65.0),
                ("suspicious_domain_pattern", 30.0),
                ("suspicious_domain_token_long", 6.0),
            ]),
            suspicious_tlds: tld_list([
                ".xyz", ".top", ".gq", ".tk", ".ml", ".ga", ".icu", ".buzz", ".rest",
                ".monster", ".zip", ".click", ".work", ".cn", ".ru",
            ]),
            trusted_domains: list_of(&[
                "google.com",
                "paypal.com",
                "facebook.com",
                "youtube.com",
                "amazon.com",
                "netflix.com",
                "microsoft.com",
                "apple.com",
                "github.com",
                "linkedin.com",
            ]),
            phishing_keywords: list_of(&[
                "login",
                "verify",
                "secure",
                "update",
                "unlock",
                "banking",
                "password",
                "confirm",
                "recovery",
                "account-security",
                "free-gift",
                "bonus",
                "promo",
                "alert",
                "suspend",
                "urgent",
                "auth",
                "2fa",
            ]),
            standard_subdomains: list_of(&["www", "m"]),
            detect_ip_urls: true,
            long_url_length: 100,
            entropy_threshold: 0.9,
            typo_distance: 2,
            long_token_length: 20,
        }
    }
}

impl ChannelRules for UrlRules {
    type Override = UrlRulesOverride;

    const CHANNEL: Channel = Channel::Url;

    fn apply(&mut self, overrides: UrlRulesOverride) {
        if let Some(weights) = overrides.weights {
            self.weights.overlay(weights);
        }
        if let Some(tlds) = overrides.suspicious_tlds {
            self.suspicious_tlds = tld_list(tlds);
        }
        if let Some(domains) = overrides.trusted_domains {
            self.trusted_domains = normalize_list(domains);
        }
        if let Some(keywords) = overrides.phishing_keywords {
            self.phishing_keywords = normalize_list(keywords);
        }
        if let Some(labels) = overrides.standard_subdomains {
            self.standard_subdomains = normalize_list(labels);
        }
        if let Some(detect) = overrides.detect_ip_urls {
            self.detect_ip_urls = detect;
        }
        if let Some(length) = overrides.long_url_length {
            self.long_url_length = length;
        }
        if let Some(threshold) = overrides.entropy_threshold {
            self.entropy_threshold = threshold;
        }
        if let Some(distance) = overrides.typo_distance {
            self.typo_distance = distance;
        }
        if let Some(length) = overrides.long_token_length {
            self.long_token_length = length;
        }
    }

    fn weights(&self) -> &Weights {
        &self.weights
    }

    fn named_list(&self, name: &str) -> Option<&BTreeSet<String>> {
        match name {
            "suspicious_tlds" => Some(&self.suspicious_tlds),
            "trusted_domains" => Some(&self.trusted_domains),
            "phishing_keywords" => Some(&self.phishing_keywords),
            "standard_subdomains" => Some(&self.standard_subdomains),
            _ => None,
        }
    }
}

fn tld_list<I, S>(items: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    normalize_list(
        items
            .into_iter()
            .map(|tld| tld.as_ref().trim().trim_start_matches('.').to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tlds_lose_leading_dot() {
        let rules = UrlRules::default();
        assert!(rules.suspicious_tlds.contains("xyz"));
        assert!(!rules.suspicious_tlds.contains(".xyz"));
    }

    #[test]
    fn test_partial_override_keeps_other_defaults() {
        let mut rules = UrlRules::default();
        let overrides: UrlRulesOverride = serde_json::from_str(
            r#"{"suspicious_tlds": [".Biz"], "weights": {"ip_in_host": 40}}"#,
        )
        .unwrap();
        rules.apply(overrides);

        assert_eq!(rules.suspicious_tlds.len(), 1);
        assert!(rules.suspicious_tlds.contains("biz"));
        assert_eq!(rules.weight("ip_in_host"), 40.0);
        assert_eq!(rules.weight("punycode"), 20.0);
        assert!(rules.trusted_domains.contains("paypal.com"));
        assert_eq!(rules.typo_distance, 2);
    }
}
