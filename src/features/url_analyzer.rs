use super::{shannon_entropy, ChannelAnalyzer};
use crate::domain_utils::{DomainInfo, DomainParser};
use crate::rules::{ChannelRules, UrlRules};
use crate::scoring::{ScoreCard, Verdict, MAX_SCORE};
use crate::similarity::{self, Similarity, TokenPattern};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use url::Url;

lazy_static! {
    static ref SUSPICIOUS_CHARS: Regex = Regex::new(r"[@\^\[\]\{\}<>\\|]").unwrap();
    static ref PATH_TOKEN: Regex = Regex::new(r"[a-z0-9_-]+").unwrap();
}

/// Entropy is reported on a 0..=1 scale; six bits per character saturates it.
const ENTROPY_NORMALIZER: f64 = 6.0;

pub const INVALID_INPUT_REASON: &str = "invalid input";

/// URL indicators, serialized in evaluation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UrlIndicators {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub invalid_input: bool,
    /// Absent when IP detection is disabled by the rules.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_in_host: Option<bool>,
    pub suspicious_tld: bool,
    pub trusted_suffix: bool,
    pub long_url: bool,
    pub many_subdomains: bool,
    pub hyphen_in_domain: bool,
    pub punycode: bool,
    pub suspicious_chars: bool,
    pub suspicious_path_tokens: Vec<String>,
    pub entropy_score: f64,
    pub known_whitelist: bool,
    pub typosquatting: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mimicked_domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suspicious_domain_pattern: Option<TokenPattern>,
    /// Only evaluated for trusted domains.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suspicious_domain_token_long: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedUrl {
    pub scheme: String,
    pub host: String,
    pub root_domain: String,
    pub subdomain: String,
    /// Percent-decoded.
    pub path: String,
    pub query: String,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UrlAnalysis {
    pub url: String,
    pub score: u8,
    pub verdict: Verdict,
    pub reasons: Vec<String>,
    pub indicators: UrlIndicators,
    pub parsed: Option<ParsedUrl>,
}

impl UrlAnalysis {
    fn invalid(url: &str) -> Self {
        Self {
            url: url.to_string(),
            score: MAX_SCORE,
            verdict: Verdict::Phishing,
            reasons: vec![INVALID_INPUT_REASON.to_string()],
            indicators: UrlIndicators {
                invalid_input: true,
                ..UrlIndicators::default()
            },
            parsed: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct UrlAnalyzer;

impl UrlAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Parse `raw`, assuming `http://` when no scheme is given.
    ///
    /// Returns `None` for anything without a usable host.
    pub fn parse(raw: &str) -> Option<(ParsedUrl, DomainInfo)> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        let candidate = if raw.contains("://") {
            raw.to_string()
        } else {
            format!("http://{}", raw)
        };
        let parsed = Url::parse(&candidate).ok()?;
        let host = parsed.host_str()?.to_lowercase();
        if host.is_empty() {
            return None;
        }

        let info = DomainParser::parse(&host);
        let parsed_url = ParsedUrl {
            scheme: parsed.scheme().to_string(),
            root_domain: info.registrable_domain.clone(),
            subdomain: info.subdomain.clone(),
            path: percent_decode(parsed.path()),
            query: parsed.query().unwrap_or_default().to_string(),
            port: parsed.port(),
            host,
        };
        Some((parsed_url, info))
    }

    fn count_extra_subdomains(subdomain: &str, standard: &BTreeSet<String>) -> usize {
        subdomain
            .split('.')
            .filter(|label| !label.is_empty() && !standard.contains(*label))
            .count()
    }

    fn path_tokens(path: &str, query: &str, keywords: &BTreeSet<String>) -> Vec<String> {
        let haystack = format!("{} {}", path, query).to_lowercase();
        let tokens: BTreeSet<&str> = PATH_TOKEN
            .find_iter(&haystack)
            .map(|m| m.as_str())
            .collect();
        tokens
            .into_iter()
            .filter(|token| keywords.contains(*token))
            .map(str::to_string)
            .collect()
    }
}

impl ChannelAnalyzer for UrlAnalyzer {
    type Input = str;
    type Rules = UrlRules;
    type Output = UrlAnalysis;

    fn analyze(&self, url: &str, rules: &UrlRules) -> UrlAnalysis {
        let original = url.trim();
        let Some((parsed, info)) = Self::parse(original) else {
            log::debug!("Rejecting unparseable URL input: {:?}", original);
            return UrlAnalysis::invalid(original);
        };

        let mut card = ScoreCard::new();
        let mut indicators = UrlIndicators::default();

        if rules.detect_ip_urls {
            indicators.ip_in_host = Some(info.host_is_ip);
            if info.host_is_ip {
                card.add(
                    rules.weight("ip_in_host"),
                    "Host is an IP address (not a domain)",
                );
            }
        }

        // Government and two-letter country suffixes count as a trust signal
        // and silence the structural checks below.
        let top_level = info.top_level();
        let trusted_suffix = top_level == "gov" || top_level.chars().count() == 2;
        indicators.trusted_suffix = trusted_suffix;
        indicators.suspicious_tld = !trusted_suffix && rules.suspicious_tlds.contains(top_level);
        if trusted_suffix {
            card.add(
                rules.weight("trusted_suffix"),
                format!(
                    "Top-level domain '.{}' is a trusted government or country-specific TLD",
                    info.public_suffix
                ),
            );
        } else if indicators.suspicious_tld {
            card.add(
                rules.weight("suspicious_tld"),
                format!(
                    "Top-level domain '.{}' is suspicious/unusual",
                    info.public_suffix
                ),
            );
        }

        let url_len = original.chars().count();
        indicators.long_url = url_len > rules.long_url_length;
        if indicators.long_url {
            card.add(
                rules.weight("long_url"),
                format!("URL length is long ({} characters)", url_len),
            );
        }

        let extra_subdomains =
            Self::count_extra_subdomains(&info.subdomain, &rules.standard_subdomains);
        indicators.many_subdomains = extra_subdomains >= 2 && !trusted_suffix;
        if indicators.many_subdomains {
            card.add(
                rules.weight("many_subdomains"),
                format!("Excessive subdomains detected ({})", extra_subdomains),
            );
        }

        indicators.hyphen_in_domain = info.domain.contains('-') && !trusted_suffix;
        if indicators.hyphen_in_domain {
            card.add(
                rules.weight("hyphen_in_domain"),
                "Hyphen found in root domain (unusual for official entities)",
            );
        }

        indicators.punycode = info.host_is_punycode && !trusted_suffix;
        if indicators.punycode {
            card.add(
                rules.weight("punycode"),
                "Punycode found in host (possible homograph attack)",
            );
        }

        indicators.suspicious_chars = SUSPICIOUS_CHARS.is_match(original) && !trusted_suffix;
        if indicators.suspicious_chars {
            card.add(
                rules.weight("suspicious_chars"),
                "Suspicious characters detected in URL",
            );
        }

        indicators.suspicious_path_tokens =
            Self::path_tokens(&parsed.path, &parsed.query, &rules.phishing_keywords);
        if !indicators.suspicious_path_tokens.is_empty() {
            card.add(
                rules.weight("suspicious_path_tokens"),
                format!(
                    "Suspicious path tokens found: {}",
                    indicators.suspicious_path_tokens.join(", ")
                ),
            );
        }

        let entropy_input = format!("{} {}", parsed.path, parsed.query);
        indicators.entropy_score =
            (shannon_entropy(entropy_input.trim()) / ENTROPY_NORMALIZER).min(1.0);
        if indicators.entropy_score > rules.entropy_threshold && !trusted_suffix {
            card.add(
                rules.weight("url_length_entropy"),
                "High character entropy in path/query (random-looking)",
            );
        }

        let similarity = if info.host_is_ip {
            Similarity::Unrelated
        } else {
            similarity::classify(
                &info.registrable_domain,
                &rules.trusted_domains,
                rules.typo_distance,
            )
        };
        indicators.known_whitelist = similarity.is_exact();

        let trusted = indicators.known_whitelist || trusted_suffix;
        if trusted {
            card.add(
                rules.weight("known_whitelist"),
                format!(
                    "Trust verified: Result is within a secure/official name space ('{}')",
                    info.registrable_domain
                ),
            );
        } else if let Similarity::Typo { brand, .. } = &similarity {
            indicators.typosquatting = true;
            indicators.mimicked_domain = Some(brand.clone());
            card.add(
                rules.weight("typosquatting"),
                format!(
                    "Alert: Domain '{}' mimics trusted brand '{}'",
                    info.registrable_domain, brand
                ),
            );
        }

        // Second pass only runs once the domain has been trusted above.
        if trusted {
            let tokens = similarity::domain_tokens(&info.domain);
            if let Some(pattern) = similarity::find_token_pattern(&tokens) {
                indicators.suspicious_domain_pattern = Some(pattern);
                card.add(
                    rules.weight("suspicious_domain_pattern"),
                    format!(
                        "Suspicious domain pattern detected: {}",
                        pattern.description()
                    ),
                );
            }

            let long_token = tokens
                .iter()
                .any(|token| token.chars().count() > rules.long_token_length);
            indicators.suspicious_domain_token_long = Some(long_token);
            if long_token {
                card.add(
                    rules.weight("suspicious_domain_token_long"),
                    "Unusually long token in domain name",
                );
            }
        }

        let scored = card.finish();
        UrlAnalysis {
            url: original.to_string(),
            score: scored.score,
            verdict: scored.verdict,
            reasons: scored.reasons,
            indicators,
            parsed: Some(parsed),
        }
    }

    fn name(&self) -> &str {
        "url_analyzer"
    }
}

/// Decode `%XX` escapes; malformed escapes are kept verbatim.
fn percent_decode(input: &str) -> String {
    String::from_utf8_lossy(&urlencoding::decode_binary(input.as_bytes())).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(url: &str) -> UrlAnalysis {
        UrlAnalyzer::new().analyze(url, &UrlRules::default())
    }

    #[test]
    fn test_whitelisted_domain_is_safe() {
        let result = analyze("https://www.google.com/search?q=x");
        assert_eq!(result.verdict, Verdict::Safe);
        assert_eq!(result.score, 0);
        assert!(result.indicators.known_whitelist);
        assert_eq!(result.indicators.suspicious_domain_pattern, None);
        assert_eq!(result.indicators.suspicious_domain_token_long, Some(false));

        let parsed = result.parsed.unwrap();
        assert_eq!(parsed.scheme, "https");
        assert_eq!(parsed.root_domain, "google.com");
        assert_eq!(parsed.subdomain, "www");
        assert_eq!(parsed.query, "q=x");
    }

    #[test]
    fn test_ip_host_scores_above_domain_host() {
        let ip = analyze("http://192.168.1.1/login");
        let named = analyze("http://example.com/login");

        assert_eq!(ip.indicators.ip_in_host, Some(true));
        assert_eq!(named.indicators.ip_in_host, Some(false));
        assert!(ip.score > named.score);
        assert_eq!(ip.score, 31);
        assert_eq!(named.score, 6);
    }

    #[test]
    fn test_ip_detection_can_be_disabled() {
        let mut rules = UrlRules::default();
        rules.detect_ip_urls = false;
        let result = UrlAnalyzer::new().analyze("http://10.0.0.1/", &rules);
        assert_eq!(result.indicators.ip_in_host, None);
        assert_eq!(result.score, 0);
    }

    #[test]
    fn test_typosquatted_domain_is_phishing() {
        let result = analyze("http://paypa1.com/signin");
        assert!(result.indicators.typosquatting);
        assert_eq!(result.indicators.mimicked_domain.as_deref(), Some("paypal.com"));
        assert_eq!(result.verdict, Verdict::Phishing);
        // Typo-matched domains are not eligible for the trusted second pass.
        assert_eq!(result.indicators.suspicious_domain_token_long, None);
    }

    #[test]
    fn test_suspicious_tld_and_path_tokens() {
        let result = analyze("secure-update.xyz/account/verify?step=login");
        assert!(result.indicators.suspicious_tld);
        assert!(result.indicators.hyphen_in_domain);
        assert_eq!(
            result.indicators.suspicious_path_tokens,
            vec!["login", "verify"]
        );
        // 18 + 6 + 6
        assert_eq!(result.score, 30);
        assert_eq!(result.verdict, Verdict::Suspicious);
    }

    #[test]
    fn test_country_suffix_is_trusted() {
        let result = analyze("https://login.secure.my-bank.co.uk/a");
        assert!(result.indicators.trusted_suffix);
        assert!(!result.indicators.hyphen_in_domain);
        assert!(!result.indicators.many_subdomains);
        assert_eq!(result.score, 0);
        assert_eq!(result.parsed.unwrap().root_domain, "my-bank.co.uk");
    }

    #[test]
    fn test_trusted_domain_pattern_second_pass() {
        let result = analyze("https://gooogle-account.gov/");
        assert!(result.indicators.trusted_suffix);
        assert_eq!(
            result.indicators.suspicious_domain_pattern,
            Some(TokenPattern::RepeatedCharacters)
        );
        assert!(result
            .reasons
            .iter()
            .any(|r| r == "Suspicious domain pattern detected: Repeated characters in domain"));
    }

    /// Defaults with both trust weights zeroed, so second-pass weights show
    /// up unnetted in the score.
    fn rules_without_trust_credit() -> UrlRules {
        let mut rules = UrlRules::default();
        rules.weights.overlay(
            [("trusted_suffix", 0.0), ("known_whitelist", 0.0)]
                .into_iter()
                .map(|(name, weight)| (name.to_string(), weight))
                .collect(),
        );
        rules
    }

    #[test]
    fn test_trusted_domain_long_token() {
        let url = "https://departmentofmotorvehicles.gov/";
        let result = analyze(url);
        assert_eq!(result.indicators.suspicious_domain_token_long, Some(true));
        assert_eq!(result.indicators.suspicious_domain_pattern, None);
        assert!(result
            .reasons
            .iter()
            .any(|r| r == "Unusually long token in domain name"));
        // -20 - 40 + 6
        assert_eq!(result.score, 0);

        let result = UrlAnalyzer::new().analyze(url, &rules_without_trust_credit());
        assert_eq!(result.score, 6);
        assert_eq!(result.verdict, Verdict::Safe);
    }

    #[test]
    fn test_trusted_domain_numbers_after_brand() {
        let url = "https://google123.gov/";
        let result = analyze(url);
        assert_eq!(
            result.indicators.suspicious_domain_pattern,
            Some(TokenPattern::NumbersAfterBrand)
        );
        assert_eq!(result.indicators.suspicious_domain_token_long, Some(false));
        assert!(result
            .reasons
            .iter()
            .any(|r| r == "Suspicious domain pattern detected: Numbers after brand name"));
        // -20 - 40 + 30
        assert_eq!(result.score, 0);

        let result = UrlAnalyzer::new().analyze(url, &rules_without_trust_credit());
        assert_eq!(result.score, 30);
        assert_eq!(result.verdict, Verdict::Suspicious);
    }

    #[test]
    fn test_many_subdomains_and_long_url() {
        let long_path = "a".repeat(120);
        let result = analyze(&format!("http://a.b.www.example.com/{}", long_path));
        assert!(result.indicators.many_subdomains);
        assert!(result.indicators.long_url);
        assert_eq!(result.score, 14);
    }

    #[test]
    fn test_punycode_and_suspicious_chars() {
        let result = analyze("http://xn--pple-43d.com/@login");
        assert!(result.indicators.punycode);
        assert!(result.indicators.suspicious_chars);
        assert!(result.score >= 26);
    }

    #[test]
    fn test_invalid_input_is_max_risk() {
        for input in ["", "   ", "http://", "http://exa mple.com"] {
            let result = analyze(input);
            assert_eq!(result.score, 100, "{:?}", input);
            assert_eq!(result.verdict, Verdict::Phishing);
            assert_eq!(result.reasons, vec![INVALID_INPUT_REASON.to_string()]);
            assert!(result.indicators.invalid_input);
            assert!(result.parsed.is_none());
        }
    }

    #[test]
    fn test_path_is_percent_decoded() {
        let result = analyze("http://example.com/a%20b/%6Cogin");
        let parsed = result.parsed.unwrap();
        assert_eq!(parsed.path, "/a b/login");
        assert_eq!(result.indicators.suspicious_path_tokens, vec!["login"]);
    }

    #[test]
    fn test_percent_decode_keeps_malformed_escapes() {
        assert_eq!(percent_decode("%zz%4"), "%zz%4");
        assert_eq!(percent_decode("%41%42"), "AB");
        // A sign is not a hex digit.
        assert_eq!(percent_decode("/a%+1b"), "/a%+1b");
        assert_eq!(percent_decode("/a%-1b"), "/a%-1b");
    }

    #[test]
    fn test_deterministic_and_bounded() {
        for url in [
            "https://www.google.com/search?q=x",
            "http://192.168.1.1/login",
            "http://paypa1.com/signin?next=verify&token=Zx81qPw0LmN",
            "https://a.b.c.d.evil-login.tk/%7Bx%7D",
        ] {
            let first = analyze(url);
            let second = analyze(url);
            assert_eq!(first, second);
            assert!(first.score <= 100);
            assert!(!first.reasons.is_empty());
        }
    }
}
