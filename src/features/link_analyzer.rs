use crate::domain_utils::DomainParser;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;
use url::Url;

lazy_static! {
    static ref LINK_PATTERN: Regex = Regex::new(r#"(?i)https?://[^\s<>"{}|\\^`\[\]]+"#).unwrap();
}

/// Link helpers shared by the email and SMS pipelines.
pub struct LinkAnalyzer;

impl LinkAnalyzer {
    /// All http(s) links in `text`, in order of appearance.
    pub fn extract_links(text: &str) -> Vec<String> {
        LINK_PATTERN
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// Lowercased host of a link, `None` when the link does not parse.
    pub fn link_host(link: &str) -> Option<String> {
        let parsed = Url::parse(link).ok()?;
        parsed
            .host_str()
            .map(|host| host.to_lowercase())
            .filter(|host| !host.is_empty())
    }

    /// Registrable domain of a link (`mail.google.com` -> `google.com`).
    ///
    /// Falls back to the bare host when it has no registrable part, so a
    /// `localhost` link still compares as something.
    pub fn link_domain(link: &str) -> Option<String> {
        let host = Self::link_host(link)?;
        let info = DomainParser::parse(&host);
        if info.is_empty() {
            Some(host)
        } else {
            Some(info.registrable_domain)
        }
    }

    /// True when the link's host is a listed shortener or a subdomain of one.
    pub fn is_shortened(link: &str, shorteners: &BTreeSet<String>) -> bool {
        let Some(host) = Self::link_host(link) else {
            return false;
        };
        let host = host.strip_prefix("www.").unwrap_or(&host);
        shorteners.iter().any(|shortener| {
            host == shortener.as_str()
                || host
                    .strip_suffix(shortener.as_str())
                    .is_some_and(|head| head.ends_with('.'))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::list_of;

    #[test]
    fn test_extract_links() {
        let text = "Verify at https://bit.ly/abc123 or HTTP://Example.com/login?id=1 now";
        assert_eq!(
            LinkAnalyzer::extract_links(text),
            vec!["https://bit.ly/abc123", "HTTP://Example.com/login?id=1"]
        );
        assert!(LinkAnalyzer::extract_links("no links here").is_empty());
    }

    #[test]
    fn test_link_stops_at_delimiters() {
        let links = LinkAnalyzer::extract_links(r#"<a href="https://evil.example/x">click</a>"#);
        assert_eq!(links, vec!["https://evil.example/x"]);
    }

    #[test]
    fn test_link_domain() {
        assert_eq!(
            LinkAnalyzer::link_domain("https://accounts.google.com/signin"),
            Some("google.com".to_string())
        );
        assert_eq!(
            LinkAnalyzer::link_domain("http://192.168.1.1/login"),
            Some("192.168.1.1".to_string())
        );
        assert_eq!(
            LinkAnalyzer::link_domain("http://localhost:8080/"),
            Some("localhost".to_string())
        );
    }

    #[test]
    fn test_shortener_matching_is_domain_based() {
        let shorteners = list_of(&["bit.ly", "t.co"]);
        assert!(LinkAnalyzer::is_shortened("https://bit.ly/x", &shorteners));
        assert!(LinkAnalyzer::is_shortened("https://www.bit.ly/x", &shorteners));
        assert!(!LinkAnalyzer::is_shortened(
            "https://reddit.com/r/rust",
            &shorteners
        ));
        assert!(!LinkAnalyzer::is_shortened("https://t.com/x", &shorteners));
        assert!(!LinkAnalyzer::is_shortened("https://notbit.ly/x", &shorteners));
        assert!(LinkAnalyzer::is_shortened("https://go.t.co/x", &shorteners));
    }
}
