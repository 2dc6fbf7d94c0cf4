use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

lazy_static! {
    static ref IPV4_LITERAL: Regex = Regex::new(r"^\d{1,3}(?:\.\d{1,3}){3}$").unwrap();
    static ref HOST_LABEL: Regex = Regex::new(r"^[a-z0-9_-]{1,63}$").unwrap();
}

/// Components of a hostname. Derived per call, never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DomainInfo {
    /// Labels left of the registrable domain, dot-joined.
    pub subdomain: String,
    /// The single label directly left of the public suffix.
    pub domain: String,
    pub public_suffix: String,
    /// `domain` plus `public_suffix`; the IP literal itself for IP hosts.
    pub registrable_domain: String,
    pub host_is_ip: bool,
    pub host_is_punycode: bool,
}

impl DomainInfo {
    /// True when the host could not be decomposed at all.
    pub fn is_empty(&self) -> bool {
        self.registrable_domain.is_empty() && !self.host_is_ip
    }

    /// Rightmost label of the public suffix (`uk` for `co.uk`).
    pub fn top_level(&self) -> &str {
        self.public_suffix.rsplit('.').next().unwrap_or("")
    }
}

pub struct DomainParser;

impl DomainParser {
    /// Decompose `host`. Malformed input yields an empty [`DomainInfo`].
    pub fn parse(host: &str) -> DomainInfo {
        let host = host.trim().trim_end_matches('.').to_lowercase();
        if host.is_empty() {
            return DomainInfo::default();
        }

        if (host.starts_with('[') && host.ends_with(']')) || IPV4_LITERAL.is_match(&host) {
            return DomainInfo {
                domain: host.clone(),
                registrable_domain: host,
                host_is_ip: true,
                ..DomainInfo::default()
            };
        }

        let labels: Vec<&str> = host.split('.').collect();
        if labels.iter().any(|label| !HOST_LABEL.is_match(label)) {
            return DomainInfo::default();
        }

        let host_is_punycode = labels.iter().any(|label| label.starts_with("xn--"));
        // Hosts under an unlisted TLD fall back to the implicit `*` rule.
        let public_suffix = psl::suffix_str(&host).unwrap_or_default().to_string();
        let Some(registrable) = psl::domain_str(&host) else {
            // Nothing registrable left of the suffix.
            return DomainInfo {
                public_suffix,
                host_is_punycode,
                ..DomainInfo::default()
            };
        };

        let registrable_domain = registrable.to_string();
        let domain = registrable_domain
            .strip_suffix(public_suffix.as_str())
            .map(|head| head.trim_end_matches('.'))
            .unwrap_or_default()
            .to_string();
        let subdomain = host
            .strip_suffix(registrable_domain.as_str())
            .map(|head| head.trim_end_matches('.'))
            .unwrap_or_default()
            .to_string();

        DomainInfo {
            subdomain,
            domain,
            public_suffix,
            registrable_domain,
            host_is_ip: false,
            host_is_punycode,
        }
    }
}

/// Splits a sender address into its local-part and domain.
pub struct SenderAddress;

impl SenderAddress {
    /// Lowercased domain after the last `@`.
    pub fn domain(address: &str) -> Option<String> {
        address
            .rsplit_once('@')
            .map(|(_, domain)| domain.trim().to_lowercase())
            .filter(|domain| !domain.is_empty())
    }

    /// Lowercased local-part before the last `@`.
    pub fn local_part(address: &str) -> Option<String> {
        address
            .rsplit_once('@')
            .map(|(local, _)| local.trim().to_lowercase())
            .filter(|local| !local.is_empty())
    }
}
