use super::link_analyzer::LinkAnalyzer;
use super::{find_phrases, preview, ChannelAnalyzer};
use crate::domain_utils::{DomainParser, SenderAddress};
use crate::rules::{ChannelRules, EmailRules};
use crate::scoring::{ScoreCard, Verdict};
use crate::similarity::{self, Similarity};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    // Digit substitution or a run of look-alike strokes (googIIe, paypa1).
    static ref SPELLING_SIGNAL: Regex = Regex::new(r"(?i)[0-9]|[il1|]{3}").unwrap();
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EmailInput {
    pub sender: String,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EmailIndicators {
    pub typosquatting: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impersonated_brand: Option<String>,
    pub brand_impersonation_local: bool,
    pub suspicious_sender_domain: bool,
    pub has_links: bool,
    pub link_domain_mismatch: bool,
    pub urgent_language: bool,
    pub info_request: bool,
    pub dangerous_attachment: bool,
    pub dangerous_attachment_mention: bool,
    pub too_good_to_be_true: bool,
    pub suspicious_subject: bool,
    pub spelling_errors: bool,
    pub generic_greeting: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailAnalysis {
    pub sender: String,
    pub subject: String,
    pub score: u8,
    pub verdict: Verdict,
    pub reasons: Vec<String>,
    pub indicators: EmailIndicators,
    pub links_found: Vec<String>,
    pub attachments_found: Vec<String>,
}

#[derive(Debug, Default)]
pub struct EmailAnalyzer;

impl EmailAnalyzer {
    pub fn new() -> Self {
        Self
    }

    fn has_generic_greeting(body: &str, rules: &EmailRules) -> bool {
        let opening: String = body
            .to_lowercase()
            .chars()
            .take(rules.greeting_window)
            .collect();
        rules
            .generic_greetings
            .iter()
            .any(|greeting| opening.contains(greeting.as_str()))
    }
}

impl ChannelAnalyzer for EmailAnalyzer {
    type Input = EmailInput;
    type Rules = EmailRules;
    type Output = EmailAnalysis;

    fn analyze(&self, input: &EmailInput, rules: &EmailRules) -> EmailAnalysis {
        let sender = input.sender.trim();
        let subject = input.subject.trim();
        let body = input.body.trim();
        let full_text = format!("{} {}", subject, body).to_lowercase();

        let mut card = ScoreCard::new();
        let mut indicators = EmailIndicators::default();

        let sender_domain = SenderAddress::domain(sender).unwrap_or_default();
        let sender_info = DomainParser::parse(&sender_domain);
        let sender_label = sender_info.domain.as_str();

        // Typosquatting outranks every other sender signal.
        if !sender_label.is_empty() {
            if let Similarity::Typo { brand, distance } =
                similarity::classify(sender_label, &rules.trusted_brands, rules.typo_distance)
            {
                log::debug!(
                    "Sender label '{}' is {} edit(s) from brand '{}'",
                    sender_label,
                    distance,
                    brand
                );
                card.add(
                    rules.weight("typosquatting"),
                    format!(
                        "Typosquatting detected: '{}' mimics trusted brand '{}'",
                        sender_domain, brand
                    ),
                );
                indicators.typosquatting = true;
                indicators.impersonated_brand = Some(brand);
            }
        }

        if let Some(local_part) = SenderAddress::local_part(sender) {
            let impersonated = rules
                .trusted_brands
                .iter()
                .filter(|brand| !rules.generic_local_parts.contains(*brand))
                .find(|brand| local_part.contains(brand.as_str()) && sender_label != brand.as_str());
            if let Some(brand) = impersonated {
                card.add(
                    rules.weight("brand_impersonation_local"),
                    format!(
                        "Trusted brand '{}' found in local-part of email (potential impersonation)",
                        brand
                    ),
                );
                indicators.brand_impersonation_local = true;
            }
        }

        indicators.suspicious_sender_domain = !sender_domain.is_empty()
            && rules.suspicious_sender_domains.contains(&sender_domain);
        if indicators.suspicious_sender_domain {
            card.add(
                rules.weight("suspicious_sender_domain"),
                format!(
                    "Sender domain '{}' is commonly used in phishing",
                    sender_domain
                ),
            );
        }

        let links_found = LinkAnalyzer::extract_links(&full_text);
        indicators.has_links = !links_found.is_empty();
        if indicators.has_links {
            card.add(
                rules.weight("suspicious_link"),
                format!("Found {} link(s) in email", links_found.len()),
            );

            if !sender_domain.is_empty() && rules.link_mismatch_detection {
                let sender_root = &sender_info.registrable_domain;
                // Links that fail to parse are skipped, not counted.
                let mismatch = links_found
                    .iter()
                    .filter_map(|link| LinkAnalyzer::link_domain(link))
                    .find(|link_root| link_root != sender_root);
                if let Some(link_root) = mismatch {
                    indicators.link_domain_mismatch = true;
                    card.add(
                        rules.weight("link_domain_mismatch"),
                        format!(
                            "Link domain '{}' doesn't match sender domain '{}'",
                            link_root, sender_root
                        ),
                    );
                }
            }
        }

        let urgent = find_phrases(&full_text, &rules.urgent_phrases);
        indicators.urgent_language = !urgent.is_empty();
        if indicators.urgent_language {
            card.add(
                rules.weight("urgent_language"),
                format!(
                    "Urgent/fear-based language detected: {}",
                    preview(&urgent, 3)
                ),
            );
        }

        let info_requests = find_phrases(&full_text, &rules.info_request_phrases);
        indicators.info_request = !info_requests.is_empty();
        if indicators.info_request {
            card.add(
                rules.weight("info_request"),
                format!(
                    "Requests sensitive information: {}",
                    preview(&info_requests, 3)
                ),
            );
        }

        let dangerous: Vec<&str> = input
            .attachments
            .iter()
            .map(String::as_str)
            .filter(|name| {
                let name = name.to_lowercase();
                rules
                    .dangerous_attachments
                    .iter()
                    .any(|ext| name.ends_with(ext.as_str()))
            })
            .collect();
        indicators.dangerous_attachment = !dangerous.is_empty();
        if indicators.dangerous_attachment {
            card.add(
                rules.weight("dangerous_attachment"),
                format!("Dangerous attachment(s) detected: {}", dangerous.join(", ")),
            );
        } else if !find_phrases(&full_text, &rules.dangerous_attachments).is_empty() {
            indicators.dangerous_attachment_mention = true;
            card.add(
                rules.weight("dangerous_attachment") * 0.5,
                "Email mentions dangerous file types",
            );
        }

        let promos = find_phrases(&full_text, &rules.promo_keywords);
        indicators.too_good_to_be_true = !promos.is_empty();
        if indicators.too_good_to_be_true {
            card.add(
                rules.weight("too_good_to_be_true"),
                format!("Suspicious promotional language: {}", preview(&promos, 3)),
            );
        }

        let subject_lower = subject.to_lowercase();
        indicators.suspicious_subject = !subject.is_empty()
            && !find_phrases(&subject_lower, &rules.suspicious_subject_keywords).is_empty();
        if indicators.suspicious_subject {
            card.add(
                rules.weight("suspicious_subject"),
                "Suspicious subject line detected",
            );
        }

        indicators.spelling_errors = SPELLING_SIGNAL.is_match(sender);
        if indicators.spelling_errors {
            card.add(
                rules.weight("spelling_errors"),
                "Potential spelling errors or typosquatting in sender address",
            );
        }

        indicators.generic_greeting = Self::has_generic_greeting(body, rules);
        if indicators.generic_greeting {
            card.add(
                rules.weight("generic_greeting"),
                "Uses generic greeting instead of personal name",
            );
        }

        let scored = card.finish();
        EmailAnalysis {
            sender: sender.to_string(),
            subject: subject.to_string(),
            score: scored.score,
            verdict: scored.verdict,
            reasons: scored.reasons,
            indicators,
            links_found,
            attachments_found: input.attachments.clone(),
        }
    }

    fn name(&self) -> &str {
        "email_analyzer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::NO_FINDINGS_REASON;

    fn analyze(input: &EmailInput) -> EmailAnalysis {
        EmailAnalyzer::new().analyze(input, &EmailRules::default())
    }

    fn analyze_sender(sender: &str) -> EmailAnalysis {
        analyze(&EmailInput {
            sender: sender.to_string(),
            ..EmailInput::default()
        })
    }

    #[test]
    fn test_typosquatted_sender_is_phishing() {
        let result = analyze_sender("admin@googie.com");
        assert!(result.indicators.typosquatting);
        assert_eq!(result.indicators.impersonated_brand.as_deref(), Some("google"));
        assert_eq!(result.score, 75);
        assert_eq!(result.verdict, Verdict::Phishing);
    }

    #[test]
    fn test_official_brand_domain_is_not_phishing() {
        let result = analyze_sender("security@google.com");
        assert!(!result.indicators.typosquatting);
        assert_ne!(result.verdict, Verdict::Phishing);
        assert_eq!(result.score, 0);
    }

    #[test]
    fn test_brand_in_local_part_is_phishing() {
        let result = analyze_sender("googlesecurity@gmail.com");
        assert!(result.indicators.brand_impersonation_local);
        assert!(result.indicators.suspicious_sender_domain);
        assert_eq!(result.score, 75);
        assert_eq!(result.verdict, Verdict::Phishing);

        let result = analyze_sender("github-support@yahoo.com");
        assert!(result.indicators.brand_impersonation_local);
        assert_eq!(result.verdict, Verdict::Phishing);
    }

    #[test]
    fn test_unrelated_sender_is_safe() {
        let result = analyze_sender("random@example.com");
        assert_eq!(result.score, 0);
        assert_eq!(result.verdict, Verdict::Safe);
        assert_eq!(result.reasons, vec![NO_FINDINGS_REASON.to_string()]);
    }

    #[test]
    fn test_webmail_sender_alone_stays_safe() {
        let result = analyze_sender("my.name@gmail.com");
        assert!(result.indicators.suspicious_sender_domain);
        assert!(!result.indicators.brand_impersonation_local);
        assert_eq!(result.score, 20);
        assert_eq!(result.verdict, Verdict::Safe);
    }

    #[test]
    fn test_known_typosquat_senders() {
        for sender in ["info@the5erss.com", "noreply@githuub.com", "pay@0pay.com"] {
            let result = analyze_sender(sender);
            assert!(result.indicators.typosquatting, "{}", sender);
            assert_eq!(result.verdict, Verdict::Phishing, "{}", sender);
        }
        // Digit substitution also trips the spelling heuristic.
        assert_eq!(analyze_sender("pay@0pay.com").score, 100);
    }

    #[test]
    fn test_links_and_mismatch() {
        let input = EmailInput {
            sender: "alerts@bank.com".to_string(),
            subject: "Notice".to_string(),
            body: "See https://bank.com/help and https://evil.example.net/login".to_string(),
            attachments: vec![],
        };
        let result = analyze(&input);
        assert_eq!(result.links_found.len(), 2);
        assert!(result.indicators.has_links);
        assert!(result.indicators.link_domain_mismatch);
        assert!(result
            .reasons
            .iter()
            .any(|r| r == "Link domain 'example.net' doesn't match sender domain 'bank.com'"));
        // 15 + 20
        assert_eq!(result.score, 35);
    }

    #[test]
    fn test_link_mismatch_under_city_suffix() {
        let input = EmailInput {
            sender: "notice@city.kyoto.jp".to_string(),
            body: "https://attacker.kyoto.jp/pay".to_string(),
            ..EmailInput::default()
        };
        let result = analyze(&input);
        assert!(result.indicators.link_domain_mismatch);
        assert!(result.reasons.iter().any(
            |r| r == "Link domain 'attacker.kyoto.jp' doesn't match sender domain 'city.kyoto.jp'"
        ));
        assert_eq!(result.score, 35);
    }

    #[test]
    fn test_link_mismatch_can_be_disabled() {
        let mut rules = EmailRules::default();
        rules.link_mismatch_detection = false;
        let input = EmailInput {
            sender: "alerts@bank.com".to_string(),
            body: "https://evil.example.net/login".to_string(),
            ..EmailInput::default()
        };
        let result = EmailAnalyzer::new().analyze(&input, &rules);
        assert!(!result.indicators.link_domain_mismatch);
        assert_eq!(result.score, 15);
    }

    #[test]
    fn test_content_keyword_lists() {
        let input = EmailInput {
            sender: "team@example.com".to_string(),
            subject: "URGENT: Action Required".to_string(),
            body: "Dear customer, congratulations! Confirm your password immediately.".to_string(),
            attachments: vec![],
        };
        let result = analyze(&input);
        assert!(result.indicators.urgent_language);
        assert!(result.indicators.info_request);
        assert!(result.indicators.too_good_to_be_true);
        assert!(result.indicators.suspicious_subject);
        assert!(result.indicators.generic_greeting);
        // 20 + 25 + 25 + 10 + 5
        assert_eq!(result.score, 85);
        assert_eq!(result.verdict, Verdict::Phishing);
    }

    #[test]
    fn test_attachment_beats_body_mention() {
        let with_file = EmailInput {
            sender: "team@example.com".to_string(),
            body: "Open invoice.exe to continue".to_string(),
            attachments: vec!["Invoice.EXE".to_string()],
            ..EmailInput::default()
        };
        let result = analyze(&with_file);
        assert!(result.indicators.dangerous_attachment);
        assert!(!result.indicators.dangerous_attachment_mention);
        assert_eq!(result.score, 20);
        assert_eq!(result.attachments_found, vec!["Invoice.EXE".to_string()]);

        let mention_only = EmailInput {
            attachments: vec![],
            ..with_file
        };
        let result = analyze(&mention_only);
        assert!(result.indicators.dangerous_attachment_mention);
        assert_eq!(result.score, 10);
    }

    #[test]
    fn test_greeting_window() {
        let late = format!("{} dear customer", "x".repeat(120));
        let input = EmailInput {
            sender: "team@example.com".to_string(),
            body: late,
            ..EmailInput::default()
        };
        assert!(!analyze(&input).indicators.generic_greeting);
    }

    #[test]
    fn test_deterministic_and_bounded() {
        let input = EmailInput {
            sender: "g00gle-support@gmail.com".to_string(),
            subject: "Urgent: verify your account".to_string(),
            body: "Dear user, you won a prize! Send your password and otp to https://x.tk/a.exe"
                .to_string(),
            attachments: vec!["payload.scr".to_string()],
        };
        let first = analyze(&input);
        assert_eq!(first, analyze(&input));
        assert_eq!(first.score, 100);
        assert!(!first.reasons.is_empty());
    }
}
