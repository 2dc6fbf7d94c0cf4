use super::link_analyzer::LinkAnalyzer;
use super::{find_phrases, preview, ChannelAnalyzer};
use crate::rules::{ChannelRules, SmsRules};
use crate::scoring::{ScoreCard, Verdict};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref PHONE_NUMBER: Regex = Regex::new(r"^\+?[0-9\s\-()]{7,}$").unwrap();
    static ref SPECIAL_CHAR: Regex =
        Regex::new(r#"[!@#$%^&*()_+\-=\[\]{};':"\\|,.<>?]"#).unwrap();
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SmsInput {
    /// Display label, e.g. "MyBank".
    pub sender: String,
    pub number: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SmsIndicators {
    pub suspicious_sender_number: bool,
    pub invalid_number_format: bool,
    pub has_links: bool,
    pub shortened_url: bool,
    pub link_sender_mismatch: bool,
    pub urgent_language: bool,
    pub phishing_keywords: bool,
    pub phishing_keyword_count: usize,
    pub unexpected_action: bool,
    pub info_request: bool,
    pub too_good_to_be_true: bool,
    pub bank_mention_without_legitimate_sender: bool,
    pub no_contact_info: bool,
    pub suspicious_sender_name: bool,
    pub excessive_special_chars: bool,
    pub excessive_caps: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SmsAnalysis {
    pub sender: String,
    pub number: String,
    pub content: String,
    pub score: u8,
    pub verdict: Verdict,
    pub reasons: Vec<String>,
    pub indicators: SmsIndicators,
    pub links_found: Vec<String>,
}

#[derive(Debug, Default)]
pub struct SmsAnalyzer;

impl SmsAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// A sender label naming a service whose links point somewhere else.
    fn sender_link_mismatch(sender: &str, links: &[String], rules: &SmsRules) -> bool {
        let sender = sender.to_lowercase();
        let claimed: Vec<&str> = rules
            .service_keywords
            .iter()
            .map(String::as_str)
            .filter(|keyword| sender.contains(keyword))
            .collect();
        if claimed.is_empty() {
            return false;
        }

        links
            .iter()
            .filter_map(|link| LinkAnalyzer::link_domain(link))
            .any(|domain| claimed.iter().any(|keyword| !domain.contains(keyword)))
    }

    fn ratio(count: usize, total: usize) -> f64 {
        count as f64 / total.max(1) as f64
    }
}

impl ChannelAnalyzer for SmsAnalyzer {
    type Input = SmsInput;
    type Rules = SmsRules;
    type Output = SmsAnalysis;

    fn analyze(&self, input: &SmsInput, rules: &SmsRules) -> SmsAnalysis {
        let sender = input.sender.trim();
        let number = input.number.trim();
        let content = input.content.trim();
        let full_text = content.to_lowercase();
        let sender_lower = sender.to_lowercase();

        let mut card = ScoreCard::new();
        let mut indicators = SmsIndicators::default();

        if !number.is_empty() {
            let number_lower = number.to_lowercase();
            indicators.suspicious_sender_number = rules
                .suspicious_numbers
                .iter()
                .any(|pattern| number_lower.contains(pattern.as_str()));
            if indicators.suspicious_sender_number {
                card.add(
                    rules.weight("suspicious_sender_number"),
                    format!("Suspicious sender number: {}", number),
                );
            }

            indicators.invalid_number_format = !PHONE_NUMBER.is_match(number);
            if indicators.invalid_number_format {
                card.add(
                    rules.weight("invalid_number_format"),
                    "Invalid or unusual phone number format",
                );
            }
        }

        let links_found = LinkAnalyzer::extract_links(content);
        indicators.has_links = !links_found.is_empty();
        if indicators.has_links {
            card.add(
                rules.weight("suspicious_link"),
                format!("Found {} link(s) in SMS", links_found.len()),
            );

            let shortened: Vec<&str> = links_found
                .iter()
                .map(String::as_str)
                .filter(|link| LinkAnalyzer::is_shortened(link, &rules.url_shorteners))
                .collect();
            indicators.shortened_url = !shortened.is_empty();
            if indicators.shortened_url {
                card.add(
                    rules.weight("shortened_url"),
                    format!("Shortened URL(s) detected: {}", preview(&shortened, 2)),
                );
            }

            indicators.link_sender_mismatch =
                !sender.is_empty() && Self::sender_link_mismatch(sender, &links_found, rules);
            if indicators.link_sender_mismatch {
                card.add(
                    rules.weight("link_sender_mismatch"),
                    "Links in SMS don't match the claimed sender service",
                );
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

        let keyword_count = rules.count_phishing_keywords(&full_text);
        indicators.phishing_keyword_count = keyword_count;
        indicators.phishing_keywords = keyword_count > 0;
        if indicators.phishing_keywords {
            let weight = rules.weight("phishing_keywords");
            // Half a weight per occurrence, capped at two weights.
            card.add(
                (weight * keyword_count as f64 / 2.0).min(weight * 2.0),
                format!(
                    "Phishing-related keywords detected ({} occurrences)",
                    keyword_count
                ),
            );
        }

        let unexpected = find_phrases(&full_text, &rules.unexpected_action_phrases);
        indicators.unexpected_action = !unexpected.is_empty();
        if indicators.unexpected_action {
            card.add(
                rules.weight("unexpected_action"),
                format!("Requests unexpected action: {}", preview(&unexpected, 2)),
            );
        }

        let info_requests = find_phrases(&full_text, &rules.info_request_keywords);
        indicators.info_request = !info_requests.is_empty();
        if indicators.info_request {
            card.add(
                rules.weight("info_request"),
                format!("Requests sensitive information: {}", info_requests.join(", ")),
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

        let mentions_bank = !find_phrases(&full_text, &rules.bank_keywords).is_empty();
        let bank_like_sender = !find_phrases(&sender_lower, &rules.bank_sender_keywords).is_empty();
        indicators.bank_mention_without_legitimate_sender = mentions_bank && !bank_like_sender;
        if indicators.bank_mention_without_legitimate_sender {
            card.add(
                rules.weight("bank_mention_mismatch"),
                "Mentions banking/financial terms but sender doesn't appear to be a bank",
            );
        }

        // Only counted once the message already looks suspicious.
        indicators.no_contact_info = find_phrases(&full_text, &rules.contact_phrases).is_empty();
        if indicators.no_contact_info && card.raw() > rules.no_contact_min_score {
            card.add(
                rules.weight("no_contact_info"),
                "No contact information or opt-out instructions",
            );
        }

        indicators.suspicious_sender_name =
            !sender.is_empty() && !find_phrases(&sender_lower, &rules.brand_sender_names).is_empty();
        if indicators.suspicious_sender_name {
            card.add(
                rules.weight("suspicious_sender_name"),
                "Sender name mimics well-known service",
            );
        }

        if !content.is_empty() {
            let length = content.chars().count();

            let specials = SPECIAL_CHAR.find_iter(content).count();
            indicators.excessive_special_chars =
                Self::ratio(specials, length) > rules.special_char_ratio;
            if indicators.excessive_special_chars {
                card.add(
                    rules.weight("excessive_special_chars"),
                    "Unusual formatting with excessive special characters",
                );
            }

            if length > rules.caps_min_length {
                let caps = content.chars().filter(|c| c.is_uppercase()).count();
                indicators.excessive_caps = Self::ratio(caps, length) > rules.caps_ratio;
                if indicators.excessive_caps {
                    card.add(
                        rules.weight("excessive_caps"),
                        "Message uses excessive capitalization",
                    );
                }
            }
        }

        let scored = card.finish();
        SmsAnalysis {
            sender: sender.to_string(),
            number: number.to_string(),
            content: content.to_string(),
            score: scored.score,
            verdict: scored.verdict,
            reasons: scored.reasons,
            indicators,
            links_found,
        }
    }

    fn name(&self) -> &str {
        "sms_analyzer"
    }
}
