use super::{list_of, normalize_list, Channel, ChannelRules, Weights};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailRules {
    pub weights: Weights,
    /// Second-level labels protected against typosquatting.
    pub trusted_brands: BTreeSet<String>,
    /// Brands too generic to count when they appear in a local-part.
    pub generic_local_parts: BTreeSet<String>,
    pub suspicious_sender_domains: BTreeSet<String>,
    pub urgent_phrases: BTreeSet<String>,
    pub info_request_phrases: BTreeSet<String>,
    pub promo_keywords: BTreeSet<String>,
    pub dangerous_attachments: BTreeSet<String>,
    pub suspicious_subject_keywords: BTreeSet<String>,
    pub generic_greetings: BTreeSet<String>,
    pub link_mismatch_detection: bool,
    pub typo_distance: usize,
    /// Number of leading body characters searched for a canned greeting.
    pub greeting_window: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct EmailRulesOverride {
    pub weights: Option<BTreeMap<String, f64>>,
    pub trusted_brands: Option<Vec<String>>,
    pub generic_local_parts: Option<Vec<String>>,
    pub suspicious_sender_domains: Option<Vec<String>>,
    pub urgent_phrases: Option<Vec<String>>,
    pub info_request_phrases: Option<Vec<String>>,
    pub promo_keywords: Option<Vec<String>>,
    pub dangerous_attachments: Option<Vec<String>>,
    pub suspicious_subject_keywords: Option<Vec<String>>,
    pub generic_greetings: Option<Vec<String>>,
    pub link_mismatch_detection: Option<bool>,
    pub typo_distance: Option<usize>,
    pub greeting_window: Option<usize>,
}

impl Default for EmailRules {
    fn default() -> Self {
        Self {
            weights: Weights::from_pairs(&[
                ("typosquatting", 75.0),
                ("brand_impersonation_local", 55.0),
                ("suspicious_sender_domain", 20.0),
                ("suspicious_link", 15.0),
                ("link_domain_mismatch", 20.0),
                ("urgent_language", 20.0),
                ("info_request", 25.0),
                ("dangerous_attachment", 20.0),
                ("too_good_to_be_true", 25.0),
                ("suspicious_subject", 10.0),
                ("spelling_errors", 25.0),
                ("generic_greeting", 5.0),
            ]),
            trusted_brands: list_of(&["google", "support", "noreply", "github", "opay", "the5ers"]),
            generic_local_parts: list_of(&["support", "noreply"]),
            suspicious_sender_domains: list_of(&[
                "outlook.com",
                "gmail.com",
                "yahoo.com",
                "hotmail.com",
            ]),
            urgent_phrases: list_of(&[
                "urgent",
                "immediately",
                "your account will be closed",
                "last warning",
                "suspended",
                "final notice",
                "verify now",
                "action required",
                "unauthorized access",
                "security alert",
            ]),
            info_request_phrases: list_of(&[
                "password",
                "credit card",
                "debit card",
                "security code",
                "otp",
                "2fa",
                "pin",
                "verify your identity",
                "confirm your details",
            ]),
            promo_keywords: list_of(&[
                "won",
                "reward",
                "free",
                "congratulations",
                "gift",
                "prize",
                "bonus",
                "lottery",
            ]),
            dangerous_attachments: list_of(&[
                ".exe", ".zip", ".rar", ".7z", ".bat", ".scr", ".js", ".vbs", ".jar", ".pdf",
            ]),
            suspicious_subject_keywords: list_of(&[
                "urgent",
                "action required",
                "verify",
                "suspended",
                "locked",
            ]),
            generic_greetings: list_of(&[
                "dear user",
                "dear customer",
                "dear sir/madam",
                "hello",
                "hi there",
            ]),
            link_mismatch_detection: true,
            typo_distance: 2,
            greeting_window: 100,
        }
    }
}

impl ChannelRules for EmailRules {
    type Override = EmailRulesOverride;

    const CHANNEL: Channel = Channel::Email;

    fn apply(&mut self, overrides: EmailRulesOverride) {
        if let Some(weights) = overrides.weights {
            self.weights.overlay(weights);
        }
        let lists = [
            (overrides.trusted_brands, &mut self.trusted_brands),
            (overrides.generic_local_parts, &mut self.generic_local_parts),
            (
                overrides.suspicious_sender_domains,
                &mut self.suspicious_sender_domains,
            ),
            (overrides.urgent_phrases, &mut self.urgent_phrases),
            (overrides.info_request_phrases, &mut self.info_request_phrases),
            (overrides.promo_keywords, &mut self.promo_keywords),
            (overrides.dangerous_attachments, &mut self.dangerous_attachments),
            (
                overrides.suspicious_subject_keywords,
                &mut self.suspicious_subject_keywords,
            ),
            (overrides.generic_greetings, &mut self.generic_greetings),
        ];
        for (replacement, slot) in lists {
            if let Some(items) = replacement {
                *slot = normalize_list(items);
            }
        }
        if let Some(detect) = overrides.link_mismatch_detection {
            self.link_mismatch_detection = detect;
        }
        if let Some(distance) = overrides.typo_distance {
            self.typo_distance = distance;
        }
        if let Some(window) = overrides.greeting_window {
            self.greeting_window = window;
        }
    }

    fn weights(&self) -> &Weights {
        &self.weights
    }

    fn named_list(&self, name: &str) -> Option<&BTreeSet<String>> {
        match name {
            "trusted_brands" => Some(&self.trusted_brands),
            "generic_local_parts" => Some(&self.generic_local_parts),
            "suspicious_sender_domains" => Some(&self.suspicious_sender_domains),
            "urgent_phrases" => Some(&self.urgent_phrases),
            "info_request_phrases" => Some(&self.info_request_phrases),
            "promo_keywords" => Some(&self.promo_keywords),
            "dangerous_attachments" => Some(&self.dangerous_attachments),
            "suspicious_subject_keywords" => Some(&self.suspicious_subject_keywords),
            "generic_greetings" => Some(&self.generic_greetings),
            _ => None,
        }
    }
}
