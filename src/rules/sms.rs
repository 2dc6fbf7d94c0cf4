use super::{list_of, normalize_list, Channel, ChannelRules, Weights, WordPattern};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SmsRules {
    pub weights: Weights,
    /// Substrings that mark a sender number as spoofed or withheld.
    pub suspicious_numbers: BTreeSet<String>,
    pub urgent_phrases: BTreeSet<String>,
    /// Counted as whole words. Replace through `apply` so the compiled
    /// pattern stays in step.
    pub phishing_keywords: BTreeSet<String>,
    #[serde(skip)]
    phishing_keyword_pattern: WordPattern,
    pub unexpected_action_phrases: BTreeSet<String>,
    pub info_request_keywords: BTreeSet<String>,
    pub promo_keywords: BTreeSet<String>,
    pub bank_keywords: BTreeSet<String>,
    pub bank_sender_keywords: BTreeSet<String>,
    /// Sender-label tokens that imply a service whose links should match it.
    pub service_keywords: BTreeSet<String>,
    pub brand_sender_names: BTreeSet<String>,
    pub contact_phrases: BTreeSet<String>,
    pub url_shorteners: BTreeSet<String>,
    pub no_contact_min_score: f64,
    pub special_char_ratio: f64,
    pub caps_ratio: f64,
    pub caps_min_length: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct SmsRulesOverride {
    pub weights: Option<BTreeMap<String, f64>>,
    pub suspicious_numbers: Option<Vec<String>>,
    pub urgent_phrases: Option<Vec<String>>,
    pub phishing_keywords: Option<Vec<String>>,
    pub unexpected_action_phrases: Option<Vec<String>>,
    pub info_request_keywords: Option<Vec<String>>,
    pub promo_keywords: Option<Vec<String>>,
    pub bank_keywords: Option<Vec<String>>,
    pub bank_sender_keywords: Option<Vec<String>>,
    pub service_keywords: Option<Vec<String>>,
    pub brand_sender_names: Option<Vec<String>>,
    pub contact_phrases: Option<Vec<String>>,
    pub url_shorteners: Option<Vec<String>>,
    pub no_contact_min_score: Option<f64>,
    pub special_char_ratio: Option<f64>,
    pub caps_ratio: Option<f64>,
    pub caps_min_length: Option<usize>,
}

impl Default for SmsRules {
    fn default() -> Self {
        let phishing_keywords = list_of(&[
            "bank", "login", "verify", "password", "click", "promo", "free", "bonus", "gift",
        ]);
        Self {
            weights: Weights::from_pairs(&[
                ("suspicious_sender_number", 25.0),
                ("invalid_number_format", 10.0),
                ("suspicious_link", 25.0),
                ("shortened_url", 30.0),
                ("link_sender_mismatch", 30.0),
                ("urgent_language", 20.0),
                ("phishing_keywords", 15.0),
                ("unexpected_action", 25.0),
                ("info_request", 30.0),
                ("too_good_to_be_true", 15.0),
                ("bank_mention_mismatch", 15.0),
                ("no_contact_info", 5.0),
                ("suspicious_sender_name", 15.0),
                ("excessive_special_chars", 10.0),
                ("excessive_caps", 10.0),
            ]),
            suspicious_numbers: list_of(&[
                "+000",
                "+999",
                "unknown",
                "private",
                "blocked",
                "anonymous",
            ]),
            urgent_phrases: list_of(&[
                "urgent",
                "verify now",
                "your account is locked",
                "security alert",
                "click this link",
                "your bank account is blocked",
                "reset immediately",
            ]),
            phishing_keyword_pattern: WordPattern::whole_words(&phishing_keywords),
            phishing_keywords,
            unexpected_action_phrases: list_of(&[
                "send your details",
                "provide your otp",
                "confirm your password",
                "share your pin",
            ]),
            info_request_keywords: list_of(&[
                "otp",
                "pin",
                "password",
                "security code",
                "verification code",
                "2fa code",
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
                "promo",
            ]),
            bank_keywords: list_of(&[
                "bank",
                "account",
                "card",
                "payment",
                "transaction",
                "balance",
            ]),
            bank_sender_keywords: list_of(&["bank", "financial"]),
            service_keywords: list_of(&[
                "bank",
                "paypal",
                "amazon",
                "apple",
                "google",
                "microsoft",
                "netflix",
                "pay",
            ]),
            brand_sender_names: list_of(&[
                "bank",
                "paypal",
                "amazon",
                "apple",
                "google",
                "microsoft",
                "netflix",
                "uber",
                "whatsapp",
            ]),
            contact_phrases: list_of(&["call", "contact", "reply", "stop", "unsubscribe"]),
            url_shorteners: list_of(&[
                "bit.ly",
                "tinyurl.com",
                "t.co",
                "goo.gl",
                "ow.ly",
                "is.gd",
                "short.link",
                "rebrand.ly",
                "cutt.ly",
                "buff.ly",
                "adf.ly",
                "tiny.cc",
                "shorturl.at",
                "rb.gy",
                "bit.do",
                "shorte.st",
            ]),
            no_contact_min_score: 20.0,
            special_char_ratio: 0.15,
            caps_ratio: 0.5,
            caps_min_length: 10,
        }
    }
}

impl SmsRules {
    /// Whole-word occurrences of the phishing keywords in `text`.
    pub fn count_phishing_keywords(&self, text: &str) -> usize {
        self.phishing_keyword_pattern.count(text)
    }
}

impl ChannelRules for SmsRules {
    type Override = SmsRulesOverride;

    const CHANNEL: Channel = Channel::Sms;

    fn apply(&mut self, overrides: SmsRulesOverride) {
        if let Some(weights) = overrides.weights {
            self.weights.overlay(weights);
        }
        let lists = [
            (overrides.suspicious_numbers, &mut self.suspicious_numbers),
            (overrides.urgent_phrases, &mut self.urgent_phrases),
            (overrides.phishing_keywords, &mut self.phishing_keywords),
            (
                overrides.unexpected_action_phrases,
                &mut self.unexpected_action_phrases,
            ),
            (overrides.info_request_keywords, &mut self.info_request_keywords),
            (overrides.promo_keywords, &mut self.promo_keywords),
            (overrides.bank_keywords, &mut self.bank_keywords),
            (overrides.bank_sender_keywords, &mut self.bank_sender_keywords),
            (overrides.service_keywords, &mut self.service_keywords),
            (overrides.brand_sender_names, &mut self.brand_sender_names),
            (overrides.contact_phrases, &mut self.contact_phrases),
            (overrides.url_shorteners, &mut self.url_shorteners),
        ];
        for (replacement, slot) in lists {
            if let Some(items) = replacement {
                *slot = normalize_list(items);
            }
        }
        self.phishing_keyword_pattern = WordPattern::whole_words(&self.phishing_keywords);
        if let Some(score) = overrides.no_contact_min_score {
            self.no_contact_min_score = score;
        }
        if let Some(ratio) = overrides.special_char_ratio {
            self.special_char_ratio = ratio;
        }
        if let Some(ratio) = overrides.caps_ratio {
            self.caps_ratio = ratio;
        }
        if let Some(length) = overrides.caps_min_length {
            self.caps_min_length = length;
        }
    }

    fn weights(&self) -> &Weights {
        &self.weights
    }

    fn named_list(&self, name: &str) -> Option<&BTreeSet<String>> {
        match name {
            "suspicious_numbers" => Some(&self.suspicious_numbers),
            "urgent_phrases" => Some(&self.urgent_phrases),
            "phishing_keywords" => Some(&self.phishing_keywords),
            "unexpected_action_phrases" => Some(&self.unexpected_action_phrases),
            "info_request_keywords" => Some(&self.info_request_keywords),
            "promo_keywords" => Some(&self.promo_keywords),
            "bank_keywords" => Some(&self.bank_keywords),
            "bank_sender_keywords" => Some(&self.bank_sender_keywords),
            "service_keywords" => Some(&self.service_keywords),
            "brand_sender_names" => Some(&self.brand_sender_names),
            "contact_phrases" => Some(&self.contact_phrases),
            "url_shorteners" => Some(&self.url_shorteners),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_override_recompiles_pattern() {
        let mut rules = SmsRules::default();
        assert_eq!(rules.count_phishing_keywords("click the bank link"), 2);

        let overrides: SmsRulesOverride =
            serde_json::from_str(r#"{"phishing_keywords": ["Parcel"]}"#).unwrap();
        rules.apply(overrides);
        assert_eq!(rules.count_phishing_keywords("click the bank link"), 0);
        assert_eq!(rules.count_phishing_keywords("your parcel, parcel id 7"), 2);
    }
}
