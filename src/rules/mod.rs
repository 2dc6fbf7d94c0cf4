pub mod email;
pub mod sms;
pub mod url;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub use email::{EmailRules, EmailRulesOverride};
pub use sms::{SmsRules, SmsRulesOverride};
pub use url::{UrlRules, UrlRulesOverride};

static EMPTY_LIST: BTreeSet<String> = BTreeSet::new();

/// Logical channel an artifact arrived on. Also the tag handed to reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Url,
    Email,
    Sms,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Url => "url",
            Channel::Email => "email",
            Channel::Sms => "sms",
        }
    }

    /// File stem of the channel's rule document, e.g. `url_rules`.
    pub fn rules_file_stem(&self) -> &'static str {
        match self {
            Channel::Url => "url_rules",
            Channel::Email => "email_rules",
            Channel::Sms => "sms_rules",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Indicator name to signed weight. Names that are absent weigh nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Weights(BTreeMap<String, f64>);

impl Weights {
    pub fn from_pairs(pairs: &[(&str, f64)]) -> Self {
        Self(
            pairs
                .iter()
                .map(|(name, weight)| (name.to_string(), *weight))
                .collect(),
        )
    }

    pub fn get(&self, name: &str) -> f64 {
        self.0.get(name).copied().unwrap_or(0.0)
    }

    /// Entry-wise overlay: names in `overrides` replace or extend the table.
    pub fn overlay(&mut self, overrides: BTreeMap<String, f64>) {
        for (name, weight) in overrides {
            self.0.insert(name.trim().to_string(), weight);
        }
    }
}

/// Whole-word alternation over a keyword list, compiled when the list is set.
#[derive(Debug, Clone, Default)]
pub struct WordPattern(Option<Regex>);

impl WordPattern {
    pub fn whole_words(words: &BTreeSet<String>) -> Self {
        if words.is_empty() {
            return Self(None);
        }

        let alternation = words
            .iter()
            .map(|word| regex::escape(word))
            .collect::<Vec<_>>()
            .join("|");
        match Regex::new(&format!(r"\b(?:{})\b", alternation)) {
            Ok(pattern) => Self(Some(pattern)),
            Err(e) => {
                log::warn!("Keyword pattern rejected, keyword counting disabled: {}", e);
                Self(None)
            }
        }
    }

    /// Non-overlapping whole-word matches in `text`.
    pub fn count(&self, text: &str) -> usize {
        self.0
            .as_ref()
            .map_or(0, |pattern| pattern.find_iter(text).count())
    }
}

impl PartialEq for WordPattern {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_ref().map(Regex::as_str) == other.0.as_ref().map(Regex::as_str)
    }
}

/// A channel's rule set: built-in defaults overlaid by an optional partial
/// document read from disk.
pub trait ChannelRules: Default + Clone + Serialize + Send + Sync {
    /// Partial document shape; every key optional.
    type Override: DeserializeOwned;

    const CHANNEL: Channel;

    /// Merge a parsed document into `self`, key by key.
    fn apply(&mut self, overrides: Self::Override);

    fn weights(&self) -> &Weights;

    fn named_list(&self, name: &str) -> Option<&BTreeSet<String>>;

    fn weight(&self, name: &str) -> f64 {
        self.weights().get(name)
    }

    /// Unknown list names resolve to an empty set.
    fn list(&self, name: &str) -> &BTreeSet<String> {
        self.named_list(name).unwrap_or(&EMPTY_LIST)
    }
}

/// One immutable snapshot of every channel's rules.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleBook {
    pub url: UrlRules,
    pub email: EmailRules,
    pub sms: SmsRules,
}

/// Lowercase, trim and drop blank entries.
pub(crate) fn normalize_list<I, S>(items: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|item| item.as_ref().trim().to_lowercase())
        .filter(|item| !item.is_empty())
        .collect()
}

pub(crate) fn list_of(items: &[&str]) -> BTreeSet<String> {
    normalize_list(items.iter())
}
