pub mod email_analyzer;
pub mod link_analyzer;
pub mod sms_analyzer;
pub mod url_analyzer;

use crate::rules::ChannelRules;
use std::collections::{BTreeMap, BTreeSet};

/// One channel's indicator pipeline.
///
/// Implementations hold no per-call state: the result is a function of the
/// input and the rule snapshot passed in.
pub trait ChannelAnalyzer: Send + Sync {
    type Input: ?Sized;
    type Rules: ChannelRules;
    type Output;

    fn analyze(&self, input: &Self::Input, rules: &Self::Rules) -> Self::Output;
    fn name(&self) -> &str;
}

/// Entries of `phrases` that occur as substrings of `text`.
///
/// `text` is expected to be lowercased already; rule lists are normalized
/// at load time.
pub fn find_phrases<'a>(text: &str, phrases: &'a BTreeSet<String>) -> Vec<&'a str> {
    phrases
        .iter()
        .filter(|phrase| !phrase.is_empty() && text.contains(phrase.as_str()))
        .map(String::as_str)
        .collect()
}

/// Comma-joined head of a match list, for reason text.
pub fn preview(found: &[&str], limit: usize) -> String {
    found
        .iter()
        .take(limit)
        .copied()
        .collect::<Vec<_>>()
        .join(", ")
}

/// Shannon entropy of the character distribution, in bits per character.
///
/// Counts are summed in character order so repeated calls are bit-identical.
pub fn shannon_entropy(text: &str) -> f64 {
    let mut counts: BTreeMap<char, usize> = BTreeMap::new();
    let mut total = 0usize;
    for c in text.chars() {
        *counts.entry(c).or_insert(0) += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }

    let total = total as f64;
    counts
        .values()
        .map(|&count| {
            let p = count as f64 / total;
            -p * p.log2()
        })
        .sum()
}
