use serde::{Deserialize, Serialize};
use std::fmt;

pub const PHISHING_THRESHOLD: u8 = 65;
pub const SUSPICIOUS_THRESHOLD: u8 = 30;
pub const MAX_SCORE: u8 = 100;

/// Reason reported when no check fired.
pub const NO_FINDINGS_REASON: &str = "No obvious automated red flags detected";

/// Terminal classification, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Safe,
    Suspicious,
    Phishing,
}

impl Verdict {
    pub fn from_score(score: u8) -> Self {
        match score {
            s if s >= PHISHING_THRESHOLD => Verdict::Phishing,
            s if s >= SUSPICIOUS_THRESHOLD => Verdict::Suspicious,
            _ => Verdict::Safe,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Safe => "safe",
            Verdict::Suspicious => "suspicious",
            Verdict::Phishing => "phishing",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clamp an accumulated weight into `0..=100`, truncating toward zero.
pub fn clamp_score(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.clamp(0.0, f64::from(MAX_SCORE)) as u8
}

/// Running signed sum of fired checks plus their reasons, in evaluation order.
///
/// Intermediate totals may go negative (trust weights) or past 100; only
/// [`ScoreCard::finish`] clamps.
#[derive(Debug, Clone, Default)]
pub struct ScoreCard {
    raw: f64,
    reasons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scored {
    pub score: u8,
    pub verdict: Verdict,
    pub reasons: Vec<String>,
}

impl ScoreCard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, weight: f64, reason: impl Into<String>) {
        self.raw += weight;
        self.reasons.push(reason.into());
    }

    pub fn raw(&self) -> f64 {
        self.raw
    }

    pub fn finish(self) -> Scored {
        let score = clamp_score(self.raw);
        let reasons = if self.reasons.is_empty() {
            vec![NO_FINDINGS_REASON.to_string()]
        } else {
            self.reasons
        };

        Scored {
            score,
            verdict: Verdict::from_score(score),
            reasons,
        }
    }
}
