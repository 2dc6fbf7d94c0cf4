use crate::features::email_analyzer::EmailAnalysis;
use crate::features::sms_analyzer::SmsAnalysis;
use crate::features::url_analyzer::UrlAnalysis;
use crate::rules::Channel;
use crate::scoring::Verdict;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const UNKNOWN_INPUT: &str = "unknown";
const SUMMARY_PREFIX_CHARS: usize = 30;

/// What the persistence layer stores for one scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub channel: Channel,
    pub input_value: String,
    pub verdict: Verdict,
    pub score: u8,
    pub summary: String,
    /// Reasons, indicators and extracted artefacts; opaque to the store.
    pub details: Value,
}

/// What the statistics layer counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub channel: Channel,
    pub verdict: Verdict,
}

/// Common view over the per-channel analysis results.
pub trait Reportable {
    fn channel(&self) -> Channel;
    fn score(&self) -> u8;
    fn verdict(&self) -> Verdict;
    /// The value the scan is filed under.
    fn input_value(&self) -> String;
    fn summary(&self) -> String;
    fn details(&self) -> Value;

    fn to_record(&self) -> ScanRecord {
        ScanRecord {
            channel: self.channel(),
            input_value: self.input_value(),
            verdict: self.verdict(),
            score: self.score(),
            summary: self.summary(),
            details: self.details(),
        }
    }

    fn to_outcome(&self) -> ScanOutcome {
        ScanOutcome {
            channel: self.channel(),
            verdict: self.verdict(),
        }
    }
}

fn first_non_empty<'a>(candidates: &[&'a str]) -> Option<&'a str> {
    candidates.iter().copied().find(|value| !value.is_empty())
}

impl Reportable for UrlAnalysis {
    fn channel(&self) -> Channel {
        Channel::Url
    }

    fn score(&self) -> u8 {
        self.score
    }

    fn verdict(&self) -> Verdict {
        self.verdict
    }

    fn input_value(&self) -> String {
        self.url.clone()
    }

    fn summary(&self) -> String {
        match self
            .parsed
            .as_ref()
            .map(|parsed| parsed.root_domain.as_str())
            .filter(|root| !root.is_empty())
        {
            Some(root) => format!("{} - {}", root, self.verdict),
            None => {
                let head: String = self.url.chars().take(SUMMARY_PREFIX_CHARS).collect();
                format!("{}... - {}", head, self.verdict)
            }
        }
    }

    fn details(&self) -> Value {
        json!({
            "reasons": self.reasons,
            "indicators": self.indicators,
            "parsed": self.parsed,
        })
    }
}

impl Reportable for EmailAnalysis {
    fn channel(&self) -> Channel {
        Channel::Email
    }

    fn score(&self) -> u8 {
        self.score
    }

    fn verdict(&self) -> Verdict {
        self.verdict
    }

    fn input_value(&self) -> String {
        first_non_empty(&[self.sender.as_str()])
            .unwrap_or(UNKNOWN_INPUT)
            .to_string()
    }

    fn summary(&self) -> String {
        let label = first_non_empty(&[self.sender.as_str()]).unwrap_or("Email");
        format!("{} - {}", label, self.verdict)
    }

    fn details(&self) -> Value {
        json!({
            "subject": self.subject,
            "reasons": self.reasons,
            "indicators": self.indicators,
            "links_found": self.links_found,
            "attachments_found": self.attachments_found,
        })
    }
}

impl Reportable for SmsAnalysis {
    fn channel(&self) -> Channel {
        Channel::Sms
    }

    fn score(&self) -> u8 {
        self.score
    }

    fn verdict(&self) -> Verdict {
        self.verdict
    }

    fn input_value(&self) -> String {
        first_non_empty(&[self.number.as_str(), self.sender.as_str()])
            .unwrap_or(UNKNOWN_INPUT)
            .to_string()
    }

    fn summary(&self) -> String {
        let label =
            first_non_empty(&[self.number.as_str(), self.sender.as_str()]).unwrap_or("SMS");
        format!("{} - {}", label, self.verdict)
    }

    fn details(&self) -> Value {
        json!({
            "content": self.content,
            "reasons": self.reasons,
            "indicators": self.indicators,
            "links_found": self.links_found,
        })
    }
}
