use crate::config_loader::RuleRepository;
use crate::features::email_analyzer::{EmailAnalysis, EmailAnalyzer, EmailInput};
use crate::features::sms_analyzer::{SmsAnalysis, SmsAnalyzer, SmsInput};
use crate::features::url_analyzer::{UrlAnalysis, UrlAnalyzer};
use crate::features::ChannelAnalyzer;
use crate::rules::RuleBook;
use std::path::PathBuf;
use std::sync::Arc;

/// Entry point for scoring URLs, emails and SMS messages.
///
/// Each call takes a snapshot of the current rules and runs without holding
/// any lock, so an `Engine` can be shared across threads behind an `Arc`.
pub struct Engine {
    rules: RuleRepository,
    url: UrlAnalyzer,
    email: EmailAnalyzer,
    sms: SmsAnalyzer,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(RuleRepository::builtin())
    }
}

impl Engine {
    pub fn new(rules: RuleRepository) -> Self {
        Self {
            rules,
            url: UrlAnalyzer::new(),
            email: EmailAnalyzer::new(),
            sms: SmsAnalyzer::new(),
        }
    }

    pub fn from_rules_dir<P: Into<PathBuf>>(dir: P) -> Self {
        Self::new(RuleRepository::from_dir(dir))
    }

    pub fn analyze_url(&self, url: &str) -> UrlAnalysis {
        let book = self.rules.snapshot();
        let result = self.url.analyze(url, &book.url);
        log::debug!(
            "{}: {} scored {} ({})",
            self.url.name(),
            result.url,
            result.score,
            result.verdict
        );
        result
    }

    pub fn analyze_email(&self, input: &EmailInput) -> EmailAnalysis {
        let book = self.rules.snapshot();
        let result = self.email.analyze(input, &book.email);
        log::debug!(
            "{}: {} scored {} ({})",
            self.email.name(),
            result.sender,
            result.score,
            result.verdict
        );
        result
    }

    pub fn analyze_sms(&self, input: &SmsInput) -> SmsAnalysis {
        let book = self.rules.snapshot();
        let result = self.sms.analyze(input, &book.sms);
        log::debug!(
            "{}: {} scored {} ({})",
            self.sms.name(),
            if result.number.is_empty() {
                &result.sender
            } else {
                &result.number
            },
            result.score,
            result.verdict
        );
        result
    }

    /// Re-read the rules directory. In-flight analyses keep their snapshot.
    pub fn reload(&self) -> Arc<RuleBook> {
        self.rules.reload()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::Verdict;
    use std::fs;
    use std::thread;

    fn email(sender: &str) -> EmailInput {
        EmailInput {
            sender: sender.to_string(),
            ..EmailInput::default()
        }
    }

    fn sms(content: &str) -> SmsInput {
        SmsInput {
            content: content.to_string(),
            ..SmsInput::default()
        }
    }

    #[test]
    fn test_reference_cases() {
        let engine = Engine::default();

        assert_eq!(
            engine.analyze_email(&email("admin@googie.com")).verdict,
            Verdict::Phishing
        );
        assert_ne!(
            engine.analyze_email(&email("security@google.com")).verdict,
            Verdict::Phishing
        );
        assert_eq!(
            engine.analyze_email(&email("googlesecurity@gmail.com")).verdict,
            Verdict::Phishing
        );
        assert_eq!(
            engine.analyze_email(&email("random@example.com")).verdict,
            Verdict::Safe
        );
        assert_eq!(
            engine
                .analyze_url("https://www.google.com/search?q=x")
                .verdict,
            Verdict::Safe
        );

        let ip = engine.analyze_url("http://192.168.1.1/login");
        let named = engine.analyze_url("http://example.com/login");
        assert_eq!(ip.indicators.ip_in_host, Some(true));
        assert!(ip.score > named.score);

        let short = engine.analyze_sms(&sms("Claim it: https://bit.ly/abc"));
        let full = engine.analyze_sms(&sms("Claim it: https://claims.example.org/abc"));
        assert!(short.score > full.score);
    }

    #[test]
    fn test_results_are_deterministic_and_bounded() {
        let engine = Engine::default();
        let urls = [
            "",
            "google.com",
            "http://[::1]/admin",
            "https://xn--80ak6aa92e.com/verify?token=9f8a7b6c5d4e3f2a1b0c",
        ];
        for url in urls {
            let first = engine.analyze_url(url);
            assert_eq!(first, engine.analyze_url(url));
            assert!(first.score <= 100);
            assert!(!first.reasons.is_empty());
        }

        let input = EmailInput {
            sender: "it-desk@0utlook.com".to_string(),
            subject: "Password expiry".to_string(),
            body: "Hello, verify now at http://0utlook.com.evil.tk/reset".to_string(),
            attachments: vec!["reset.js".to_string()],
        };
        let first = engine.analyze_email(&input);
        assert_eq!(first, engine.analyze_email(&input));
        assert!(first.score <= 100);
        assert!(!first.reasons.is_empty());

        let message = sms("FREE GIFT!!! Click https://tinyurl.com/x NOW");
        let first = engine.analyze_sms(&message);
        assert_eq!(first, engine.analyze_sms(&message));
        assert!(first.score <= 100);
        assert!(!first.reasons.is_empty());
    }

    #[test]
    fn test_concurrent_analyses_share_engine() {
        let engine = Arc::new(Engine::default());
        let expected = engine.analyze_email(&email("admin@googie.com"));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || engine.analyze_email(&email("admin@googie.com")))
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    }

    #[test]
    fn test_reload_changes_later_results() {
        let dir = std::env::temp_dir().join(format!("phish-sentry-engine-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();

        let engine = Engine::from_rules_dir(&dir);
        assert_eq!(engine.analyze_url("http://10.0.0.1/").score, 25);

        fs::write(dir.join("url_rules.json"), r#"{"weights": {"ip_in_host": 70}}"#).unwrap();
        engine.reload();
        let result = engine.analyze_url("http://10.0.0.1/");
        assert_eq!(result.score, 70);
        assert_eq!(result.verdict, Verdict::Phishing);

        fs::remove_dir_all(&dir).ok();
    }
}
