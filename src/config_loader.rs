use crate::rules::{ChannelRules, EmailRules, RuleBook, SmsRules, UrlRules};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

const RULE_FILE_EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

/// Read the partial rule document for `R` from `dir`.
///
/// Returns `Ok(None)` when the directory holds no rule file for the channel.
/// JSON takes precedence over YAML when both are present.
pub fn read_overrides<R: ChannelRules>(dir: &Path) -> Result<Option<R::Override>> {
    let stem = R::CHANNEL.rules_file_stem();

    for extension in RULE_FILE_EXTENSIONS {
        let path = dir.join(format!("{}.{}", stem, extension));
        if !path.is_file() {
            continue;
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read rule file: {}", path.display()))?;
        let overrides = if extension == "json" {
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid JSON in rule file: {}", path.display()))?
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Invalid YAML in rule file: {}", path.display()))?
        };
        return Ok(Some(overrides));
    }

    Ok(None)
}

/// Load one channel's rules. Never fails: a missing or corrupt document
/// yields the built-in defaults.
pub fn load_channel<R: ChannelRules>(dir: &Path) -> R {
    let mut rules = R::default();

    match read_overrides::<R>(dir) {
        Ok(Some(overrides)) => {
            rules.apply(overrides);
            log::info!("Loaded {} rules from {}", R::CHANNEL, dir.display());
        }
        Ok(None) => {
            log::debug!(
                "No {} rule file in {}, using built-in defaults",
                R::CHANNEL,
                dir.display()
            );
        }
        Err(e) => {
            log::warn!(
                "Failed to load {} rules, using built-in defaults: {:#}",
                R::CHANNEL,
                e
            );
        }
    }

    rules
}

impl RuleBook {
    pub fn load(dir: &Path) -> Self {
        Self {
            url: load_channel::<UrlRules>(dir),
            email: load_channel::<EmailRules>(dir),
            sms: load_channel::<SmsRules>(dir),
        }
    }
}

/// Write the built-in defaults as one JSON document per channel.
pub fn write_default_rules(dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create rules directory: {}", dir.display()))?;

    let defaults = RuleBook::default();
    let documents = [
        (
            UrlRules::CHANNEL,
            serde_json::to_string_pretty(&defaults.url)?,
        ),
        (
            EmailRules::CHANNEL,
            serde_json::to_string_pretty(&defaults.email)?,
        ),
        (
            SmsRules::CHANNEL,
            serde_json::to_string_pretty(&defaults.sms)?,
        ),
    ];

    let mut written = Vec::new();
    for (channel, document) in documents {
        let path = dir.join(format!("{}.json", channel.rules_file_stem()));
        fs::write(&path, document)
            .with_context(|| format!("Failed to write rule file: {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

/// Process-wide holder of the active [`RuleBook`].
///
/// Readers take a cheap `Arc` snapshot; `reload` builds the replacement
/// before taking the write lock, so no reader ever sees a partial update.
pub struct RuleRepository {
    rules_dir: Option<PathBuf>,
    current: RwLock<Arc<RuleBook>>,
}

impl Default for RuleRepository {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RuleRepository {
    /// Built-in defaults only; `reload` is a no-op.
    pub fn builtin() -> Self {
        Self::with_rules(RuleBook::default())
    }

    fn with_rules(book: RuleBook) -> Self {
        Self {
            rules_dir: None,
            current: RwLock::new(Arc::new(book)),
        }
    }

    pub fn from_dir<P: Into<PathBuf>>(dir: P) -> Self {
        let dir = dir.into();
        let book = RuleBook::load(&dir);
        Self {
            rules_dir: Some(dir),
            current: RwLock::new(Arc::new(book)),
        }
    }

    pub fn snapshot(&self) -> Arc<RuleBook> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    /// Re-read the rules directory and swap the result in atomically.
    pub fn reload(&self) -> Arc<RuleBook> {
        match &self.rules_dir {
            Some(dir) => {
                let book = Arc::new(RuleBook::load(dir));
                let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
                *guard = Arc::clone(&book);
                drop(guard);
                log::info!("Rules reloaded from {}", dir.display());
                book
            }
            None => self.snapshot(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "phish-sentry-{}-{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_missing_directory_uses_defaults() {
        let dir = std::env::temp_dir().join("phish-sentry-does-not-exist");
        let book = RuleBook::load(&dir);
        assert_eq!(book, RuleBook::default());
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let dir = scratch_dir("corrupt");
        fs::write(dir.join("url_rules.json"), "{ not json").unwrap();

        let rules = load_channel::<UrlRules>(&dir);
        assert_eq!(rules, UrlRules::default());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_partial_file_overrides_single_key() {
        let dir = scratch_dir("partial");
        fs::write(
            dir.join("sms_rules.json"),
            r#"{"url_shorteners": ["sho.rt"], "weights": {"shortened_url": 50}}"#,
        )
        .unwrap();

        let rules = load_channel::<SmsRules>(&dir);
        assert!(rules.url_shorteners.contains("sho.rt"));
        assert!(!rules.url_shorteners.contains("bit.ly"));
        assert_eq!(rules.weight("shortened_url"), 50.0);
        assert_eq!(rules.weight("suspicious_link"), 25.0);
        assert_eq!(rules.phishing_keywords, SmsRules::default().phishing_keywords);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_yaml_rule_file() {
        let dir = scratch_dir("yaml");
        fs::write(
            dir.join("email_rules.yaml"),
            "suspicious_sender_domains:\n  - mail.ru\n",
        )
        .unwrap();

        let rules = load_channel::<EmailRules>(&dir);
        assert!(rules.suspicious_sender_domains.contains("mail.ru"));
        assert!(!rules.suspicious_sender_domains.contains("gmail.com"));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_generated_defaults_round_trip() {
        let dir = scratch_dir("generate");
        let written = write_default_rules(&dir).unwrap();
        assert_eq!(written.len(), 3);

        let book = RuleBook::load(&dir);
        assert_eq!(book, RuleBook::default());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_shipped_rule_files_match_defaults() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("rules");
        assert_eq!(RuleBook::load(&dir), RuleBook::default());
    }

    #[test]
    fn test_reload_swaps_snapshot() {
        let dir = scratch_dir("reload");
        let repository = RuleRepository::from_dir(&dir);
        let before = repository.snapshot();
        assert!(before.url.detect_ip_urls);

        fs::write(dir.join("url_rules.json"), r#"{"detect_ip_urls": false}"#).unwrap();
        repository.reload();

        assert!(!repository.snapshot().url.detect_ip_urls);
        // Earlier snapshots are unaffected by the swap.
        assert!(before.url.detect_ip_urls);
        fs::remove_dir_all(&dir).ok();
    }
}
