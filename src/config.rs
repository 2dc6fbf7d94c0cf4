use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Process configuration for the `phish-sentry` binary.
#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub rules: RulesConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct RulesConfig {
    /// Directory holding `url_rules.json`, `email_rules.json` and `sms_rules.json`.
    pub dir: PathBuf,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("rules"),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Unknown level names fall back to `Info`.
    pub fn level_filter(&self) -> log::LevelFilter {
        self.level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

impl EngineConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: EngineConfig = toml::from_str(&content)
            .with_context(|| format!("Invalid TOML in config file: {}", path.display()))?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise return the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn default_path() -> &'static str {
        "phish-sentry.toml"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.rules.dir, PathBuf::from("rules"));
        assert_eq!(config.logging.level_filter(), log::LevelFilter::Info);
    }

    #[test]
    fn test_partial_toml() {
        let config: EngineConfig = toml::from_str("[logging]\nlevel = \"debug\"\n").unwrap();
        assert_eq!(config.rules.dir, PathBuf::from("rules"));
        assert_eq!(config.logging.level_filter(), log::LevelFilter::Debug);

        let config: EngineConfig =
            toml::from_str("[rules]\ndir = \"/etc/phish-sentry/rules\"\n").unwrap();
        assert_eq!(config.rules.dir, PathBuf::from("/etc/phish-sentry/rules"));
    }

    #[test]
    fn test_unknown_level_falls_back() {
        let logging = LoggingConfig {
            level: "chatty".to_string(),
        };
        assert_eq!(logging.level_filter(), log::LevelFilter::Info);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("phish-sentry-no-such-config.toml");
        let config = EngineConfig::load_or_default(&path).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let path = std::env::temp_dir().join(format!(
            "phish-sentry-bad-config-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "[rules\ndir = 3").unwrap();
        assert!(EngineConfig::load_from_file(&path).is_err());
        std::fs::remove_file(&path).ok();
    }
}
