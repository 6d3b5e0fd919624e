//! Crawler configuration file.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Deserializer, Serialize};

/// Default config location.
pub const DEFAULT_CONFIG_PATH: &str = "./config/config.json";

/// Env fallback for `account.api_id`.
pub const ENV_API_ID: &str = "TELEGRAM_API_ID";
/// Env fallback for `account.api_hash`.
pub const ENV_API_HASH: &str = "TELEGRAM_API_HASH";
/// Env fallback for `account.phone_number`.
pub const ENV_PHONE: &str = "TELEGRAM_PHONE";

/// Account section. Every field may instead come from the environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountConfig {
    #[serde(default, deserialize_with = "string_or_number")]
    pub api_id: Option<String>,
    #[serde(default)]
    pub api_hash: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

/// Resolved account credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_id: String,
    pub api_hash: String,
    pub phone_number: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_id", &self.api_id)
            .field("api_hash", &"<redacted>")
            .field("phone_number", &"<redacted>")
            .finish()
    }
}

/// Contents of the JSON config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Seed channel links or usernames.
    #[serde(default)]
    pub initial_channel_links: Vec<String>,
    /// Keywords of interest. Not used for scoring.
    #[serde(default)]
    pub message_keywords: Vec<String>,
    #[serde(default)]
    pub account: AccountConfig,
    /// Extra or replacement lexicon valences.
    #[serde(default)]
    pub lexicon: HashMap<String, f64>,
}

impl CrawlerConfig {
    /// Load from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!(
                "Config file not found: {} (copy config/config.example.json and fill it in)",
                path.display()
            );
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        tracing::debug!(
            path = %path.display(),
            seeds = config.initial_channel_links.len(),
            keywords = config.message_keywords.len(),
            lexicon_overrides = config.lexicon.len(),
            "Loaded config"
        );
        Ok(config)
    }

    /// Check the config is usable and resolve credentials from the file or
    /// the process environment.
    pub fn validate(&self) -> Result<Credentials> {
        self.validate_with(|key| std::env::var(key).ok())
    }

    /// [`validate`](Self::validate) with an explicit environment lookup.
    pub fn validate_with<F>(&self, env: F) -> Result<Credentials>
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.initial_channel_links.iter().all(|s| s.trim().is_empty()) {
            bail!("initial_channel_links is empty; add at least one channel to start from");
        }
        self.credentials_with(env)
    }

    fn credentials_with<F>(&self, env: F) -> Result<Credentials>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |value: &Option<String>, key: &str| {
            value
                .clone()
                .filter(|v| !v.trim().is_empty())
                .or_else(|| env(key).filter(|v| !v.trim().is_empty()))
        };

        let api_id = pick(&self.account.api_id, ENV_API_ID);
        let api_hash = pick(&self.account.api_hash, ENV_API_HASH);
        let phone_number = pick(&self.account.phone_number, ENV_PHONE);

        let missing: Vec<&str> = [
            ("account.api_id", api_id.is_none(), ENV_API_ID),
            ("account.api_hash", api_hash.is_none(), ENV_API_HASH),
            ("account.phone_number", phone_number.is_none(), ENV_PHONE),
        ]
        .iter()
        .filter(|(_, absent, _)| *absent)
        .map(|(field, _, _)| *field)
        .collect();

        match (api_id, api_hash, phone_number) {
            (Some(api_id), Some(api_hash), Some(phone_number)) => Ok(Credentials {
                api_id,
                api_hash,
                phone_number,
            }),
            _ => bail!(
                "Missing credentials: {} (set them in the config file or via {ENV_API_ID}, {ENV_API_HASH} and {ENV_PHONE})",
                missing.join(", ")
            ),
        }
    }
}

/// Accept `api_id` as either a JSON number or a string.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Number(n) => n.to_string(),
        Raw::Text(s) => s,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"{
        "initial_channel_links": ["https://t.me/sec_feed", "t.me/joinchat/AbC123"],
        "message_keywords": ["leak", "exploit"],
        "account": {"api_id": 123456, "api_hash": "deadbeef", "phone_number": "+15550100"},
        "lexicon": {"fullz": -3.0}
    }"#;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_load_full_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, FULL).unwrap();

        let config = CrawlerConfig::load(&path).unwrap();
        assert_eq!(config.initial_channel_links.len(), 2);
        assert_eq!(config.message_keywords, vec!["leak", "exploit"]);
        assert_eq!(config.lexicon.get("fullz"), Some(&-3.0));

        let credentials = config.validate_with(no_env).unwrap();
        assert_eq!(credentials.api_id, "123456");
        assert_eq!(credentials.api_hash, "deadbeef");
        assert!(!format!("{credentials:?}").contains("deadbeef"));
    }

    #[test]
    fn test_missing_file_is_descriptive() {
        let err = CrawlerConfig::load(Path::new("/nonexistent/telecrawl.json")).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = CrawlerConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_credentials_fall_back_to_env() {
        let config: CrawlerConfig = serde_json::from_str(
            r#"{"initial_channel_links": ["sec_feed"], "account": {"api_id": "42"}}"#,
        )
        .unwrap();

        let credentials = config
            .validate_with(|key| match key {
                ENV_API_HASH => Some("from-env".to_string()),
                ENV_PHONE => Some("+15550199".to_string()),
                _ => None,
            })
            .unwrap();

        assert_eq!(credentials.api_id, "42");
        assert_eq!(credentials.api_hash, "from-env");
        assert_eq!(credentials.phone_number, "+15550199");
    }

    #[test]
    fn test_missing_credentials_listed() {
        let config: CrawlerConfig =
            serde_json::from_str(r#"{"initial_channel_links": ["sec_feed"]}"#).unwrap();

        let err = config.validate_with(no_env).unwrap_err().to_string();
        assert!(err.contains("account.api_id"));
        assert!(err.contains("account.api_hash"));
        assert!(err.contains("account.phone_number"));
    }

    #[test]
    fn test_no_seeds_rejected() {
        let config: CrawlerConfig = serde_json::from_str(
            r#"{"account": {"api_id": 1, "api_hash": "h", "phone_number": "p"}}"#,
        )
        .unwrap();

        let err = config.validate_with(no_env).unwrap_err();
        assert!(err.to_string().contains("initial_channel_links"));
    }
}
