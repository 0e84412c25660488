use anyhow::{Result, anyhow};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE: &str = "taskcrew.toml";
pub const DATA_DIR_ENV: &str = "TASKCREW_DATA_DIR";
pub const API_KEY_ENVS: &[&str] = &["TASKCREW_API_KEY", "ANTHROPIC_API_KEY"];

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CrewConfig {
    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Anthropic,
    Openai,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: ProviderKind,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Overrides the provider's public endpoint (proxies, local gateways).
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Seconds before an AI call is abandoned; 0 waits indefinitely.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// File name inside the data directory that receives a copy of the log.
    #[serde(default)]
    pub file: Option<String>,
}

fn default_provider() -> ProviderKind {
    ProviderKind::Anthropic
}
fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_key: None,
            base_url: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl LlmConfig {
    /// The credential, if one is set and non-blank.
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl LoggingConfig {
    /// Unknown level names fall back to `info`.
    pub fn max_level(&self) -> tracing::Level {
        self.level
            .trim()
            .parse::<tracing::Level>()
            .unwrap_or(tracing::Level::INFO)
    }
}

impl CrewConfig {
    pub async fn load<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let config_path = data_dir.as_ref().join(CONFIG_FILE);
        let mut config = if config_path.exists() {
            let content = tokio::fs::read_to_string(&config_path).await?;
            toml::from_str::<CrewConfig>(&content)
                .map_err(|e| anyhow!("invalid {}: {}", config_path.display(), e))?
        } else {
            CrewConfig::default()
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// One-line description for the startup log. Never includes the credential.
    pub fn summary(&self) -> String {
        format!(
            "provider={:?}, model={}, credential={}, timeout={}s, log_level={}",
            self.llm.provider,
            self.llm.model,
            if self.llm.credential().is_some() {
                "set"
            } else {
                "unset"
            },
            self.llm.timeout_secs,
            self.logging.max_level()
        )
    }

    /// Environment credentials win over the file; the first non-blank one is used.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = API_KEY_ENVS
            .iter()
            .filter_map(|name| lookup(name))
            .find(|value| !value.trim().is_empty())
        {
            self.llm.api_key = Some(key);
        }
    }
}

/// `$TASKCREW_DATA_DIR`, falling back to `~/.taskcrew`.
pub fn resolve_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV)
        && !dir.trim().is_empty()
    {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".taskcrew"))
        .ok_or_else(|| anyhow!("cannot determine home directory; set {}", DATA_DIR_ENV))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_target_anthropic_without_credential() {
        let config = CrewConfig::default();
        assert_eq!(config.llm.provider, ProviderKind::Anthropic);
        assert_eq!(config.llm.model, "claude-sonnet-4-20250514");
        assert_eq!(config.llm.max_tokens, 4096);
        assert!(config.llm.credential().is_none());
        assert_eq!(config.llm.timeout(), Some(Duration::from_secs(120)));
    }

    #[test]
    fn blank_credential_counts_as_unconfigured() {
        let mut config = CrewConfig::default();
        config.llm.api_key = Some("   ".to_string());
        assert!(config.llm.credential().is_none());
    }

    #[test]
    fn zero_timeout_disables_it() {
        let mut config = CrewConfig::default();
        config.llm.timeout_secs = 0;
        assert!(config.llm.timeout().is_none());
    }

    #[test]
    fn env_credential_overrides_file() {
        let mut config = CrewConfig::default();
        config.llm.api_key = Some("from-file".to_string());
        config.apply_env(|name| match name {
            "TASKCREW_API_KEY" => Some(String::new()),
            "ANTHROPIC_API_KEY" => Some("from-env".to_string()),
            _ => None,
        });
        assert_eq!(config.llm.credential(), Some("from-env"));
    }

    #[test]
    fn parses_partial_file() {
        let config: CrewConfig = toml::from_str(
            r#"
[llm]
provider = "openai"
model = "gpt-4o-mini"
timeout_secs = 5

[logging]
level = "debug"
file = "taskcrew.log"
"#,
        )
        .unwrap();
        assert_eq!(config.llm.provider, ProviderKind::Openai);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.max_tokens, 4096);
        assert_eq!(config.llm.timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.logging.max_level(), tracing::Level::DEBUG);
        assert_eq!(config.logging.file.as_deref(), Some("taskcrew.log"));
    }

    #[test]
    fn level_names_parse_case_insensitively() {
        let mut logging = LoggingConfig::default();
        for (name, level) in [
            ("trace", tracing::Level::TRACE),
            ("DEBUG", tracing::Level::DEBUG),
            ("Warn", tracing::Level::WARN),
            (" error ", tracing::Level::ERROR),
            ("chatty", tracing::Level::INFO),
        ] {
            logging.level = name.to_string();
            assert_eq!(logging.max_level(), level, "level {name:?}");
        }
    }

    #[test]
    fn summary_reports_credential_presence_only() {
        let mut config = CrewConfig::default();
        assert!(config.summary().contains("credential=unset"));
        config.llm.api_key = Some("sk-ant-secret".to_string());
        let summary = config.summary();
        assert!(summary.contains("credential=set"));
        assert!(summary.contains("provider=Anthropic"));
        assert!(summary.contains("log_level=INFO"));
        assert!(!summary.contains("sk-ant-secret"));
    }

    #[tokio::test]
    async fn load_missing_file_returns_default() {
        let tmpdir = tempfile::tempdir().unwrap();
        let config = CrewConfig::load(tmpdir.path()).await.unwrap();
        assert_eq!(config.llm.max_tokens, 4096);
    }

    #[tokio::test]
    async fn load_rejects_malformed_file() {
        let tmpdir = tempfile::tempdir().unwrap();
        std::fs::write(tmpdir.path().join(CONFIG_FILE), "[llm\nmodel = ").unwrap();
        let err = CrewConfig::load(tmpdir.path()).await.unwrap_err();
        assert!(err.to_string().contains(CONFIG_FILE));
    }
}
