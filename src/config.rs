//! Engine configuration.
//!
//! API keys come from the environment (`ANTHROPIC_API_KEY`, `OPENAI_API_KEY`;
//! a `.env` file is honored by the binary via dotenvy). Everything else has
//! defaults and can be overridden through the CLI.

use std::time::Duration;

use crate::llm::ProviderKind;

/// Per-provider settings: credentials plus model identifier.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// API key for the backend; `None` means the provider is not configured.
    pub api_key: Option<String>,
    /// Model identifier to request.
    pub model: String,
}

/// Tunables for the provider pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of live handles across all providers.
    pub max_handles: usize,
    /// Refusal period imposed on a provider kind after a reported failure.
    pub cooldown: Duration,
    /// How long an idle handle survives before the sweep evicts it.
    pub idle_lifetime: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_handles: 2,
            cooldown: Duration::from_secs(60),
            idle_lifetime: Duration::from_secs(300),
        }
    }
}

/// Tunables for batch processing.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Number of documents per group.
    pub group_size: usize,
    /// Pause between groups, to stay friendly with backend rate limits.
    pub group_delay: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            group_size: 5,
            group_delay: Duration::from_secs(2),
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Provider tried first for every document.
    pub default_provider: ProviderKind,
    /// Anthropic settings.
    pub claude: ProviderSettings,
    /// OpenAI settings.
    pub openai: ProviderSettings,
    /// Optional prefix applied to every written tag (e.g. "ai/").
    pub tag_prefix: Option<String>,
    /// Pool tunables.
    pub pool: PoolConfig,
    /// Batch tunables.
    pub batch: BatchConfig,
}

const DEFAULT_CLAUDE_MODEL: &str = "claude-3-5-haiku-latest";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

impl EngineConfig {
    /// Builds a configuration from the environment.
    ///
    /// Recognized variables: `ANTHROPIC_API_KEY`, `OPENAI_API_KEY`,
    /// `TAGSMITH_CLAUDE_MODEL`, `TAGSMITH_OPENAI_MODEL`, `TAGSMITH_PROVIDER`,
    /// `TAGSMITH_TAG_PREFIX`. Unset variables fall back to defaults; the
    /// default provider is Claude unless overridden.
    #[must_use]
    pub fn from_env() -> Self {
        let default_provider = std::env::var("TAGSMITH_PROVIDER")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(ProviderKind::Claude);

        Self {
            default_provider,
            claude: ProviderSettings {
                api_key: non_empty_env("ANTHROPIC_API_KEY"),
                model: std::env::var("TAGSMITH_CLAUDE_MODEL")
                    .unwrap_or_else(|_| DEFAULT_CLAUDE_MODEL.to_string()),
            },
            openai: ProviderSettings {
                api_key: non_empty_env("OPENAI_API_KEY"),
                model: std::env::var("TAGSMITH_OPENAI_MODEL")
                    .unwrap_or_else(|_| DEFAULT_OPENAI_MODEL.to_string()),
            },
            tag_prefix: non_empty_env("TAGSMITH_TAG_PREFIX"),
            pool: PoolConfig::default(),
            batch: BatchConfig::default(),
        }
    }

    /// Returns the settings for the given provider kind.
    #[must_use]
    pub fn settings(&self, kind: ProviderKind) -> &ProviderSettings {
        match kind {
            ProviderKind::Claude => &self.claude,
            ProviderKind::OpenAi => &self.openai,
        }
    }

    /// True when the given provider kind has an API key configured.
    #[must_use]
    pub fn has_credentials(&self, kind: ProviderKind) -> bool {
        self.settings(kind).api_key.is_some()
    }

    /// True when at least one provider has credentials.
    #[must_use]
    pub fn any_provider_configured(&self) -> bool {
        self.has_credentials(ProviderKind::Claude) || self.has_credentials(ProviderKind::OpenAi)
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn test_config() -> EngineConfig {
        EngineConfig {
            default_provider: ProviderKind::Claude,
            claude: ProviderSettings {
                api_key: Some("claude-key".to_string()),
                model: DEFAULT_CLAUDE_MODEL.to_string(),
            },
            openai: ProviderSettings {
                api_key: None,
                model: DEFAULT_OPENAI_MODEL.to_string(),
            },
            tag_prefix: None,
            pool: PoolConfig::default(),
            batch: BatchConfig::default(),
        }
    }

    #[test]
    fn settings_lookup_by_kind() {
        let config = test_config();
        assert_eq!(
            config.settings(ProviderKind::Claude).api_key.as_deref(),
            Some("claude-key")
        );
        assert!(config.settings(ProviderKind::OpenAi).api_key.is_none());
    }

    #[test]
    fn credentials_checks() {
        let config = test_config();
        assert!(config.has_credentials(ProviderKind::Claude));
        assert!(!config.has_credentials(ProviderKind::OpenAi));
        assert!(config.any_provider_configured());
    }

    #[test]
    fn no_providers_configured() {
        let mut config = test_config();
        config.claude.api_key = None;
        assert!(!config.any_provider_configured());
    }

    #[test]
    fn pool_defaults_match_documented_values() {
        let pool = PoolConfig::default();
        assert_eq!(pool.max_handles, 2);
        assert_eq!(pool.cooldown, Duration::from_secs(60));
        assert_eq!(pool.idle_lifetime, Duration::from_secs(300));
    }

    #[test]
    fn batch_defaults_match_documented_values() {
        let batch = BatchConfig::default();
        assert_eq!(batch.group_size, 5);
        assert_eq!(batch.group_delay, Duration::from_secs(2));
    }

    #[test]
    #[serial]
    fn from_env_reads_keys_and_provider() {
        unsafe {
            std::env::set_var("ANTHROPIC_API_KEY", "env-claude-key");
            std::env::remove_var("OPENAI_API_KEY");
            std::env::set_var("TAGSMITH_PROVIDER", "openai");
            std::env::set_var("TAGSMITH_TAG_PREFIX", "ai/");
        }

        let config = EngineConfig::from_env();
        assert_eq!(config.default_provider, ProviderKind::OpenAi);
        assert_eq!(config.claude.api_key.as_deref(), Some("env-claude-key"));
        assert!(config.openai.api_key.is_none());
        assert_eq!(config.tag_prefix.as_deref(), Some("ai/"));

        unsafe {
            std::env::remove_var("ANTHROPIC_API_KEY");
            std::env::remove_var("TAGSMITH_PROVIDER");
            std::env::remove_var("TAGSMITH_TAG_PREFIX");
        }
    }

    #[test]
    #[serial]
    fn from_env_ignores_blank_keys() {
        unsafe {
            std::env::set_var("ANTHROPIC_API_KEY", "   ");
            std::env::remove_var("OPENAI_API_KEY");
            std::env::remove_var("TAGSMITH_PROVIDER");
        }

        let config = EngineConfig::from_env();
        assert!(config.claude.api_key.is_none());
        assert_eq!(config.default_provider, ProviderKind::Claude);

        unsafe {
            std::env::remove_var("ANTHROPIC_API_KEY");
        }
    }
}
