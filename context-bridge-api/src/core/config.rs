use config::{Config, ConfigBuilder, ConfigError, Environment, File, builder::DefaultState};
use context_bridge::GatewayOptions;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::core::controller::DEFAULT_SYSTEM_PROMPT;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub context: ContextConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ModelConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub api_version: String,
    pub timeout_seconds: u64,
    pub system_prompt: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ContextConfig {
    pub max_turns: usize,
    pub max_bytes: usize,
    pub ttl_hours: u64,
    /// Non-system turns kept in storage per session
    pub max_history_turns: usize,
    /// Persist the shaped view instead of the full history
    #[serde(default)]
    pub persist_shaped: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Sqlite,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub path: String,
    pub sweep_interval_seconds: u64,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Self::defaults()?
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("CONTEXT_BRIDGE").separator("__"))
            .build()?;

        let mut settings: Settings = s.try_deserialize()?;
        settings.apply_key_fallback(env::var("ANTHROPIC_API_KEY").ok());
        settings.validate()?;
        Ok(settings)
    }

    /// Builder preloaded with every default value
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("model.base_url", context_bridge::gateway::DEFAULT_BASE_URL)?
            .set_default("model.model", context_bridge::gateway::DEFAULT_MODEL)?
            .set_default("model.max_tokens", 1000)?
            .set_default("model.api_version", context_bridge::gateway::DEFAULT_API_VERSION)?
            .set_default("model.timeout_seconds", 60)?
            .set_default("model.system_prompt", DEFAULT_SYSTEM_PROMPT)?
            .set_default("context.max_turns", 50)?
            .set_default("context.max_bytes", 8000)?
            .set_default("context.ttl_hours", 24)?
            .set_default("context.max_history_turns", 500)?
            .set_default("context.persist_shaped", false)?
            .set_default("storage.backend", "memory")?
            .set_default("storage.path", "data/context-bridge.db")?
            .set_default("storage.sweep_interval_seconds", 300)
    }

    fn apply_key_fallback(&mut self, fallback: Option<String>) {
        let missing = self
            .model
            .api_key
            .as_deref()
            .is_none_or(|key| key.trim().is_empty());
        if missing {
            self.model.api_key = fallback.filter(|key| !key.trim().is_empty());
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.context.max_turns == 0 {
            return Err(ConfigError::Message(
                "context.max_turns must be at least 1".to_string(),
            ));
        }
        if self.context.max_history_turns < self.context.max_turns {
            return Err(ConfigError::Message(
                "context.max_history_turns must be at least context.max_turns".to_string(),
            ));
        }
        if self.context.ttl_hours == 0 {
            return Err(ConfigError::Message(
                "context.ttl_hours must be at least 1".to_string(),
            ));
        }
        if self.storage.sweep_interval_seconds == 0 {
            return Err(ConfigError::Message(
                "storage.sweep_interval_seconds must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn gateway_options(&self) -> GatewayOptions {
        GatewayOptions {
            base_url: self.model.base_url.clone(),
            model: self.model.model.clone(),
            max_tokens: self.model.max_tokens,
            api_version: self.model.api_version.clone(),
            timeout: Duration::from_secs(self.model.timeout_seconds),
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.context.ttl_hours.saturating_mul(60 * 60))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.storage.sweep_interval_seconds)
    }
}
