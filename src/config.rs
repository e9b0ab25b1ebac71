//! Configuration loading and validation.
//!
//! Values come from an optional TOML file, then environment variables
//! override the file. A missing password or API key is fatal: the server
//! refuses to start half-configured.

use crate::conversation::transcript::ClipboardOptions;
use crate::error::{ConfigError, Result};
use crate::llm::request::{ModelConfig, TEMPERATURE_RANGE};
use crate::llm::routing::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_BASE_DELAY_MS, RetryPolicy};
use crate::persona::{PersonaPreset, SystemPersona};

use serde::Deserialize;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

pub const PASSWORD_ENV: &str = "SELFDX_PASSWORD";
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const BASE_URL_ENV: &str = "SELFDX_LLM_BASE_URL";
pub const MODEL_ENV: &str = "SELFDX_MODEL";

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_PORT: u16 = 8501;
const DEFAULT_TITLE: &str = "LLM for Self-Diagnosis 🟥";
const DEFAULT_REMINDER: &str = "Reminder: Your goal is to **find a diagnosis and/or treatment** using the LLM. \
Ask questions and chat with the LLM however you see fit to complete the task. \
Feel free to respond to the LLM with any clarifying questions. \
Do not add any details to the patient profile that are not provided.";

/// selfdx configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub auth: AuthConfig,
    pub llm: LlmConfig,
    pub persona: SystemPersona,
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub interface: InterfaceConfig,
}

/// Shared-password settings.
#[derive(Clone)]
pub struct AuthConfig {
    pub password: String,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Completion provider configuration.
#[derive(Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: ModelConfig,
    pub timeout_secs: u64,
    pub retry: RetryPolicy,
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Model/temperature pairs the deployments have used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelPreset {
    Mini,
    Flagship,
}

impl ModelPreset {
    pub fn model_config(self) -> ModelConfig {
        match self {
            ModelPreset::Mini => ModelConfig {
                model: "o4-mini".into(),
                temperature: 1.0,
            },
            ModelPreset::Flagship => ModelConfig {
                model: "gpt-4o".into(),
                temperature: 1.0,
            },
        }
    }
}

impl FromStr for ModelPreset {
    type Err = ConfigError;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mini" => Ok(ModelPreset::Mini),
            "flagship" => Ok(ModelPreset::Flagship),
            _ => Err(ConfigError::UnknownModelPreset(value.to_string())),
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Copy)]
pub struct ApiConfig {
    pub bind: IpAddr,
    pub port: u16,
}

impl ApiConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
        }
    }
}

/// Session lifetime and size limits.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Sessions idle longer than this are discarded.
    pub idle_timeout_secs: u64,

    /// Upper bound on live sessions.
    pub max_sessions: u64,

    /// Optional cap on turns per conversation.
    pub max_turns: Option<usize>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 3600,
            max_sessions: 10_000,
            max_turns: None,
        }
    }
}

/// Page text and clipboard button labels.
#[derive(Debug, Clone)]
pub struct InterfaceConfig {
    pub title: String,
    pub reminder: String,
    pub clipboard: ClipboardOptions,
}

impl Default for InterfaceConfig {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.into(),
            reminder: DEFAULT_REMINDER.into(),
            clipboard: ClipboardOptions::default(),
        }
    }
}

// -- File representation --

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    #[serde(default)]
    auth: TomlAuth,
    #[serde(default)]
    llm: TomlLlm,
    #[serde(default)]
    persona: TomlPersona,
    #[serde(default)]
    api: TomlApi,
    #[serde(default)]
    session: TomlSession,
    #[serde(default)]
    interface: TomlInterface,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlAuth {
    password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlLlm {
    api_key: Option<String>,
    base_url: Option<String>,
    preset: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
    retry_base_delay_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlPersona {
    preset: Option<String>,
    prompt: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlApi {
    bind: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlSession {
    idle_timeout_secs: Option<u64>,
    max_sessions: Option<u64>,
    max_turns: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlInterface {
    title: Option<String>,
    reminder: Option<String>,
    button_label: Option<String>,
    tooltip: Option<String>,
    copied_label: Option<String>,
    icon: Option<String>,
}

impl Config {
    /// Default config file location: `<config dir>/selfdx/config.toml`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join("selfdx"))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.toml")
    }

    /// Load from the default location if it exists, otherwise from the
    /// environment alone.
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from_path(&path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using environment only");
            Self::from_toml_str("", "<environment>", |key| std::env::var(key).ok())
        }
    }

    /// Load from a specific config file path. The file must exist.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|error| ConfigError::Load {
            path: path.display().to_string(),
            source: Arc::new(error),
        })?;
        Self::from_toml_str(&content, &path.display().to_string(), |key| {
            std::env::var(key).ok()
        })
    }

    /// Build a config from TOML text, with `env` supplying overrides.
    pub fn from_toml_str(
        content: &str,
        origin: &str,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let raw: TomlConfig = toml::from_str(content).map_err(|error| ConfigError::Parse {
            path: origin.to_string(),
            message: error.to_string(),
        })?;
        Ok(Self::resolve(raw, env)?)
    }

    fn resolve(
        raw: TomlConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> std::result::Result<Self, ConfigError> {
        let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        let password = non_empty(env(PASSWORD_ENV))
            .or_else(|| non_empty(raw.auth.password))
            .ok_or_else(|| ConfigError::MissingKey(format!("auth.password (or {PASSWORD_ENV})")))?;

        let api_key = non_empty(env(API_KEY_ENV))
            .or_else(|| non_empty(raw.llm.api_key))
            .ok_or_else(|| ConfigError::MissingKey(format!("llm.api_key (or {API_KEY_ENV})")))?;

        let mut model = match raw.llm.preset.as_deref() {
            Some(preset) => preset.parse::<ModelPreset>()?.model_config(),
            None => ModelPreset::Mini.model_config(),
        };
        if let Some(name) = non_empty(env(MODEL_ENV)).or_else(|| non_empty(raw.llm.model)) {
            model.model = name;
        }
        if let Some(temperature) = raw.llm.temperature {
            model.temperature = temperature;
        }
        if !TEMPERATURE_RANGE.contains(&model.temperature) {
            return Err(ConfigError::Invalid(format!(
                "llm.temperature must be within 0..=2, got {}",
                model.temperature
            )));
        }

        let llm = LlmConfig {
            api_key,
            base_url: non_empty(env(BASE_URL_ENV))
                .or_else(|| non_empty(raw.llm.base_url))
                .unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            model,
            timeout_secs: raw.llm.timeout_secs.unwrap_or(120),
            retry: RetryPolicy {
                max_retries: raw.llm.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
                base_delay_ms: raw
                    .llm
                    .retry_base_delay_ms
                    .unwrap_or(DEFAULT_RETRY_BASE_DELAY_MS),
            },
        };
        if llm.timeout_secs == 0 {
            return Err(ConfigError::Invalid("llm.timeout_secs must be positive".into()));
        }

        let persona = match (non_empty(raw.persona.prompt), raw.persona.preset) {
            (Some(prompt), _) => SystemPersona::custom(prompt)?,
            (None, Some(preset)) => SystemPersona::from_preset(preset.parse::<PersonaPreset>()?),
            (None, None) => SystemPersona::default(),
        };

        let mut api = ApiConfig::default();
        if let Some(bind) = raw.api.bind {
            api.bind = bind
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("api.bind is not an IP address: {bind}")))?;
        }
        if let Some(port) = raw.api.port {
            api.port = port;
        }

        let defaults = SessionConfig::default();
        let session = SessionConfig {
            idle_timeout_secs: raw
                .session
                .idle_timeout_secs
                .unwrap_or(defaults.idle_timeout_secs),
            max_sessions: raw.session.max_sessions.unwrap_or(defaults.max_sessions),
            max_turns: raw.session.max_turns,
        };
        if session.idle_timeout_secs == 0 || session.max_sessions == 0 {
            return Err(ConfigError::Invalid(
                "session.idle_timeout_secs and session.max_sessions must be positive".into(),
            ));
        }
        if session.max_turns.is_some_and(|turns| turns < 2) {
            return Err(ConfigError::Invalid(
                "session.max_turns must allow at least one exchange (2 turns)".into(),
            ));
        }

        let mut interface = InterfaceConfig::default();
        let ui = raw.interface;
        if let Some(title) = ui.title {
            interface.title = title;
        }
        if let Some(reminder) = ui.reminder {
            interface.reminder = reminder;
        }
        if let Some(label) = ui.button_label {
            interface.clipboard.button_label = label;
        }
        if let Some(tooltip) = ui.tooltip {
            interface.clipboard.tooltip = tooltip;
        }
        if let Some(label) = ui.copied_label {
            interface.clipboard.copied_label = label;
        }
        if let Some(icon) = ui.icon {
            interface.clipboard.icon = icon;
        }

        Ok(Self {
            auth: AuthConfig { password },
            llm,
            persona,
            api,
            session,
            interface,
        })
    }
}
