//! Configuration management
//!
//! Settings are loaded with the following priority:
//! 1. Environment variables
//! 2. `novacal.toml` configuration file
//! 3. Default values
//!
//! `${VAR_NAME}` references inside the configuration file are expanded from
//! the environment.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::Error;

/// LLM Provider type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Google Gemini through its OpenAI-compatible endpoint
    #[default]
    Gemini,
    /// Any OpenAI-compatible chat completions API
    OpenAi,
    /// Anthropic Claude Messages API
    Claude,
}

impl LlmProvider {
    fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "openai" | "glm" | "zai" => Self::OpenAi,
            "claude" | "anthropic" => Self::Claude,
            _ => Self::Gemini,
        }
    }

    /// Endpoint used when no base URL is configured
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai",
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Claude => "https://api.anthropic.com/v1",
        }
    }
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API key; empty until the user provides one
    #[serde(default)]
    pub api_key: String,

    /// Model to use
    #[serde(default = "default_model")]
    pub model: String,

    /// API provider
    #[serde(default)]
    pub provider: LlmProvider,

    /// Base URL (optional, for custom endpoints)
    pub base_url: Option<String>,

    /// Sampling temperature; kept low so tool arguments stay well-formed
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per model response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u64,

    /// Upper bound on model round-trips within one turn
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            provider: LlmProvider::default(),
            base_url: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_iterations: default_max_iterations(),
        }
    }
}

impl LlmConfig {
    /// Base URL to send requests to
    pub fn effective_base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.provider.default_base_url().to_string())
    }
}

/// Google Calendar configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarSettings {
    /// OAuth client configuration file
    #[serde(default = "default_credentials_path")]
    pub credentials_path: String,

    /// Authorized-user token file
    #[serde(default = "default_token_path")]
    pub token_path: String,

    /// Calendar REST API root
    #[serde(default = "default_calendar_api_base_url")]
    pub api_base_url: String,

    /// Calendar every tool operates on
    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,

    /// Public holiday calendar merged into date-range lookups
    #[serde(default = "default_holiday_calendar_id")]
    pub holiday_calendar_id: String,

    /// Offset appended to date-range boundaries
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,

    /// IANA zone name sent with created/updated events
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Result cap for keyword lookups
    #[serde(default = "default_keyword_limit")]
    pub keyword_limit: u32,

    /// Result cap per calendar for date-range lookups
    #[serde(default = "default_range_limit")]
    pub range_limit: u32,

    /// Result cap for the visual calendar listing
    #[serde(default = "default_view_limit")]
    pub view_limit: u32,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            credentials_path: default_credentials_path(),
            token_path: default_token_path(),
            api_base_url: default_calendar_api_base_url(),
            calendar_id: default_calendar_id(),
            holiday_calendar_id: default_holiday_calendar_id(),
            utc_offset: default_utc_offset(),
            timezone: default_timezone(),
            keyword_limit: default_keyword_limit(),
            range_limit: default_range_limit(),
            view_limit: default_view_limit(),
        }
    }
}

/// Agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Native calendar tools whose name contains one of these patterns are
    /// not offered to the model
    #[serde(default = "default_excluded_tools")]
    pub excluded_tools: Vec<String>,

    /// Instruction template replacing the built-in one
    pub prompt_path: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            excluded_tools: default_excluded_tools(),
            prompt_path: None,
        }
    }
}

/// Secret store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretsConfig {
    /// TOML file holding the `[files]` secrets
    #[serde(default = "default_secrets_path")]
    pub path: String,
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            path: default_secrets_path(),
        }
    }
}

/// HTTP API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Bearer key required by the HTTP API (optional)
    pub key: Option<String>,

    /// Port for HTTP API server
    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            key: None,
            port: default_api_port(),
        }
    }
}

/// Main configuration for novacal
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub calendar: CalendarSettings,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub secrets: SecretsConfig,

    #[serde(default)]
    pub api: ApiConfig,
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u64 {
    4096
}

fn default_max_iterations() -> usize {
    15
}

fn default_credentials_path() -> String {
    "credentials.json".to_string()
}

fn default_token_path() -> String {
    "token.json".to_string()
}

fn default_calendar_api_base_url() -> String {
    "https://www.googleapis.com/calendar/v3".to_string()
}

fn default_calendar_id() -> String {
    "primary".to_string()
}

fn default_holiday_calendar_id() -> String {
    "id.indonesian#holiday@group.v.calendar.google.com".to_string()
}

fn default_utc_offset() -> String {
    "+07:00".to_string()
}

fn default_timezone() -> String {
    "Asia/Jakarta".to_string()
}

fn default_keyword_limit() -> u32 {
    10
}

fn default_range_limit() -> u32 {
    50
}

fn default_view_limit() -> u32 {
    2500
}

fn default_excluded_tools() -> Vec<String> {
    vec!["search".to_string(), "get".to_string()]
}

fn default_secrets_path() -> String {
    "secrets.toml".to_string()
}

fn default_api_port() -> u16 {
    8501
}

impl Config {
    /// Expand `${VAR_NAME}` references with environment values.
    ///
    /// Unknown variables expand to an empty string.
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next(); // consume '{'

                let mut var_name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();

        let toml_content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let expanded_content = Self::expand_env_vars(&toml_content);

        let mut cfg = Self::from_toml_str(&expanded_content)?;
        cfg.apply_env_overrides();

        Ok(cfg)
    }

    /// Parse configuration from TOML text (no env expansion or overrides)
    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Load configuration from the default location.
    ///
    /// Uses `./novacal.toml` when present, otherwise the environment only.
    pub fn load() -> crate::Result<Self> {
        if Path::new("novacal.toml").exists() {
            return Self::from_toml_file("novacal.toml");
        }

        Ok(Self::from_env())
    }

    /// Load configuration from environment variables over defaults
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_env_overrides();
        cfg
    }

    /// Override settings with environment variables
    fn apply_env_overrides(&mut self) {
        // LLM
        if let Some(api_key) = env_non_empty("LLM_API_KEY").or_else(|| env_non_empty("GOOGLE_API_KEY")) {
            self.llm.api_key = api_key;
        }
        if let Some(model) = env_non_empty("LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(provider) = env_non_empty("LLM_PROVIDER") {
            self.llm.provider = LlmProvider::parse(&provider);
        }
        if let Some(base_url) = env_non_empty("LLM_BASE_URL") {
            self.llm.base_url = Some(base_url);
        }
        if let Some(temperature) = env_non_empty("LLM_TEMPERATURE").and_then(|t| t.parse().ok()) {
            self.llm.temperature = temperature;
        }

        // Calendar
        if let Some(path) = env_non_empty("CALENDAR_TOKEN_PATH") {
            self.calendar.token_path = path;
        }
        if let Some(path) = env_non_empty("CALENDAR_CREDENTIALS_PATH") {
            self.calendar.credentials_path = path;
        }
        if let Some(url) = env_non_empty("CALENDAR_API_BASE_URL") {
            self.calendar.api_base_url = url;
        }
        if let Some(offset) = env_non_empty("CALENDAR_UTC_OFFSET") {
            self.calendar.utc_offset = offset;
        }
        if let Some(id) = env_non_empty("HOLIDAY_CALENDAR_ID") {
            self.calendar.holiday_calendar_id = id;
        }

        // Agent
        if let Some(path) = env_non_empty("AGENT_PROMPT_PATH") {
            self.agent.prompt_path = Some(path);
        }

        // Secrets
        if let Some(path) = env_non_empty("SECRETS_PATH") {
            self.secrets.path = path;
        }

        // API
        if let Some(key) = env_non_empty("API_KEY") {
            self.api.key = Some(key);
        }
        if let Some(port) = env_non_empty("API_PORT").and_then(|p| p.parse().ok()) {
            self.api.port = port;
        }
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
