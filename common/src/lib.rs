/*!
common/src/lib.rs

Shared configuration types for the AI news bot.

This file provides:
- Config data structures (deserialized from TOML)
- An async loader with default/override file merging
- Environment resolution into an immutable `Settings` value
- The `ConfigError` taxonomy
*/

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use url::Url;

/// Required: Anthropic API key for digest generation.
pub const ENV_ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
/// Required: comma-separated list of notification methods.
pub const ENV_NOTIFICATION_METHODS: &str = "NOTIFICATION_METHODS";
/// Optional: language code for generated content, defaults to "en".
pub const ENV_AI_RESPONSE_LANGUAGE: &str = "AI_RESPONSE_LANGUAGE";
/// Required when "email" is selected.
pub const ENV_RESEND_API_KEY: &str = "RESEND_API_KEY";
/// Required when "email" is selected.
pub const ENV_EMAIL_FROM: &str = "EMAIL_FROM";
/// Required when "email" is selected.
pub const ENV_EMAIL_TO: &str = "EMAIL_TO";
/// Required when "webhook" is selected.
pub const ENV_WEBHOOK_URL: &str = "WEBHOOK_URL";

/// Errors raised while loading or resolving configuration. All of these
/// are fatal and surface before any network call is made.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("required environment variable {0} is not set")]
    MissingEnv(&'static str),

    #[error("invalid value for {name}: {reason}")]
    InvalidEnv { name: &'static str, reason: String },

    #[error("unknown notification method: {0}")]
    UnknownMethod(String),

    #[error("no notification methods configured (set NOTIFICATION_METHODS)")]
    NoMethods,
}

/// News content configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsConfig {
    /// Topics the digest should cover, in presentation order
    #[serde(default = "default_topics")]
    pub topics: Vec<String>,
    /// Prompt template with a `{topics}` placeholder
    #[serde(default = "default_prompt_template")]
    pub prompt_template: String,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            topics: default_topics(),
            prompt_template: default_prompt_template(),
        }
    }
}

/// LLM endpoint configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_api_url")]
    pub api_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_llm_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: default_llm_api_url(),
            model: default_llm_model(),
            max_tokens: default_llm_max_tokens(),
            timeout_seconds: default_llm_timeout_seconds(),
        }
    }
}

/// Email delivery configuration section. Credentials come from the
/// environment; only the endpoint lives in the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default = "default_email_api_url")]
    pub api_url: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            api_url: default_email_api_url(),
        }
    }
}

/// Logging configuration section. `format` is "full" or "compact".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub news: NewsConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file asynchronously.
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;
        toml::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Load configuration with an optional default file and an optional
    /// override file. If both are present, they are merged (override takes
    /// precedence). With neither present, built-in defaults apply.
    pub async fn load_with_defaults(
        default_path: Option<&Path>,
        override_path: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        for path in [default_path, override_path].into_iter().flatten() {
            if !path.exists() {
                continue;
            }
            let data = tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ConfigError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
            let val: toml::Value = toml::from_str(&data).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
            merge_toml(&mut config_value, val);
        }

        config_value
            .try_into()
            .map_err(|source| ConfigError::Parse {
                path: "merged configuration".to_string(),
                source,
            })
    }
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}

fn default_topics() -> Vec<String> {
    vec!["Latest AI developments and breakthroughs".to_string()]
}

fn default_prompt_template() -> String {
    "You are an AI news curator. Please provide a concise daily digest of AI news and developments.\n\
     \n\
     Focus on these topics:\n\
     {topics}\n\
     \n\
     Requirements:\n\
     1. Provide 3-5 key news items or developments\n\
     2. Each item should include a brief description (2-3 sentences)\n\
     3. Focus on significant developments from the past 24-48 hours\n\
     4. Include context about why each item is important\n\
     5. Use a professional but accessible tone\n\
     \n\
     Format your response as a structured news digest with clear sections."
        .to_string()
}

fn default_llm_api_url() -> String {
    "https://api.anthropic.com/v1/messages".to_string()
}

fn default_llm_model() -> String {
    "claude-sonnet-4-5-20250929".to_string()
}

fn default_llm_max_tokens() -> u32 {
    2000
}

fn default_llm_timeout_seconds() -> u64 {
    60
}

fn default_email_api_url() -> String {
    "https://api.resend.com/emails".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "full".to_string()
}

/// Supported response languages. Each code maps to the English name used
/// in the prompt instruction appended for non-English runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Zh,
    Ja,
    Ko,
    Es,
    Fr,
    De,
    Pt,
    Ru,
    It,
    Ar,
    Hi,
    Nl,
}

impl Language {
    /// Parse a language code, case-insensitively. Returns `None` for
    /// unsupported codes.
    pub fn parse(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "en" => Some(Self::En),
            "zh" => Some(Self::Zh),
            "ja" => Some(Self::Ja),
            "ko" => Some(Self::Ko),
            "es" => Some(Self::Es),
            "fr" => Some(Self::Fr),
            "de" => Some(Self::De),
            "pt" => Some(Self::Pt),
            "ru" => Some(Self::Ru),
            "it" => Some(Self::It),
            "ar" => Some(Self::Ar),
            "hi" => Some(Self::Hi),
            "nl" => Some(Self::Nl),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Zh => "zh",
            Self::Ja => "ja",
            Self::Ko => "ko",
            Self::Es => "es",
            Self::Fr => "fr",
            Self::De => "de",
            Self::Pt => "pt",
            Self::Ru => "ru",
            Self::It => "it",
            Self::Ar => "ar",
            Self::Hi => "hi",
            Self::Nl => "nl",
        }
    }

    pub fn english_name(&self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Zh => "Chinese",
            Self::Ja => "Japanese",
            Self::Ko => "Korean",
            Self::Es => "Spanish",
            Self::Fr => "French",
            Self::De => "German",
            Self::Pt => "Portuguese",
            Self::Ru => "Russian",
            Self::It => "Italian",
            Self::Ar => "Arabic",
            Self::Hi => "Hindi",
            Self::Nl => "Dutch",
        }
    }
}

/// The closed set of delivery channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyMethod {
    Email,
    Webhook,
}

impl NotifyMethod {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "email" => Some(Self::Email),
            "webhook" => Some(Self::Webhook),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Webhook => "webhook",
        }
    }
}

/// Parse the comma-separated NOTIFICATION_METHODS value. Declared order is
/// preserved (it is the dispatch order), duplicates are dropped, unknown
/// names are rejected and an empty result is an error.
pub fn parse_methods(raw: &str) -> Result<Vec<NotifyMethod>, ConfigError> {
    let mut methods = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let method =
            NotifyMethod::parse(part).ok_or_else(|| ConfigError::UnknownMethod(part.to_string()))?;
        if !methods.contains(&method) {
            methods.push(method);
        }
    }
    if methods.is_empty() {
        return Err(ConfigError::NoMethods);
    }
    Ok(methods)
}

/// Resolved email channel settings.
#[derive(Debug, Clone)]
pub struct EmailSettings {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
    pub to: String,
}

/// Resolved webhook channel settings.
#[derive(Debug, Clone)]
pub struct WebhookSettings {
    pub url: String,
}

/// The immutable, fully resolved configuration for one run: file config
/// plus environment. Constructed once at startup and passed by reference;
/// components never read the environment themselves.
#[derive(Debug, Clone)]
pub struct Settings {
    pub news: NewsConfig,
    pub llm: LlmConfig,
    pub logging: LoggingConfig,
    pub anthropic_api_key: String,
    pub language: Language,
    pub methods: Vec<NotifyMethod>,
    pub email: Option<EmailSettings>,
    pub webhook: Option<WebhookSettings>,
}

impl Settings {
    /// Resolve settings from the process environment.
    pub fn from_env(config: Config) -> Result<Self, ConfigError> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::resolve(config, &vars)
    }

    /// Resolve settings from an explicit variable map. Validates everything
    /// up front so failures happen before any network call.
    pub fn resolve(config: Config, vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let anthropic_api_key = require(vars, ENV_ANTHROPIC_API_KEY)?;

        let methods_raw = vars
            .get(ENV_NOTIFICATION_METHODS)
            .ok_or(ConfigError::MissingEnv(ENV_NOTIFICATION_METHODS))?;
        let methods = parse_methods(methods_raw)?;

        let language = match vars.get(ENV_AI_RESPONSE_LANGUAGE) {
            None => Language::default(),
            Some(raw) if raw.trim().is_empty() => Language::default(),
            Some(raw) => Language::parse(raw).ok_or_else(|| ConfigError::InvalidEnv {
                name: ENV_AI_RESPONSE_LANGUAGE,
                reason: format!("unsupported language code: {raw}"),
            })?,
        };

        let email = if methods.contains(&NotifyMethod::Email) {
            Some(EmailSettings {
                api_url: config.email.api_url.clone(),
                api_key: require(vars, ENV_RESEND_API_KEY)?,
                from: require(vars, ENV_EMAIL_FROM)?,
                to: require(vars, ENV_EMAIL_TO)?,
            })
        } else {
            None
        };

        let webhook = if methods.contains(&NotifyMethod::Webhook) {
            let raw = require(vars, ENV_WEBHOOK_URL)?;
            Url::parse(&raw).map_err(|e| ConfigError::InvalidEnv {
                name: ENV_WEBHOOK_URL,
                reason: e.to_string(),
            })?;
            Some(WebhookSettings { url: raw })
        } else {
            None
        };

        Ok(Self {
            news: config.news,
            llm: config.llm,
            logging: config.logging,
            anthropic_api_key,
            language,
            methods,
            email,
            webhook,
        })
    }
}

fn require(vars: &HashMap<String, String>, name: &'static str) -> Result<String, ConfigError> {
    match vars.get(name) {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ConfigError::MissingEnv(name)),
    }
}

/// Mask a URL's path for logging, keeping scheme and host only.
pub fn mask_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(url) => match url.host_str() {
            Some(host) => format!("{}://{}/***", url.scheme(), host),
            None => "***".to_string(),
        },
        Err(_) => "***".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn base_vars() -> HashMap<String, String> {
        let mut vars = HashMap::new();
        vars.insert(ENV_ANTHROPIC_API_KEY.to_string(), "sk-ant-test".to_string());
        vars.insert(ENV_NOTIFICATION_METHODS.to_string(), "webhook".to_string());
        vars.insert(
            ENV_WEBHOOK_URL.to_string(),
            "https://hooks.example.com/digest".to_string(),
        );
        vars
    }

    #[test]
    fn config_parses_news_section() {
        let toml = r#"
            [news]
            topics = ["AI research", "AI products"]
            prompt_template = "Digest these: {topics}"

            [logging]
            level = "debug"
        "#;

        let cfg: Config = toml::from_str(toml).expect("parse config");
        assert_eq!(cfg.news.topics.len(), 2);
        assert_eq!(cfg.news.prompt_template, "Digest these: {topics}");
        assert_eq!(cfg.logging.level, "debug");
        // Untouched sections fall back to defaults
        assert_eq!(cfg.llm.model, "claude-sonnet-4-5-20250929");
        assert_eq!(cfg.llm.max_tokens, 2000);
        assert_eq!(cfg.email.api_url, "https://api.resend.com/emails");
    }

    #[test]
    fn empty_config_uses_defaults() {
        let cfg: Config = toml::from_str("").expect("parse empty config");
        assert_eq!(cfg.news.topics.len(), 1);
        assert!(cfg.news.prompt_template.contains("{topics}"));
        assert_eq!(cfg.logging.level, "info");
    }

    #[tokio::test]
    async fn load_with_defaults_merges_override() {
        let dir = tempfile::tempdir().expect("tempdir");

        let default_path = dir.path().join("config.default.toml");
        let mut f = std::fs::File::create(&default_path).expect("create default");
        writeln!(
            f,
            "[news]\ntopics = [\"default topic\"]\n\n[logging]\nlevel = \"info\""
        )
        .expect("write default");

        let override_path = dir.path().join("config.toml");
        let mut f = std::fs::File::create(&override_path).expect("create override");
        writeln!(f, "[logging]\nlevel = \"debug\"").expect("write override");

        let cfg = Config::load_with_defaults(Some(&default_path), Some(&override_path))
            .await
            .expect("load merged config");

        // Override wins where set, defaults survive elsewhere
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.news.topics, vec!["default topic".to_string()]);
    }

    #[tokio::test]
    async fn from_file_reports_missing_path() {
        let err = Config::from_file("does-not-exist.toml").await.unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn resolve_requires_api_key() {
        let mut vars = base_vars();
        vars.remove(ENV_ANTHROPIC_API_KEY);

        let err = Settings::resolve(Config::default(), &vars).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingEnv(ENV_ANTHROPIC_API_KEY)
        ));
    }

    #[test]
    fn resolve_requires_email_vars_when_email_selected() {
        let mut vars = base_vars();
        vars.insert(
            ENV_NOTIFICATION_METHODS.to_string(),
            "email,webhook".to_string(),
        );
        vars.insert(ENV_RESEND_API_KEY.to_string(), "re_test".to_string());
        vars.insert(ENV_EMAIL_FROM.to_string(), "bot@example.com".to_string());
        // EMAIL_TO intentionally absent

        let err = Settings::resolve(Config::default(), &vars).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv(ENV_EMAIL_TO)));
    }

    #[test]
    fn resolve_rejects_unknown_method() {
        let mut vars = base_vars();
        vars.insert(
            ENV_NOTIFICATION_METHODS.to_string(),
            "email,carrier-pigeon".to_string(),
        );

        let err = Settings::resolve(Config::default(), &vars).unwrap_err();
        match err {
            ConfigError::UnknownMethod(name) => assert_eq!(name, "carrier-pigeon"),
            other => panic!("expected UnknownMethod, got {other:?}"),
        }
    }

    #[test]
    fn resolve_rejects_empty_method_list() {
        let mut vars = base_vars();
        vars.insert(ENV_NOTIFICATION_METHODS.to_string(), " , ".to_string());

        let err = Settings::resolve(Config::default(), &vars).unwrap_err();
        assert!(matches!(err, ConfigError::NoMethods));
    }

    #[test]
    fn resolve_rejects_missing_method_var() {
        let mut vars = base_vars();
        vars.remove(ENV_NOTIFICATION_METHODS);

        let err = Settings::resolve(Config::default(), &vars).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingEnv(ENV_NOTIFICATION_METHODS)
        ));
    }

    #[test]
    fn resolve_rejects_invalid_webhook_url() {
        let mut vars = base_vars();
        vars.insert(ENV_WEBHOOK_URL.to_string(), "not a url".to_string());

        let err = Settings::resolve(Config::default(), &vars).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidEnv {
                name: ENV_WEBHOOK_URL,
                ..
            }
        ));
    }

    #[test]
    fn resolve_language_defaults_and_parses() {
        let vars = base_vars();
        let settings = Settings::resolve(Config::default(), &vars).expect("resolve");
        assert_eq!(settings.language, Language::En);

        let mut vars = base_vars();
        vars.insert(ENV_AI_RESPONSE_LANGUAGE.to_string(), "ZH".to_string());
        let settings = Settings::resolve(Config::default(), &vars).expect("resolve zh");
        assert_eq!(settings.language, Language::Zh);
        assert_eq!(settings.language.english_name(), "Chinese");

        let mut vars = base_vars();
        vars.insert(ENV_AI_RESPONSE_LANGUAGE.to_string(), "klingon".to_string());
        let err = Settings::resolve(Config::default(), &vars).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidEnv {
                name: ENV_AI_RESPONSE_LANGUAGE,
                ..
            }
        ));
    }

    #[test]
    fn methods_keep_declared_order_and_dedup() {
        let methods = parse_methods("webhook, email, webhook").expect("parse methods");
        assert_eq!(methods, vec![NotifyMethod::Webhook, NotifyMethod::Email]);
    }

    #[test]
    fn mask_url_keeps_host_only() {
        assert_eq!(
            mask_url("https://hooks.example.com/secret/token-abc"),
            "https://hooks.example.com/***"
        );
        assert_eq!(mask_url("not a url"), "***");
    }
}
