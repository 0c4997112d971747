pub mod environment;

use serde::Deserialize;

use std::fs;
use std::path::Path;
use anyhow::{anyhow, Result};
use backtrace::Backtrace;
use log::{error, info};

pub const DEFAULT_SETTINGS_PATH: &str = "src/resources/settings.yaml";

// Main configuration struct
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub auth: AuthConfig,
    pub poller: PollerConfig,
    pub keep_alive: KeepAliveConfig,
    pub gmail: GmailConfig,
    pub telegram: TelegramConfig,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Tokens come straight from the environment.
    #[default]
    Direct,
    /// Tokens come from `token.json`, obtained once through the consent page.
    Interactive,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub mode: AuthMode,
    pub credentials_path: String,
    pub credentials_base64_path: String,
    pub token_path: String,
    pub token_base64_path: String,
    pub scopes: Vec<String>,
    pub auth_uri: String,
    pub token_uri: String,
    pub open_browser: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mode: AuthMode::Direct,
            credentials_path: "credentials.json".to_string(),
            credentials_base64_path: "credentials.txt".to_string(),
            token_path: "token.json".to_string(),
            token_base64_path: "token.base64".to_string(),
            scopes: vec!["https://www.googleapis.com/auth/gmail.readonly".to_string()],
            auth_uri: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_uri: "https://oauth2.googleapis.com/token".to_string(),
            open_browser: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PollerConfig {
    /// Cron expression with a leading seconds field.
    pub schedule: String,
    pub query: String,
    /// Upper bound on messages listed per cycle. There is no pagination.
    pub max_results: u32,
    pub deduplicate: bool,
    pub run_on_start: bool,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            schedule: "0 0 */3 * * *".to_string(),
            query: "is:unread".to_string(),
            max_results: 10,
            deduplicate: true,
            run_on_start: true,
        }
    }
}

// Keep-alive listener for hosts that require an open port
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct KeepAliveConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GmailConfig {
    pub api_base: String,
    pub user_id: String,
    /// Web UI prefix the message id is appended to.
    pub web_url: String,
}

impl Default for GmailConfig {
    fn default() -> Self {
        Self {
            api_base: "https://gmail.googleapis.com/gmail/v1".to_string(),
            user_id: "me".to_string(),
            web_url: "https://mail.google.com/mail/u/0/#inbox".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TelegramConfig {
    pub api_base: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.telegram.org".to_string(),
        }
    }
}

pub fn parse_settings(yaml: &str) -> Result<Config, serde_yaml::Error> {
    serde_yaml::from_str(yaml)
}

/// Loads the settings file. Without an explicit path a missing default file
/// means built-in defaults; an explicit path must exist and parse.
pub fn load_settings(path: Option<&Path>) -> Result<Config> {
    let explicit = path.is_some();
    let path = path.unwrap_or_else(|| Path::new(DEFAULT_SETTINGS_PATH));

    if !explicit && !path.exists() {
        info!("No settings file at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            error!("Error: {}", err);
            let backtrace = Backtrace::new();
            error!("Backtrace:\n{:?}", backtrace);
            return Err(anyhow!("Cannot open settings {}: {}", path.display(), err));
        }
    };

    // Parse the YAML file into the Config struct
    let config = match parse_settings(&text) {
        Ok(config) => config,
        Err(err) => {
            error!("Error: {}", err);
            let backtrace = Backtrace::new();
            error!("Backtrace:\n{:?}", backtrace);
            return Err(anyhow!("Cannot deserialize settings {}: {}", path.display(), err));
        }
    };

    info!("Loaded settings from {}", path.display());
    Ok(config)
}
