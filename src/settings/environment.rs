//! Environment variables read at startup.

use crate::error::ConfigError;

pub const KEYWORDS: &str = "KEYWORDS";
pub const TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const TELEGRAM_CHAT_ID: &str = "TELEGRAM_CHAT_ID";
pub const CLIENT_ID: &str = "CLIENT_ID";
pub const CLIENT_SECRET: &str = "CLIENT_SECRET";
pub const REDIRECT_URI: &str = "REDIRECT_URI";
pub const ACCESS_TOKEN: &str = "ACCESS_TOKEN";
pub const REFRESH_TOKEN: &str = "REFRESH_TOKEN";
pub const SCOPE: &str = "SCOPE";
pub const TOKEN_TYPE: &str = "TOKEN_TYPE";
pub const PORT: &str = "PORT";

#[derive(Debug, Clone)]
pub struct Environment {
    pub telegram_bot_token: String,
    pub telegram_chat_id: String,
    pub port: Option<u16>,
}

impl Environment {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(process_env)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Checked here so a missing list fails before anything is scheduled.
        required(&lookup, KEYWORDS)?;

        let port = match optional(&lookup, PORT) {
            Some(raw) => Some(raw.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: PORT.to_string(),
                reason: e.to_string(),
            })?),
            None => None,
        };

        Ok(Self {
            telegram_bot_token: required(&lookup, TELEGRAM_BOT_TOKEN)?,
            telegram_chat_id: required(&lookup, TELEGRAM_CHAT_ID)?,
            port,
        })
    }
}

pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Blank values count as unset.
pub fn optional<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name).filter(|value| !value.trim().is_empty())
}

pub fn required<F>(lookup: &F, name: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, name).ok_or_else(|| ConfigError::MissingEnv(name.to_string()))
}
