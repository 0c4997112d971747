use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use log::{error, info, warn};
use reqwest::Client;
use serde::Deserialize;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use crate::auth::{token, Authenticator, CredentialHandle, Credentials, OAuthClient};
use crate::error::{AuthError, ConfigError};
use crate::settings::AuthConfig;

const CODE_PROMPT: &str = "Enter the code from the page: ";

pub type CodePrompt = fn(&str) -> io::Result<String>;

fn read_code(prompt: &str) -> io::Result<String> {
    read_code_from(prompt, &mut io::stdin().lock(), &mut io::stdout())
}

// The code is echoed so the operator can see what was pasted.
fn read_code_from<R: BufRead, W: Write>(
    prompt: &str,
    input: &mut R,
    output: &mut W,
) -> io::Result<String> {
    write!(output, "{}", prompt)?;
    output.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "input closed before a code was entered",
        ));
    }
    Ok(line)
}

// Layout of the client secrets file downloaded from the Google console
#[derive(Debug, Deserialize)]
struct CredentialsFile {
    installed: Option<ClientSection>,
    web: Option<ClientSection>,
}

#[derive(Debug, Deserialize)]
struct ClientSection {
    client_id: String,
    client_secret: String,
    #[serde(default)]
    redirect_uris: Vec<String>,
    auth_uri: Option<String>,
    token_uri: Option<String>,
}

pub fn load_client(config: &AuthConfig) -> Result<OAuthClient, ConfigError> {
    let path = &config.credentials_path;
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    let file: CredentialsFile = serde_json::from_str(&raw).map_err(|e| ConfigError::Parse {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    let section = file.installed.or(file.web).ok_or_else(|| ConfigError::Parse {
        path: path.clone(),
        reason: "expected an \"installed\" or \"web\" section".to_string(),
    })?;

    Ok(OAuthClient {
        client_id: section.client_id,
        client_secret: section.client_secret,
        redirect_uri: section.redirect_uris.into_iter().next().unwrap_or_default(),
        auth_uri: section.auth_uri.unwrap_or_else(|| config.auth_uri.clone()),
        token_uri: section.token_uri.unwrap_or_else(|| config.token_uri.clone()),
    })
}

/// Recreates `credentials.json` and `token.json` from their base64 mirrors
/// when only the mirrors exist. Runs once at startup.
pub fn restore_base64_artifacts(config: &AuthConfig) -> Result<(), ConfigError> {
    restore_one(
        Path::new(&config.credentials_path),
        Path::new(&config.credentials_base64_path),
    )?;
    restore_one(
        Path::new(&config.token_path),
        Path::new(&config.token_base64_path),
    )
}

fn restore_one(plain: &Path, encoded: &Path) -> Result<(), ConfigError> {
    if plain.exists() || !encoded.exists() {
        return Ok(());
    }

    let io_error = |path: &Path, source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    };
    let text = fs::read_to_string(encoded).map_err(|e| io_error(encoded, e))?;
    let decoded = BASE64.decode(text.trim()).map_err(|e| ConfigError::Parse {
        path: encoded.display().to_string(),
        reason: e.to_string(),
    })?;
    fs::write(plain, decoded).map_err(|e| io_error(plain, e))?;

    info!("Decoded {} -> {}", encoded.display(), plain.display());
    Ok(())
}

/// `token.json` plus its base64 mirror.
#[derive(Debug, Clone)]
pub struct TokenStore {
    token_path: PathBuf,
    base64_path: PathBuf,
}

impl TokenStore {
    pub fn new(token_path: impl Into<PathBuf>, base64_path: impl Into<PathBuf>) -> Self {
        Self {
            token_path: token_path.into(),
            base64_path: base64_path.into(),
        }
    }

    pub fn load(&self) -> Result<Option<Credentials>, ConfigError> {
        if !self.token_path.exists() {
            return Ok(None);
        }
        let path = self.token_path.display().to_string();
        let raw = fs::read_to_string(&self.token_path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let credentials = serde_json::from_str(&raw).map_err(|e| ConfigError::Parse {
            path,
            reason: e.to_string(),
        })?;
        Ok(Some(credentials))
    }

    pub fn save(&self, credentials: &Credentials) -> Result<(), AuthError> {
        let json = serde_json::to_string(credentials).map_err(|e| AuthError::Persist {
            path: self.token_path.display().to_string(),
            source: io::Error::new(io::ErrorKind::InvalidData, e),
        })?;

        fs::write(&self.token_path, &json).map_err(|source| AuthError::Persist {
            path: self.token_path.display().to_string(),
            source,
        })?;
        info!("Token stored to {}", self.token_path.display());

        fs::write(&self.base64_path, BASE64.encode(&json)).map_err(|source| {
            AuthError::Persist {
                path: self.base64_path.display().to_string(),
                source,
            }
        })?;
        info!(
            "Encoded {} -> {}",
            self.token_path.display(),
            self.base64_path.display()
        );
        Ok(())
    }
}

pub fn authorization_url(client: &OAuthClient, scopes: &[String]) -> String {
    format!(
        "{}?access_type=offline&response_type=code&client_id={}&redirect_uri={}&scope={}",
        client.auth_uri,
        urlencoding::encode(&client.client_id),
        urlencoding::encode(&client.redirect_uri),
        urlencoding::encode(&scopes.join(" ")),
    )
}

/// Reuses `token.json` when present; otherwise walks the operator through
/// the consent page once and stores the result.
pub struct InteractiveAuthenticator {
    client: OAuthClient,
    scopes: Vec<String>,
    store: TokenStore,
    http: Client,
    open_browser: bool,
    prompt: CodePrompt,
}

impl InteractiveAuthenticator {
    pub fn new(config: &AuthConfig, http: Client) -> Result<Self, ConfigError> {
        Ok(Self {
            client: load_client(config)?,
            scopes: config.scopes.clone(),
            store: TokenStore::new(&config.token_path, &config.token_base64_path),
            http,
            open_browser: config.open_browser,
            prompt: read_code,
        })
    }

    #[cfg(test)]
    pub fn with_prompt(mut self, prompt: CodePrompt) -> Self {
        self.prompt = prompt;
        self
    }

    async fn obtain_token(&self) -> Result<Credentials, AuthError> {
        let url = authorization_url(&self.client, &self.scopes);
        info!("Authorize this app by visiting this URL: {}", url);
        if self.open_browser {
            if let Err(e) = open::that(&url) {
                warn!("Cannot open a browser: {}", e);
            }
        }

        let prompt = self.prompt;
        let code = tokio::task::spawn_blocking(move || prompt(CODE_PROMPT))
            .await
            .map_err(|e| AuthError::Prompt(e.to_string()))?
            .map_err(|e| AuthError::Prompt(e.to_string()))?;
        let code = code.trim();
        if code.is_empty() {
            return Err(AuthError::Prompt("empty authorization code".to_string()));
        }

        let credentials = match token::exchange_code(&self.http, &self.client, code).await {
            Ok(credentials) => credentials,
            Err(e) => {
                error!("Error retrieving token: {}", e);
                return Err(e);
            }
        };
        self.store.save(&credentials)?;
        Ok(credentials)
    }
}

#[async_trait]
impl Authenticator for InteractiveAuthenticator {
    async fn authorize(&self) -> Result<CredentialHandle, AuthError> {
        let credentials = match self.store.load()? {
            Some(credentials) => credentials,
            None => self.obtain_token().await?,
        };

        Ok(CredentialHandle {
            credentials,
            client: Some(self.client.clone()),
            store: Some(self.store.clone()),
        })
    }
}
