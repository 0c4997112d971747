//! OAuth2 token endpoint calls.

use chrono::Utc;
use log::debug;
use reqwest::Client;
use serde::Deserialize;

use crate::auth::{Credentials, OAuthClient};
use crate::error::AuthError;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
}

impl TokenResponse {
    fn into_credentials(self, now_millis: i64) -> Credentials {
        Credentials {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            scope: self.scope,
            token_type: self.token_type,
            expiry_date: self.expires_in.map(|secs| now_millis + secs * 1000),
        }
    }
}

/// Trades an authorization code for tokens.
pub async fn exchange_code(
    http: &Client,
    client: &OAuthClient,
    code: &str,
) -> Result<Credentials, AuthError> {
    request_token(
        http,
        &client.token_uri,
        &[
            ("code", code),
            ("client_id", client.client_id.as_str()),
            ("client_secret", client.client_secret.as_str()),
            ("redirect_uri", client.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ],
    )
    .await
}

pub async fn refresh(
    http: &Client,
    client: &OAuthClient,
    refresh_token: &str,
) -> Result<Credentials, AuthError> {
    request_token(
        http,
        &client.token_uri,
        &[
            ("client_id", client.client_id.as_str()),
            ("client_secret", client.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ],
    )
    .await
}

async fn request_token(
    http: &Client,
    token_uri: &str,
    form: &[(&str, &str)],
) -> Result<Credentials, AuthError> {
    debug!("POST {}", token_uri);
    let response = http.post(token_uri).form(form).send().await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AuthError::Rejected {
            status: status.as_u16(),
            body,
        });
    }

    let token: TokenResponse = response.json().await?;
    Ok(token.into_credentials(Utc::now().timestamp_millis()))
}
