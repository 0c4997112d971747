pub mod direct;
pub mod interactive;
pub mod token;

use async_trait::async_trait;
use chrono::Utc;
use log::info;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::auth::interactive::TokenStore;
use crate::error::AuthError;

/// OAuth2 token bundle, in the shape Google tools write to `token.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Milliseconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,
}

impl Credentials {
    pub fn is_expired_at(&self, now_millis: i64) -> bool {
        self.expiry_date.is_some_and(|expiry| expiry <= now_millis)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp_millis())
    }

    pub fn authorization_header(&self) -> String {
        // Google hands out "Bearer"; stored files sometimes carry it lowercased.
        let kind = match self.token_type.as_deref() {
            Some(kind) if !kind.eq_ignore_ascii_case("bearer") => kind,
            _ => "Bearer",
        };
        format!("{} {}", kind, self.access_token)
    }

    /// Applies a refresh response. Google omits the refresh token on refresh,
    /// so the old one is kept unless a new one arrives.
    fn absorb(&mut self, fresh: Credentials) {
        self.access_token = fresh.access_token;
        self.expiry_date = fresh.expiry_date;
        if fresh.refresh_token.is_some() {
            self.refresh_token = fresh.refresh_token;
        }
        if fresh.scope.is_some() {
            self.scope = fresh.scope;
        }
        if fresh.token_type.is_some() {
            self.token_type = fresh.token_type;
        }
    }
}

/// OAuth2 client registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub auth_uri: String,
    pub token_uri: String,
}

/// Ready-to-use credentials for one invocation of the poll loop.
///
/// Built fresh for every invocation and dropped afterwards. The only state it
/// changes is its own access token, when the mailbox client refreshes it.
#[derive(Debug, Clone)]
pub struct CredentialHandle {
    pub credentials: Credentials,
    pub client: Option<OAuthClient>,
    /// Where refreshed tokens are written back, if anywhere.
    pub store: Option<TokenStore>,
}

impl CredentialHandle {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            client: None,
            store: None,
        }
    }

    pub fn can_refresh(&self) -> bool {
        self.credentials.refresh_token.is_some()
            && self
                .client
                .as_ref()
                .is_some_and(|client| !client.client_secret.is_empty())
    }

    pub async fn refresh(&mut self, http: &Client) -> Result<(), AuthError> {
        let (Some(client), Some(refresh_token)) =
            (self.client.as_ref(), self.credentials.refresh_token.as_deref())
        else {
            return Err(AuthError::CannotRefresh);
        };

        let fresh = token::refresh(http, client, refresh_token).await?;
        self.credentials.absorb(fresh);
        info!("Access token refreshed");

        if let Some(store) = &self.store {
            store.save(&self.credentials)?;
        }
        Ok(())
    }
}

/// Produces the credential handle each invocation starts from.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authorize(&self) -> Result<CredentialHandle, AuthError>;
}
