use async_trait::async_trait;

use crate::auth::{Authenticator, CredentialHandle, Credentials, OAuthClient};
use crate::error::{AuthError, ConfigError};
use crate::settings::environment::{
    optional, process_env, required, ACCESS_TOKEN, CLIENT_ID, CLIENT_SECRET, REDIRECT_URI,
    REFRESH_TOKEN, SCOPE, TOKEN_TYPE,
};
use crate::settings::AuthConfig;

/// Builds the handle from tokens supplied through the environment. No file
/// I/O and no network round trip; rotating the tokens is the operator's job.
pub struct DirectAuthenticator {
    credentials: Credentials,
    client: Option<OAuthClient>,
}

impl DirectAuthenticator {
    pub fn from_env(config: &AuthConfig) -> Result<Self, ConfigError> {
        Self::from_lookup(config, process_env)
    }

    pub fn from_lookup<F>(config: &AuthConfig, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let credentials = Credentials {
            access_token: required(&lookup, ACCESS_TOKEN)?,
            refresh_token: optional(&lookup, REFRESH_TOKEN),
            scope: optional(&lookup, SCOPE),
            token_type: optional(&lookup, TOKEN_TYPE),
            expiry_date: None,
        };

        // Without both halves of the client registration the access token is used as-is.
        let client = match (optional(&lookup, CLIENT_ID), optional(&lookup, CLIENT_SECRET)) {
            (Some(client_id), Some(client_secret)) => Some(OAuthClient {
                client_id,
                client_secret,
                redirect_uri: optional(&lookup, REDIRECT_URI).unwrap_or_default(),
                auth_uri: config.auth_uri.clone(),
                token_uri: config.token_uri.clone(),
            }),
            _ => None,
        };

        Ok(Self {
            credentials,
            client,
        })
    }
}

#[async_trait]
impl Authenticator for DirectAuthenticator {
    async fn authorize(&self) -> Result<CredentialHandle, AuthError> {
        Ok(CredentialHandle {
            client: self.client.clone(),
            ..CredentialHandle::new(self.credentials.clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[tokio::test]
    async fn builds_handle_from_all_fields() {
        let auth = DirectAuthenticator::from_lookup(
            &AuthConfig::default(),
            lookup_from(&[
                (ACCESS_TOKEN, "ya29.a"),
                (REFRESH_TOKEN, "1//r"),
                (SCOPE, "https://www.googleapis.com/auth/gmail.readonly"),
                (TOKEN_TYPE, "Bearer"),
                (CLIENT_ID, "id.apps.googleusercontent.com"),
                (CLIENT_SECRET, "secret"),
                (REDIRECT_URI, "http://localhost"),
            ]),
        )
        .unwrap();

        let handle = auth.authorize().await.unwrap();
        assert_eq!(handle.credentials.access_token, "ya29.a");
        assert_eq!(handle.credentials.token_type.as_deref(), Some("Bearer"));
        assert!(handle.can_refresh());
        let client = handle.client.unwrap();
        assert_eq!(client.redirect_uri, "http://localhost");
        assert_eq!(client.token_uri, AuthConfig::default().token_uri);
        assert!(handle.store.is_none());
    }

    #[tokio::test]
    async fn access_token_alone_is_enough() {
        let auth = DirectAuthenticator::from_lookup(
            &AuthConfig::default(),
            lookup_from(&[(ACCESS_TOKEN, "ya29.a"), (CLIENT_ID, "id-only")]),
        )
        .unwrap();

        let handle = auth.authorize().await.unwrap();
        assert!(handle.client.is_none());
        assert!(!handle.can_refresh());
    }

    #[test]
    fn missing_access_token_fails() {
        let result = DirectAuthenticator::from_lookup(
            &AuthConfig::default(),
            lookup_from(&[(REFRESH_TOKEN, "1//r")]),
        );
        assert!(matches!(result, Err(ConfigError::MissingEnv(name)) if name == ACCESS_TOKEN));
    }
}
