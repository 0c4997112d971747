//! Gmail REST client.

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use crate::auth::CredentialHandle;
use crate::error::MailboxError;
use crate::mail_reader::message::{GmailMessage, ListMessagesResponse, MessageDetail, MessageSummary};
use crate::mail_reader::Mailbox;
use crate::settings::GmailConfig;

/// Gmail client bound to one credential handle.
///
/// An access token whose expiry has passed is refreshed before the request.
/// A 401 refreshes once and re-sends, when the handle allows refreshing.
pub struct GmailClient {
    http: Client,
    base_url: String,
    user_id: String,
    handle: Mutex<CredentialHandle>,
}

impl GmailClient {
    pub fn new(http: Client, config: &GmailConfig, handle: CredentialHandle) -> Self {
        Self {
            http,
            base_url: config.api_base.trim_end_matches('/').to_string(),
            user_id: config.user_id.clone(),
            handle: Mutex::new(handle),
        }
    }

    #[cfg(test)]
    pub fn into_handle(self) -> CredentialHandle {
        self.handle.into_inner()
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/users/{}/messages",
            self.base_url,
            urlencoding::encode(&self.user_id)
        )
    }

    async fn send(
        &self,
        url: &str,
        query: &[(&str, &str)],
        handle: &CredentialHandle,
    ) -> Result<Response, MailboxError> {
        let response = self
            .http
            .get(url)
            .query(query)
            .header("Authorization", handle.credentials.authorization_header())
            .send()
            .await?;
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, MailboxError> {
        let mut handle = self.handle.lock().await;

        if handle.credentials.is_expired() && handle.can_refresh() {
            info!("Access token expired, refreshing");
            handle.refresh(&self.http).await?;
        }

        debug!("GET {}", url);
        let mut response = self.send(url, query, &handle).await?;

        if response.status() == StatusCode::UNAUTHORIZED && handle.can_refresh() {
            warn!("Access token rejected, refreshing");
            handle.refresh(&self.http).await?;
            response = self.send(url, query, &handle).await?;
        }
        drop(handle);

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailboxError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl Mailbox for GmailClient {
    async fn list_messages(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<MessageSummary>, MailboxError> {
        let max_results = max_results.to_string();
        let response: ListMessagesResponse = self
            .get_json(
                &self.messages_url(),
                &[("q", query), ("maxResults", max_results.as_str())],
            )
            .await?;
        debug!(
            "List returned an estimated {} result(s)",
            response.result_size_estimate.unwrap_or(0)
        );
        Ok(response.messages.unwrap_or_default())
    }

    async fn get_message(&self, id: &str) -> Result<MessageDetail, MailboxError> {
        let url = format!("{}/{}", self.messages_url(), urlencoding::encode(id));
        let message: GmailMessage = self
            .get_json(
                &url,
                &[("format", "metadata"), ("metadataHeaders", "Subject")],
            )
            .await?;
        Ok(MessageDetail::from(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Credentials, OAuthClient};
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials(access_token: &str) -> Credentials {
        Credentials {
            access_token: access_token.to_string(),
            refresh_token: Some("1//refresh".to_string()),
            scope: None,
            token_type: Some("Bearer".to_string()),
            expiry_date: None,
        }
    }

    fn refreshable(server: &MockServer, credentials: Credentials) -> CredentialHandle {
        CredentialHandle {
            credentials,
            client: Some(OAuthClient {
                client_id: "id".to_string(),
                client_secret: "secret".to_string(),
                redirect_uri: String::new(),
                auth_uri: String::new(),
                token_uri: format!("{}/token", server.uri()),
            }),
            store: None,
        }
    }

    fn gmail(server: &MockServer, handle: CredentialHandle) -> GmailClient {
        let config = GmailConfig {
            api_base: server.uri(),
            ..GmailConfig::default()
        };
        GmailClient::new(Client::new(), &config, handle)
    }

    async fn mount_token_refresh(server: &MockServer, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.new",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn list_sends_query_and_cap() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me/messages"))
            .and(query_param("q", "is:unread"))
            .and(query_param("maxResults", "10"))
            .and(header("Authorization", "Bearer ya29.ok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messages": [
                    {"id": "m1", "threadId": "t1"},
                    {"id": "m2", "threadId": "t2"}
                ],
                "resultSizeEstimate": 2
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = gmail(&server, CredentialHandle::new(credentials("ya29.ok")));
        let messages = client.list_messages("is:unread", 10).await.unwrap();
        let ids: Vec<_> = messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2"]);
        assert_eq!(messages[0].thread_id.as_deref(), Some("t1"));
    }

    #[tokio::test]
    async fn list_without_messages_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me/messages"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"resultSizeEstimate": 0})),
            )
            .mount(&server)
            .await;

        let client = gmail(&server, CredentialHandle::new(credentials("ya29.ok")));
        assert!(client.list_messages("is:unread", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn get_message_reads_snippet_and_subject() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me/messages/m1"))
            .and(query_param("format", "metadata"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "m1",
                "snippet": "Payment DUE tomorrow",
                "payload": {"headers": [{"name": "Subject", "value": "Reminder: ASAP"}]}
            })))
            .mount(&server)
            .await;

        let client = gmail(&server, CredentialHandle::new(credentials("ya29.ok")));
        let detail = client.get_message("m1").await.unwrap();
        assert_eq!(detail.snippet, "payment due tomorrow");
        assert_eq!(detail.subject, "reminder: asap");
        assert_eq!(detail.display_subject, "Reminder: ASAP");
    }

    #[tokio::test]
    async fn server_error_surfaces_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("backend down"))
            .mount(&server)
            .await;

        let client = gmail(&server, CredentialHandle::new(credentials("ya29.ok")));
        let err = client.list_messages("is:unread", 10).await.unwrap_err();
        assert!(matches!(err, MailboxError::Api { status: 503, .. }));
    }

    #[tokio::test]
    async fn unauthorized_refreshes_once_and_resends() {
        let server = MockServer::start().await;
        mount_token_refresh(&server, 1).await;
        Mock::given(method("GET"))
            .and(path("/users/me/messages"))
            .and(header("Authorization", "Bearer ya29.stale"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/me/messages"))
            .and(header("Authorization", "Bearer ya29.new"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"messages": [{"id": "m9"}]})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = gmail(&server, refreshable(&server, credentials("ya29.stale")));
        let messages = client.list_messages("is:unread", 10).await.unwrap();
        assert_eq!(messages, vec![MessageSummary::new("m9")]);

        let handle = client.into_handle();
        assert_eq!(handle.credentials.access_token, "ya29.new");
        assert_eq!(handle.credentials.refresh_token.as_deref(), Some("1//refresh"));
    }

    #[tokio::test]
    async fn unauthorized_without_refresh_is_an_error() {
        let server = MockServer::start().await;
        mount_token_refresh(&server, 0).await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid credentials"))
            .mount(&server)
            .await;

        let client = gmail(&server, CredentialHandle::new(credentials("ya29.stale")));
        let err = client.list_messages("is:unread", 10).await.unwrap_err();
        assert!(matches!(err, MailboxError::Api { status: 401, .. }));
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_before_sending() {
        let server = MockServer::start().await;
        mount_token_refresh(&server, 1).await;
        Mock::given(method("GET"))
            .and(path("/users/me/messages"))
            .and(header("Authorization", "Bearer ya29.new"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let expired = Credentials {
            expiry_date: Some(0),
            ..credentials("ya29.old")
        };
        let client = gmail(&server, refreshable(&server, expired));
        assert!(client.list_messages("is:unread", 10).await.unwrap().is_empty());
    }
}
