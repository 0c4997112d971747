use serde::{Deserialize, Serialize};

/// One entry of a list call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSummary {
    pub id: String,
    #[serde(rename = "threadId", default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

impl MessageSummary {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            thread_id: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListMessagesResponse {
    #[serde(default)]
    pub messages: Option<Vec<MessageSummary>>,
    #[serde(rename = "resultSizeEstimate", default)]
    pub result_size_estimate: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct GmailMessage {
    pub id: String,
    #[serde(default)]
    pub snippet: Option<String>,
    #[serde(default)]
    pub payload: Option<GmailPayload>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GmailPayload {
    #[serde(default)]
    pub headers: Vec<GmailHeader>,
}

#[derive(Debug, Deserialize)]
pub struct GmailHeader {
    pub name: String,
    pub value: String,
}

impl GmailMessage {
    /// Header value by name, ignoring ASCII case in the name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.payload
            .as_ref()?
            .headers
            .iter()
            .find(|header| header.name.eq_ignore_ascii_case(name))
            .map(|header| header.value.as_str())
    }
}

/// What matching needs from one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDetail {
    pub id: String,
    /// Lowercased snippet.
    pub snippet: String,
    /// Lowercased subject; empty when the message has none.
    pub subject: String,
    /// Subject as sent, for display.
    pub display_subject: String,
}

impl MessageDetail {
    pub fn new(id: impl Into<String>, snippet: &str, subject: Option<&str>) -> Self {
        let display_subject = subject.unwrap_or_default().to_string();
        Self {
            id: id.into(),
            snippet: snippet.to_lowercase(),
            subject: display_subject.to_lowercase(),
            display_subject,
        }
    }
}

impl From<GmailMessage> for MessageDetail {
    fn from(message: GmailMessage) -> Self {
        let subject = message.header("Subject").map(str::to_string);
        MessageDetail::new(
            message.id,
            message.snippet.as_deref().unwrap_or_default(),
            subject.as_deref(),
        )
    }
}
