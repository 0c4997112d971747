pub mod telegram;

use async_trait::async_trait;

use crate::error::NotifyError;
use crate::mail_reader::message::MessageDetail;

/// One matched message, ready to be announced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub message_id: String,
    pub subject: String,
    /// Deep link into the mailbox web UI.
    pub link: String,
}

impl Alert {
    pub fn new(message: &MessageDetail, web_url: &str) -> Self {
        Self {
            message_id: message.id.clone(),
            subject: message.display_subject.clone(),
            link: format!("{}/{}", web_url.trim_end_matches('/'), message.id),
        }
    }

    /// Chat text in Telegram's legacy Markdown.
    pub fn text(&self) -> String {
        format!(
            "📧 *New Email Matched Keyword!*\n*Subject:* {}\n🔗 [Open Email]({})",
            escape_markdown(&self.subject),
            self.link
        )
    }
}

fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, alert: &Alert) -> Result<(), NotifyError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    const INBOX: &str = "https://mail.google.com/mail/u/0/#inbox";

    #[test]
    fn link_points_at_message() {
        let message = MessageDetail::new("18c2f0", "snippet", Some("Hello"));
        let alert = Alert::new(&message, INBOX);
        assert_eq!(alert.link, "https://mail.google.com/mail/u/0/#inbox/18c2f0");
        assert_eq!(alert.message_id, "18c2f0");
    }

    #[test]
    fn text_follows_template() {
        let message = MessageDetail::new("m1", "snippet", Some("Invoice Ready"));
        let alert = Alert::new(&message, &format!("{INBOX}/"));
        assert_eq!(
            alert.text(),
            "📧 *New Email Matched Keyword!*\n*Subject:* Invoice Ready\n🔗 [Open Email](https://mail.google.com/mail/u/0/#inbox/m1)"
        );
    }

    #[test]
    fn subject_keeps_original_case() {
        let message = MessageDetail::new("m1", "", Some("URGENT: Server Down"));
        assert_eq!(Alert::new(&message, INBOX).subject, "URGENT: Server Down");
    }

    #[test]
    fn missing_subject_renders_empty() {
        let message = MessageDetail::new("m1", "your invoice", None);
        let alert = Alert::new(&message, INBOX);
        assert_eq!(alert.subject, "");
        assert!(alert.text().contains("*Subject:* \n"));
    }

    #[test]
    fn markdown_specials_are_escaped() {
        assert_eq!(escape_markdown("a_b*c`d[e]"), "a\\_b\\*c\\`d\\[e]");
    }
}
