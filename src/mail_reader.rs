use async_trait::async_trait;

use crate::error::MailboxError;
use crate::mail_reader::message::{MessageDetail, MessageSummary};

pub mod gmail;
pub mod message;

/// Read side of the mailbox API, as seen by the poll loop.
#[async_trait]
pub trait Mailbox: Send + Sync {
    /// At most `max_results` messages matching `query`. No pagination.
    async fn list_messages(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<MessageSummary>, MailboxError>;

    async fn get_message(&self, id: &str) -> Result<MessageDetail, MailboxError>;
}
