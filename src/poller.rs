pub mod scheduler;

use std::collections::HashSet;

use log::{debug, error, info, warn};

use crate::error::CycleError;
use crate::keyword_filter::KeywordSource;
use crate::mail_reader::Mailbox;
use crate::notifier::{Alert, Notifier};
use crate::settings::{GmailConfig, PollerConfig};

/// Counts for one cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub listed: usize,
    pub already_notified: usize,
    pub fetched: usize,
    pub fetch_failures: usize,
    pub matched: usize,
    pub notified: usize,
    pub dispatch_failures: usize,
}

/// List, fetch, match, notify. Owns the notified-ID set, which lives only
/// as long as this value does.
pub struct PollLoop {
    keywords: KeywordSource,
    query: String,
    max_results: u32,
    web_url: String,
    notified: Option<HashSet<String>>,
}

impl PollLoop {
    pub fn new(keywords: KeywordSource, poller: &PollerConfig, gmail: &GmailConfig) -> Self {
        Self {
            keywords,
            query: poller.query.clone(),
            max_results: poller.max_results,
            web_url: gmail.web_url.clone(),
            notified: poller.deduplicate.then(HashSet::new),
        }
    }

    pub fn deduplicates(&self) -> bool {
        self.notified.is_some()
    }

    pub fn notified_count(&self) -> usize {
        self.notified.as_ref().map_or(0, HashSet::len)
    }

    pub fn was_notified(&self, id: &str) -> bool {
        self.notified.as_ref().is_some_and(|seen| seen.contains(id))
    }

    /// Runs one cycle. Messages are handled strictly one after another.
    ///
    /// Keyword loading or listing failures abort the cycle. A failed detail
    /// fetch skips that message; a failed dispatch is logged and the cycle
    /// moves on.
    pub async fn run_cycle(
        &mut self,
        mailbox: &dyn Mailbox,
        notifier: &dyn Notifier,
    ) -> Result<CycleReport, CycleError> {
        let keywords = self.keywords.load()?;
        if keywords.is_empty() {
            warn!("No keywords configured, nothing can match");
        } else if keywords.matches_everything() {
            warn!("KEYWORDS contains an empty entry, every message will match");
        }
        debug!("Keywords: {:?}", keywords.keywords());

        let summaries = mailbox
            .list_messages(&self.query, self.max_results)
            .await
            .map_err(CycleError::List)?;

        let mut report = CycleReport {
            listed: summaries.len(),
            ..CycleReport::default()
        };
        debug!("{} message(s) matched query {:?}", summaries.len(), self.query);

        for summary in &summaries {
            if self.was_notified(&summary.id) {
                debug!("Message {} already notified, skipping", summary.id);
                report.already_notified += 1;
                continue;
            }

            let message = match mailbox.get_message(&summary.id).await {
                Ok(message) => message,
                Err(e) => {
                    warn!("Cannot fetch message {}: {}", summary.id, e);
                    report.fetch_failures += 1;
                    continue;
                }
            };
            report.fetched += 1;

            if !keywords.matches_message(&message) {
                continue;
            }
            report.matched += 1;
            info!("Message {} matched a keyword", message.id);

            let alert = Alert::new(&message, &self.web_url);
            match notifier.notify(&alert).await {
                Ok(()) => report.notified += 1,
                Err(e) => {
                    error!("Failed to send alert for message {}: {}", message.id, e);
                    report.dispatch_failures += 1;
                }
            }

            // Recorded after the attempt, whatever its outcome.
            if let Some(seen) = self.notified.as_mut() {
                seen.insert(summary.id.clone());
            }
        }

        Ok(report)
    }
}
