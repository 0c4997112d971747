use std::sync::Arc;

use anyhow::Result;
use chrono::Local;
use log::{error, info};
use reqwest::Client;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::auth::direct::DirectAuthenticator;
use crate::auth::interactive::{restore_base64_artifacts, InteractiveAuthenticator};
use crate::auth::Authenticator;
use crate::error::ConfigError;
use crate::keyword_filter::KeywordSource;
use crate::mail_reader::gmail::GmailClient;
use crate::notifier::telegram::TelegramNotifier;
use crate::notifier::Notifier;
use crate::poller::{CycleReport, PollLoop};
use crate::settings::environment::Environment;
use crate::settings::{AuthMode, Config, GmailConfig};

/// Everything one invocation needs. The poll loop sits behind a mutex so the
/// startup run and timer runs never overlap.
pub struct Watcher {
    authenticator: Arc<dyn Authenticator>,
    notifier: Arc<dyn Notifier>,
    poll_loop: Mutex<PollLoop>,
    http: Client,
    gmail: GmailConfig,
}

impl Watcher {
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        notifier: Arc<dyn Notifier>,
        poll_loop: PollLoop,
        http: Client,
        gmail: GmailConfig,
    ) -> Self {
        Self {
            authenticator,
            notifier,
            poll_loop: Mutex::new(poll_loop),
            http,
            gmail,
        }
    }

    pub fn from_config(config: &Config, env: &Environment) -> Result<Self, ConfigError> {
        let http = Client::new();

        let authenticator: Arc<dyn Authenticator> = match config.auth.mode {
            AuthMode::Direct => Arc::new(DirectAuthenticator::from_env(&config.auth)?),
            AuthMode::Interactive => {
                restore_base64_artifacts(&config.auth)?;
                Arc::new(InteractiveAuthenticator::new(&config.auth, http.clone())?)
            }
        };

        let notifier = Arc::new(TelegramNotifier::new(
            http.clone(),
            &config.telegram.api_base,
            &env.telegram_bot_token,
            env.telegram_chat_id.clone(),
        ));

        let poll_loop = PollLoop::new(KeywordSource::environment(), &config.poller, &config.gmail);
        info!(
            "Watching with {:?} authentication, deduplication {}",
            config.auth.mode,
            if poll_loop.deduplicates() { "on" } else { "off" }
        );

        Ok(Self::new(
            authenticator,
            notifier,
            poll_loop,
            http,
            config.gmail.clone(),
        ))
    }

    /// Builds a fresh credential handle and runs one cycle with it.
    /// Failures are logged here; `None` means nothing was processed.
    pub async fn invoke(&self) -> Option<CycleReport> {
        let mut poll_loop = self.poll_loop.lock().await;

        let handle = match self.authenticator.authorize().await {
            Ok(handle) => handle,
            Err(e) => {
                error!("Authorization failed, skipping this run: {}", e);
                return None;
            }
        };
        let mailbox = GmailClient::new(self.http.clone(), &self.gmail, handle);

        match poll_loop.run_cycle(&mailbox, self.notifier.as_ref()).await {
            Ok(report) => {
                info!(
                    "Mailbox checked: {} listed, {} already notified, {} matched, {} notified, {} failed ({} ids remembered)",
                    report.listed,
                    report.already_notified,
                    report.matched,
                    report.notified,
                    report.fetch_failures + report.dispatch_failures,
                    poll_loop.notified_count()
                );
                Some(report)
            }
            Err(e) => {
                error!("Mailbox check aborted: {}", e);
                None
            }
        }
    }
}

/// Cron job running one invocation per tick. The expression is evaluated in
/// the host's local time, so `0 0 9 * * *` fires at 09:00 on the server clock.
pub fn mailbox_job(watcher: Arc<Watcher>, schedule: &str) -> Result<Job, JobSchedulerError> {
    Job::new_async_tz(schedule, Local, move |_uuid, _l| {
        let watcher = Arc::clone(&watcher);
        Box::pin(async move {
            info!("Cron triggered - checking emails");
            watcher.invoke().await;
        })
    })
}

pub async fn entrypoint(watcher: Arc<Watcher>, schedule: &str) -> Result<JobScheduler> {
    let sched = JobScheduler::new().await?;

    sched.add(mailbox_job(watcher, schedule)?).await?;
    info!("Scheduled mailbox checks at {:?}", schedule);

    // Start the scheduler
    let runner = sched.clone();
    tokio::spawn(async move {
        if let Err(e) = runner.start().await {
            error!("Scheduler error: {}", e);
        }
    });

    Ok(sched)
}
