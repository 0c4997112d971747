//! Error types, grouped by how a failure affects the process.
//!
//! [`ConfigError`] is fatal at startup. [`AuthError`] skips one invocation.
//! [`CycleError`] aborts one cycle. [`MailboxError`] on a detail fetch and
//! [`NotifyError`] only skip the message they belong to.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    MissingEnv(String),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: String, reason: String },

    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {path}: {reason}")]
    Parse { path: String, reason: String },
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("token endpoint request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("token endpoint rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("no refresh token or client secret available")]
    CannotRefresh,

    #[error("cannot read authorization code: {0}")]
    Prompt(String),

    #[error("cannot persist token to {path}: {source}")]
    Persist {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum MailboxError {
    #[error("mailbox request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("mailbox API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("access token refresh failed: {0}")]
    Refresh(#[from] AuthError),
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("chat request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("chat API error: {0}")]
    Api(String),
}

/// Failures that abort a whole cycle. The scheduler keeps running.
#[derive(Error, Debug)]
pub enum CycleError {
    #[error("cannot load keywords: {0}")]
    Keywords(#[from] ConfigError),

    #[error("cannot list messages: {0}")]
    List(#[source] MailboxError),
}
