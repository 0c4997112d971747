use axum::{routing::get, Router};
use log::info;
use std::error::Error;

pub const LIVENESS_MESSAGE: &str = "Mail keyword notifier is running";

async fn liveness() -> &'static str {
    LIVENESS_MESSAGE
}

pub fn router() -> Router {
    Router::new().route("/", get(liveness))
}

/// Serves the liveness route until the process exits. Only exists so hosts
/// that insist on a listening port keep the process up.
pub async fn entrypoint(host: &str, port: u16) -> Result<(), Box<dyn Error + Send + Sync>> {
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    info!("Keep-alive listener on http://{}:{}", host, port);
    axum::serve(listener, router()).await?;
    Ok(())
}
