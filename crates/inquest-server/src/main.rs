//! # inquest-server
//!
//! HTTP API server for the Inquest case marketplace.
//!
//! This binary provides:
//! - **Case request lifecycle**: customers open investigation requests,
//!   investigators accept or decline them, and every status change is
//!   validated against the transition table and audited
//! - **Case timeline**: an append-only feed of lifecycle events, progress
//!   notes, and reports per case
//! - **Case chat**: a private message channel between the customer and
//!   the assigned investigator, created on first use
//! - **Reviews**: one rating per completed case, folded into the
//!   investigator's running average
//! - **Per-caller rate limiting** to protect against abuse

mod api;
mod auth;
mod chat;
mod config;
mod error;
mod notify;
mod rate_limit;
mod requests;
mod reviews;
#[cfg(test)]
mod testutil;
mod timeline;
mod transition;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use inquest_store::Database;

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::rate_limit::RateLimiter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,inquest_server=debug")),
        )
        .init();

    info!("Starting Inquest server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------

    // Store (runs migrations on open)
    let db = match &config.db_path {
        Some(path) => Database::open_at(path)?,
        None => Database::open_default()?,
    };

    // Rate limiter: 10 req/s sustained, burst of 30
    let rate_limiter = RateLimiter::default();

    // Application state for the HTTP API
    let app_state = AppState {
        db: Arc::new(tokio::sync::Mutex::new(db)),
        rate_limiter: rate_limiter.clone(),
        config: Arc::new(config.clone()),
    };

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------

    // Periodic rate limiter cleanup (every 5 minutes, evict buckets idle >10 min)
    let rl = rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            rl.purge_stale(600.0).await;
        }
    });

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    // tokio::select! ensures that if either the HTTP server or a shutdown
    // signal arrives, we exit cleanly.
    let http_addr = config.http_addr;

    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
