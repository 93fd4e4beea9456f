//! tattoo-server – entry point.
//!
//! Startup order:
//! 1. Load `.env` (if present) and parse configuration; a missing
//!    `GEMINI_API_KEY` aborts here.
//! 2. Initialise structured tracing (JSON or pretty).
//! 3. Build the Gemini client, output store, and templates.
//! 4. Build the Axum router and start the HTTP server with graceful shutdown.

mod config;
mod error;
mod middleware;
mod routes;
mod schemas;
mod state;
mod templates;

#[cfg(test)]
mod test_support;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tattoo_core::{GeminiClient, OutputStore};
use tracing::{info, warn};

use crate::config::Config;
use crate::state::AppState;
use crate::templates::Templates;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Configuration ───────────────────────────────────────────────────────
    let dotenv = dotenvy::dotenv();
    let cfg = Config::from_env()?;

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    let env_filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match cfg.log_level.parse::<tracing_subscriber::EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: TATTOO_LOG='{}' is not a valid tracing filter ({}); \
                     falling back to 'info'",
                    cfg.log_level, e
                );
                tracing_subscriber::EnvFilter::new("info")
            }
        },
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true);

    if cfg.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "tattoo-server starting");
    match dotenv {
        Ok(path) => info!(path = %path.display(), "loaded environment file"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!(error = %e, "failed to read .env; continuing with process environment"),
    }

    // ── 3. Shared application state ────────────────────────────────────────────
    std::fs::create_dir_all(&cfg.static_dir)
        .with_context(|| format!("creating static dir {}", cfg.static_dir.display()))?;

    let mut model = GeminiClient::builder().api_key(cfg.gemini_api_key.clone());
    if let Some(base) = &cfg.gemini_api_base {
        model = model.base_url(base.clone());
    }
    let model = model.build()?;
    info!(?model, "Gemini client ready");

    let store = OutputStore::new(cfg.output_dir.clone());
    info!(output_dir = %store.dir().display(), "generated images directory");

    let state = Arc::new(AppState {
        config: Arc::new(cfg.clone()),
        model: Arc::new(model),
        store: Arc::new(store),
        templates: Arc::new(Templates::new()?),
    });

    // ── 4. HTTP server with graceful shutdown ──────────────────────────────────
    let app = routes::build(Arc::clone(&state));
    let addr: SocketAddr = cfg.bind_address.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("tattoo-server stopped");
    Ok(())
}

/// Returns a future that resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c   => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; starting graceful shutdown");
}
