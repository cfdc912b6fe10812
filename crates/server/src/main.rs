// Path: crates/server/src/main.rs
//! The proof-of-read core binary: loads configuration, runs migrations,
//! wires every component from `ackify-ledger`/`ackify-identity`/
//! `ackify-registry`/`ackify-mailer`, and serves the `/api/v1` HTTP API
//! (spec §6) plus the ambient telemetry surface (SPEC_FULL.md §B).

use ackify_crypto::Signer;
use ackify_http_api::state::{AppState, Inner, RateLimiters};
use ackify_identity::{MagicLinkProvider, OAuthProvider, PgSessionStore};
use ackify_ledger::{PgLedgerStore, SigningEngine};
use ackify_mailer::{Dispatcher, EmailQueue, PgEmailQueue, SmtpTransport, TemplateResolver};
use ackify_registry::{PgDocumentStore, PgSignerRegistry};
use ackify_types::config::AppConfig;
use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Process-level options that sit alongside `AppConfig` rather than inside
/// it (spec §6's env table governs application behavior; these two govern
/// only where this binary binds its sockets).
#[derive(Parser, Debug)]
#[clap(name = "ackify-server", about = "Proof-of-read attestation service")]
struct Opts {
    #[clap(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    listen_addr: SocketAddr,
    #[clap(long, env = "METRICS_ADDR", default_value = "0.0.0.0:9090")]
    metrics_addr: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<()> {
    ackify_telemetry::init::init_tracing()?;
    let opts = Opts::parse();
    let config = AppConfig::from_env()?;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(20)
        .connect(&config.db_dsn)
        .await
        .context("failed to connect to Postgres")?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run database migrations")?;

    let signer = Arc::new(Signer::load_or_generate(config.ed25519_private_key_b64.as_deref())?);
    let signer_public_key = signer.public_key_bytes();

    let ledger: Arc<dyn ackify_ledger::LedgerStore> = Arc::new(PgLedgerStore::new(pool.clone()));
    let signing_engine = SigningEngine::new(ledger.clone(), signer.clone());
    let sessions: Arc<dyn ackify_identity::SessionStore> =
        Arc::new(PgSessionStore::new(pool.clone(), &config.cookie_secret_b64)?);
    let documents: Arc<dyn ackify_registry::DocumentStore> =
        Arc::new(PgDocumentStore::new(pool.clone(), ledger.clone()));
    let signers: Arc<dyn ackify_registry::SignerRegistry> =
        Arc::new(PgSignerRegistry::new(pool.clone(), ledger.clone()));

    let oauth = match &config.oauth {
        Some(oauth_config) => {
            let redirect_url = format!("{}/api/v1/auth/callback", config.base_url);
            Some(OAuthProvider::new(oauth_config.clone(), redirect_url)?)
        }
        None => None,
    };
    let magiclink = if config.magiclink_enabled {
        Some(MagicLinkProvider::new(pool.clone()))
    } else {
        None
    };

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let email_queue: Option<Arc<dyn EmailQueue>> = match &config.mail {
        Some(mail_config) => {
            let queue: Arc<dyn EmailQueue> = Arc::new(PgEmailQueue::new(pool.clone()));
            let templates = Arc::new(TemplateResolver::new(
                &mail_config.template_dir,
                &mail_config.default_locale,
                &mail_config.organisation,
                &config.base_url,
                &mail_config.from_name,
                &mail_config.from_address,
            ));
            let transport = Arc::new(SmtpTransport::new(mail_config)?);
            let dispatcher = Dispatcher::new(queue.clone(), templates, transport);
            let dispatcher_shutdown = shutdown_rx.clone();
            tokio::spawn(async move {
                dispatcher.run(dispatcher_shutdown).await;
            });
            Some(queue)
        }
        None => {
            tracing::warn!("MAIL_HOST not set; outbound email (magic links, reminders) is disabled");
            None
        }
    };

    let rate_limiters = RateLimiters::new(&config.rate_limits);
    let state = AppState(Arc::new(Inner {
        config: config.clone(),
        pool: pool.clone(),
        ledger,
        signing_engine,
        sessions: sessions.clone(),
        oauth: oauth.clone(),
        magiclink: magiclink.clone(),
        documents,
        signers,
        email_queue,
        signer_public_key,
        rate_limiters,
    }));

    spawn_reapers(sessions, magiclink, oauth, shutdown_rx.clone());
    tokio::spawn(ackify_telemetry::http::run_server(opts.metrics_addr));

    let app = ackify_http_api::router(state);
    let listener = tokio::net::TcpListener::bind(opts.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", opts.listen_addr))?;
    tracing::info!(addr = %opts.listen_addr, "listening");

    let serve = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        });

    serve.await.context("HTTP server error")?;
    Ok(())
}

/// Spawns the three background maintenance loops shared by every running
/// instance regardless of which auth methods are enabled (spec §4.4.3
/// state-cache sweep, §4.4.2 expired-token cleanup, §4.5 session reaper).
fn spawn_reapers(
    sessions: Arc<dyn ackify_identity::SessionStore>,
    magiclink: Option<MagicLinkProvider>,
    oauth: Option<OAuthProvider>,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    const REAP_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);

    tokio::spawn({
        let mut shutdown = shutdown.clone();
        async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(REAP_INTERVAL) => {}
                    _ = shutdown.changed() => if *shutdown.borrow() { return },
                }
                match sessions.reap_expired().await {
                    Ok(n) => tracing::info!(reaped = n, "session reaper pass complete"),
                    Err(e) => tracing::warn!(error = %e, "session reaper pass failed"),
                }
            }
        }
    });

    if let Some(magiclink) = magiclink {
        tokio::spawn({
            let mut shutdown = shutdown.clone();
            async move {
                loop {
                    tokio::select! {
                        _ = tokio::time::sleep(REAP_INTERVAL) => {}
                        _ = shutdown.changed() => if *shutdown.borrow() { return },
                    }
                    match magiclink.cleanup_expired().await {
                        Ok(n) => tracing::info!(reaped = n, "magic-link cleanup pass complete"),
                        Err(e) => tracing::warn!(error = %e, "magic-link cleanup pass failed"),
                    }
                }
            }
        });
    }

    if let Some(oauth) = oauth {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_secs(60)) => {}
                    _ = shutdown.changed() => if *shutdown.borrow() { return },
                }
                oauth.sweep_expired_state();
            }
        });
    }
}
