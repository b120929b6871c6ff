//! Jack Machine Portal - public site, user portal and admin console.
//!
//! This binary serves everything on port 3000.
//!
//! # Architecture
//!
//! - Axum web framework with a small script for row partials and live toasts
//! - Askama templates for server-side rendering
//! - Supabase for rows, resume storage, accounts and push (`PORTAL_BACKEND=supabase`)
//! - An in-process backend for local development (`PORTAL_BACKEND=memory`)
//!
//! # Security
//!
//! Credentials are only ever checked by the auth provider. Row access uses the
//! service-role key when one is configured; it never leaves the server.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use jack_machine_portal::backend::{DataService, MemoryBackend, SupabaseClient};
use jack_machine_portal::config::{BackendKind, PortalConfig};
use jack_machine_portal::state::AppState;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &PortalConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            traces_sample_rate: config.sentry_traces_sample_rate,
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Build the configured data service.
fn data_service(config: &PortalConfig) -> Arc<dyn DataService> {
    match (config.backend, config.supabase.as_ref()) {
        (BackendKind::Supabase, Some(supabase)) => {
            let client = SupabaseClient::new(supabase).expect("Failed to create Supabase client");
            if !client.has_service_role() {
                tracing::warn!("SUPABASE_SERVICE_ROLE_KEY not set; row access uses the anon key");
            }
            Arc::new(client)
        }
        (BackendKind::Supabase, None) => panic!("Supabase backend selected without Supabase config"),
        (BackendKind::Memory, _) => {
            tracing::warn!("Using the in-memory backend; nothing will be persisted");
            Arc::new(MemoryBackend::new())
        }
    }
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = PortalConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "jack_machine_portal=info,tower_http=debug".into());

    let fmt_layer = if std::env::var_os("PORTAL_LOG_JSON").is_some() {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    // TLS for the realtime websocket and reqwest
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        tracing::debug!("rustls crypto provider already installed");
    }

    let data = data_service(&config);
    let state = AppState::new(config.clone(), data);

    // One upstream subscription feeds every open dashboard
    let realtime = config
        .supabase
        .as_ref()
        .is_none_or(|supabase| supabase.realtime_enabled);
    let notifications = realtime.then(|| state.start_notifications());
    if notifications.is_none() {
        tracing::info!("Realtime disabled; dashboard toasts are off");
    }

    let app = jack_machine_portal::app(state);

    // Start server
    let addr = config.socket_addr();
    tracing::info!("portal listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    if let Some(handle) = notifications {
        handle.abort();
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
