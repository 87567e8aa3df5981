//! engage-daemon entry point.
//!
//! This file is intentionally thin: it connects to the database, builds the
//! shared state, spawns the background poller/reminder loops, wires
//! middleware, and starts the HTTP server. All route handlers live in
//! `routes.rs`; all shared state types live in `state.rs`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use engage_daemon::{routes, state};
use engage_dispatch::DispatchGateway;
use engage_poller::PauseRegistry;
use engage_schemas::Channel;
use engage_transport_fake::{FakeContentGenerator, LoggingTransport};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let pool = engage_store::connect_from_env().await.context("connect to database")?;
    let pause_registry = Arc::new(PauseRegistry::new());

    let shared = Arc::new(state::AppState::new(pool.clone(), Arc::clone(&pause_registry)));

    state::spawn_heartbeat(shared.bus.clone(), Duration::from_secs(1));
    spawn_poller_loops(pool.clone(), Arc::clone(&pause_registry));
    tokio::spawn(engage_reminders::run_reminder_loop(pool.clone()));

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr = bind_addr_from_env().unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8899)));
    info!("engage-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await.context("server crashed")?;

    Ok(())
}

/// One spawned tick loop per channel, sharing one transport/content-gen/
/// pause-registry instance across all three so a dispatch budget and a
/// webhook-driven pause are consistent daemon-wide.
fn spawn_poller_loops(pool: sqlx::PgPool, pause_registry: Arc<PauseRegistry>) {
    let gateway = Arc::new(DispatchGateway::new(LoggingTransport::new()));
    let content_gen = Arc::new(FakeContentGenerator);

    for channel in Channel::all() {
        let pool = pool.clone();
        let gateway = Arc::clone(&gateway);
        let content_gen = Arc::clone(&content_gen);
        let pause_registry = Arc::clone(&pause_registry);
        tokio::spawn(engage_poller::run_channel_loop(
            pool,
            channel,
            "engage-daemon".to_string(),
            gateway,
            content_gen,
            pause_registry,
        ));
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
}

fn bind_addr_from_env() -> Option<SocketAddr> {
    std::env::var("ENGAGE_DAEMON_ADDR").ok()?.parse().ok()
}

/// CORS: allow only localhost origins.
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    let origins: Vec<HeaderValue> = allowed_origins.iter().filter_map(|o| HeaderValue::from_str(o).ok()).collect();

    CorsLayer::new().allow_origin(origins).allow_methods([Method::GET, Method::POST, Method::PUT]).allow_headers(tower_http::cors::Any)
}
