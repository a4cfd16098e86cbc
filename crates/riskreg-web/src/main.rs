mod api;
mod auth;
mod client;
mod config;
mod dto;
mod error;
mod middleware;
mod state;

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, Method};
use axum::middleware::from_fn;
use riskreg_core::{AuthEvent, LoginService};
use tower_governor::{governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer};
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ServerConfig;
use crate::state::AppState;

/// Mounts the API under `/api`. `auth_routes` arrives with whatever per-IP layers the caller wants.
fn api_routes(auth_routes: axum::Router<AppState>) -> axum::Router<AppState> {
    axum::Router::new().nest("/api", auth_routes.merge(api::protected_router()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "riskreg_web=debug,riskreg_core=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::load()?;
    let bind_addr = config.bind_addr;
    let tls_config = config.tls.clone();
    let tls_enabled = config.tls_enabled();
    let rate_limit_rpm = config.rate_limit.login_requests_per_minute;

    let verifier = riskreg_core::build_verifier(&config.login.directory)?;
    let login = LoginService::new(verifier, &config.login);
    tracing::info!(
        "Login throttle: {} attempts per {}s",
        config.login.throttle.max_attempts,
        config.login.throttle.decay_seconds
    );

    let state = AppState::new(config, login);

    // Audit trail for login outcomes
    let mut events = state.login.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(AuthEvent::Lockout { key, retry_after_secs }) => {
                    tracing::warn!(target: "riskreg_web::audit", "lockout key={key} retry_after={retry_after_secs}s");
                }
                Ok(AuthEvent::Failed { identity, client_addr, attempts }) => {
                    tracing::info!(target: "riskreg_web::audit", "failed identity={identity} addr={client_addr} attempts={attempts}");
                }
                Ok(AuthEvent::Authenticated { identity, client_addr }) => {
                    tracing::info!(target: "riskreg_web::audit", "login identity={identity} addr={client_addr}");
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("Audit subscriber lagged, {n} events dropped");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Throttle counter + revoked session cleanup task
    let cleanup_limiter = state.login.limiter().clone();
    let cleanup_sessions = state.revoked_sessions.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            cleanup_limiter.prune_expired();
            cleanup_sessions.cleanup_expired();
        }
    });

    // CORS: same-origin only by default (no cross-origin requests allowed)
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT_LANGUAGE]);

    // Per-IP request ceiling in front of the per-identity login throttle
    let period_per_request = 60 / rate_limit_rpm.clamp(1, 60);
    let governor_config = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(period_per_request.into())
            .burst_size(rate_limit_rpm.max(1))
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("invalid rate limit configuration"))?,
    );

    let auth_routes = api::auth_router()
        .layer(GovernorLayer::<_, _, axum::body::Body>::new(governor_config));

    let base_router = api_routes(auth_routes);

    let app = if tls_enabled {
        base_router
            .layer(from_fn(middleware::security_headers::security_headers_with_hsts))
            .layer(RequestBodyLimitLayer::new(16 * 1024))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    } else {
        base_router
            .layer(from_fn(middleware::security_headers::security_headers))
            .layer(RequestBodyLimitLayer::new(16 * 1024))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    };

    if let (Some(cert), Some(key)) = (&tls_config.cert_path, &tls_config.key_path) {
        use axum_server::tls_rustls::RustlsConfig;
        let rustls_config = RustlsConfig::from_pem_file(cert, key).await?;
        tracing::info!("riskreg-web listening on https://{}", bind_addr);
        axum_server::bind_rustls(bind_addr, rustls_config)
            .serve(app.into_make_service_with_connect_info::<std::net::SocketAddr>())
            .await?;
    } else {
        let listener = tokio::net::TcpListener::bind(bind_addr).await?;
        tracing::info!("riskreg-web listening on http://{}", bind_addr);
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
        )
        .await?;
    }

    Ok(())
}
