//! Approval backend for bridging TikTok accounts.
//!
//! A user walks through four steps (TikTok username, verification code,
//! phone number, final code). Each submitted value lands as `pending` and
//! waits for an admin to approve or reject it. The account counts as
//! verified once the final code is approved.
//!
//! # Storage
//!
//! Everything lives in plain JSON files under `DATA_DIR`:
//! - `submissions.json` keyed by submission id
//! - `admins.json` keyed by admin id
//! - `phone_numbers.json` keyed by phone number id
//!
//! Writes go through a temp file and a rename. Every read-modify-write on a
//! file holds that file's lock for the whole cycle.
//!
//! # Sessions
//!
//! Admin sessions sit in Redis when `REDIS_URL` is set and in process memory
//! otherwise. The browser only ever sees the raw token in the `sid` cookie.
//!
//! # Running
//!
//! ```sh
//! RUST_LOG=info DATA_DIR=./data cargo run
//! ```
//!
//! Swagger UI is served at `/swagger-ui`.

use std::{sync::Arc, time::Duration};

use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    Router,
};
use tokio::{net::TcpListener, signal::ctrl_c};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod config;
pub mod entities;
pub mod error;
pub mod handler;
pub mod openapi;
pub mod repo;
pub mod service;
pub mod state;
pub mod store;

use service::config::{ConfigService, ConfigServiceImpl};
use state::AppState;

/// Full router with docs, tracing and the optional CORS layer.
pub fn app(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .merge(handler::health::routes())
        .merge(handler::submissions::routes(state.clone()))
        .merge(handler::phone_numbers::routes(state.clone()))
        .merge(handler::admin::routes(state.clone()))
        .merge(handler::session::routes(state.clone()))
        .merge(
            SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", openapi::ApiDoc::openapi()),
        );

    if let Some(cors) = cors_layer(state.config().values().cors_allow_origin.as_deref()) {
        app = app.layer(cors);
    }

    app.layer(TraceLayer::new_for_http())
}

fn cors_layer(origin: Option<&str>) -> Option<CorsLayer> {
    let origin = origin?;
    let origin = match HeaderValue::from_str(origin) {
        Ok(origin) => origin,
        Err(err) => {
            warn!(origin, error = %err, "ignoring invalid CORS_ALLOW_ORIGIN");
            return None;
        }
    };

    Some(
        CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(Duration::from_secs(60 * 60)),
    )
}

pub async fn start_server() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let config = Arc::new(ConfigServiceImpl::new());
    let port = config.port();
    let state = match AppState::new(config).await {
        Ok(state) => state,
        Err(err) => {
            error!(error = %err, "failed to initialize state");
            std::process::exit(1);
        }
    };

    let address = format!("0.0.0.0:{port}");
    info!("Binding to {address}");
    let listener = match TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(error = %err, "failed to bind to {address}");
            std::process::exit(1);
        }
    };

    info!("Server running on {address}");
    if let Err(err) = axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %err, "server error");
    }

    info!("Server shutting down...");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(err) => {
                error!(error = %err, "failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(err) => {
                error!(error = %err, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
