//! HTTP front end: upload a PDF, get back a one-shot download link.
//!
//! | Method | Path | |
//! |--------|------|-|
//! | POST | `/convert` | multipart `file` field, answers `{message, download_url}` |
//! | GET | `/download-result/{filename}` | the deck, removed after sending |
//! | GET | `/health` | liveness |

mod config;
mod error;
mod handlers;
mod storage;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult, ErrorResponse};
pub use handlers::{ConvertResponse, HealthResponse};
pub use storage::{is_safe_name, sanitize_stem, Reservation, TempStore};

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub store: TempStore,
}

/// Build the router. Creates the temp directory if needed.
pub fn create_router(config: &ServerConfig) -> std::io::Result<Router> {
    let store = TempStore::open(&config.temp_dir)?;
    Ok(router_with_store(store, config.max_upload_bytes))
}

pub fn router_with_store(store: TempStore, max_upload_bytes: usize) -> Router {
    let state = AppState { store };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/convert", post(handlers::convert_handler))
        .route("/download-result/{filename}", get(handlers::download_handler))
        .route("/health", get(handlers::health_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .with_state(state)
}

/// Serve until Ctrl-C
pub async fn serve(config: ServerConfig) -> std::io::Result<()> {
    let app = create_router(&config)?;
    let listener = tokio::net::TcpListener::bind(config.bind).await?;

    log::info!(
        "listening on {} (temp dir {})",
        config.bind,
        config.temp_dir.display()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("shutting down");
}
