use ticket_desk::{AppConfig, AppState, Event, Purchase, PurchaseView};

use std::sync::Arc;

mod web;

use crate::web::{cors_layer, preflight, ApiError};

use axum::{
    extract::{rejection::JsonRejection, Path},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use tower_http::services::ServeDir;

/// Body of a purchase request
///
/// Missing fields decode to zero values and are rejected by validation.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PurchaseRequest {
    event_id: i64,
    buyer_name: String,
    qty: i64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::init();

    log::info!("Starting Ticket Desk server...");

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("TICKETS_CONFIG").ok());
    let config = AppConfig::load_from_file_and_env(config_path.as_deref())?;

    let app_state = Arc::new(AppState::new(config).await?);

    let result = serve(app_state.clone()).await;

    app_state.close().await;
    log::info!("Database closed");

    result
}

/// Serve the API and the static frontend over HTTP until shutdown
async fn serve(app_state: Arc<AppState>) -> Result<(), Box<dyn std::error::Error>> {
    let addr = app_state.config().server.bind_address.clone();
    let app = router(app_state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("Server listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
    }
    log::info!("Shutdown signal received");
}

/// Build the application router
fn router(app_state: Arc<AppState>) -> Router {
    let static_dir = app_state.config().server.static_dir.clone();

    let mut app = Router::new()
        .route("/events", get(events_get).options(preflight))
        .route("/events/:id", get(event_get).options(preflight))
        .route("/purchase", post(purchase_post).options(preflight))
        .route("/purchases", get(purchases_get).options(preflight));

    if std::path::Path::new(&static_dir).is_dir() {
        log::info!("Serving static files from {}", static_dir);
        app = app.fallback_service(ServeDir::new(static_dir));
    }

    app.layer(cors_layer()).layer(Extension(app_state))
}

/// Handler for GET requests to /events
async fn events_get(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<Event>>, ApiError> {
    Ok(Json(app_state.database().list_events().await?))
}

/// Handler for GET requests to /events/:id
///
/// An id that is not a number looks up event 0, which never exists.
async fn event_get(
    Path(id): Path<String>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<Json<Event>, ApiError> {
    let id = id.parse::<i64>().unwrap_or(0);
    Ok(Json(app_state.database().get_event(id).await?))
}

/// Handler for POST requests to /purchase
#[axum::debug_handler]
async fn purchase_post(
    Extension(app_state): Extension<Arc<AppState>>,
    payload: Result<Json<PurchaseRequest>, JsonRejection>,
) -> Result<Json<Purchase>, ApiError> {
    let Json(request) = payload
        .map_err(|e| ApiError::BadRequest(format!("Invalid purchase data: {}", e.body_text())))?;

    let purchase = app_state
        .purchases()
        .submit_purchase(request.event_id, &request.buyer_name, request.qty)
        .await?;
    Ok(Json(purchase))
}

/// Handler for GET requests to /purchases
async fn purchases_get(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<PurchaseView>>, ApiError> {
    Ok(Json(app_state.database().list_purchases().await?))
}
