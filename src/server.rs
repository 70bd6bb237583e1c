/// HTTP server setup and routing
use crate::{
    context::AppContext,
    db,
    error::{CardError, CardResult},
};
use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    response::Json,
    routing::get,
    Router,
};
use serde_json::json;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Build the main application router
/// Returns Router<()> because state is already provided
pub fn build_router(ctx: AppContext) -> Router {
    // Permissive CORS for the frontend app
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        // Health check endpoint (no middleware)
        .route("/health", get(health_check))
        // Card API + tap redirect
        .merge(crate::api::routes())
        // Provide state - converts Router<AppContext> to Router<()>
        .with_state(ctx)
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .fallback(not_found)
}

/// Health check handler; degrades when the cards database is unreachable
async fn health_check(State(ctx): State<AppContext>) -> Json<serde_json::Value> {
    let status = if db::test_connection(&ctx.cards_db).await.is_ok() {
        "ok"
    } else {
        "degraded"
    };

    Json(json!({
        "status": status,
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// 404 handler
async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "NotFound",
            "message": "Endpoint not found"
        })),
    )
}

/// Start the HTTP server
pub async fn serve(ctx: AppContext) -> CardResult<()> {
    let addr = format!("{}:{}", ctx.config.service.hostname, ctx.config.service.port);

    info!("NearCard service listening on {}", addr);
    info!("   Service URL: {}", ctx.service_url());
    info!("   Frontend URL: {}", ctx.config.service.frontend_url);

    let app = build_router(ctx);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| CardError::Internal(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| CardError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}
