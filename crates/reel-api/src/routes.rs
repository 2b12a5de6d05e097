//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{middleware, Router};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handlers::*;
use crate::middleware::{cors_layer, request_id, request_logging};
use crate::state::AppState;
use crate::ws::ws_logs;

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let footage_routes = Router::new()
        .route("/footage", get(list_footage).post(upload_footage))
        .route("/footage/search", get(search_footage))
        .route("/footage/scan", post(scan_footage))
        .route("/footage/:asset_id", get(get_footage).delete(delete_footage));

    let director_routes = Router::new()
        .route("/director/transcribe", post(transcribe))
        .route("/director/plan", post(generate_plan))
        .route("/director/compile", post(compile_schedule));

    let render_routes = Router::new()
        .route("/render", post(trigger_render))
        .route("/render/:render_id", get(render_status))
        .route("/preview", post(preview_frame));

    let api_routes = Router::new()
        .merge(footage_routes)
        .merge(director_routes)
        .merge(render_routes)
        .route("/trends", post(research_trend));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    // Library files are served as-is so schedules can reference them by URL.
    let media_routes = Router::new()
        .nest_service("/footage", ServeDir::new(state.pipeline.raw_dir()))
        .nest_service("/renders", ServeDir::new(state.pipeline.renders_dir()));

    Router::new()
        .nest("/api", api_routes)
        .route("/ws/logs", get(ws_logs))
        .merge(health_routes)
        .merge(media_routes)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
