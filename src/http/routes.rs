use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        .route("/session", get(handlers::get_session))
        // Conversation control
        .route("/conversation/start", post(handlers::start_conversation))
        .route("/conversation/stop", post(handlers::stop_turn))
        .route("/conversation/cancel", post(handlers::cancel_conversation))
        .route("/conversation/status", get(handlers::get_status))
        // Text to speech
        .route("/voices", get(handlers::list_voices))
        .route("/speak", post(handlers::speak))
        // Request logging and browser access
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
