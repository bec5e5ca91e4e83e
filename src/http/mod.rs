//! HTTP control API for a browser page or other front end
//!
//! This module provides a REST API in front of the conversation loop:
//! - GET /session - Session id and the address that resumes it
//! - POST /conversation/start - Start capturing
//! - POST /conversation/stop - Stop capturing and run the turn
//! - POST /conversation/cancel - Stop the conversation
//! - GET /conversation/status - Loop stats and surface contents
//! - GET /voices - Available voices
//! - POST /speak - Text to speech
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
