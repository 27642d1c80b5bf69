//! HTTP API server for room credential issuance
//!
//! - POST /livekit/token - Mint a room credential for a session
//! - GET /livekit/health - Whether credentials can be issued
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use handlers::{ErrorResponse, RealtimeHealthResponse};
pub use routes::create_router;
pub use state::AppState;
