//! HTTP control API
//!
//! Local control surface for the streaming session: start/stop capture,
//! query status, fetch the transcript. One session slot per process; there
//! is no multi-connection support.

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::AppState;
