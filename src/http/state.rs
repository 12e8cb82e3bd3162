use crate::config::Config;
use crate::session::StreamSession;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Loaded application configuration
    pub config: Arc<Config>,

    /// The single session slot (connected lazily on first start)
    pub session: Arc<RwLock<Option<Arc<StreamSession>>>>,
}

impl AppState {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            session: Arc::new(RwLock::new(None)),
        }
    }
}
