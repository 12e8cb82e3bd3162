use crate::capture::CaptureConfig;

/// Configuration for a streaming session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Unique client identifier, minted once per client lifetime
    pub client_id: String,

    /// Service base URL; the connection path is `{endpoint}/ws/{client_id}`
    pub endpoint: String,

    /// Audio capture shape (16 kHz mono, fixed-duration chunks)
    pub capture: CaptureConfig,

    /// Rate the service produces audio at. Distinct from the capture rate;
    /// the two directions must never be conflated.
    pub playback_sample_rate: u32,

    /// Video snapshot period in milliseconds
    pub snapshot_period_ms: u64,
}

impl SessionConfig {
    /// Build a session config from the application config, minting a fresh
    /// client identifier.
    pub fn from_app_config(app: &crate::config::Config) -> Self {
        Self {
            client_id: format!("client-{}", uuid::Uuid::new_v4()),
            endpoint: app.transport.endpoint.clone(),
            capture: CaptureConfig {
                sample_rate: app.audio.capture_sample_rate,
                channels: 1,
                chunk_duration_ms: app.audio.chunk_duration_ms,
            },
            playback_sample_rate: app.audio.playback_sample_rate,
            snapshot_period_ms: app.video.snapshot_period_ms,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            client_id: format!("client-{}", uuid::Uuid::new_v4()),
            endpoint: "ws://localhost:8000".to_string(),
            capture: CaptureConfig::default(),
            playback_sample_rate: 24000, // the service speaks at 24 kHz
            snapshot_period_ms: 1000,    // one still frame per second
        }
    }
}
