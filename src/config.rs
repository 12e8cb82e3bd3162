use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioSettings,
    pub video: VideoSettings,
    pub transport: TransportSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct AudioSettings {
    /// Capture rate sent to the service
    pub capture_sample_rate: u32,
    /// Rate the service's audio responses arrive at
    pub playback_sample_rate: u32,
    /// Capture chunk duration in milliseconds
    pub chunk_duration_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct VideoSettings {
    /// Still-frame snapshot period in milliseconds
    pub snapshot_period_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct TransportSettings {
    /// Service base URL (ws:// or wss://)
    pub endpoint: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
