use anyhow::Result;
use tokio::sync::mpsc;
use tracing::info;

use super::source::{AudioChunk, CaptureSource};
use crate::error::DeviceAccessError;

/// Replays a prepared chunk sequence on a fixed virtual clock.
///
/// Every chunk is delivered immediately with timestamps derived from the
/// configured cadence; the channel then stays open (capture "continues")
/// until `stop` is called. Used for deterministic tests and offline runs.
pub struct ScriptedSource {
    chunks: Vec<AudioChunk>,
    keepalive: Option<mpsc::Sender<AudioChunk>>,
}

impl ScriptedSource {
    pub fn new(chunks: Vec<AudioChunk>) -> Self {
        Self {
            chunks,
            keepalive: None,
        }
    }
}

#[async_trait::async_trait]
impl CaptureSource for ScriptedSource {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioChunk>, DeviceAccessError> {
        let chunks = std::mem::take(&mut self.chunks);
        let (tx, rx) = mpsc::channel(chunks.len() + 1);

        for chunk in chunks {
            if tx.send(chunk).await.is_err() {
                break;
            }
        }

        // Keep the sender so the stream stays open until stop().
        self.keepalive = Some(tx);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if self.keepalive.take().is_some() {
            info!("Scripted capture stopped");
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.keepalive.is_some()
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
