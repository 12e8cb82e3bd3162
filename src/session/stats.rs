use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::session::SessionMode;
use crate::transport::ConnectionState;

/// Statistics about a streaming session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Current capture mode
    pub mode: SessionMode,

    /// Whether capture is currently active
    pub is_streaming: bool,

    /// State of the underlying connection
    pub connection: ConnectionState,

    /// When the session connected
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// Audio chunks sent so far
    pub chunks_sent: usize,

    /// Video frames sent so far
    pub frames_sent: usize,

    /// Audio items played to completion (skips included)
    pub items_played: usize,

    /// Audio items skipped because they failed to decode or start
    pub items_skipped: usize,

    /// Audio items still queued for playback
    pub pending_playback: usize,

    /// Transcript entries received
    pub transcript_entries: usize,

    /// Last transport failure, if any
    pub last_error: Option<String>,
}

/// A single text response from the service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Response text
    pub text: String,

    /// When this entry was received
    pub received_at: DateTime<Utc>,
}
