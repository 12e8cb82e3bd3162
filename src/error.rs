use thiserror::Error;

/// Errors raised while acquiring a local capture device.
///
/// Recovered locally: the session stays Idle and the reason is surfaced as a
/// one-line message.
#[derive(Debug, Error)]
pub enum DeviceAccessError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("no {0} device available")]
    NoDevice(&'static str),

    #[error("device backend error: {0}")]
    Backend(String),
}

/// Errors raised while decoding a received audio payload.
///
/// Recovered locally by skipping the item; never surfaced to the user and
/// never allowed to stall the playback queue.
#[derive(Debug, Error)]
pub enum MalformedAudioError {
    #[error("pcm byte length {0} is not a multiple of 2")]
    TruncatedSample(usize),

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Connection-level failures on the duplex link.
///
/// Terminal for the current connection: there is no automatic retry.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect to {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },

    #[error("connection lost: {0}")]
    ConnectionLost(String),

    #[error("send failed: {0}")]
    Send(String),
}
