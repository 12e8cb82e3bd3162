pub mod capture;
pub mod codec;
pub mod config;
pub mod error;
pub mod http;
pub mod playback;
pub mod session;
pub mod transport;

pub use capture::{
    AudioChunk, CameraSource, CaptureConfig, CaptureSource, Chunker, MicrophoneSource,
    ScriptedSource, VideoFrame, VideoSource,
};
pub use config::Config;
pub use error::{DeviceAccessError, MalformedAudioError, TransportError};
pub use http::{create_router, AppState};
pub use playback::{AudioSink, CpalSink, PlaybackItem, PlaybackQueue};
pub use session::{SessionConfig, SessionIo, SessionMode, SessionStats, StreamSession, TranscriptEntry};
pub use transport::{ConnectionState, Frame, TransportChannel, TransportEvent};
