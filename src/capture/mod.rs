//! Local media capture
//!
//! Audio comes from the default input device at its native format and is
//! reshaped by the [`Chunker`] into fixed-duration 16 kHz mono chunks. Video
//! is a periodic still-frame snapshot, not a continuous stream. Both sides
//! sit behind traits so tests can substitute scripted sources.

mod chunker;
mod microphone;
mod scripted;
mod source;
mod ticker;
mod video;

pub use chunker::Chunker;
pub use microphone::MicrophoneSource;
pub use scripted::ScriptedSource;
pub use source::{AudioChunk, CaptureConfig, CaptureSource};
pub use ticker::{IntervalTicker, ManualTicker, Ticker};
pub use video::{encode_jpeg, snapshot_loop, CameraSource, FrameGrabber, RgbFrame, VideoFrame, VideoSource};
