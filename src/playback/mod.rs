//! Ordered audio playback
//!
//! Received audio payloads are buffered in arrival order and played strictly
//! back-to-back: at most one item is ever in flight, and a bad item is
//! skipped rather than allowed to stall the queue.

mod queue;
mod sink;

pub use queue::{PlaybackItem, PlaybackQueue};
pub use sink::{AudioSink, CpalSink};
