use std::collections::VecDeque;
use tracing::warn;

use super::sink::AudioSink;
use crate::codec;

/// A received audio payload awaiting playback: raw little-endian PCM16 bytes
/// plus the rate they were produced at. Decoded at dequeue time.
#[derive(Debug)]
pub struct PlaybackItem {
    pub pcm: Vec<u8>,
    pub sample_rate: u32,
}

/// Strictly sequential playback queue.
///
/// Items play in FIFO arrival order with at most one in flight. Each item is
/// decoded when it reaches the head and handed to the sink; the sink signals
/// completion exactly once per started item, which advances the queue. A
/// decode or sink failure is treated as an immediate completion so later
/// items are unaffected.
pub struct PlaybackQueue {
    pending: VecDeque<PlaybackItem>,
    is_playing: bool,
    completed: usize,
    skipped: usize,
}

impl PlaybackQueue {
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            is_playing: false,
            completed: 0,
            skipped: 0,
        }
    }

    /// Append an item; starts playing it immediately if the queue was idle.
    pub fn enqueue(&mut self, item: PlaybackItem, sink: &dyn AudioSink) {
        self.pending.push_back(item);
        if !self.is_playing {
            self.is_playing = true;
            self.play_head(sink);
        }
    }

    /// Advance past the item whose playback just finished. Invoked exactly
    /// once per completion signal from the sink.
    pub fn on_playback_complete(&mut self, sink: &dyn AudioSink) {
        if self.pending.pop_front().is_none() {
            warn!("Playback completion with empty queue");
            self.is_playing = false;
            return;
        }
        self.completed += 1;

        if self.pending.is_empty() {
            self.is_playing = false;
        } else {
            self.play_head(sink);
        }
    }

    /// Decode and start the head item, skipping over items that fail to
    /// decode or start until one plays or the queue drains.
    fn play_head(&mut self, sink: &dyn AudioSink) {
        while let Some(item) = self.pending.front() {
            match codec::pcm16_to_float(&item.pcm) {
                Ok(samples) => match sink.begin(samples, item.sample_rate) {
                    Ok(()) => return,
                    Err(e) => warn!("Skipping unplayable audio item: {}", e),
                },
                Err(e) => warn!("Skipping malformed audio item: {}", e),
            }

            // Complete-semantics for the failed item.
            self.pending.pop_front();
            self.completed += 1;
            self.skipped += 1;
        }
        self.is_playing = false;
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    /// Items still queued, including the one currently playing.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Completions so far, skips included.
    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl Default for PlaybackQueue {
    fn default() -> Self {
        Self::new()
    }
}
