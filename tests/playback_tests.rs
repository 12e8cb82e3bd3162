// Tests for the ordered playback queue
//
// The queue is the serialization point for audio output: strict FIFO order,
// at most one item in flight, and skip-with-complete-semantics on failure.

use anyhow::Result;
use std::sync::Mutex;
use voicewire::codec::{float_to_pcm16, pcm16_to_bytes};
use voicewire::playback::{AudioSink, PlaybackItem, PlaybackQueue};

/// Records every item started, without ever completing on its own. Tests
/// drive completions explicitly through `on_playback_complete`.
#[derive(Default)]
struct RecordingSink {
    started: Mutex<Vec<Vec<f32>>>,
}

impl RecordingSink {
    fn started_count(&self) -> usize {
        self.started.lock().unwrap().len()
    }

    fn started_first_samples(&self) -> Vec<f32> {
        self.started
            .lock()
            .unwrap()
            .iter()
            .map(|samples| samples[0])
            .collect()
    }
}

impl AudioSink for RecordingSink {
    fn begin(&self, samples: Vec<f32>, _sample_rate: u32) -> Result<()> {
        self.started.lock().unwrap().push(samples);
        Ok(())
    }
}

/// An item whose first decoded sample equals `marker` (approximately).
fn item_with_marker(marker: f32) -> PlaybackItem {
    PlaybackItem {
        pcm: pcm16_to_bytes(&float_to_pcm16(&[marker, 0.0, 0.0, 0.0])),
        sample_rate: 24000,
    }
}

fn malformed_item() -> PlaybackItem {
    PlaybackItem {
        pcm: vec![0x01, 0x02, 0x03], // odd byte count
        sample_rate: 24000,
    }
}

#[test]
fn test_first_enqueue_starts_playback() {
    let sink = RecordingSink::default();
    let mut queue = PlaybackQueue::new();

    assert!(!queue.is_playing());

    queue.enqueue(item_with_marker(0.25), &sink);

    assert!(queue.is_playing());
    assert_eq!(sink.started_count(), 1);
    assert_eq!(queue.len(), 1);
}

#[test]
fn test_fifo_order_one_item_in_flight() {
    let sink = RecordingSink::default();
    let mut queue = PlaybackQueue::new();

    queue.enqueue(item_with_marker(0.1), &sink);
    queue.enqueue(item_with_marker(0.2), &sink);
    queue.enqueue(item_with_marker(0.3), &sink);

    // Only the head is playing; B and C wait for completion signals.
    assert_eq!(sink.started_count(), 1);
    assert_eq!(queue.len(), 3);

    queue.on_playback_complete(&sink);
    assert_eq!(sink.started_count(), 2);
    assert_eq!(queue.len(), 2);

    queue.on_playback_complete(&sink);
    assert_eq!(sink.started_count(), 3);

    queue.on_playback_complete(&sink);
    assert!(!queue.is_playing());
    assert!(queue.is_empty());
    assert_eq!(queue.completed(), 3);

    // Each start happened in arrival order.
    let markers = sink.started_first_samples();
    assert!((markers[0] - 0.1).abs() < 0.001);
    assert!((markers[1] - 0.2).abs() < 0.001);
    assert!((markers[2] - 0.3).abs() < 0.001);
}

#[test]
fn test_decode_failure_skips_to_next_item() {
    let sink = RecordingSink::default();
    let mut queue = PlaybackQueue::new();

    queue.enqueue(item_with_marker(0.1), &sink);
    queue.enqueue(malformed_item(), &sink);
    queue.enqueue(item_with_marker(0.3), &sink);

    // A completes; B fails to decode and is skipped; C starts immediately.
    queue.on_playback_complete(&sink);
    assert_eq!(sink.started_count(), 2);
    assert_eq!(queue.skipped(), 1);
    assert!(queue.is_playing());

    // C completes; total completion count includes the skipped item.
    queue.on_playback_complete(&sink);
    assert_eq!(queue.completed(), 3);
    assert_eq!(queue.skipped(), 1);
    assert!(!queue.is_playing());

    let markers = sink.started_first_samples();
    assert_eq!(markers.len(), 2);
    assert!((markers[0] - 0.1).abs() < 0.001);
    assert!((markers[1] - 0.3).abs() < 0.001);
}

#[test]
fn test_malformed_item_alone_does_not_wedge_queue() {
    let sink = RecordingSink::default();
    let mut queue = PlaybackQueue::new();

    queue.enqueue(malformed_item(), &sink);

    // Skipped immediately; the queue is idle and ready for the next item.
    assert!(!queue.is_playing());
    assert!(queue.is_empty());
    assert_eq!(queue.completed(), 1);
    assert_eq!(queue.skipped(), 1);

    queue.enqueue(item_with_marker(0.5), &sink);
    assert!(queue.is_playing());
    assert_eq!(sink.started_count(), 1);
}

#[test]
fn test_consecutive_malformed_items_all_skipped() {
    let sink = RecordingSink::default();
    let mut queue = PlaybackQueue::new();

    queue.enqueue(item_with_marker(0.1), &sink);
    queue.enqueue(malformed_item(), &sink);
    queue.enqueue(malformed_item(), &sink);
    queue.enqueue(item_with_marker(0.4), &sink);

    queue.on_playback_complete(&sink);

    // Both bad items skipped in one advance; the last good item is playing.
    assert_eq!(sink.started_count(), 2);
    assert_eq!(queue.skipped(), 2);
    assert_eq!(queue.len(), 1);
}

#[test]
fn test_spurious_completion_is_harmless() {
    let sink = RecordingSink::default();
    let mut queue = PlaybackQueue::new();

    queue.on_playback_complete(&sink);

    assert!(!queue.is_playing());
    assert_eq!(queue.completed(), 0);
}

#[test]
fn test_enqueue_after_drain_restarts() {
    let sink = RecordingSink::default();
    let mut queue = PlaybackQueue::new();

    queue.enqueue(item_with_marker(0.1), &sink);
    queue.on_playback_complete(&sink);
    assert!(!queue.is_playing());

    queue.enqueue(item_with_marker(0.2), &sink);
    assert!(queue.is_playing());
    assert_eq!(sink.started_count(), 2);
}
