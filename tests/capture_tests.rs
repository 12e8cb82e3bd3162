// Tests for capture-side reshaping: the chunker, the scripted source, and
// the snapshot loop on a manually driven ticker.

use std::sync::mpsc as std_mpsc;
use voicewire::capture::{
    encode_jpeg, snapshot_loop, AudioChunk, CaptureConfig, CaptureSource, Chunker, FrameGrabber,
    ManualTicker, RgbFrame, ScriptedSource,
};

#[test]
fn test_capture_config_default() {
    let config = CaptureConfig::default();

    assert_eq!(config.sample_rate, 16000, "Input side runs at 16 kHz");
    assert_eq!(config.channels, 1, "Default should be mono");
    assert_eq!(config.chunk_duration_ms, 500);
    assert_eq!(config.chunk_samples(), 8000);
}

#[test]
fn test_chunker_passthrough_rate_and_channels() {
    let config = CaptureConfig::default();
    let mut chunker = Chunker::new(16000, 1, &config);

    // Half a chunk: nothing emitted yet.
    let chunks = chunker.push(&vec![0.1f32; 4000]);
    assert!(chunks.is_empty());

    // Second half completes exactly one chunk.
    let chunks = chunker.push(&vec![0.1f32; 4000]);
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].samples.len(), 8000);
    assert_eq!(chunks[0].sample_rate, 16000);
    assert_eq!(chunks[0].channels, 1);
    assert_eq!(chunks[0].timestamp_ms, 0);
}

#[test]
fn test_chunker_downmixes_and_decimates() {
    let config = CaptureConfig::default();
    // 48 kHz stereo device input: ratio 3 decimation, averaged to mono.
    let mut chunker = Chunker::new(48000, 2, &config);

    // One second of interleaved stereo (L = 0.2, R = 0.4).
    let mut interleaved = Vec::with_capacity(48000 * 2);
    for _ in 0..48000 {
        interleaved.push(0.2f32);
        interleaved.push(0.4f32);
    }

    let chunks = chunker.push(&interleaved);

    // 48000 frames -> 16000 mono samples -> two 8000-sample chunks.
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].timestamp_ms, 0);
    assert_eq!(chunks[1].timestamp_ms, 500);
    for chunk in &chunks {
        assert_eq!(chunk.samples.len(), 8000);
        for &sample in &chunk.samples {
            assert!((sample - 0.3).abs() < 1e-6, "expected L/R average");
        }
    }
}

#[test]
fn test_chunker_timestamps_follow_sample_count() {
    let config = CaptureConfig {
        sample_rate: 16000,
        channels: 1,
        chunk_duration_ms: 100,
    };
    let mut chunker = Chunker::new(16000, 1, &config);

    let chunks = chunker.push(&vec![0.0f32; 16000]);
    assert_eq!(chunks.len(), 10);
    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.timestamp_ms, i as u64 * 100);
    }
}

#[tokio::test]
async fn test_scripted_source_replays_in_order() {
    let chunks: Vec<AudioChunk> = (0..3)
        .map(|i| AudioChunk {
            samples: vec![i as f32 * 0.1; 160],
            sample_rate: 16000,
            channels: 1,
            timestamp_ms: i * 500,
        })
        .collect();

    let mut source = ScriptedSource::new(chunks);
    let mut rx = source.start().await.unwrap();
    assert!(source.is_capturing());

    for i in 0..3u64 {
        let chunk = rx.recv().await.unwrap();
        assert_eq!(chunk.timestamp_ms, i * 500);
    }

    source.stop().await.unwrap();
    assert!(!source.is_capturing());

    // The stream ends once the source is stopped.
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn test_scripted_source_double_stop_is_noop() {
    let mut source = ScriptedSource::new(vec![]);
    let _rx = source.start().await.unwrap();

    source.stop().await.unwrap();
    source.stop().await.unwrap();
    assert!(!source.is_capturing());
}

/// Deterministic grabber: a 2x2 solid-color frame per call.
struct SolidGrabber;

impl FrameGrabber for SolidGrabber {
    fn grab(&mut self) -> anyhow::Result<RgbFrame> {
        Ok(RgbFrame {
            width: 2,
            height: 2,
            pixels: vec![200u8; 2 * 2 * 3],
        })
    }
}

#[test]
fn test_encode_jpeg_produces_jpeg_magic() {
    let jpeg = encode_jpeg(&RgbFrame {
        width: 2,
        height: 2,
        pixels: vec![10u8; 12],
    })
    .unwrap();

    assert!(jpeg.len() > 2);
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
}

#[tokio::test]
async fn test_snapshot_loop_on_manual_ticker() {
    let (tick_tx, tick_rx) = std_mpsc::channel();
    let (frame_tx, mut frame_rx) = tokio::sync::mpsc::channel(8);

    let worker = std::thread::spawn(move || {
        snapshot_loop(SolidGrabber, ManualTicker::new(tick_rx), 1000, frame_tx);
    });

    for _ in 0..3 {
        tick_tx.send(()).unwrap();
    }
    drop(tick_tx); // stops the loop

    for expected_ts in [0u64, 1000, 2000] {
        let frame = frame_rx.recv().await.expect("expected a frame per tick");
        assert_eq!(frame.timestamp_ms, expected_ts);
        assert_eq!(&frame.jpeg[..2], &[0xFF, 0xD8]);
    }

    assert!(frame_rx.recv().await.is_none());
    worker.join().unwrap();
}
