use anyhow::Result;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::StreamConfig;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use crate::error::DeviceAccessError;

/// Audio output seam for the playback queue.
///
/// `begin` starts playback of exactly one decoded item and returns without
/// waiting for it to finish. The implementation must signal completion
/// exactly once per successfully started item on its completion channel.
pub trait AudioSink: Send + Sync {
    fn begin(&self, samples: Vec<f32>, sample_rate: u32) -> Result<()>;
}

struct SinkShared {
    buffer: Mutex<VecDeque<f32>>,
    remaining: AtomicUsize,
    completion_tx: mpsc::UnboundedSender<()>,
}

/// Plays mono f32 audio through the default output device.
///
/// The cpal stream lives on a dedicated thread (cpal streams are not Send);
/// the output callback drains a shared buffer and reports when the current
/// item's samples have all been consumed.
pub struct CpalSink {
    shared: Arc<SinkShared>,
    stop_tx: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl CpalSink {
    /// Open the default output device at the given rate. Returns the sink and
    /// the channel on which item completions are delivered.
    pub fn open(
        sample_rate: u32,
    ) -> Result<(Self, mpsc::UnboundedReceiver<()>), DeviceAccessError> {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(SinkShared {
            buffer: Mutex::new(VecDeque::new()),
            remaining: AtomicUsize::new(0),
            completion_tx,
        });

        let (ready_tx, ready_rx) = std::sync::mpsc::channel();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let stream_shared = Arc::clone(&shared);
        let thread = std::thread::spawn(move || {
            run_output_stream(stream_shared, sample_rate, ready_tx, stop_rx);
        });

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e);
            }
            Err(_) => {
                let _ = thread.join();
                return Err(DeviceAccessError::Backend(
                    "output thread exited before reporting readiness".into(),
                ));
            }
        }

        info!("Audio output sink opened at {} Hz", sample_rate);

        Ok((
            Self {
                shared,
                stop_tx: Some(stop_tx),
                thread: Some(thread),
            },
            completion_rx,
        ))
    }
}

impl AudioSink for CpalSink {
    fn begin(&self, samples: Vec<f32>, _sample_rate: u32) -> Result<()> {
        if samples.is_empty() {
            // Nothing for the device to drain; complete right away.
            let _ = self.shared.completion_tx.send(());
            return Ok(());
        }

        self.shared
            .remaining
            .fetch_add(samples.len(), Ordering::SeqCst);

        let mut buffer = self
            .shared
            .buffer
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        buffer.extend(samples);

        Ok(())
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn run_output_stream(
    shared: Arc<SinkShared>,
    sample_rate: u32,
    ready_tx: std::sync::mpsc::Sender<Result<(), DeviceAccessError>>,
    stop_rx: oneshot::Receiver<()>,
) {
    let host = cpal::default_host();
    let device = match host.default_output_device() {
        Some(device) => device,
        None => {
            let _ = ready_tx.send(Err(DeviceAccessError::NoDevice("audio output")));
            return;
        }
    };

    let config = StreamConfig {
        channels: 1,
        sample_rate: cpal::SampleRate(sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let callback_shared = Arc::clone(&shared);
    let stream = device.build_output_stream(
        &config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            let mut popped = 0;
            {
                let mut buffer = callback_shared
                    .buffer
                    .lock()
                    .unwrap_or_else(|e| e.into_inner());
                for sample in data.iter_mut() {
                    match buffer.pop_front() {
                        Some(s) => {
                            *sample = s;
                            popped += 1;
                        }
                        None => *sample = 0.0, // silence on underrun
                    }
                }
            }

            if popped > 0 {
                let before = callback_shared.remaining.fetch_sub(popped, Ordering::SeqCst);
                if before == popped {
                    // The current item has fully drained.
                    let _ = callback_shared.completion_tx.send(());
                }
            }
        },
        |err| warn!("Output stream error: {}", err),
        None,
    );

    let stream = match stream {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(DeviceAccessError::Backend(e.to_string())));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(DeviceAccessError::Backend(e.to_string())));
        return;
    }

    let _ = ready_tx.send(Ok(()));

    // Hold the stream (and the device handle) until the sink is dropped.
    let _ = stop_rx.blocking_recv();
    drop(stream);
}
