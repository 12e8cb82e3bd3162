use anyhow::Result;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::chunker::Chunker;
use super::source::{AudioChunk, CaptureConfig, CaptureSource};
use crate::error::DeviceAccessError;

/// Captures the default input device via cpal.
///
/// The device runs at its native rate and format on a dedicated thread (cpal
/// streams are not Send); raw buffers are bridged to a tokio task that runs
/// them through the [`Chunker`] and emits fixed-duration chunks.
pub struct MicrophoneSource {
    config: CaptureConfig,
    stop_tx: Option<std::sync::mpsc::Sender<()>>,
    thread: Option<std::thread::JoinHandle<()>>,
    chunk_task: Option<JoinHandle<()>>,
}

impl MicrophoneSource {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            stop_tx: None,
            thread: None,
            chunk_task: None,
        }
    }
}

#[async_trait::async_trait]
impl CaptureSource for MicrophoneSource {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioChunk>, DeviceAccessError> {
        if self.is_capturing() {
            return Err(DeviceAccessError::Backend(
                "microphone capture already started".into(),
            ));
        }

        let (raw_tx, mut raw_rx) = mpsc::unbounded_channel::<Vec<f32>>();
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = std::sync::mpsc::channel::<()>();

        let thread = std::thread::spawn(move || run_input_stream(raw_tx, ready_tx, stop_rx));

        let (src_rate, src_channels) = match ready_rx.await {
            Ok(Ok(info)) => info,
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e);
            }
            Err(_) => {
                let _ = thread.join();
                return Err(DeviceAccessError::Backend(
                    "capture thread exited before reporting readiness".into(),
                ));
            }
        };

        info!(
            "Microphone capture started ({} Hz, {} channels -> {} Hz mono, {} ms chunks)",
            src_rate, src_channels, self.config.sample_rate, self.config.chunk_duration_ms
        );

        let (chunk_tx, chunk_rx) = mpsc::channel(100);
        let config = self.config.clone();
        let chunk_task = tokio::spawn(async move {
            let mut chunker = Chunker::new(src_rate, src_channels, &config);
            while let Some(buffer) = raw_rx.recv().await {
                for chunk in chunker.push(&buffer) {
                    if chunk_tx.send(chunk).await.is_err() {
                        return;
                    }
                }
            }
        });

        self.stop_tx = Some(stop_tx);
        self.thread = Some(thread);
        self.chunk_task = Some(chunk_task);

        Ok(chunk_rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }

        if let Some(thread) = self.thread.take() {
            info!("Stopping microphone capture");
            let _ = tokio::task::spawn_blocking(move || thread.join()).await;
        }

        // The chunking task ends once the stream thread drops its sender.
        if let Some(task) = self.chunk_task.take() {
            if let Err(e) = task.await {
                error!("Chunking task panicked: {}", e);
            }
        }

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.thread.is_some()
    }

    fn name(&self) -> &str {
        "microphone"
    }
}

type StreamInfo = (u32, u16);

/// Owns the cpal input stream for the lifetime of the capture. Reports
/// readiness (or the access failure) once, then blocks until stopped.
fn run_input_stream(
    raw_tx: mpsc::UnboundedSender<Vec<f32>>,
    ready_tx: oneshot::Sender<Result<StreamInfo, DeviceAccessError>>,
    stop_rx: std::sync::mpsc::Receiver<()>,
) {
    let host = cpal::default_host();
    let device = match host.default_input_device() {
        Some(device) => device,
        None => {
            let _ = ready_tx.send(Err(DeviceAccessError::NoDevice("audio input")));
            return;
        }
    };

    let supported = match device.default_input_config() {
        Ok(config) => config,
        Err(e) => {
            let _ = ready_tx.send(Err(DeviceAccessError::Backend(e.to_string())));
            return;
        }
    };

    let src_rate = supported.sample_rate().0;
    let src_channels = supported.channels();
    let stream_config: cpal::StreamConfig = supported.clone().into();

    let stream = match supported.sample_format() {
        SampleFormat::F32 => {
            let tx = raw_tx.clone();
            device.build_input_stream(
                &stream_config,
                move |data: &[f32], _| {
                    let _ = tx.send(data.to_vec());
                },
                log_stream_error,
                None,
            )
        }
        SampleFormat::I16 => {
            let tx = raw_tx.clone();
            device.build_input_stream(
                &stream_config,
                move |data: &[i16], _| {
                    let _ = tx.send(data.iter().map(|&s| s as f32 / 32768.0).collect());
                },
                log_stream_error,
                None,
            )
        }
        SampleFormat::U16 => {
            let tx = raw_tx.clone();
            device.build_input_stream(
                &stream_config,
                move |data: &[u16], _| {
                    let _ = tx.send(
                        data.iter()
                            .map(|&s| (s as f32 / u16::MAX as f32) * 2.0 - 1.0)
                            .collect(),
                    );
                },
                log_stream_error,
                None,
            )
        }
        other => {
            let _ = ready_tx.send(Err(DeviceAccessError::Backend(format!(
                "unsupported sample format: {:?}",
                other
            ))));
            return;
        }
    };

    let stream = match stream {
        Ok(stream) => stream,
        Err(cpal::BuildStreamError::DeviceNotAvailable) => {
            let _ = ready_tx.send(Err(DeviceAccessError::NoDevice("audio input")));
            return;
        }
        Err(e) => {
            let _ = ready_tx.send(Err(DeviceAccessError::Backend(e.to_string())));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(DeviceAccessError::Backend(e.to_string())));
        return;
    }

    let _ = ready_tx.send(Ok((src_rate, src_channels)));

    // Hold the stream (and the exclusive device handle) until stopped.
    let _ = stop_rx.recv();
    drop(stream);
}

fn log_stream_error(err: cpal::StreamError) {
    warn!("Input stream error: {}", err);
}
