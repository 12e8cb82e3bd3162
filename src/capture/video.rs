use anyhow::Result;
use image::codecs::jpeg::JpegEncoder;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::{Camera, NokhwaError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use super::ticker::{IntervalTicker, Ticker};
use crate::error::DeviceAccessError;

/// One JPEG still frame.
///
/// Video is a periodic sample, not a continuous stream: one frame per
/// snapshot tick, independent of the audio cadence.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub jpeg: Vec<u8>,
    /// Milliseconds since capture started (tick count x snapshot period)
    pub timestamp_ms: u64,
}

/// A raw RGB8 frame as it comes off the camera.
#[derive(Debug, Clone)]
pub struct RgbFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Produces one raw frame per call. Implemented by the camera backend and by
/// scripted grabbers in tests.
pub trait FrameGrabber {
    fn grab(&mut self) -> Result<RgbFrame>;
}

/// Video capture source trait
#[async_trait::async_trait]
pub trait VideoSource: Send {
    /// Start capturing; returns a channel receiver of snapshot frames.
    async fn start(&mut self) -> Result<mpsc::Receiver<VideoFrame>, DeviceAccessError>;

    /// Stop capturing and release the device. Idempotent.
    async fn stop(&mut self) -> Result<()>;

    fn is_capturing(&self) -> bool;

    fn name(&self) -> &str;
}

/// Encode a raw RGB frame as JPEG.
pub fn encode_jpeg(frame: &RgbFrame) -> Result<Vec<u8>> {
    let mut jpeg = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, 80);
    encoder.encode(
        &frame.pixels,
        frame.width,
        frame.height,
        image::ColorType::Rgb8,
    )?;
    Ok(jpeg)
}

/// Grab-encode-emit loop shared by the camera source and tests.
///
/// Runs on its own thread: one frame per tick until the ticker stops or the
/// receiver goes away. A failed grab or encode skips that tick; it never ends
/// the loop. Timestamps come from the tick count, not the wall clock.
pub fn snapshot_loop(
    mut grabber: impl FrameGrabber,
    mut ticker: impl Ticker,
    period_ms: u64,
    frame_tx: mpsc::Sender<VideoFrame>,
) {
    let mut ticks = 0u64;
    while ticker.wait() {
        let frame = match grabber.grab() {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Snapshot failed: {}", e);
                ticks += 1;
                continue;
            }
        };

        let jpeg = match encode_jpeg(&frame) {
            Ok(jpeg) => jpeg,
            Err(e) => {
                warn!("JPEG encoding failed: {}", e);
                ticks += 1;
                continue;
            }
        };

        let video = VideoFrame {
            jpeg,
            timestamp_ms: ticks * period_ms,
        };
        ticks += 1;

        if frame_tx.blocking_send(video).is_err() {
            break;
        }
    }
}

/// Captures still frames from the default camera.
pub struct CameraSource {
    period_ms: u64,
    stop_tx: Option<std::sync::mpsc::Sender<()>>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl CameraSource {
    pub fn new(period_ms: u64) -> Self {
        Self {
            period_ms,
            stop_tx: None,
            thread: None,
        }
    }
}

#[async_trait::async_trait]
impl VideoSource for CameraSource {
    async fn start(&mut self) -> Result<mpsc::Receiver<VideoFrame>, DeviceAccessError> {
        if self.is_capturing() {
            return Err(DeviceAccessError::Backend(
                "camera capture already started".into(),
            ));
        }

        let (frame_tx, frame_rx) = mpsc::channel(8);
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = std::sync::mpsc::channel::<()>();
        let period_ms = self.period_ms;

        let thread = std::thread::spawn(move || {
            // The camera lives on this thread for its whole lifetime.
            let grabber = match CameraGrabber::open() {
                Ok(grabber) => grabber,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            let _ = ready_tx.send(Ok(()));

            let ticker = IntervalTicker::new(Duration::from_millis(period_ms), stop_rx);
            snapshot_loop(grabber, ticker, period_ms, frame_tx);
        });

        match ready_rx.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e);
            }
            Err(_) => {
                let _ = thread.join();
                return Err(DeviceAccessError::Backend(
                    "camera thread exited before reporting readiness".into(),
                ));
            }
        }

        info!("Camera capture started ({} ms snapshot period)", period_ms);

        self.stop_tx = Some(stop_tx);
        self.thread = Some(thread);
        Ok(frame_rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            info!("Stopping camera capture");
            let _ = tokio::task::spawn_blocking(move || thread.join()).await;
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.thread.is_some()
    }

    fn name(&self) -> &str {
        "camera"
    }
}

struct CameraGrabber {
    camera: Camera,
}

impl CameraGrabber {
    fn open() -> Result<Self, DeviceAccessError> {
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
        let mut camera =
            Camera::new(CameraIndex::Index(0), requested).map_err(map_camera_error)?;
        camera.open_stream().map_err(map_camera_error)?;
        Ok(Self { camera })
    }
}

impl FrameGrabber for CameraGrabber {
    fn grab(&mut self) -> Result<RgbFrame> {
        let buffer = self.camera.frame()?;
        let image = buffer.decode_image::<RgbFormat>()?;
        Ok(RgbFrame {
            width: image.width(),
            height: image.height(),
            pixels: image.into_raw(),
        })
    }
}

impl Drop for CameraGrabber {
    fn drop(&mut self) {
        let _ = self.camera.stop_stream();
    }
}

fn map_camera_error(e: NokhwaError) -> DeviceAccessError {
    let message = e.to_string();
    let lowered = message.to_lowercase();
    if lowered.contains("permission") || lowered.contains("denied") {
        DeviceAccessError::PermissionDenied(message)
    } else if lowered.contains("not found") || lowered.contains("no device") {
        DeviceAccessError::NoDevice("camera")
    } else {
        DeviceAccessError::Backend(message)
    }
}
