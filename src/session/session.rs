use super::config::SessionConfig;
use super::stats::{SessionStats, TranscriptEntry};
use crate::capture::{CameraSource, CaptureSource, MicrophoneSource, VideoSource};
use crate::codec;
use crate::playback::{AudioSink, CpalSink, PlaybackItem, PlaybackQueue};
use crate::transport::{ConnectionState, Frame, TransportChannel, TransportEvent};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Capture mode of a session. At most one capture is active per mode;
/// starting a new mode while one is active is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    Idle,
    AudioOnly,
    AudioAndVideo,
}

/// Media wiring for a session: the playback sink with its completion channel,
/// and factories for the capture sources started on each mode change. The
/// default wiring uses real devices; tests inject scripted sources and a
/// recording sink.
pub struct SessionIo {
    pub sink: Arc<dyn AudioSink>,
    pub completions: mpsc::UnboundedReceiver<()>,
    pub audio_source: Box<dyn Fn() -> Box<dyn CaptureSource> + Send + Sync>,
    pub video_source: Box<dyn Fn() -> Box<dyn VideoSource> + Send + Sync>,
}

/// A streaming session: one persistent connection to the inference service,
/// plus the capture pipeline feeding it and the playback pipeline draining it.
///
/// The session owns all of its sub-resources; nothing here is global. The
/// dispatch task is the sole mutator of the playback queue, so enqueues and
/// completions are serialized by construction.
pub struct StreamSession {
    config: SessionConfig,

    /// Persistent duplex connection (outlives individual capture runs)
    transport: Arc<TransportChannel>,

    /// Capture mode state machine
    mode: Mutex<SessionMode>,

    /// When the session connected
    started_at: chrono::DateTime<chrono::Utc>,

    /// Whether capture is currently active
    is_streaming: Arc<AtomicBool>,

    /// Signals capture tasks to wind down (true = stop). Reset at the start
    /// of each capture run; a watch channel cannot miss a wakeup the way an
    /// unbuffered notification can.
    stop_signal: watch::Sender<bool>,

    /// Counters for session statistics
    chunks_sent: Arc<AtomicUsize>,
    frames_sent: Arc<AtomicUsize>,

    /// Accumulated text responses
    transcript: Arc<StdMutex<Vec<TranscriptEntry>>>,

    /// Last transport failure, surfaced in stats
    last_error: Arc<StdMutex<Option<String>>>,

    /// Ordered playback of service audio responses
    queue: Arc<StdMutex<PlaybackQueue>>,
    sink: Arc<dyn AudioSink>,

    audio_factory: Box<dyn Fn() -> Box<dyn CaptureSource> + Send + Sync>,
    video_factory: Box<dyn Fn() -> Box<dyn VideoSource> + Send + Sync>,

    audio_task: Mutex<Option<JoinHandle<()>>>,
    video_task: Mutex<Option<JoinHandle<()>>>,
    dispatch_task: Mutex<Option<JoinHandle<()>>>,
}

impl StreamSession {
    /// Connect with real devices: cpal output sink, microphone and camera
    /// sources.
    pub async fn connect(config: SessionConfig) -> Result<Self> {
        let playback_rate = config.playback_sample_rate;
        let (sink, completions) =
            tokio::task::spawn_blocking(move || CpalSink::open(playback_rate))
                .await
                .context("Audio output thread failed")?
                .context("Failed to open audio output")?;

        let capture_config = config.capture.clone();
        let snapshot_period_ms = config.snapshot_period_ms;

        let io = SessionIo {
            sink: Arc::new(sink),
            completions,
            audio_source: Box::new(move || {
                Box::new(MicrophoneSource::new(capture_config.clone()))
            }),
            video_source: Box::new(move || Box::new(CameraSource::new(snapshot_period_ms))),
        };

        Self::connect_with(config, io).await
    }

    /// Connect with explicit media wiring.
    pub async fn connect_with(config: SessionConfig, io: SessionIo) -> Result<Self> {
        info!("Creating streaming session: {}", config.client_id);

        let (transport, events) = TransportChannel::connect(&config.endpoint, &config.client_id)
            .await
            .context("Failed to connect to service")?;

        let session = Self {
            config,
            transport: Arc::new(transport),
            mode: Mutex::new(SessionMode::Idle),
            started_at: Utc::now(),
            is_streaming: Arc::new(AtomicBool::new(false)),
            stop_signal: watch::channel(false).0,
            chunks_sent: Arc::new(AtomicUsize::new(0)),
            frames_sent: Arc::new(AtomicUsize::new(0)),
            transcript: Arc::new(StdMutex::new(Vec::new())),
            last_error: Arc::new(StdMutex::new(None)),
            queue: Arc::new(StdMutex::new(PlaybackQueue::new())),
            sink: io.sink,
            audio_factory: io.audio_source,
            video_factory: io.video_source,
            audio_task: Mutex::new(None),
            video_task: Mutex::new(None),
            dispatch_task: Mutex::new(None),
        };

        let dispatch = session.spawn_dispatch(events, io.completions);
        *session.dispatch_task.lock().await = Some(dispatch);

        Ok(session)
    }

    /// Route incoming transport events and playback completions. This task is
    /// the single serialization point for the playback queue.
    fn spawn_dispatch(
        &self,
        mut events: mpsc::Receiver<TransportEvent>,
        mut completions: mpsc::UnboundedReceiver<()>,
    ) -> JoinHandle<()> {
        let queue = Arc::clone(&self.queue);
        let sink = Arc::clone(&self.sink);
        let transcript = Arc::clone(&self.transcript);
        let last_error = Arc::clone(&self.last_error);
        let playback_rate = self.config.playback_sample_rate;

        tokio::spawn(async move {
            info!("Dispatch task started");

            loop {
                tokio::select! {
                    event = events.recv() => match event {
                        Some(TransportEvent::Frame(Frame::Audio { data })) => {
                            match codec::decode_base64(&data) {
                                Ok(pcm) => {
                                    let item = PlaybackItem {
                                        pcm,
                                        sample_rate: playback_rate,
                                    };
                                    let mut queue =
                                        queue.lock().unwrap_or_else(|e| e.into_inner());
                                    queue.enqueue(item, sink.as_ref());
                                }
                                Err(e) => warn!("Dropping malformed audio payload: {}", e),
                            }
                        }
                        Some(TransportEvent::Frame(Frame::Text { data })) => {
                            info!("Service text: {}", data);
                            transcript
                                .lock()
                                .unwrap_or_else(|e| e.into_inner())
                                .push(TranscriptEntry {
                                    text: data,
                                    received_at: Utc::now(),
                                });
                        }
                        Some(TransportEvent::Frame(Frame::Video { .. })) => {
                            warn!("Ignoring unexpected video frame from service");
                        }
                        Some(TransportEvent::Error(e)) => {
                            // Capture keeps running; sends drop until the user
                            // stops the session.
                            error!("Transport error: {}", e);
                            *last_error.lock().unwrap_or_else(|e| e.into_inner()) =
                                Some(e.to_string());
                        }
                        Some(TransportEvent::Closed) => {
                            info!("Connection closed by service");
                        }
                        None => break,
                    },
                    done = completions.recv() => match done {
                        Some(()) => {
                            let mut queue = queue.lock().unwrap_or_else(|e| e.into_inner());
                            queue.on_playback_complete(sink.as_ref());
                        }
                        None => break,
                    },
                }
            }

            info!("Dispatch task stopped");
        })
    }

    /// Start camera + audio capture: Idle -> AudioAndVideo.
    pub async fn start_camera(&self) -> Result<()> {
        self.start_capture(SessionMode::AudioAndVideo).await
    }

    /// Start audio-only capture: Idle -> AudioOnly.
    pub async fn start_audio_only(&self) -> Result<()> {
        self.start_capture(SessionMode::AudioOnly).await
    }

    async fn start_capture(&self, target: SessionMode) -> Result<()> {
        let mut mode = self.mode.lock().await;
        if *mode != SessionMode::Idle {
            bail!("capture already active ({:?}); stop it first", *mode);
        }

        // Acquire every device before committing the mode change so a denial
        // leaves the session Idle with nothing half-started.
        let mut audio_source = (self.audio_factory)();
        let audio_rx = audio_source
            .start()
            .await
            .context("Failed to access audio device")?;

        let video = if target == SessionMode::AudioAndVideo {
            let mut video_source = (self.video_factory)();
            match video_source.start().await {
                Ok(rx) => Some((video_source, rx)),
                Err(e) => {
                    // Release the microphone on the error path.
                    if let Err(stop_err) = audio_source.stop().await {
                        error!("Failed to release audio device: {}", stop_err);
                    }
                    return Err(anyhow::Error::new(e).context("Failed to access camera"));
                }
            }
        } else {
            None
        };

        *mode = target;
        self.is_streaming.store(true, Ordering::SeqCst);
        let _ = self.stop_signal.send(false);

        let audio_task = self.spawn_audio_streaming(audio_source, audio_rx);
        *self.audio_task.lock().await = Some(audio_task);

        if let Some((video_source, video_rx)) = video {
            let video_task = self.spawn_video_streaming(video_source, video_rx);
            *self.video_task.lock().await = Some(video_task);
        }

        info!("Capture started ({:?})", target);
        Ok(())
    }

    /// Encode and send every captured chunk, with no buffering at this layer.
    fn spawn_audio_streaming(
        &self,
        mut source: Box<dyn CaptureSource>,
        mut audio_rx: mpsc::Receiver<crate::capture::AudioChunk>,
    ) -> JoinHandle<()> {
        let transport = Arc::clone(&self.transport);
        let mut stop_rx = self.stop_signal.subscribe();
        let chunks_sent = Arc::clone(&self.chunks_sent);

        tokio::spawn(async move {
            info!("Audio streaming task started");

            loop {
                tokio::select! {
                    maybe = audio_rx.recv() => match maybe {
                        Some(chunk) => {
                            let pcm = codec::float_to_pcm16(&chunk.samples);
                            let bytes = codec::pcm16_to_bytes(&pcm);
                            transport.send(Frame::audio(&bytes));
                            chunks_sent.fetch_add(1, Ordering::SeqCst);
                        }
                        None => break,
                    },
                    _ = stop_rx.changed() => {
                        if *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            if let Err(e) = source.stop().await {
                error!("Failed to stop {} capture: {}", source.name(), e);
            }
            info!("Audio streaming task stopped");
        })
    }

    /// Forward one still frame per snapshot tick.
    fn spawn_video_streaming(
        &self,
        mut source: Box<dyn VideoSource>,
        mut video_rx: mpsc::Receiver<crate::capture::VideoFrame>,
    ) -> JoinHandle<()> {
        let transport = Arc::clone(&self.transport);
        let mut stop_rx = self.stop_signal.subscribe();
        let frames_sent = Arc::clone(&self.frames_sent);

        tokio::spawn(async move {
            info!("Video streaming task started");

            loop {
                tokio::select! {
                    maybe = video_rx.recv() => match maybe {
                        Some(frame) => {
                            transport.send(Frame::video(&frame.jpeg));
                            frames_sent.fetch_add(1, Ordering::SeqCst);
                        }
                        None => break,
                    },
                    _ = stop_rx.changed() => {
                        if *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            if let Err(e) = source.stop().await {
                error!("Failed to stop {} capture: {}", source.name(), e);
            }
            info!("Video streaming task stopped");
        })
    }

    /// Stop capture and release all device handles. Leaves the transport
    /// connection open (connection lifetime is the session's, not the
    /// capture run's). Idempotent: stopping an Idle session is a no-op.
    pub async fn stop(&self) -> Result<SessionStats> {
        let mut mode = self.mode.lock().await;
        if *mode == SessionMode::Idle {
            warn!("Capture not active");
            return Ok(self.stats_with_mode(SessionMode::Idle));
        }

        info!("Stopping capture");
        self.is_streaming.store(false, Ordering::SeqCst);
        let _ = self.stop_signal.send(true);

        if let Some(task) = self.audio_task.lock().await.take() {
            if let Err(e) = task.await {
                error!("Audio streaming task panicked: {}", e);
            }
        }
        if let Some(task) = self.video_task.lock().await.take() {
            if let Err(e) = task.await {
                error!("Video streaming task panicked: {}", e);
            }
        }

        *mode = SessionMode::Idle;
        info!("Capture stopped");

        Ok(self.stats_with_mode(SessionMode::Idle))
    }

    /// Stop capture and close the connection. Used at process exit.
    pub async fn shutdown(&self) -> Result<SessionStats> {
        let stats = self.stop().await?;
        self.transport.close().await;

        if let Some(task) = self.dispatch_task.lock().await.take() {
            if let Err(e) = task.await {
                error!("Dispatch task panicked: {}", e);
            }
        }

        Ok(stats)
    }

    /// Current capture mode.
    pub async fn mode(&self) -> SessionMode {
        *self.mode.lock().await
    }

    /// State of the underlying connection.
    pub fn connection_state(&self) -> ConnectionState {
        self.transport.state()
    }

    /// Current session statistics.
    pub async fn stats(&self) -> SessionStats {
        let mode = *self.mode.lock().await;
        self.stats_with_mode(mode)
    }

    fn stats_with_mode(&self, mode: SessionMode) -> SessionStats {
        let (pending, played, skipped) = {
            let queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
            (queue.len(), queue.completed(), queue.skipped())
        };

        let duration = Utc::now().signed_duration_since(self.started_at);

        SessionStats {
            mode,
            is_streaming: self.is_streaming.load(Ordering::SeqCst),
            connection: self.transport.state(),
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            chunks_sent: self.chunks_sent.load(Ordering::SeqCst),
            frames_sent: self.frames_sent.load(Ordering::SeqCst),
            items_played: played,
            items_skipped: skipped,
            pending_playback: pending,
            transcript_entries: self
                .transcript
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .len(),
            last_error: self
                .last_error
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone(),
        }
    }

    /// Accumulated text responses.
    pub fn transcript(&self) -> Vec<TranscriptEntry> {
        self.transcript
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// The client identifier this session connected with.
    pub fn client_id(&self) -> &str {
        &self.config.client_id
    }
}
