use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, info, warn};

use super::messages::Frame;
use crate::error::TransportError;

/// Lifecycle of the duplex connection.
///
/// Transitions are monotonic; `Closed` and `Errored` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connecting,
    Open,
    Closing,
    Closed,
    Errored,
}

impl ConnectionState {
    fn rank(self) -> u8 {
        match self {
            ConnectionState::Connecting => 0,
            ConnectionState::Open => 1,
            ConnectionState::Closing => 2,
            ConnectionState::Closed => 3,
            ConnectionState::Errored => 3,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Closed | ConnectionState::Errored)
    }
}

/// Events delivered to the session's dispatch task, in receive order.
#[derive(Debug)]
pub enum TransportEvent {
    /// A parsed incoming frame.
    Frame(Frame),
    /// A connection-level failure; terminal for this connection.
    Error(TransportError),
    /// The peer closed the connection.
    Closed,
}

enum Outbound {
    Frame(Frame),
    Shutdown,
}

/// Owns the persistent WebSocket connection to the inference service.
///
/// A writer task serializes outgoing frames; a reader task parses incoming
/// JSON and forwards typed events. Frames sent while the connection is not
/// `Open` are dropped silently (logged at debug). There is no automatic
/// reconnection: a failed connection stays `Errored` until the session is
/// torn down.
pub struct TransportChannel {
    state: Arc<StdMutex<ConnectionState>>,
    outgoing: mpsc::UnboundedSender<Outbound>,
    writer_task: Mutex<Option<JoinHandle<()>>>,
    reader_task: Mutex<Option<JoinHandle<()>>>,
}

impl TransportChannel {
    /// Open the connection and return the channel plus its ordered event
    /// stream. The endpoint is the service base URL; the full path is
    /// `{endpoint}/ws/{client_id}`.
    pub async fn connect(
        endpoint: &str,
        client_id: &str,
    ) -> Result<(Self, mpsc::Receiver<TransportEvent>), TransportError> {
        let url = format!("{}/ws/{}", endpoint.trim_end_matches('/'), client_id);
        info!("Connecting to {}", url);

        let state = Arc::new(StdMutex::new(ConnectionState::Connecting));

        let (ws_stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| TransportError::Connect {
                endpoint: url.clone(),
                reason: e.to_string(),
            })?;

        advance(&state, ConnectionState::Open);
        info!("Connected to {}", url);

        let (mut ws_tx, mut ws_rx) = ws_stream.split();
        let (outgoing_tx, mut outgoing_rx) = mpsc::unbounded_channel::<Outbound>();
        let (event_tx, event_rx) = mpsc::channel::<TransportEvent>(100);

        let writer_state = Arc::clone(&state);
        let writer_events = event_tx.clone();
        let writer_task = tokio::spawn(async move {
            while let Some(outbound) = outgoing_rx.recv().await {
                match outbound {
                    Outbound::Frame(frame) => {
                        let json = match serde_json::to_string(&frame) {
                            Ok(json) => json,
                            Err(e) => {
                                warn!("Failed to serialize {} frame: {}", frame.kind(), e);
                                continue;
                            }
                        };
                        if let Err(e) = ws_tx.send(Message::Text(json)).await {
                            advance(&writer_state, ConnectionState::Errored);
                            let _ = writer_events
                                .send(TransportEvent::Error(TransportError::Send(e.to_string())))
                                .await;
                            break;
                        }
                    }
                    Outbound::Shutdown => {
                        let _ = ws_tx.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
            debug!("Transport writer task stopped");
        });

        let reader_state = Arc::clone(&state);
        let reader_task = tokio::spawn(async move {
            while let Some(msg) = ws_rx.next().await {
                match msg {
                    Ok(Message::Text(text)) => match serde_json::from_str::<Frame>(&text) {
                        Ok(frame) => {
                            if event_tx.send(TransportEvent::Frame(frame)).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            warn!("Dropping unrecognized message: {}", e);
                        }
                    },
                    Ok(Message::Close(_)) => {
                        advance(&reader_state, ConnectionState::Closed);
                        let _ = event_tx.send(TransportEvent::Closed).await;
                        break;
                    }
                    Ok(_) => {} // ping/pong and binary frames are not part of the protocol
                    Err(e) => {
                        advance(&reader_state, ConnectionState::Errored);
                        let _ = event_tx
                            .send(TransportEvent::Error(TransportError::ConnectionLost(
                                e.to_string(),
                            )))
                            .await;
                        break;
                    }
                }
            }

            // Stream ended without an explicit close handshake.
            if advance(&reader_state, ConnectionState::Closed) {
                let _ = event_tx.send(TransportEvent::Closed).await;
            }
            debug!("Transport reader task stopped");
        });

        Ok((
            Self {
                state,
                outgoing: outgoing_tx,
                writer_task: Mutex::new(Some(writer_task)),
                reader_task: Mutex::new(Some(reader_task)),
            },
            event_rx,
        ))
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue a frame for sending. Dropped silently unless the connection is
    /// `Open` (backpressure and ordering are the writer task's concern).
    pub fn send(&self, frame: Frame) {
        let state = self.state();
        if state != ConnectionState::Open {
            debug!("Dropping {} frame: connection is {:?}", frame.kind(), state);
            return;
        }
        if self.outgoing.send(Outbound::Frame(frame)).is_err() {
            debug!("Dropping frame: writer task has exited");
        }
    }

    /// Close the connection. Idempotent: closing an already-closed or errored
    /// channel is a no-op.
    pub async fn close(&self) {
        if !advance(&self.state, ConnectionState::Closing) {
            return;
        }

        info!("Closing transport connection");
        let _ = self.outgoing.send(Outbound::Shutdown);

        if let Some(task) = self.writer_task.lock().await.take() {
            let _ = task.await;
        }
        if let Some(task) = self.reader_task.lock().await.take() {
            task.abort();
        }

        advance(&self.state, ConnectionState::Closed);
    }
}

/// Apply a monotonic state transition. Returns false if the transition would
/// move backwards or leave a terminal state.
fn advance(state: &StdMutex<ConnectionState>, next: ConnectionState) -> bool {
    let mut guard = state.lock().unwrap_or_else(|e| e.into_inner());
    if guard.is_terminal() || next.rank() <= guard.rank() {
        return false;
    }
    *guard = next;
    true
}
