// Integration tests for the transport channel against a local WebSocket peer.

use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::time::{timeout, Duration};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::protocol::Message;
use voicewire::transport::{ConnectionState, Frame, TransportChannel, TransportEvent};

/// Accept one connection, send the scripted messages, then either close or
/// echo incoming text frames until the peer goes away.
async fn spawn_server(scripted: Vec<String>, echo: bool, close_after: bool) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        if let Ok((stream, _)) = listener.accept().await {
            let mut ws = accept_async(stream).await.unwrap();

            for message in scripted {
                if ws.send(Message::Text(message)).await.is_err() {
                    return;
                }
            }

            if close_after {
                let _ = ws.close(None).await;
                return;
            }

            while let Some(Ok(msg)) = ws.next().await {
                if echo && msg.is_text() {
                    if ws.send(msg).await.is_err() {
                        return;
                    }
                }
            }
        }
    });

    format!("ws://{}", addr)
}

async fn next_event(events: &mut tokio::sync::mpsc::Receiver<TransportEvent>) -> TransportEvent {
    timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("timed out waiting for transport event")
        .expect("event stream ended unexpectedly")
}

#[tokio::test]
async fn test_connect_reaches_open() {
    let endpoint = spawn_server(vec![], false, false).await;

    let (channel, _events) = TransportChannel::connect(&endpoint, "client-a")
        .await
        .unwrap();

    assert_eq!(channel.state(), ConnectionState::Open);
    channel.close().await;
}

#[tokio::test]
async fn test_connect_failure_surfaces_reason() {
    // Nothing is listening here.
    let result = TransportChannel::connect("ws://127.0.0.1:1", "client-a").await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_duplex_round_trip() {
    let endpoint = spawn_server(vec![], true, false).await;
    let (channel, mut events) = TransportChannel::connect(&endpoint, "client-a")
        .await
        .unwrap();

    channel.send(Frame::text("hello"));

    match next_event(&mut events).await {
        TransportEvent::Frame(frame) => assert_eq!(frame, Frame::text("hello")),
        other => panic!("expected echoed frame, got {:?}", other),
    }

    channel.close().await;
}

#[tokio::test]
async fn test_unknown_discriminator_dropped_not_fatal() {
    let scripted = vec![
        r#"{"type":"bogus","data":"x"}"#.to_string(),
        r#"{"type":"text","data":"after"}"#.to_string(),
    ];
    let endpoint = spawn_server(scripted, false, false).await;
    let (channel, mut events) = TransportChannel::connect(&endpoint, "client-a")
        .await
        .unwrap();

    // The unknown message is dropped; the channel keeps delivering.
    match next_event(&mut events).await {
        TransportEvent::Frame(frame) => assert_eq!(frame, Frame::text("after")),
        other => panic!("expected text frame, got {:?}", other),
    }

    channel.close().await;
}

#[tokio::test]
async fn test_peer_close_delivers_closed_event() {
    let endpoint = spawn_server(vec![], false, true).await;
    let (channel, mut events) = TransportChannel::connect(&endpoint, "client-a")
        .await
        .unwrap();

    match next_event(&mut events).await {
        TransportEvent::Closed => {}
        other => panic!("expected closed event, got {:?}", other),
    }

    assert_eq!(channel.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn test_close_is_idempotent_and_send_after_close_drops() {
    let endpoint = spawn_server(vec![], false, false).await;
    let (channel, _events) = TransportChannel::connect(&endpoint, "client-a")
        .await
        .unwrap();

    channel.close().await;
    assert_eq!(channel.state(), ConnectionState::Closed);

    channel.close().await;
    assert_eq!(channel.state(), ConnectionState::Closed);

    // Silently dropped, never a panic or error.
    channel.send(Frame::text("too late"));
    assert_eq!(channel.state(), ConnectionState::Closed);
}
