//! Integration tests for the depth client.
//!
//! A scripted raw TCP listener plays the server's role, which lets the tests
//! control exactly which bytes arrive and when the connection drops. The
//! assertions are on the client's public surface: the mirrored depth value
//! and the [`ClientEvent`] stream.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};

use fathom_device::{ClientEvent, DepthClient, DepthClientConfig};

/// Short timings so failure paths stay fast under test.
fn fast_config(addr: SocketAddr) -> DepthClientConfig {
    DepthClientConfig {
        server_addr: addr,
        connect_attempts: 3,
        connect_timeout: Duration::from_millis(100),
        retry_delay: Duration::from_millis(50),
        reconnect_delay: Duration::from_millis(50),
    }
}

/// Polls the client until it mirrors `expect` or two seconds pass.
async fn mirrors(client: &DepthClient, expect: u16) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if client.depth().get() == expect {
            return true;
        }
        time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// Receives the next event within two seconds.
async fn next_event(events: &mut mpsc::Receiver<ClientEvent>) -> Option<ClientEvent> {
    time::timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("expected an event before the deadline")
}

#[tokio::test]
async fn test_client_mirrors_values_from_the_stream() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let client = DepthClient::new(fast_config(listener.local_addr().unwrap()));
    let mut events = client.start();

    let (mut sock, _) = listener.accept().await.unwrap();
    assert!(matches!(
        next_event(&mut events).await,
        Some(ClientEvent::Connected { .. })
    ));

    // Unterminated record, accepted by the tolerant-tail rule.
    sock.write_all(b"450").await.unwrap();
    assert!(mirrors(&client, 450).await);

    // Malformed record dropped, following record applied.
    sock.write_all(b"12ab\n34\n").await.unwrap();
    assert!(mirrors(&client, 34).await);

    client.stop();
}

#[tokio::test]
async fn test_client_reconnects_after_connection_drop() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let client = DepthClient::new(fast_config(listener.local_addr().unwrap()));
    let mut events = client.start();

    let (mut sock, _) = listener.accept().await.unwrap();
    assert!(matches!(
        next_event(&mut events).await,
        Some(ClientEvent::Connected { .. })
    ));
    sock.write_all(b"100\n").await.unwrap();
    assert!(mirrors(&client, 100).await);

    // Cable unplugged.
    drop(sock);
    assert_eq!(next_event(&mut events).await, Some(ClientEvent::Disconnected));

    // The client must come back on its own.
    let (mut sock, _) = listener.accept().await.unwrap();
    assert!(matches!(
        next_event(&mut events).await,
        Some(ClientEvent::Connected { .. })
    ));

    // The mirror held the last-known value across the gap.
    assert_eq!(client.depth().get(), 100);

    sock.write_all(b"900").await.unwrap();
    assert!(mirrors(&client, 900).await);

    client.stop();
}

#[tokio::test]
async fn test_exhausted_initial_attempts_degrade_to_zero() {
    // Obtain a dead address: bind, then immediately drop the listener.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut config = fast_config(addr);
    config.connect_attempts = 2;
    let client = DepthClient::new(config);
    let mut events = client.start();

    assert_eq!(
        next_event(&mut events).await,
        Some(ClientEvent::ConnectFailed { attempts: 2 })
    );

    // The task has given up: the event channel closes and the consumer
    // keeps seeing the last-known (zero) value.
    assert_eq!(next_event(&mut events).await, None);
    assert_eq!(client.depth().get(), 0);
}

#[tokio::test]
async fn test_stop_is_observed_while_the_event_channel_is_full() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let client = DepthClient::new(fast_config(listener.local_addr().unwrap()));

    // Held but never drained; lifecycle events must overflow, not block.
    let _events = client.start();

    // Each accept-then-drop cycle produces a Disconnected plus a Connected
    // on the retry, more than filling the channel.
    for _ in 0..12 {
        let (sock, _) = listener.accept().await.unwrap();
        drop(sock);
    }

    // The task is still alive and still mirroring.
    let (mut sock, _) = listener.accept().await.unwrap();
    sock.write_all(b"640\n").await.unwrap();
    assert!(mirrors(&client, 640).await);

    client.stop();

    // Stop drops the socket promptly even with the channel full.
    let mut buf = [0u8; 8];
    let read = time::timeout(Duration::from_millis(500), sock.read(&mut buf))
        .await
        .expect("connection must close promptly after stop");
    assert_eq!(read.unwrap(), 0);
}

#[tokio::test]
async fn test_stop_ends_the_background_task() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let client = DepthClient::new(fast_config(listener.local_addr().unwrap()));
    let mut events = client.start();

    let (_sock, _) = listener.accept().await.unwrap();
    assert!(matches!(
        next_event(&mut events).await,
        Some(ClientEvent::Connected { .. })
    ));

    client.stop();

    // Task exit closes the event channel.
    assert_eq!(next_event(&mut events).await, None);
}
