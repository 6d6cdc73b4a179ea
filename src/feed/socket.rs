//! Reconnecting WebSocket client for the dashboard feed
//!
//! One background task owns the socket. When a session ends for any reason it
//! waits a fixed delay and dials again, forever, until the handle is shut down
//! or dropped.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use super::{Command, Envelope, FeedError, FeedMessage};

/// Delay between a closed session and the next connection attempt
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Limit on the TCP connect plus WebSocket upgrade
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Events reported to the UI
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Connected,
    Disconnected,
    Message(FeedMessage),
    Error(String),
}

/// How a session ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Peer closed the socket; the client will reconnect
    Closed,
    /// Handle asked the task to stop
    Shutdown,
}

/// Channels a session works with
pub struct SessionIo<'a> {
    pub events: &'a mpsc::UnboundedSender<FeedEvent>,
    pub outbound: &'a mut mpsc::UnboundedReceiver<Envelope>,
    pub shutdown: &'a mut watch::Receiver<bool>,
    pub open: &'a AtomicBool,
}

impl SessionIo<'_> {
    /// Mark the socket open and tell the UI
    pub fn opened(&mut self) {
        // Anything queued while closed was never meant for this session
        while self.outbound.try_recv().is_ok() {}
        self.open.store(true, Ordering::SeqCst);
        let _ = self.events.send(FeedEvent::Connected);
    }

    /// Decode one text frame and forward it. Malformed frames are dropped.
    pub fn dispatch(&self, text: &str) {
        match FeedMessage::parse(text) {
            Ok(FeedMessage::Unknown(kind)) => {
                tracing::debug!("Ignoring feed message of type {}", kind);
            }
            Ok(message) => {
                let _ = self.events.send(FeedEvent::Message(message));
            }
            Err(e) => tracing::error!("Failed to parse feed message: {}", e),
        }
    }
}

/// One connection attempt plus the session that follows it
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn run_session(&self, url: &str, io: SessionIo<'_>) -> Result<SessionEnd, FeedError>;
}

/// Connector backed by tokio-tungstenite
pub struct WsConnector {
    connect_timeout: Duration,
}

impl WsConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for WsConnector {
    fn default() -> Self {
        Self::new(CONNECT_TIMEOUT)
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn run_session(&self, url: &str, mut io: SessionIo<'_>) -> Result<SessionEnd, FeedError> {
        // Shutdown must not wait on a peer that never finishes the upgrade
        let connect = tokio::time::timeout(self.connect_timeout, tokio_tungstenite::connect_async(url));
        let (stream, _) = tokio::select! {
            result = connect => match result {
                Ok(connected) => connected?,
                Err(_) => return Err(FeedError::ConnectTimeout(self.connect_timeout)),
            },
            _ = io.shutdown.changed() => return Ok(SessionEnd::Shutdown),
        };
        let (mut write, mut read) = stream.split();

        io.opened();
        tracing::info!("Feed connected to {}", url);

        loop {
            tokio::select! {
                _ = io.shutdown.changed() => {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(SessionEnd::Shutdown);
                }
                Some(envelope) = io.outbound.recv() => {
                    match serde_json::to_string(&envelope) {
                        Ok(text) => write.send(Message::Text(text)).await?,
                        Err(e) => tracing::warn!("Could not encode {} message: {}", envelope.kind, e),
                    }
                }
                frame = read.next() => match frame {
                    Some(Ok(Message::Text(text))) => io.dispatch(&text),
                    Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                        Ok(text) => io.dispatch(&text),
                        Err(_) => tracing::error!("Dropping non UTF-8 binary frame"),
                    },
                    Some(Ok(Message::Close(_))) | None => return Ok(SessionEnd::Closed),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                }
            }
        }
    }
}

/// Handle to the background feed task
pub struct FeedHandle {
    outbound: mpsc::UnboundedSender<Envelope>,
    open: Arc<AtomicBool>,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl FeedHandle {
    /// Start the feed against a real WebSocket endpoint
    pub fn spawn(
        url: impl Into<String>,
        reconnect_delay: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<FeedEvent>) {
        Self::spawn_with(WsConnector::default(), url, reconnect_delay)
    }

    pub fn spawn_with<C: Connector>(
        connector: C,
        url: impl Into<String>,
        reconnect_delay: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<FeedEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let open = Arc::new(AtomicBool::new(false));

        let task = tokio::spawn(run_feed(
            connector,
            url.into(),
            reconnect_delay,
            event_tx,
            outbound_rx,
            shutdown_rx,
            open.clone(),
        ));

        let handle = Self {
            outbound: outbound_tx,
            open,
            shutdown: shutdown_tx,
            task: Some(task),
        };
        (handle, event_rx)
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Queue a message for the server. Dropped when the socket is not open.
    pub fn send(&self, envelope: Envelope) -> bool {
        if !self.is_open() {
            tracing::debug!("Feed not open, dropping {} message", envelope.kind);
            return false;
        }
        self.outbound.send(envelope).is_ok()
    }

    pub fn send_command(&self, command: Command) -> bool {
        self.send(command.envelope())
    }

    /// Close the socket, cancel any pending retry and wait for the task
    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

async fn run_feed<C: Connector>(
    connector: C,
    url: String,
    reconnect_delay: Duration,
    events: mpsc::UnboundedSender<FeedEvent>,
    mut outbound: mpsc::UnboundedReceiver<Envelope>,
    mut shutdown: watch::Receiver<bool>,
    open: Arc<AtomicBool>,
) {
    let mut attempt: u64 = 0;

    loop {
        if *shutdown.borrow() {
            break;
        }

        attempt += 1;
        tracing::debug!("Feed connection attempt {} to {}", attempt, url);

        let io = SessionIo {
            events: &events,
            outbound: &mut outbound,
            shutdown: &mut shutdown,
            open: &open,
        };
        let result = connector.run_session(&url, io).await;
        open.store(false, Ordering::SeqCst);

        match result {
            Ok(SessionEnd::Shutdown) => break,
            Ok(SessionEnd::Closed) => tracing::info!("Feed disconnected"),
            Err(e) => {
                tracing::warn!("Feed connection error: {}", e);
                let _ = events.send(FeedEvent::Error(e.to_string()));
            }
        }

        if events.send(FeedEvent::Disconnected).is_err() {
            // Nobody is listening any more
            break;
        }

        tracing::info!("Reconnecting feed in {}ms", reconnect_delay.as_millis());
        tokio::select! {
            _ = tokio::time::sleep(reconnect_delay) => {}
            _ = shutdown.changed() => break,
        }
    }

    tracing::info!("Feed task stopped after {} attempts", attempt);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::mock;
    use std::sync::Mutex;
    use tokio::net::TcpListener;
    use tokio::time::{timeout, Instant};

    /// Connector whose sessions open and immediately close
    #[derive(Clone, Default)]
    struct FlakyConnector {
        attempts: Arc<Mutex<Vec<Instant>>>,
    }

    #[async_trait]
    impl Connector for FlakyConnector {
        async fn run_session(&self, _url: &str, mut io: SessionIo<'_>) -> Result<SessionEnd, FeedError> {
            self.attempts.lock().unwrap().push(Instant::now());
            io.opened();
            Ok(SessionEnd::Closed)
        }
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<FeedEvent>) -> FeedEvent {
        timeout(Duration::from_secs(30), rx.recv())
            .await
            .expect("timed out waiting for feed event")
            .expect("feed channel closed")
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnects_after_fixed_delay_without_cap() {
        let connector = FlakyConnector::default();
        let attempts = connector.attempts.clone();
        let delay = Duration::from_secs(3);
        let (handle, mut rx) = FeedHandle::spawn_with(connector, "ws://test", delay);

        let mut disconnects = 0;
        while disconnects < 25 {
            if next_event(&mut rx).await == FeedEvent::Disconnected {
                disconnects += 1;
            }
        }

        let attempts = attempts.lock().unwrap().clone();
        assert!(attempts.len() >= 25);
        for pair in attempts.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(gap >= delay, "retry came after {:?}", gap);
            assert!(gap < delay + Duration::from_millis(100), "retry came after {:?}", gap);
        }

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_pending_retry() {
        let connector = FlakyConnector::default();
        let attempts = connector.attempts.clone();
        let (handle, mut rx) = FeedHandle::spawn_with(connector, "ws://test", Duration::from_secs(3));

        assert_eq!(next_event(&mut rx).await, FeedEvent::Connected);
        assert_eq!(next_event(&mut rx).await, FeedEvent::Disconnected);

        handle.shutdown().await;
        let seen = attempts.lock().unwrap().len();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(attempts.lock().unwrap().len(), seen);
    }

    #[tokio::test]
    async fn test_send_is_dropped_while_closed() {
        struct NeverConnects;

        #[async_trait]
        impl Connector for NeverConnects {
            async fn run_session(&self, _url: &str, mut io: SessionIo<'_>) -> Result<SessionEnd, FeedError> {
                let _ = io.shutdown.changed().await;
                Ok(SessionEnd::Shutdown)
            }
        }

        let (handle, _rx) = FeedHandle::spawn_with(NeverConnects, "ws://test", DEFAULT_RECONNECT_DELAY);
        assert!(!handle.is_open());
        assert!(!handle.send_command(Command::GetPortfolio));
        handle.shutdown().await;
    }

    /// Listener that accepts TCP connections and never answers the upgrade
    async fn silent_listener() -> (String, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((tcp, _)) = listener.accept().await {
                held.push(tcp);
            }
        });
        (url, server)
    }

    #[tokio::test]
    async fn test_shutdown_during_stalled_handshake() {
        let (url, server) = silent_listener().await;
        let (handle, _rx) = FeedHandle::spawn(url, Duration::from_millis(50));

        tokio::time::sleep(Duration::from_millis(200)).await;
        timeout(Duration::from_secs(2), handle.shutdown())
            .await
            .expect("shutdown waited on the handshake");
        server.abort();
    }

    #[tokio::test]
    async fn test_stalled_handshake_times_out_and_retries() {
        let (url, server) = silent_listener().await;
        let connector = WsConnector::new(Duration::from_millis(100));
        let (handle, mut rx) = FeedHandle::spawn_with(connector, url, Duration::from_millis(50));

        for _ in 0..2 {
            match next_event(&mut rx).await {
                FeedEvent::Error(message) => assert!(message.contains("timed out"), "{}", message),
                other => panic!("expected a timeout error, got {:?}", other),
            }
            assert_eq!(next_event(&mut rx).await, FeedEvent::Disconnected);
        }

        handle.shutdown().await;
        server.abort();
    }

    #[tokio::test]
    async fn test_websocket_session_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        let snapshot = mock::dashboard();
        let initial = serde_json::to_string(&Envelope::new(
            "initial_data",
            serde_json::to_value(&snapshot).unwrap(),
        ))
        .unwrap();

        // First connection: send a snapshot, a bad frame, read one command, close.
        // Second connection proves the client came back.
        let server = tokio::spawn(async move {
            let mut received = Vec::new();
            for _ in 0..2 {
                let (tcp, _) = listener.accept().await.unwrap();
                let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
                ws.send(Message::Text(initial.clone())).await.unwrap();
                ws.send(Message::Text("{garbage".to_string())).await.unwrap();
                if received.is_empty() {
                    while let Some(Ok(frame)) = ws.next().await {
                        if let Message::Text(text) = frame {
                            received.push(text);
                            break;
                        }
                    }
                }
                let _ = ws.close(None).await;
            }
            received
        });

        let (handle, mut rx) = FeedHandle::spawn(url, Duration::from_millis(50));

        assert_eq!(next_event(&mut rx).await, FeedEvent::Connected);
        assert_eq!(
            next_event(&mut rx).await,
            FeedEvent::Message(FeedMessage::InitialData(snapshot.clone()))
        );
        assert!(handle.send_command(Command::ResumeStrategy(3)));

        // The malformed frame never surfaces; the next events are close and reconnect
        assert_eq!(next_event(&mut rx).await, FeedEvent::Disconnected);
        assert_eq!(next_event(&mut rx).await, FeedEvent::Connected);
        assert_eq!(
            next_event(&mut rx).await,
            FeedEvent::Message(FeedMessage::InitialData(snapshot))
        );

        let received = timeout(Duration::from_secs(10), server).await.unwrap().unwrap();
        assert_eq!(received, vec![r#"{"type":"resume_strategy","data":3}"#.to_string()]);

        handle.shutdown().await;
    }
}
