//! Server network layer: accept loop, lifecycle and per-connection sessions
//!
//! Each [`IngressServer`] owns one listening socket and services a single
//! client at a time. The accept loop spawns a session task for the accepted
//! connection and waits for it to finish before accepting again, so a second
//! peer simply waits in the listen backlog. A lost connection only ever sends
//! the server back to [`ServerState::Listening`]; the loop ends on shutdown.

use crate::config::ServerConfig;
use crate::framing::Framer;
use crate::shutdown::{Shutdown, ShutdownListener};
use log::{debug, error, info, warn};
use shared::FrameError;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

const READ_BUFFER_SIZE: usize = 4096;
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum IngressError {
    /// Port unavailable at startup. The server does not start.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    /// Transient; the accept loop keeps going
    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),
    /// Read fault on a live session; the session is torn down
    #[error("connection error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Stopped,
    Listening,
    Connected,
    Stopping,
}

/// Lifecycle notifications handed to the protocol for operator reporting
#[derive(Debug)]
pub enum ServerEvent<'a> {
    Listening { addr: SocketAddr },
    BindFailed { error: &'a IngressError },
    AcceptFailed { error: &'a IngressError },
    Connected { peer: SocketAddr },
    Disconnected { peer: SocketAddr },
    ConnectionError { peer: SocketAddr, error: &'a IngressError },
    FrameDropped { error: &'a FrameError },
    WaitingForReconnect,
    Stopped,
}

/// How a session ended when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    PeerClosed,
    Shutdown,
}

/// Protocol-specific half of a server: how to frame the stream and what to do
/// with each frame.
///
/// `handle_frame` runs inline on the session task. It must not block, and an
/// error only drops that frame; the session carries on.
pub trait Protocol: Send + Sync + 'static {
    type Framer: Framer + Send;

    /// Short name used in log output
    fn name(&self) -> &'static str;

    fn framer(&self) -> Self::Framer;

    fn handle_frame(&self, frame: &[u8]) -> Result<(), FrameError>;

    fn on_event(&self, _event: &ServerEvent<'_>) {}
}

/// Reads one connection until the peer closes it, a read fails, or shutdown
/// is requested.
///
/// Frames are handed to the protocol in the order they complete. The caller
/// owns the stream and closes it by dropping it.
pub async fn serve_connection<S, P>(
    stream: &mut S,
    protocol: &P,
    shutdown: &mut ShutdownListener,
) -> Result<SessionEnd, IngressError>
where
    S: AsyncRead + Unpin,
    P: Protocol + ?Sized,
{
    let mut framer = protocol.framer();
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];

    loop {
        if shutdown.is_shutdown() {
            return Ok(SessionEnd::Shutdown);
        }

        let len = tokio::select! {
            result = stream.read(&mut buffer) => result?,
            _ = shutdown.wait() => return Ok(SessionEnd::Shutdown),
        };

        if len == 0 {
            if framer.pending() > 0 {
                debug!(
                    "[{}] discarding {} bytes of incomplete frame",
                    protocol.name(),
                    framer.pending()
                );
            }
            return Ok(SessionEnd::PeerClosed);
        }

        let frames = framer.push(&buffer[..len]);
        let results = frames
            .iter()
            .map(|frame| protocol.handle_frame(frame))
            .chain(framer.take_errors().into_iter().map(Err));
        for result in results {
            if let Err(e) = result {
                warn!("[{}] dropped frame: {}", protocol.name(), e);
                protocol.on_event(&ServerEvent::FrameDropped { error: &e });
            }
        }
    }
}

/// A bound, not yet running, ingress server
pub struct IngressServer<P: Protocol> {
    listener: TcpListener,
    local_addr: SocketAddr,
    protocol: Arc<P>,
    shutdown: ShutdownListener,
    state: watch::Sender<ServerState>,
}

impl<P: Protocol> IngressServer<P> {
    /// Binds the configured address. Failure is fatal for this server and is
    /// reported once, both to the log and to the protocol.
    pub async fn bind(
        config: &ServerConfig,
        protocol: P,
        shutdown: &Shutdown,
    ) -> Result<Self, IngressError> {
        let addr = config.bind_addr();
        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(source) => {
                let err = IngressError::Bind { addr, source };
                error!("[{}] {}", protocol.name(), err);
                protocol.on_event(&ServerEvent::BindFailed { error: &err });
                return Err(err);
            }
        };
        let local_addr = listener.local_addr()?;

        info!("[{}] listening on {}", protocol.name(), local_addr);
        protocol.on_event(&ServerEvent::Listening { addr: local_addr });

        let (state, _) = watch::channel(ServerState::Listening);

        Ok(Self {
            listener,
            local_addr,
            protocol: Arc::new(protocol),
            shutdown: shutdown.subscribe(),
            state,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn protocol(&self) -> Arc<P> {
        Arc::clone(&self.protocol)
    }

    pub fn state(&self) -> watch::Receiver<ServerState> {
        self.state.subscribe()
    }

    /// Runs the accept loop on a background task
    pub fn spawn(self) -> ServerHandle {
        let local_addr = self.local_addr;
        let state = self.state();
        let task = tokio::spawn(self.run());
        ServerHandle {
            local_addr,
            state,
            task,
        }
    }

    /// Accept loop. Returns once shutdown has been requested.
    pub async fn run(self) -> Result<(), IngressError> {
        let Self {
            listener,
            protocol,
            mut shutdown,
            state,
            ..
        } = self;
        let name = protocol.name();

        loop {
            if shutdown.is_shutdown() {
                break;
            }

            let accepted = tokio::select! {
                result = listener.accept() => result,
                _ = shutdown.wait() => break,
            };

            let (stream, peer) = match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    if shutdown.is_shutdown() {
                        break;
                    }
                    let err = IngressError::Accept(e);
                    warn!("[{}] {}", name, err);
                    protocol.on_event(&ServerEvent::AcceptFailed { error: &err });
                    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                    continue;
                }
            };

            state.send_replace(ServerState::Connected);
            info!("[{}] peer {} connected", name, peer);
            protocol.on_event(&ServerEvent::Connected { peer });

            let session = {
                let protocol = Arc::clone(&protocol);
                let mut shutdown = shutdown.clone();
                tokio::spawn(async move {
                    let mut stream = stream;
                    serve_connection(&mut stream, protocol.as_ref(), &mut shutdown).await
                })
            };

            match session.await {
                Ok(Ok(SessionEnd::PeerClosed)) => {
                    info!("[{}] peer {} disconnected", name, peer);
                    protocol.on_event(&ServerEvent::Disconnected { peer });
                }
                Ok(Ok(SessionEnd::Shutdown)) => {
                    debug!("[{}] session with {} closed for shutdown", name, peer);
                }
                Ok(Err(err)) => {
                    warn!("[{}] session with {} failed: {}", name, peer, err);
                    protocol.on_event(&ServerEvent::ConnectionError { peer, error: &err });
                }
                Err(e) => {
                    error!("[{}] session task for {} aborted: {}", name, peer, e);
                }
            }

            if shutdown.is_shutdown() {
                break;
            }

            state.send_replace(ServerState::Listening);
            protocol.on_event(&ServerEvent::WaitingForReconnect);
        }

        state.send_replace(ServerState::Stopping);
        drop(listener);
        info!("[{}] stopped", name);
        protocol.on_event(&ServerEvent::Stopped);
        state.send_replace(ServerState::Stopped);

        Ok(())
    }
}

/// A running server
pub struct ServerHandle {
    local_addr: SocketAddr,
    state: watch::Receiver<ServerState>,
    task: JoinHandle<Result<(), IngressError>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn state(&self) -> ServerState {
        *self.state.borrow()
    }

    /// Waits until the server reaches `target`
    pub async fn wait_for(&mut self, target: ServerState) {
        // Err means the task is gone, which also means it is stopped
        let _ = self.state.wait_for(|state| *state == target).await;
    }

    /// Waits for the accept loop to exit after shutdown was triggered,
    /// aborting it if it takes longer than `grace`.
    pub async fn join(self, grace: Duration) -> Result<(), IngressError> {
        let mut task = self.task;
        match tokio::time::timeout(grace, &mut task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                error!("server task failed: {}", e);
                Ok(())
            }
            Err(_) => {
                warn!("server on {} did not stop in {:?}, aborting", self.local_addr, grace);
                task.abort();
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::LineFramer;
    use std::sync::Mutex;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpStream;
    use tokio::time::timeout;

    /// Records every frame as text, rejects frames reading "bad"
    #[derive(Default)]
    struct Recorder {
        frames: Mutex<Vec<String>>,
        events: Mutex<Vec<String>>,
    }

    impl Protocol for Recorder {
        type Framer = LineFramer;

        fn name(&self) -> &'static str {
            "recorder"
        }

        fn framer(&self) -> LineFramer {
            LineFramer::new()
        }

        fn handle_frame(&self, frame: &[u8]) -> Result<(), FrameError> {
            let text = String::from_utf8_lossy(frame).into_owned();
            if text == "bad" {
                return Err(shared::ParseError::FieldCount(0).into());
            }
            self.frames.lock().unwrap().push(text);
            Ok(())
        }

        fn on_event(&self, event: &ServerEvent<'_>) {
            let label = match event {
                ServerEvent::Listening { .. } => "listening",
                ServerEvent::BindFailed { .. } => "bind-failed",
                ServerEvent::AcceptFailed { .. } => "accept-failed",
                ServerEvent::Connected { .. } => "connected",
                ServerEvent::Disconnected { .. } => "disconnected",
                ServerEvent::ConnectionError { .. } => "error",
                ServerEvent::FrameDropped { .. } => "dropped",
                ServerEvent::WaitingForReconnect => "waiting",
                ServerEvent::Stopped => "stopped",
            };
            self.events.lock().unwrap().push(label.to_string());
        }
    }

    impl Recorder {
        fn frames(&self) -> Vec<String> {
            self.frames.lock().unwrap().clone()
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    fn loopback() -> ServerConfig {
        ServerConfig::telemetry()
            .with_host("127.0.0.1".parse().unwrap())
            .with_port(0)
    }

    #[tokio::test]
    async fn test_session_on_mock_stream() {
        let mut stream = tokio_test::io::Builder::new()
            .read(b"one\ntw")
            .read(b"o\nbad\nthree\npartial")
            .build();
        let protocol = Recorder::default();
        let shutdown = Shutdown::new();

        let end = serve_connection(&mut stream, &protocol, &mut shutdown.subscribe())
            .await
            .unwrap();

        assert_eq!(end, SessionEnd::PeerClosed);
        assert_eq!(protocol.frames(), vec!["one", "two", "three"]);
        assert_eq!(protocol.events(), vec!["dropped"]);
    }

    #[tokio::test]
    async fn test_session_drops_runaway_line() {
        let runaway = vec![b'a'; crate::framing::DEFAULT_MAX_LINE_LEN + 1];
        let mut stream = tokio_test::io::Builder::new()
            .read(&runaway)
            .read(b"aaaa\nok\n")
            .build();
        let protocol = Recorder::default();
        let shutdown = Shutdown::new();

        let end = serve_connection(&mut stream, &protocol, &mut shutdown.subscribe())
            .await
            .unwrap();

        assert_eq!(end, SessionEnd::PeerClosed);
        assert_eq!(protocol.frames(), vec!["ok"]);
        assert_eq!(protocol.events(), vec!["dropped"]);
    }

    #[tokio::test]
    async fn test_session_read_error() {
        let mut stream = tokio_test::io::Builder::new()
            .read(b"one\n")
            .read_error(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            .build();
        let protocol = Recorder::default();
        let shutdown = Shutdown::new();

        let result = serve_connection(&mut stream, &protocol, &mut shutdown.subscribe()).await;

        assert!(matches!(result, Err(IngressError::Io(_))));
        assert_eq!(protocol.frames(), vec!["one"]);
    }

    #[tokio::test]
    async fn test_session_stops_on_shutdown() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        let mut stream = tokio_test::io::Builder::new().build();

        let end = serve_connection(&mut stream, &Recorder::default(), &mut shutdown.subscribe())
            .await
            .unwrap();
        assert_eq!(end, SessionEnd::Shutdown);
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let shutdown = Shutdown::new();
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();

        let config = loopback().with_port(port);
        let result = IngressServer::bind(&config, Recorder::default(), &shutdown).await;

        assert!(matches!(result, Err(IngressError::Bind { .. })));
    }

    #[tokio::test]
    async fn test_lifecycle_and_reconnect() {
        let shutdown = Shutdown::new();
        let server = IngressServer::bind(&loopback(), Recorder::default(), &shutdown)
            .await
            .unwrap();
        let protocol = server.protocol();
        let mut handle = server.spawn();
        let addr = handle.local_addr();
        assert_eq!(handle.state(), ServerState::Listening);

        for round in 0..3 {
            let mut client = TcpStream::connect(addr).await.unwrap();
            timeout(Duration::from_secs(2), handle.wait_for(ServerState::Connected))
                .await
                .unwrap();
            client
                .write_all(format!("round-{}\nleftover", round).as_bytes())
                .await
                .unwrap();
            drop(client);
            timeout(Duration::from_secs(2), handle.wait_for(ServerState::Listening))
                .await
                .unwrap();
        }

        assert_eq!(protocol.frames(), vec!["round-0", "round-1", "round-2"]);

        shutdown.trigger();
        handle.join(Duration::from_secs(2)).await.unwrap();

        let events = protocol.events();
        assert_eq!(events.first().map(String::as_str), Some("listening"));
        assert_eq!(events.last().map(String::as_str), Some("stopped"));
        assert_eq!(events.iter().filter(|e| *e == "disconnected").count(), 3);
    }

    #[tokio::test]
    async fn test_keeps_listening_when_trigger_is_dropped() {
        let server = IngressServer::bind(&loopback(), Recorder::default(), &Shutdown::new())
            .await
            .unwrap();
        let protocol = server.protocol();
        let mut handle = server.spawn();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(handle.state(), ServerState::Listening);

        let mut client = TcpStream::connect(handle.local_addr()).await.unwrap();
        timeout(Duration::from_secs(2), handle.wait_for(ServerState::Connected))
            .await
            .unwrap();
        client.write_all(b"still here\n").await.unwrap();
        drop(client);
        timeout(Duration::from_secs(2), handle.wait_for(ServerState::Listening))
            .await
            .unwrap();

        assert_eq!(protocol.frames(), vec!["still here"]);
        assert!(!protocol.events().contains(&"stopped".to_string()));

        // Nothing can stop it now; join falls back to aborting the task
        handle.join(Duration::from_millis(50)).await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_closes_live_session() {
        let shutdown = Shutdown::new();
        let server = IngressServer::bind(&loopback(), Recorder::default(), &shutdown)
            .await
            .unwrap();
        let mut handle = server.spawn();

        let mut client = TcpStream::connect(handle.local_addr()).await.unwrap();
        timeout(Duration::from_secs(2), handle.wait_for(ServerState::Connected))
            .await
            .unwrap();

        shutdown.trigger();
        let mut state = handle.state.clone();
        handle.join(Duration::from_secs(2)).await.unwrap();
        assert_eq!(*state.borrow_and_update(), ServerState::Stopped);

        // Server side is gone: the client sees EOF
        let mut buf = [0u8; 1];
        let n = timeout(Duration::from_secs(2), client.read(&mut buf))
            .await
            .unwrap()
            .unwrap_or(0);
        assert_eq!(n, 0);
    }
}
