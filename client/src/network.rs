//! Outbound TCP link with reconnect.
//!
//! A [`Link`] delivers opaque frames to one server. Any connect or write
//! failure drops the socket, waits, reconnects and retries the same frame, so
//! frames are delivered in order. [`Outbox`] runs a link on a background task
//! behind a queue.

use crate::ClientError;
use log::{error, info, warn};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;

pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug)]
pub struct Link {
    name: &'static str,
    addr: SocketAddr,
    stream: Option<TcpStream>,
    retry_delay: Duration,
    max_attempts: Option<u32>,
}

impl Link {
    pub fn new(name: &'static str, addr: SocketAddr) -> Self {
        Self {
            name,
            addr,
            stream: None,
            retry_delay: DEFAULT_RETRY_DELAY,
            max_attempts: None,
        }
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Give up on a frame after this many attempts. Unlimited by default.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts.max(1));
        self
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Sends one frame, reconnecting as often as allowed
    pub async fn send(&mut self, frame: &[u8]) -> Result<(), ClientError> {
        let mut attempts = 0;
        loop {
            attempts += 1;

            if self.stream.is_none() {
                match TcpStream::connect(self.addr).await {
                    Ok(stream) => {
                        info!("Connected to {} at {}", self.name, self.addr);
                        self.stream = Some(stream);
                    }
                    Err(e) => warn!("{} connection failed: {}", self.name, e),
                }
            }

            if let Some(stream) = self.stream.as_mut() {
                match stream.write_all(frame).await {
                    Ok(()) => return Ok(()),
                    Err(e) => {
                        warn!("{} send error: {}", self.name, e);
                        self.stream = None;
                    }
                }
            }

            if self.max_attempts.is_some_and(|max| attempts >= max) {
                return Err(ClientError::Unreachable {
                    name: self.name,
                    addr: self.addr,
                    attempts,
                });
            }
            sleep(self.retry_delay).await;
        }
    }

    /// Flushes and closes the write half
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                warn!("{} close error: {}", self.name, e);
            }
        }
    }
}

/// A link driven by a background task. Frames are queued without blocking
/// and delivered in order.
pub struct Outbox {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    task: JoinHandle<()>,
}

impl Outbox {
    pub fn spawn(mut link: Link) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let task = tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                if let Err(e) = link.send(&frame).await {
                    error!("Dropping frame: {}", e);
                }
            }
            link.close().await;
        });
        Self { tx, task }
    }

    pub fn send(&self, frame: Vec<u8>) -> Result<(), ClientError> {
        self.tx.send(frame).map_err(|_| ClientError::Closed)
    }

    /// Delivers everything still queued, then closes the link
    pub async fn finish(self) {
        drop(self.tx);
        if let Err(e) = self.task.await {
            error!("Outbox task failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_link_delivers_in_order() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let reader = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            socket.read_to_end(&mut received).await.unwrap();
            received
        });

        let mut link = Link::new("test", addr);
        link.send(b"one,").await.unwrap();
        link.send(b"two").await.unwrap();
        assert!(link.is_connected());
        link.close().await;

        let received = timeout(Duration::from_secs(2), reader).await.unwrap().unwrap();
        assert_eq!(received, b"one,two");
    }

    #[tokio::test]
    async fn test_link_gives_up_after_max_attempts() {
        // Grab a free port, then release it so nothing is listening there
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };

        let mut link = Link::new("nobody", addr)
            .with_retry_delay(Duration::from_millis(10))
            .with_max_attempts(3);

        let result = link.send(b"lost").await;
        assert!(matches!(
            result,
            Err(ClientError::Unreachable { attempts: 3, .. })
        ));
        assert!(!link.is_connected());
    }

    #[tokio::test]
    async fn test_link_waits_for_late_server() {
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };

        let mut link = Link::new("late", addr).with_retry_delay(Duration::from_millis(50));
        let sender = tokio::spawn(async move {
            link.send(b"hello").await.unwrap();
            link.close().await;
        });

        tokio::time::sleep(Duration::from_millis(120)).await;
        let listener = TcpListener::bind(addr).await.unwrap();
        let (mut socket, _) = timeout(Duration::from_secs(2), listener.accept())
            .await
            .unwrap()
            .unwrap();

        let mut received = Vec::new();
        socket.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"hello");
        sender.await.unwrap();
    }

    #[tokio::test]
    async fn test_outbox_flushes_on_finish() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let outbox = Outbox::spawn(Link::new("outbox", addr));
        for i in 0..5u8 {
            outbox.send(vec![b'0' + i]).unwrap();
        }
        outbox.finish().await;

        let (mut socket, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        socket.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"01234");
    }
}
