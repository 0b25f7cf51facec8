//! Stream source abstraction.
//!
//! A [`StreamSource`] opens connections; a [`StreamConnection`] yields frames
//! until the peer goes away. The observer never talks to a transport
//! directly, so tests can script frames without a network.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::Result;

/// A frame received from a push channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 text frame.
    Text(String),
    /// Binary frame.
    Binary(Vec<u8>),
    /// Keep-alive ping.
    Ping,
    /// Keep-alive pong.
    Pong,
    /// Peer-initiated close, with its reason if any.
    Close(Option<String>),
}

/// Opens connections to a push channel.
#[async_trait]
pub trait StreamSource: Send + Sync {
    /// Opens a connection to `url`.
    ///
    /// # Errors
    /// Returns a connection error if the channel cannot be opened.
    async fn open(&self, url: &str) -> Result<Box<dyn StreamConnection>>;
}

/// An open push-channel connection.
///
/// Owned by the receive loop. The supervisor asks it to close through a
/// [`CloseSignal`] rather than touching the connection.
#[async_trait]
pub trait StreamConnection: Send {
    /// Receives the next frame.
    ///
    /// Returns `None` once the stream has ended.
    async fn recv(&mut self) -> Option<Result<Frame>>;

    /// Closes the connection.
    ///
    /// # Errors
    /// Returns an error if the close handshake could not be sent.
    async fn close(&mut self) -> Result<()>;
}

/// Shared close request between the supervisor and the receive loop.
///
/// Requesting close is idempotent; every request is counted.
#[derive(Debug, Clone)]
pub struct CloseSignal {
    tx: Arc<watch::Sender<bool>>,
    requests: Arc<AtomicU64>,
}

impl CloseSignal {
    /// Creates an unraised signal.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            requests: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Requests close. Returns true if this call raised the signal.
    pub fn request(&self) -> bool {
        self.requests.fetch_add(1, Ordering::SeqCst);
        !self.tx.send_replace(true)
    }

    /// Returns how many times close was requested.
    #[must_use]
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::SeqCst)
    }

    /// Waits until close is requested.
    pub async fn requested(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|raised| *raised).await;
    }
}

impl Default for CloseSignal {
    fn default() -> Self {
        Self::new()
    }
}
