//! WebSocket stream source.

use async_trait::async_trait;
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use twinprobe_core::ProbeError;

use crate::error::{ObserveError, Result};
use crate::source::{Frame, StreamConnection, StreamSource};

/// Opens WebSocket connections with `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketSource;

impl WebSocketSource {
    /// Creates a WebSocket source.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StreamSource for WebSocketSource {
    async fn open(&self, url: &str) -> Result<Box<dyn StreamConnection>> {
        if !url.starts_with("ws://") && !url.starts_with("wss://") {
            return Err(
                ProbeError::config(format!("websocket URL must start with ws:// or wss://, got {url}"))
                    .into(),
            );
        }
        tracing::debug!(url = url, "opening websocket");
        let (stream, response) = connect_async(url)
            .await
            .map_err(|e| ObserveError::connection(format!("{url}: {e}")))?;
        tracing::debug!(url = url, status = response.status().as_u16(), "websocket upgraded");
        Ok(Box::new(WebSocketConnection { stream }))
    }
}

/// An open WebSocket connection.
pub struct WebSocketConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl std::fmt::Debug for WebSocketConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketConnection").finish_non_exhaustive()
    }
}

#[async_trait]
impl StreamConnection for WebSocketConnection {
    async fn recv(&mut self) -> Option<Result<Frame>> {
        loop {
            let message = match self.stream.next().await? {
                Ok(message) => message,
                Err(e) => return Some(Err(ObserveError::connection(e.to_string()))),
            };
            let frame = match message {
                Message::Text(text) => Frame::Text(text.to_string()),
                Message::Binary(data) => Frame::Binary(data.to_vec()),
                Message::Ping(_) => Frame::Ping,
                Message::Pong(_) => Frame::Pong,
                Message::Close(close) => {
                    Frame::Close(close.map(|c| format!("{} {}", u16::from(c.code), c.reason)))
                }
                // Raw frames are only surfaced when reading at the frame level.
                Message::Frame(_) => continue,
            };
            return Some(Ok(frame));
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.stream
            .close(None)
            .await
            .map_err(|e| ObserveError::connection(format!("close failed: {e}")))
    }
}
