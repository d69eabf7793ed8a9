use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, info};

use crate::alerts_error;
use crate::error::{AlertsResult, ErrorKind};
use crate::feed::encoding::PROTOCOL_VERSION;

/// A live WebSocket connection to Supabase Realtime.
pub struct RealtimeConnection {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl RealtimeConnection {
    pub async fn connect(url: &str, api_key: &str) -> AlertsResult<Self> {
        let separator = if url.contains('?') { '&' } else { '?' };
        let connect_url = format!("{url}{separator}apikey={api_key}&vsn={PROTOCOL_VERSION}");
        debug!(url = %url, "connecting to Realtime WebSocket");

        let (ws, _) = connect_async(&connect_url).await.map_err(|e| {
            alerts_error!(
                ErrorKind::SubscriptionTransportError,
                "failed to connect to Realtime WebSocket",
                format!("URL: {url}, error: {e}"),
                source: e
            )
        })?;

        info!(url = %url, "connected to Realtime WebSocket");
        Ok(Self { ws })
    }

    pub async fn send(&mut self, message: &str) -> AlertsResult<()> {
        self.ws
            .send(Message::Text(message.to_owned().into()))
            .await
            .map_err(|e| {
                alerts_error!(
                    ErrorKind::SubscriptionTransportError,
                    "failed to send message to Realtime",
                    format!("error: {e}"),
                    source: e
                )
            })
    }

    /// Returns the next text frame, or `None` once the server closed the connection.
    ///
    /// Control and binary frames are skipped. Cancel safe.
    pub async fn recv(&mut self) -> AlertsResult<Option<String>> {
        while let Some(message) = self.ws.next().await {
            match message? {
                Message::Text(text) => return Ok(Some(text.to_string())),
                Message::Close(frame) => {
                    debug!(?frame, "Realtime closed the connection");
                    return Ok(None);
                }
                Message::Ping(_) | Message::Pong(_) | Message::Binary(_) | Message::Frame(_) => {}
            }
        }

        Ok(None)
    }

    /// Closes the connection gracefully.
    pub async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }
}
