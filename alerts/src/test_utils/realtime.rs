use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::{WebSocketStream, accept_async, tungstenite::Message};

use crate::feed::PhoenixMessage;
use crate::test_utils::notify::DEFAULT_WAIT_TIMEOUT;

/// A local WebSocket server standing in for Supabase Realtime.
///
/// Every accepted connection is handed to the test through [`MockRealtimeServer::accept`].
pub struct MockRealtimeServer {
    addr: SocketAddr,
    connections: mpsc::UnboundedReceiver<MockRealtimeConnection>,
    accept_task: JoinHandle<()>,
}

impl MockRealtimeServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, connections) = mpsc::unbounded_channel();

        let accept_task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let Ok(ws) = accept_async(stream).await else {
                    continue;
                };
                if tx.send(MockRealtimeConnection { ws }).is_err() {
                    break;
                }
            }
        });

        Self {
            addr,
            connections,
            accept_task,
        }
    }

    /// URL clients connect to. Includes a path so the request target is valid.
    pub fn url(&self) -> String {
        format!("ws://{}/realtime/v1/websocket", self.addr)
    }

    /// Waits for the next client connection.
    pub async fn accept(&mut self) -> MockRealtimeConnection {
        timeout(DEFAULT_WAIT_TIMEOUT, self.connections.recv())
            .await
            .expect("no client connected in time")
            .expect("accept loop stopped")
    }
}

impl Drop for MockRealtimeServer {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

/// Server side of one client connection.
pub struct MockRealtimeConnection {
    ws: WebSocketStream<TcpStream>,
}

impl MockRealtimeConnection {
    /// Next frame from the client, skipping heartbeats. `None` once the client hung up.
    pub async fn recv(&mut self) -> Option<PhoenixMessage> {
        self.recv_with_timeout(DEFAULT_WAIT_TIMEOUT).await
    }

    pub async fn recv_with_timeout(&mut self, duration: Duration) -> Option<PhoenixMessage> {
        loop {
            let message = self.next_message(duration).await?;
            if message.event != "heartbeat" {
                return Some(message);
            }
        }
    }

    /// Waits for the next heartbeat, dropping any other frame in between.
    pub async fn expect_heartbeat(&mut self) -> PhoenixMessage {
        loop {
            let message = self
                .next_message(DEFAULT_WAIT_TIMEOUT)
                .await
                .expect("client closed before sending a heartbeat");
            if message.event == "heartbeat" {
                return message;
            }
        }
    }

    async fn next_message(&mut self, duration: Duration) -> Option<PhoenixMessage> {
        loop {
            let frame = timeout(duration, self.ws.next())
                .await
                .expect("client sent nothing in time");

            match frame {
                Some(Ok(Message::Text(text))) => {
                    return Some(serde_json::from_str(&text).unwrap());
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return None,
                Some(Ok(_)) => {}
            }
        }
    }

    /// Waits for a `phx_join` and returns it.
    pub async fn expect_join(&mut self) -> PhoenixMessage {
        let message = self.recv().await.expect("client closed before joining");
        assert_eq!(message.event, "phx_join", "expected a join, got {message:?}");
        message
    }

    /// Replies to a join or heartbeat with the given status.
    pub async fn reply(&mut self, join: &PhoenixMessage, status: &str) {
        self.send(json!({
            "event": "phx_reply",
            "join_ref": join.join_ref,
            "payload": { "response": { "postgres_changes": [] }, "status": status },
            "ref": join.msg_ref,
            "topic": join.topic,
        }))
        .await;
    }

    /// Sends a `postgres_changes` event for `table`.
    pub async fn send_change(&mut self, topic: &str, table: &str, change_type: &str) {
        self.send(json!({
            "event": "postgres_changes",
            "payload": {
                "data": {
                    "commit_timestamp": "2026-01-01T00:00:00Z",
                    "record": { "id": 1 },
                    "schema": "public",
                    "table": table,
                    "type": change_type,
                },
                "ids": [1],
            },
            "ref": null,
            "topic": topic,
        }))
        .await;
    }

    pub async fn send(&mut self, frame: Value) {
        self.ws
            .send(Message::Text(frame.to_string().into()))
            .await
            .unwrap();
    }

    /// Closes the connection from the server side.
    pub async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }
}
