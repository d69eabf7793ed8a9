use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AlertsResult, ErrorKind};
use crate::alerts_error;

/// Topic used for connection-level heartbeats.
pub const PHOENIX_TOPIC: &str = "phoenix";

/// Phoenix serializer version requested on connect. `1.0.0` uses JSON objects.
pub const PROTOCOL_VERSION: &str = "1.0.0";

/// A Phoenix channel frame in the `1.0.0` JSON object format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoenixMessage {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(rename = "ref", default)]
    pub msg_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_ref: Option<String>,
}

impl PhoenixMessage {
    fn to_text(&self) -> String {
        // Serializing a struct of strings and a `Value` cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// A decoded frame, reduced to what the change feed reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Reply to a message we sent, correlated by `msg_ref`.
    Reply {
        msg_ref: Option<String>,
        ok: bool,
        response: Value,
    },
    /// A row changed in one of the subscribed tables.
    PostgresChange {
        table: Option<String>,
        change_type: Option<String>,
    },
    /// Status report from the server about the channel's extensions.
    System { ok: bool, message: String },
    ChannelError,
    ChannelClosed,
    /// Frames for other topics or events this client ignores.
    Other { topic: String, event: String },
}

/// Builds the topic string for a Realtime channel.
pub fn build_topic(channel: &str) -> String {
    format!("realtime:{channel}")
}

/// Builds a `phx_join` subscribing to every event type on `tables`.
pub fn build_join_message(
    topic: &str,
    schema: &str,
    tables: &[String],
    access_token: &str,
    msg_ref: &str,
) -> String {
    let postgres_changes: Vec<Value> = tables
        .iter()
        .map(|table| serde_json::json!({ "event": "*", "schema": schema, "table": table }))
        .collect();

    PhoenixMessage {
        topic: topic.to_owned(),
        event: "phx_join".to_owned(),
        payload: serde_json::json!({
            "access_token": access_token,
            "config": {
                "broadcast": { "ack": false, "self": false },
                "postgres_changes": postgres_changes,
                "presence": { "key": "" }
            }
        }),
        msg_ref: Some(msg_ref.to_owned()),
        join_ref: Some(msg_ref.to_owned()),
    }
    .to_text()
}

/// Builds a connection heartbeat. The server drops connections silent for ~60 seconds.
pub fn build_heartbeat_message(msg_ref: &str) -> String {
    PhoenixMessage {
        topic: PHOENIX_TOPIC.to_owned(),
        event: "heartbeat".to_owned(),
        payload: serde_json::json!({}),
        msg_ref: Some(msg_ref.to_owned()),
        join_ref: None,
    }
    .to_text()
}

pub fn build_leave_message(topic: &str, msg_ref: &str, join_ref: &str) -> String {
    PhoenixMessage {
        topic: topic.to_owned(),
        event: "phx_leave".to_owned(),
        payload: serde_json::json!({}),
        msg_ref: Some(msg_ref.to_owned()),
        join_ref: Some(join_ref.to_owned()),
    }
    .to_text()
}

/// Decodes a text frame received while joined to `topic`.
pub fn parse_message(topic: &str, text: &str) -> AlertsResult<InboundMessage> {
    let message: PhoenixMessage = serde_json::from_str(text).map_err(|err| {
        alerts_error!(
            ErrorKind::DeserializationError,
            "invalid Realtime frame",
            format!("frame: {text}"),
            source: err
        )
    })?;

    if message.event == "phx_reply" {
        return Ok(InboundMessage::Reply {
            ok: status_is_ok(&message.payload),
            response: message
                .payload
                .get("response")
                .cloned()
                .unwrap_or(Value::Null),
            msg_ref: message.msg_ref,
        });
    }

    if message.topic != topic {
        return Ok(InboundMessage::Other {
            topic: message.topic,
            event: message.event,
        });
    }

    let inbound = match message.event.as_str() {
        "postgres_changes" => {
            let data = message.payload.get("data");
            InboundMessage::PostgresChange {
                table: string_field(data, "table"),
                change_type: string_field(data, "type"),
            }
        }
        "system" => InboundMessage::System {
            ok: status_is_ok(&message.payload),
            message: string_field(Some(&message.payload), "message").unwrap_or_default(),
        },
        "phx_error" => InboundMessage::ChannelError,
        "phx_close" => InboundMessage::ChannelClosed,
        _ => InboundMessage::Other {
            topic: message.topic,
            event: message.event,
        },
    };

    Ok(inbound)
}

fn status_is_ok(payload: &Value) -> bool {
    payload.get("status").and_then(Value::as_str) == Some("ok")
}

fn string_field(value: Option<&Value>, field: &str) -> Option<String> {
    value?.get(field)?.as_str().map(str::to_owned)
}
