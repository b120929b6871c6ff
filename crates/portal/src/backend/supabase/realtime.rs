//! Row-insert notifications over the Realtime websocket.
//!
//! Realtime speaks the Phoenix channel protocol: join a topic with a
//! `postgres_changes` filter, heartbeat every 25 seconds, and receive one
//! `postgres_changes` frame per inserted row. The stream ends with an error
//! when the socket closes or the join is refused; reconnecting is left to the
//! caller.

use std::time::Duration;

use async_stream::stream;
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use super::SupabaseClient;
use crate::backend::{BackendError, Row, RowStream};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(25);

/// What the subscription loop saw next.
enum Step {
    Heartbeat,
    Frame(Option<Result<Message, tokio_tungstenite::tungstenite::Error>>),
}

fn realtime_error(err: impl std::fmt::Display) -> BackendError {
    BackendError::Realtime(err.to_string())
}

impl SupabaseClient {
    /// `wss://{project}/realtime/v1/websocket?apikey=...&vsn=1.0.0`
    fn realtime_url(&self) -> Result<Url, BackendError> {
        let mut url = self.endpoint("realtime/v1/websocket")?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|()| realtime_error("project URL cannot carry a websocket scheme"))?;
        url.query_pairs_mut()
            .append_pair("apikey", &self.inner.anon_key)
            .append_pair("vsn", "1.0.0");
        Ok(url)
    }

    pub(super) async fn realtime_subscribe(&self, table: &str) -> Result<RowStream, BackendError> {
        if !self.inner.realtime_enabled {
            return Err(realtime_error("realtime is disabled"));
        }

        let url = self.realtime_url()?;
        let (socket, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(realtime_error)?;
        let (mut write, mut read) = socket.split();

        let topic = format!("realtime:{table}-inserts");
        let join = join_frame(&topic, table, &self.inner.anon_key);
        write
            .send(Message::Text(join.to_string().into()))
            .await
            .map_err(realtime_error)?;
        tracing::info!(%topic, "Joined realtime channel");

        let stream = stream! {
            let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
            // The first tick completes immediately; the join just went out.
            heartbeat.tick().await;
            let mut reference: u64 = 1;

            loop {
                let step = tokio::select! {
                    _ = heartbeat.tick() => Step::Heartbeat,
                    frame = read.next() => Step::Frame(frame),
                };

                match step {
                    Step::Heartbeat => {
                        reference += 1;
                        let frame = heartbeat_frame(reference).to_string();
                        if let Err(e) = write.send(Message::Text(frame.into())).await {
                            yield Err(realtime_error(e));
                            break;
                        }
                    }
                    Step::Frame(Some(Ok(Message::Text(text)))) => {
                        match parse_frame(&topic, text.as_str()) {
                            Ok(Some(row)) => yield Ok(row),
                            Ok(None) => {}
                            Err(e) => {
                                yield Err(e);
                                break;
                            }
                        }
                    }
                    Step::Frame(Some(Ok(Message::Close(_))) | None) => {
                        yield Err(realtime_error("connection closed"));
                        break;
                    }
                    Step::Frame(Some(Ok(_))) => {}
                    Step::Frame(Some(Err(e))) => {
                        yield Err(realtime_error(e));
                        break;
                    }
                }
            }
        };

        Ok(stream.boxed())
    }
}

fn join_frame(topic: &str, table: &str, access_token: &str) -> Value {
    json!({
        "topic": topic,
        "event": "phx_join",
        "payload": {
            "config": {
                "broadcast": { "ack": false, "self": false },
                "presence": { "key": "" },
                "postgres_changes": [
                    { "event": "INSERT", "schema": "public", "table": table }
                ],
                "private": false
            },
            "access_token": access_token
        },
        "ref": "1",
        "join_ref": "1"
    })
}

fn heartbeat_frame(reference: u64) -> Value {
    json!({
        "topic": "phoenix",
        "event": "heartbeat",
        "payload": {},
        "ref": reference.to_string()
    })
}

/// Inserted row carried by a frame, if any. Refused joins and channel errors
/// become errors; everything else is ignored.
fn parse_frame(topic: &str, text: &str) -> Result<Option<Row>, BackendError> {
    let frame: Value = serde_json::from_str(text)?;
    if frame.get("topic").and_then(Value::as_str) != Some(topic) {
        return Ok(None);
    }

    let payload = frame.get("payload").cloned().unwrap_or(Value::Null);
    match frame.get("event").and_then(Value::as_str) {
        Some("postgres_changes") => {
            let data = &payload["data"];
            if data["type"].as_str() != Some("INSERT") {
                return Ok(None);
            }
            Ok(data.get("record").cloned())
        }
        Some("phx_reply") if payload["status"].as_str() == Some("error") => Err(realtime_error(
            format!("join refused: {}", payload["response"]),
        )),
        Some("system") if payload["status"].as_str() == Some("error") => Err(realtime_error(
            payload["message"].as_str().unwrap_or("channel error"),
        )),
        Some("phx_error" | "phx_close") => Err(realtime_error("channel closed by server")),
        _ => Ok(None),
    }
}
