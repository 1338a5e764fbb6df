//! Per-connection WebSocket handling
//!
//! Each socket is split in two. A writer task drains the connection's
//! outbound queue into the socket while the reader loop normalizes inbound
//! frames and hands them to the relay. Closing either side ends the
//! connection; the relay then drops the outbound queue, which stops the
//! writer.

use std::net::SocketAddr;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::protocol::{ClientMessage, ProtocolError, ServerEvent};
use crate::registry::ConnectionId;
use crate::server::relay::RelayHandle;

/// Drive one WebSocket until it closes
pub(crate) async fn serve_socket(socket: WebSocket, peer: SocketAddr, relay: RelayHandle) {
    let connection = ConnectionId::generate();
    let (mut sink, mut stream) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<ServerEvent>();

    if let Err(e) = relay.connect(connection.clone(), outbound_tx) {
        tracing::error!(peer = %peer, error = %e, "Could not attach connection to relay");
        return;
    }

    tracing::info!(connection = %connection, peer = %peer, "Client connected");

    let writer_id = connection.clone();
    let writer = tokio::spawn(async move {
        while let Some(event) = outbound_rx.recv().await {
            let text = match event.to_json() {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(
                        connection = %writer_id,
                        event = event.event_name(),
                        error = %e,
                        "Failed to encode event"
                    );
                    continue;
                }
            };

            if let Err(e) = sink.send(Message::Text(text)).await {
                tracing::debug!(connection = %writer_id, error = %e, "Socket write failed");
                break;
            }
        }

        let _ = sink.close().await;
    });

    while let Some(frame) = stream.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(_)) => {
                tracing::debug!(connection = %connection, "Ignoring binary frame");
                continue;
            }
            Ok(Message::Close(_)) => break,
            // Ping and pong are answered by the socket itself
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(connection = %connection, error = %e, "Socket read failed");
                break;
            }
        };

        match decode(&text) {
            Ok(message) => {
                if relay.message(connection.clone(), message).is_err() {
                    tracing::warn!(connection = %connection, "Relay gone, closing connection");
                    break;
                }
            }
            Err(Error::Protocol(ProtocolError::UnknownEvent(event))) => {
                tracing::debug!(connection = %connection, event = %event, "Ignoring unknown event");
            }
            Err(Error::Protocol(ProtocolError::Json(e))) => {
                tracing::debug!(connection = %connection, error = %e, "Ignoring non-envelope frame");
            }
            Err(e) => {
                tracing::warn!(connection = %connection, error = %e, "Dropping malformed message");
            }
        }
    }

    let _ = relay.disconnect(connection.clone());

    if let Err(e) = writer.await {
        tracing::error!(connection = %connection, error = %e, "Writer task failed");
    }

    tracing::info!(connection = %connection, peer = %peer, "Client disconnected");
}

fn decode(text: &str) -> Result<ClientMessage> {
    Ok(ClientMessage::parse(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_maps_protocol_errors() {
        assert!(matches!(
            decode(r#"{"event":"list-broadcasters"}"#),
            Ok(ClientMessage::ListBroadcasters)
        ));
        assert!(matches!(
            decode(r#"{"event":"dance"}"#),
            Err(Error::Protocol(ProtocolError::UnknownEvent(_)))
        ));
        assert!(matches!(
            decode("not json"),
            Err(Error::Protocol(ProtocolError::Json(_)))
        ));
    }
}
