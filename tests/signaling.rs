//! End-to-end signaling over real WebSockets

use std::net::SocketAddr;
use std::time::Duration;

use atmos_relay::{ServerConfig, SignalServer};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_server() -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = SignalServer::new(ServerConfig::with_addr(addr));

    let task = tokio::spawn(async move {
        server
            .serve(listener, std::future::pending())
            .await
            .unwrap();
    });

    (addr, task)
}

async fn connect(addr: SocketAddr) -> Client {
    let (ws, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
    ws
}

async fn send(ws: &mut Client, event: &str, data: Value) {
    let frame = json!({ "event": event, "data": data }).to_string();
    ws.send(Message::Text(frame)).await.unwrap();
}

/// Next envelope, skipping control frames
async fn recv(ws: &mut Client) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for an event")
            .expect("socket closed")
            .unwrap();
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

/// Asserts nothing arrives within a short window
async fn assert_silent(ws: &mut Client) {
    let next = tokio::time::timeout(Duration::from_millis(200), ws.next()).await;
    assert!(next.is_err(), "unexpected frame: {next:?}");
}

async fn http_get(addr: SocketAddr, path: &str) -> (u16, Value) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();

    let status = raw[9..12].parse().unwrap();
    let body = raw.split("\r\n\r\n").nth(1).unwrap_or_default();
    (status, serde_json::from_str(body).unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_offer_answer_exchange() {
    let (addr, server) = start_server().await;

    let mut broadcaster = connect(addr).await;
    send(
        &mut broadcaster,
        "register-broadcaster",
        json!({ "id": "A1", "name": "Cam1" }),
    )
    .await;
    assert_eq!(
        recv(&mut broadcaster).await,
        json!({ "event": "monitor-number", "data": { "broadcasterId": "A1", "number": 1 } })
    );

    let mut viewer = connect(addr).await;
    send(&mut viewer, "list-broadcasters", Value::Null).await;
    assert_eq!(
        recv(&mut viewer).await,
        json!({
            "event": "broadcaster-list",
            "data": [{ "id": "A1", "name": "Cam1", "monitorNumber": 1 }]
        })
    );

    send(
        &mut viewer,
        "connect-to-broadcaster",
        json!({ "broadcasterId": "A1" }),
    )
    .await;
    let request = recv(&mut broadcaster).await;
    assert_eq!(request["event"], "viewer-requested-connection");
    let viewer_id = request["data"]["viewerId"].as_str().unwrap().to_string();
    assert_eq!(viewer_id.len(), 32);

    let offer_sdp = json!({ "type": "offer", "sdp": "v=0 offer" });
    send(
        &mut broadcaster,
        "offer",
        json!({ "sdp": offer_sdp, "targetViewerId": viewer_id }),
    )
    .await;
    assert_eq!(
        recv(&mut viewer).await,
        json!({ "event": "offer", "data": { "sdp": offer_sdp, "broadcasterId": "A1" } })
    );

    let answer_sdp = json!({ "type": "answer", "sdp": "v=0 answer" });
    send(
        &mut viewer,
        "answer",
        json!({ "sdp": answer_sdp, "targetBroadcasterId": "A1" }),
    )
    .await;
    assert_eq!(
        recv(&mut broadcaster).await,
        json!({ "event": "answer", "data": { "sdp": answer_sdp, "viewerId": viewer_id } })
    );

    send(
        &mut viewer,
        "ice-candidate",
        json!({ "candidate": { "candidate": "udp 1" }, "targetBroadcasterId": "A1" }),
    )
    .await;
    assert_eq!(
        recv(&mut broadcaster).await,
        json!({
            "event": "ice-candidate",
            "data": { "candidate": { "candidate": "udp 1" }, "viewerId": viewer_id }
        })
    );

    server.abort();
}

#[tokio::test]
async fn test_forwarding_is_targeted() {
    let (addr, server) = start_server().await;

    let mut broadcaster = connect(addr).await;
    send(&mut broadcaster, "register-broadcaster", json!({ "id": "A1" })).await;
    recv(&mut broadcaster).await;

    let mut viewers = Vec::new();
    for _ in 0..3 {
        let mut viewer = connect(addr).await;
        send(&mut viewer, "connect-to-broadcaster", json!("A1")).await;
        let request = recv(&mut broadcaster).await;
        let id = request["data"]["viewerId"].as_str().unwrap().to_string();
        viewers.push((viewer, id));
    }

    let target = viewers[1].1.clone();
    send(
        &mut broadcaster,
        "offer",
        json!({ "sdp": "v=0", "targetViewerId": target }),
    )
    .await;

    let offer = recv(&mut viewers[1].0).await;
    assert_eq!(offer["event"], "offer");
    assert_eq!(offer["data"]["sdp"], "v=0");
    assert_silent(&mut viewers[0].0).await;
    assert_silent(&mut viewers[2].0).await;

    // Unknown target: nobody hears about it
    send(
        &mut viewers[0].0,
        "answer",
        json!({ "sdp": "v=0", "targetBroadcasterId": "ghost" }),
    )
    .await;
    assert_silent(&mut broadcaster).await;

    server.abort();
}

#[tokio::test]
async fn test_disconnect_and_revival() {
    let (addr, server) = start_server().await;

    let mut viewer = connect(addr).await;
    let mut broadcaster = connect(addr).await;
    send(&mut broadcaster, "register-broadcaster", json!({ "id": "A1" })).await;
    recv(&mut broadcaster).await;
    assert_eq!(
        recv(&mut viewer).await,
        json!({
            "event": "broadcaster-joined",
            "data": { "id": "A1", "name": "Monitor 1", "monitorNumber": 1 }
        })
    );

    broadcaster.close(None).await.unwrap();
    assert_eq!(
        recv(&mut viewer).await,
        json!({ "event": "broadcaster-disconnected", "data": "A1" })
    );
    assert_silent(&mut viewer).await;

    let mut broadcaster = connect(addr).await;
    send(&mut broadcaster, "register-broadcaster", json!({ "id": "A1" })).await;
    assert_eq!(
        recv(&mut broadcaster).await,
        json!({ "event": "monitor-number", "data": { "broadcasterId": "A1", "number": 1 } })
    );

    server.abort();
}

#[tokio::test]
async fn test_malformed_frames_keep_connection_open() {
    let (addr, server) = start_server().await;

    let mut client = connect(addr).await;
    client.send(Message::Text("not json".into())).await.unwrap();
    client
        .send(Message::Text(r#"{"event":"dance"}"#.into()))
        .await
        .unwrap();
    send(&mut client, "offer", json!({ "sdp": "v=0" })).await;
    client.send(Message::Binary(vec![1, 2, 3])).await.unwrap();

    send(&mut client, "viewer-connect", Value::Null).await;
    assert_eq!(
        recv(&mut client).await,
        json!({ "event": "broadcaster-list", "data": [] })
    );

    server.abort();
}

#[tokio::test]
async fn test_status_endpoints() {
    let (addr, server) = start_server().await;

    let mut broadcaster = connect(addr).await;
    send(&mut broadcaster, "register-broadcaster", json!({ "id": "A1" })).await;
    recv(&mut broadcaster).await;

    let (status, health) = http_get(addr, "/health").await;
    assert_eq!(status, 200);
    assert_eq!(health["status"], "ok");

    let (status, info) = http_get(addr, "/api/server-info").await;
    assert_eq!(status, 200);
    assert_eq!(info["status"], "online");
    assert_eq!(info["broadcasters"], 1);

    let (status, debug) = http_get(addr, "/api/debug").await;
    assert_eq!(status, 200);
    assert_eq!(debug["broadcasters"]["count"], 1);
    assert_eq!(debug["broadcasters"]["active"][0]["id"], "A1");
    assert_eq!(debug["broadcasters"]["active"][0]["connected"], true);
    assert_eq!(debug["connections"], 1);

    server.abort();
}
