//! WebSocket session tests against a live listener.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use filedrop_server::{web_api, AppConfig, AppState};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tower::ServiceExt;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const BOUNDARY: &str = "----filedrop-ws-boundary";
const WAIT: Duration = Duration::from_secs(5);

fn test_state() -> AppState {
    AppState::new(AppConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        max_file_size: 1024,
        static_dir: PathBuf::from("./"),
        ws_client_buffer: 16,
    })
}

async fn spawn_server(state: &AppState) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let app = web_api::create_router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    addr
}

async fn connect(addr: SocketAddr) -> Client {
    let (ws, _) = connect_async(format!("ws://{}/ws", addr))
        .await
        .expect("websocket handshake");
    ws
}

async fn next_text(ws: &mut Client) -> String {
    loop {
        let frame = tokio::time::timeout(WAIT, ws.next())
            .await
            .expect("frame before timeout")
            .expect("stream open")
            .expect("frame");
        match frame {
            Message::Text(text) => return text,
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {:?}", other),
        }
    }
}

async fn wait_for_connections(state: &AppState, expected: usize) {
    tokio::time::timeout(WAIT, async {
        while state.realtime.connection_count().await != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("connection count settles");
}

async fn upload(state: &AppState, filename: &str, content: &[u8]) -> StatusCode {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n\r\n",
            filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    let request = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .expect("request");

    web_api::create_router(state.clone())
        .oneshot(request)
        .await
        .expect("response")
        .status()
}

#[tokio::test]
async fn session_acks_pushes_uploads_and_deregisters_on_close() {
    let state = test_state();
    let addr = spawn_server(&state).await;

    let mut ws = connect(addr).await;
    assert_eq!(next_text(&mut ws).await, r#"{"type":"connected"}"#);
    assert_eq!(state.realtime.connection_count().await, 1);

    assert_eq!(upload(&state, "clip.ogg", b"OggS").await, StatusCode::OK);
    assert_eq!(
        next_text(&mut ws).await,
        r#"{"type":"new_message","filename":"clip.ogg","id":1}"#
    );

    ws.close(None).await.expect("close");
    while let Ok(Some(Ok(_))) = tokio::time::timeout(WAIT, ws.next()).await {}

    wait_for_connections(&state, 0).await;
}

#[tokio::test]
async fn every_session_receives_each_upload() {
    let state = test_state();
    let addr = spawn_server(&state).await;

    let mut first = connect(addr).await;
    let mut second = connect(addr).await;
    assert_eq!(next_text(&mut first).await, r#"{"type":"connected"}"#);
    assert_eq!(next_text(&mut second).await, r#"{"type":"connected"}"#);

    assert_eq!(upload(&state, "a.txt", b"one").await, StatusCode::OK);
    assert_eq!(upload(&state, "b.txt", b"two").await, StatusCode::OK);

    for ws in [&mut first, &mut second] {
        assert_eq!(
            next_text(ws).await,
            r#"{"type":"new_message","filename":"a.txt","id":1}"#
        );
        assert_eq!(
            next_text(ws).await,
            r#"{"type":"new_message","filename":"b.txt","id":2}"#
        );
    }
}

#[tokio::test]
async fn dropped_connection_is_deregistered() {
    let state = test_state();
    let addr = spawn_server(&state).await;

    let mut ws = connect(addr).await;
    assert_eq!(next_text(&mut ws).await, r#"{"type":"connected"}"#);
    wait_for_connections(&state, 1).await;

    // No close frame; the server sees a read error or EOF
    drop(ws);

    wait_for_connections(&state, 0).await;
}
