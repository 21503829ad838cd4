//! API Routes

use axum::{
    extract::{
        multipart::{Field, MultipartRejection},
        ws::{Message, WebSocket, WebSocketUpgrade},
        DefaultBodyLimit, Multipart, Path, State,
    },
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::{Bytes, BytesMut};
use futures::{SinkExt, StreamExt};

use crate::artifact_store::ArtifactMeta;
use crate::error::{Error, Result};
use crate::formats::{self, MULTIPART_OVERHEAD};
use crate::ingress_coordinator::{IncomingFile, UploadReport};
use crate::state::AppState;

/// Multipart field carrying uploads
const FILE_FIELD: &str = "file";

/// Placeholder name when the body fails before any file part is seen
const UNNAMED_PART: &str = "request body";

/// Create API router
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.config.max_file_size.saturating_add(MULTIPART_OVERHEAD);
    let body_limit = usize::try_from(body_limit).unwrap_or(usize::MAX);

    let uploads = Router::new()
        .route("/upload", post(upload))
        .route("/record", post(upload))
        .layer(DefaultBodyLimit::max(body_limit));

    Router::new()
        .merge(uploads)
        // Health
        .route("/healthz", get(super::health_check))
        // Messages
        .route("/messages", get(list_messages))
        .route("/message/:id", get(get_message))
        .route("/formats", get(super::formats))
        // WebSocket
        .route("/ws", get(websocket_handler))
        .with_state(state)
}

// ========================================
// Upload Handlers
// ========================================

/// POST /upload and POST /record
async fn upload(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadReport>> {
    let mut multipart =
        multipart.map_err(|e| Error::Multipart(format!("parse multipart form: {}", e.body_text())))?;

    let limit = state.ingress.max_file_size();
    let mut batch = state.ingress.begin_upload();
    // Blamed when the body limit trips between parts
    let mut last_filename = UNNAMED_PART.to_string();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::from_multipart(e, &last_filename, limit))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        last_filename.clone_from(&filename);
        if !batch.admit(&filename) {
            continue;
        }

        let declared_content_type = field.content_type().map(str::to_string);
        let content = read_field(field, &filename, &state, limit).await?;

        batch
            .store(IncomingFile {
                filename,
                content,
                declared_content_type,
            })
            .await?;
    }

    Ok(Json(batch.finish()?))
}

/// Read one multipart field, aborting once it grows past the ceiling
async fn read_field(
    mut field: Field<'_>,
    filename: &str,
    state: &AppState,
    limit: u64,
) -> Result<Bytes> {
    let mut buf = BytesMut::new();

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| Error::from_multipart(e, filename, limit))?
    {
        state
            .ingress
            .check_size(filename, (buf.len() + chunk.len()) as u64)?;
        buf.extend_from_slice(&chunk);
    }

    Ok(buf.freeze())
}

// ========================================
// Message Handlers
// ========================================

/// GET /messages
async fn list_messages(State(state): State<AppState>) -> Json<Vec<ArtifactMeta>> {
    Json(state.store.list().await)
}

/// GET /message/:id
async fn get_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    let id: i64 = id
        .parse()
        .map_err(|_| Error::Validation("invalid message_id".to_string()))?;

    // Negative ids are well-formed but can never match
    let artifact = match u64::try_from(id) {
        Ok(id) => state.store.get(id).await,
        Err(_) => None,
    }
    .ok_or_else(|| Error::NotFound("message not found".to_string()))?;

    let headers = [
        (header::CONTENT_TYPE, artifact.content_type.clone()),
        (
            header::CONTENT_DISPOSITION,
            formats::content_disposition(&artifact.filename),
        ),
        (header::CONTENT_LENGTH, artifact.size.to_string()),
    ];

    Ok((headers, artifact.content).into_response())
}

// ========================================
// WebSocket Handler
// ========================================

/// WebSocket upgrade handler
async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Handle WebSocket connection
async fn handle_websocket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    // Register with RealtimeHub; the connected ack is already queued
    let (conn_id, mut rx) = state.realtime.register().await;

    // Forward hub messages to the socket. Ends when the hub drops us or the
    // socket write fails.
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = sender.send(Message::Text(msg)).await {
                tracing::debug!(connection_id = %conn_id, error = %e, "WebSocket send failed");
                break;
            }
        }
        let _ = sender.close().await;
    });

    // Inbound frames carry no meaning; the loop only watches for close
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) => break,
                Ok(Message::Ping(data)) => {
                    // Pong is handled automatically by axum
                    tracing::trace!("Received ping: {:?}", data);
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(connection_id = %conn_id, error = %e, "WebSocket error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.realtime.unregister(&conn_id).await;
}
