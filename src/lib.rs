//! filedrop-server Library
//!
//! In-memory file drop with live upload notifications.
//!
//! ## Architecture (4 Components)
//!
//! 1. ArtifactStore - SSoT for uploaded files (process memory only)
//! 2. RealtimeHub - WebSocket client registry and fan-out
//! 3. IngressCoordinator - Screen, store, then notify
//! 4. WebAPI - HTTP/WebSocket endpoints
//!
//! ## Design Principles
//!
//! - SSoT: ArtifactStore is the single source of truth for uploads
//! - Each shared collection is owned by exactly one component
//! - A file is retrievable before anyone is told about it

pub mod artifact_store;
pub mod error;
pub mod formats;
pub mod ingress_coordinator;
pub mod models;
pub mod realtime_hub;
pub mod state;
pub mod web_api;

pub use error::{Error, Result};
pub use state::{AppConfig, AppState};
