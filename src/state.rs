//! Application state
//!
//! Holds all shared components and configuration

use crate::artifact_store::ArtifactStore;
use crate::formats::{DEFAULT_MAX_FILE_SIZE, ONE_MB};
use crate::ingress_coordinator::IngressCoordinator;
use crate::realtime_hub::{RealtimeHub, DEFAULT_CLIENT_BUFFER};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Per-file size ceiling in bytes
    pub max_file_size: u64,
    /// Directory served for non-API GET requests
    pub static_dir: PathBuf,
    /// Per WebSocket client queue length
    pub ws_client_buffer: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            max_file_size: max_file_size_from_mb(
                std::env::var("MAX_FILE_SIZE_MB").ok().as_deref(),
            ),
            static_dir: std::env::var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./")),
            ws_client_buffer: std::env::var("WS_CLIENT_BUFFER")
                .ok()
                .and_then(|n| n.parse().ok())
                .unwrap_or(DEFAULT_CLIENT_BUFFER),
        }
    }
}

/// Ceiling in bytes from a megabyte count; unparsable or overflowing values
/// fall back to the default
fn max_file_size_from_mb(raw: Option<&str>) -> u64 {
    raw.and_then(|mb| mb.trim().parse::<u64>().ok())
        .and_then(|mb| mb.checked_mul(ONE_MB))
        .unwrap_or(DEFAULT_MAX_FILE_SIZE)
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: AppConfig,
    /// ArtifactStore (SSoT for uploads)
    pub store: Arc<ArtifactStore>,
    /// RealtimeHub (WebSocket)
    pub realtime: Arc<RealtimeHub>,
    /// IngressCoordinator (upload path)
    pub ingress: Arc<IngressCoordinator>,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    /// Wire up all components from config
    pub fn new(config: AppConfig) -> Self {
        let store = Arc::new(ArtifactStore::new());
        let realtime = Arc::new(RealtimeHub::with_client_buffer(config.ws_client_buffer));
        let ingress = Arc::new(IngressCoordinator::new(
            store.clone(),
            realtime.clone(),
            config.max_file_size,
        ));

        Self {
            config,
            store,
            realtime,
            ingress,
            started_at: Instant::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_file_size_from_mb() {
        assert_eq!(max_file_size_from_mb(Some("5")), 5 * ONE_MB);
        assert_eq!(max_file_size_from_mb(None), DEFAULT_MAX_FILE_SIZE);
        assert_eq!(max_file_size_from_mb(Some("lots")), DEFAULT_MAX_FILE_SIZE);
        assert_eq!(
            max_file_size_from_mb(Some(&u64::MAX.to_string())),
            DEFAULT_MAX_FILE_SIZE
        );
    }

    #[test]
    fn test_components_share_store_and_hub() {
        let config = AppConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            max_file_size: 10,
            static_dir: PathBuf::from("./"),
            ws_client_buffer: 8,
        };
        let state = AppState::new(config);

        assert_eq!(state.ingress.max_file_size(), 10);
        assert_eq!(Arc::strong_count(&state.store), 2);
        assert_eq!(Arc::strong_count(&state.realtime), 2);
    }
}
