//! Shared response models
//!
//! Types returned by more than one handler, kept here to avoid circular
//! dependencies between web_api and the components.

use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_sec: u64,
    pub artifact_count: usize,
    pub stored_bytes: u64,
    pub ws_clients: usize,
}

/// Upload capability descriptor (GET /formats)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatsResponse {
    pub formats: Vec<String>,
    pub max_size_bytes: u64,
    pub max_size_mb: u64,
}
