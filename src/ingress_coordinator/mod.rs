//! IngressCoordinator - Upload Orchestration
//!
//! ## Responsibilities
//!
//! - Screen each upload against the accepted formats and size ceiling
//! - Store accepted files in the ArtifactStore
//! - Notify WebSocket clients through the RealtimeHub
//!
//! A file is always retrievable before its notification goes out. An
//! `UploadBatch` processes files in the order they are fed to it; the caller
//! stops at the first error and files stored before it stay stored.

use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;

use crate::artifact_store::{ArtifactMeta, ArtifactStore};
use crate::error::{Error, Result};
use crate::formats;
use crate::realtime_hub::{HubMessage, RealtimeHub};

/// One uploaded file as received from the client
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub filename: String,
    pub content: Bytes,
    pub declared_content_type: Option<String>,
}

impl IncomingFile {
    pub fn new(filename: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
            declared_content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.declared_content_type = Some(content_type.into());
        self
    }
}

/// Upload response body
#[derive(Debug, Clone, Default, Serialize)]
pub struct UploadReport {
    pub success: bool,
    pub uploaded: Vec<ArtifactMeta>,
    /// Filenames dropped for an unsupported extension
    pub skipped: Vec<String>,
}

/// IngressCoordinator instance
pub struct IngressCoordinator {
    store: Arc<ArtifactStore>,
    hub: Arc<RealtimeHub>,
    max_file_size: u64,
}

impl IngressCoordinator {
    /// Create new IngressCoordinator
    pub fn new(store: Arc<ArtifactStore>, hub: Arc<RealtimeHub>, max_file_size: u64) -> Self {
        Self {
            store,
            hub,
            max_file_size,
        }
    }

    /// Per-file size ceiling in bytes
    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Fail with `PayloadTooLarge` when `size` is over the ceiling
    pub fn check_size(&self, filename: &str, size: u64) -> Result<()> {
        if size > self.max_file_size {
            return Err(Error::PayloadTooLarge {
                filename: filename.to_string(),
                limit: self.max_file_size,
            });
        }
        Ok(())
    }

    /// Start collecting one upload request
    pub fn begin_upload(&self) -> UploadBatch<'_> {
        UploadBatch {
            coordinator: self,
            report: UploadReport {
                success: true,
                ..Default::default()
            },
            saw_file: false,
        }
    }

    /// Store one screened file and announce it
    async fn store_and_notify(&self, file: IncomingFile) -> Result<ArtifactMeta> {
        self.check_size(&file.filename, file.content.len() as u64)?;

        let artifact = self
            .store
            .insert(
                file.filename,
                file.content,
                file.declared_content_type.as_deref(),
            )
            .await;

        // insert has returned, so the artifact is already visible to readers
        self.hub
            .broadcast(HubMessage::NewMessage {
                filename: artifact.filename.clone(),
                id: artifact.id,
            })
            .await;

        Ok(artifact.meta())
    }
}

/// Files of a single upload request, in arrival order
pub struct UploadBatch<'a> {
    coordinator: &'a IngressCoordinator,
    report: UploadReport,
    saw_file: bool,
}

impl UploadBatch<'_> {
    /// Announce the next file by name
    ///
    /// Returns `false` when the extension is unsupported; the file is then
    /// recorded as skipped and its content should not be read.
    pub fn admit(&mut self, filename: &str) -> bool {
        self.saw_file = true;
        if formats::is_accepted(filename) {
            return true;
        }
        tracing::debug!(filename = %filename, "Skipping unsupported file");
        self.report.skipped.push(filename.to_string());
        false
    }

    /// Store an admitted file and notify clients
    pub async fn store(&mut self, file: IncomingFile) -> Result<()> {
        let meta = self.coordinator.store_and_notify(file).await?;
        self.report.uploaded.push(meta);
        Ok(())
    }

    /// Close the batch; an upload without any file is rejected
    pub fn finish(self) -> Result<UploadReport> {
        if !self.saw_file {
            return Err(Error::Validation("no file provided".to_string()));
        }
        Ok(self.report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn push(batch: &mut UploadBatch<'_>, file: IncomingFile) -> Result<()> {
        if batch.admit(&file.filename) {
            batch.store(file).await?;
        }
        Ok(())
    }

    fn coordinator(max_file_size: u64) -> (IngressCoordinator, Arc<ArtifactStore>, Arc<RealtimeHub>) {
        let store = Arc::new(ArtifactStore::new());
        let hub = Arc::new(RealtimeHub::new());
        (
            IngressCoordinator::new(store.clone(), hub.clone(), max_file_size),
            store,
            hub,
        )
    }

    #[tokio::test]
    async fn test_store_then_notify() {
        let (coordinator, store, hub) = coordinator(1024);
        let (_id, mut rx) = hub.register().await;

        let mut batch = coordinator.begin_upload();
        push(&mut batch, IncomingFile::new("song.mp3", &b"ID3data"[..]))
            .await
            .unwrap();
        let report = batch.finish().unwrap();

        assert_eq!(report.uploaded.len(), 1);
        assert_eq!(report.uploaded[0].id, 1);
        assert_eq!(report.uploaded[0].size, 7);

        let stored = store.get(1).await.unwrap();
        assert_eq!(stored.content_type, "audio/mpeg");

        assert_eq!(rx.recv().await.unwrap(), r#"{"type":"connected"}"#);
        assert_eq!(
            rx.recv().await.unwrap(),
            r#"{"type":"new_message","filename":"song.mp3","id":1}"#
        );
    }

    #[tokio::test]
    async fn test_unsupported_extension_skipped() {
        let (coordinator, store, _hub) = coordinator(1024);

        let mut batch = coordinator.begin_upload();
        push(&mut batch, IncomingFile::new("notes.xyz", &b"hello"[..])).await.unwrap();
        push(&mut batch, IncomingFile::new("notes.txt", &b"hello"[..])).await.unwrap();
        let report = batch.finish().unwrap();

        assert!(report.success);
        assert_eq!(report.uploaded.len(), 1);
        assert_eq!(report.uploaded[0].filename, "notes.txt");
        assert_eq!(report.skipped, vec!["notes.xyz".to_string()]);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_admit_does_not_store() {
        let (coordinator, store, _hub) = coordinator(1024);

        let mut batch = coordinator.begin_upload();
        assert!(batch.admit("clip.ogg"));
        assert!(!batch.admit("run.exe"));

        assert!(store.is_empty().await);
        assert_eq!(batch.finish().unwrap().skipped, vec!["run.exe".to_string()]);
    }

    #[tokio::test]
    async fn test_oversize_rejected_without_store_or_broadcast() {
        let (coordinator, store, hub) = coordinator(4);
        let (_id, mut rx) = hub.register().await;
        rx.recv().await.unwrap(); // connected

        let mut batch = coordinator.begin_upload();
        let err = push(&mut batch, IncomingFile::new("big.txt", &b"12345"[..]))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::PayloadTooLarge { ref filename, limit: 4 } if filename == "big.txt"));
        assert!(store.is_empty().await);
        assert!(rx.try_recv().is_err());

        // exactly at the ceiling is fine
        push(&mut batch, IncomingFile::new("fits.txt", &b"1234"[..]))
            .await
            .unwrap();
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_failure_keeps_earlier_files() {
        let (coordinator, store, _hub) = coordinator(4);

        let mut batch = coordinator.begin_upload();
        push(&mut batch, IncomingFile::new("a.txt", &b"ok"[..])).await.unwrap();
        let err = push(&mut batch, IncomingFile::new("b.txt", &b"too big"[..]))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::PayloadTooLarge { ref filename, .. } if filename == "b.txt"));
        let names: Vec<_> = store.list().await.into_iter().map(|m| m.filename).collect();
        assert_eq!(names, vec!["a.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_batch_rejected() {
        let (coordinator, _store, _hub) = coordinator(4);

        let err = coordinator.begin_upload().finish().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_declared_content_type_kept() {
        let (coordinator, store, _hub) = coordinator(1024);

        let mut batch = coordinator.begin_upload();
        push(&mut batch, IncomingFile::new("voice.webm", &b"\x1a\x45"[..]).with_content_type("video/webm"))
            .await
            .unwrap();

        assert_eq!(store.get(1).await.unwrap().content_type, "video/webm");
    }
}
