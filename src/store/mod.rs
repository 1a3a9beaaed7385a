//! Access to the hosted record store and object storage.
//!
//! Records are only ever read as snapshots; the single write paths are the
//! ticket workflow columns and the URL of a generated document.

pub mod rest;
pub mod rows;
pub mod snapshot;
pub mod storage;

use crate::models::{LandfillTicketRecord, ManifestRecord, VesselRecord};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

pub use rest::{RestObjectStorage, RestStore};
pub use snapshot::SnapshotStore;
pub use storage::{LocalDirStorage, ObjectStorage};

/// Errors raised while reading from or writing to the record store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed store data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Store API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("{kind} not found: {id}")]
    NotFound { kind: RecordKind, id: String },
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Record kinds that can carry a generated document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Manifest,
    Ticket,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Manifest => write!(f, "Manifest"),
            RecordKind::Ticket => write!(f, "Landfill ticket"),
        }
    }
}

/// Read models and the few write paths the document workflow needs.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn manifests(&self) -> Result<Vec<ManifestRecord>>;

    async fn tickets(&self) -> Result<Vec<LandfillTicketRecord>>;

    async fn vessels(&self) -> Result<Vec<VesselRecord>>;

    async fn manifest(&self, id: &str) -> Result<ManifestRecord> {
        self.manifests()
            .await?
            .into_iter()
            .find(|m| m.id == id)
            .ok_or_else(|| StoreError::NotFound {
                kind: RecordKind::Manifest,
                id: id.to_string(),
            })
    }

    async fn ticket(&self, id: &str) -> Result<LandfillTicketRecord> {
        self.tickets()
            .await?
            .into_iter()
            .find(|t| t.id == id)
            .ok_or_else(|| StoreError::NotFound {
                kind: RecordKind::Ticket,
                id: id.to_string(),
            })
    }

    /// Persist the workflow columns (exit weight/time, status, observations).
    async fn save_ticket(&self, ticket: &LandfillTicketRecord) -> Result<()>;

    /// Attach a generated document's URL to its source record.
    async fn set_document_url(&self, kind: RecordKind, id: &str, url: &str) -> Result<()>;
}
