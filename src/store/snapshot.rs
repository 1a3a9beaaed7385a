//! JSON snapshot of the record store on local disk.
//!
//! The file holds the raw join rows exactly as the hosted API returns them:
//! `{"manifests": [...], "tickets": [...], "vessels": [...]}`.

use super::rows::{resolve_manifests, resolve_tickets, ManifestRow, TicketRow, VesselRow};
use super::{RecordKind, RecordStore, Result, StoreError};
use crate::models::{LandfillTicketRecord, ManifestRecord, VesselRecord};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Contents of a snapshot file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub manifests: Vec<ManifestRow>,
    #[serde(default)]
    pub tickets: Vec<TicketRow>,
    #[serde(default)]
    pub vessels: Vec<VesselRow>,
}

/// Record store backed by a snapshot file.
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<Snapshot> {
        debug!("Reading snapshot {}", self.path.display());
        let content = tokio::fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Sibling file a new snapshot is written to before it replaces the old one.
    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    async fn write(&self, snapshot: &Snapshot) -> Result<()> {
        let content = serde_json::to_string_pretty(snapshot)?;
        let staging = self.staging_path();
        tokio::fs::write(&staging, content).await?;
        tokio::fs::rename(&staging, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for SnapshotStore {
    async fn manifests(&self) -> Result<Vec<ManifestRecord>> {
        let snapshot = self.read().await?;
        Ok(resolve_manifests(snapshot.manifests))
    }

    async fn tickets(&self) -> Result<Vec<LandfillTicketRecord>> {
        let snapshot = self.read().await?;
        Ok(resolve_tickets(snapshot.tickets))
    }

    async fn vessels(&self) -> Result<Vec<VesselRecord>> {
        let snapshot = self.read().await?;
        Ok(snapshot.vessels.into_iter().map(VesselRow::resolve).collect())
    }

    async fn save_ticket(&self, ticket: &LandfillTicketRecord) -> Result<()> {
        let mut snapshot = self.read().await?;
        let row = snapshot
            .tickets
            .iter_mut()
            .find(|row| row.id == ticket.id)
            .ok_or_else(|| StoreError::NotFound {
                kind: RecordKind::Ticket,
                id: ticket.id.clone(),
            })?;
        row.apply(ticket);
        self.write(&snapshot).await?;
        info!("Saved ticket {} ({})", ticket.id, ticket.status);
        Ok(())
    }

    async fn set_document_url(&self, kind: RecordKind, id: &str, url: &str) -> Result<()> {
        let mut snapshot = self.read().await?;
        let slot = match kind {
            RecordKind::Manifest => snapshot
                .manifests
                .iter_mut()
                .find(|row| row.id == id)
                .map(|row| &mut row.document_url),
            RecordKind::Ticket => snapshot
                .tickets
                .iter_mut()
                .find(|row| row.id == id)
                .map(|row| &mut row.document_url),
        };
        let slot = slot.ok_or_else(|| StoreError::NotFound {
            kind,
            id: id.to_string(),
        })?;
        *slot = Some(url.to_string());
        self.write(&snapshot).await
    }
}
