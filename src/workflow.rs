//! Document publishing workflows.
//!
//! Completing a landfill ticket commits the status change first and then
//! generates, uploads and links its document on a best-effort basis: a
//! failure after the commit is logged and reported, never rolled back.

use crate::config::StorageConfig;
use crate::document::{
    compose_manifest, compose_ticket, AssetLoader, ComposedDocument, DocumentContext,
    ImageSource, ManifestSignatures, PDF_CONTENT_TYPE,
};
use crate::models::{LandfillTicketRecord, ManifestRecord, TicketStatus};
use crate::store::{ObjectStorage, RecordKind, RecordStore, StoreError};
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Ticket {id} is {status}, only tickets in process can be completed")]
    NotInProcess { id: String, status: TicketStatus },

    #[error("Invalid exit weight: {0}")]
    InvalidExitWeight(f64),
}

/// Result of completing a ticket.
#[derive(Debug, Clone)]
pub struct CompletionOutcome {
    /// The ticket as committed to the store.
    pub ticket: LandfillTicketRecord,
    pub document_url: Option<String>,
    /// Why the document could not be published, if it wasn't.
    pub document_error: Option<String>,
}

/// A document uploaded and linked to its record.
#[derive(Debug, Clone)]
pub struct PublishedDocument {
    pub url: String,
    pub document: ComposedDocument,
}

/// Everything the publishing workflows touch, borrowed for one command.
pub struct Publisher<'a> {
    pub store: &'a dyn RecordStore,
    pub storage: &'a dyn ObjectStorage,
    pub loader: &'a AssetLoader,
    pub ctx: &'a DocumentContext,
    pub paths: &'a StorageConfig,
}

impl<'a> Publisher<'a> {
    async fn publish(&self, document: &ComposedDocument, id: &str) -> Result<String, StoreError> {
        let prefix = match document.kind {
            RecordKind::Manifest => &self.paths.manifest_prefix,
            RecordKind::Ticket => &self.paths.ticket_prefix,
        };
        let path = format!("{}/{}", prefix.trim_end_matches('/'), document.file_name);

        let url = self
            .storage
            .upload(&path, &document.bytes, PDF_CONTENT_TYPE)
            .await?;
        self.store.set_document_url(document.kind, id, &url).await?;
        Ok(url)
    }

    /// Record the exit weighing of an in-process ticket and publish its
    /// document.
    pub async fn complete_ticket(
        &self,
        id: &str,
        exit_weight: f64,
        observations: Option<String>,
        signature: Option<&ImageSource>,
        now: DateTime<Utc>,
    ) -> Result<CompletionOutcome, WorkflowError> {
        let mut ticket = self.store.ticket(id).await?;

        if ticket.status != TicketStatus::InProcess {
            return Err(WorkflowError::NotInProcess {
                id: ticket.id,
                status: ticket.status,
            });
        }
        if !exit_weight.is_finite() || exit_weight < 0.0 {
            return Err(WorkflowError::InvalidExitWeight(exit_weight));
        }
        if exit_weight < ticket.entry_weight {
            warn!(
                "Ticket {}: exit weight {:.2} is below entry weight {:.2}",
                id, exit_weight, ticket.entry_weight
            );
        }

        ticket.exit_weight = Some(exit_weight);
        ticket.exit_time = Some(now);
        ticket.status = TicketStatus::Completed;
        if observations.is_some() {
            ticket.observations = observations;
        }

        self.store.save_ticket(&ticket).await?;
        info!(
            "Ticket {} completed, net deposited {:.2} kg",
            ticket.id,
            ticket.net_for_totals()
        );

        let document = compose_ticket(&ticket, signature, self.ctx, self.loader, now.date_naive()).await;

        match self.publish(&document, &ticket.id).await {
            Ok(url) => {
                ticket.document_url = Some(url.clone());
                Ok(CompletionOutcome {
                    ticket,
                    document_url: Some(url),
                    document_error: None,
                })
            }
            Err(e) => {
                warn!(
                    "Ticket {} is completed but its document was not published: {}",
                    ticket.id, e
                );
                Ok(CompletionOutcome {
                    ticket,
                    document_url: None,
                    document_error: Some(e.to_string()),
                })
            }
        }
    }

    /// Compose, upload and link one manifest document.
    pub async fn publish_manifest(
        &self,
        record: &ManifestRecord,
        signatures: &ManifestSignatures,
        generated_on: NaiveDate,
    ) -> Result<PublishedDocument, WorkflowError> {
        let document = compose_manifest(record, signatures, self.ctx, self.loader, generated_on).await;
        let url = self.publish(&document, &record.id).await?;
        info!("Published manifest {} to {}", record.folio, url);
        Ok(PublishedDocument { url, document })
    }

    /// Compose, upload and link one ticket document without touching its
    /// workflow state.
    pub async fn publish_ticket(
        &self,
        record: &LandfillTicketRecord,
        signature: Option<&ImageSource>,
        generated_on: NaiveDate,
    ) -> Result<PublishedDocument, WorkflowError> {
        let document = compose_ticket(record, signature, self.ctx, self.loader, generated_on).await;
        let url = self.publish(&document, &record.id).await?;
        info!("Published landfill ticket {} to {}", record.id, url);
        Ok(PublishedDocument { url, document })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::{DigitizationStatus, VesselRecord};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        manifests: Vec<ManifestRecord>,
        tickets: Mutex<Vec<LandfillTicketRecord>>,
        urls: Mutex<Vec<(RecordKind, String, String)>>,
        reject_urls: bool,
    }

    #[async_trait]
    impl RecordStore for MemoryStore {
        async fn manifests(&self) -> crate::store::Result<Vec<ManifestRecord>> {
            Ok(self.manifests.clone())
        }

        async fn tickets(&self) -> crate::store::Result<Vec<LandfillTicketRecord>> {
            Ok(self.tickets.lock().unwrap().clone())
        }

        async fn vessels(&self) -> crate::store::Result<Vec<VesselRecord>> {
            Ok(Vec::new())
        }

        async fn save_ticket(&self, ticket: &LandfillTicketRecord) -> crate::store::Result<()> {
            let mut tickets = self.tickets.lock().unwrap();
            if let Some(existing) = tickets.iter_mut().find(|t| t.id == ticket.id) {
                *existing = ticket.clone();
            }
            Ok(())
        }

        async fn set_document_url(
            &self,
            kind: RecordKind,
            id: &str,
            url: &str,
        ) -> crate::store::Result<()> {
            if self.reject_urls {
                return Err(StoreError::Api {
                    status: 409,
                    body: "row is locked".to_string(),
                });
            }
            self.urls
                .lock()
                .unwrap()
                .push((kind, id.to_string(), url.to_string()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemoryStorage {
        paths: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ObjectStorage for MemoryStorage {
        async fn upload(&self, path: &str, bytes: &[u8], content_type: &str) -> crate::store::Result<String> {
            assert!(bytes.starts_with(b"%PDF-"));
            assert_eq!(content_type, PDF_CONTENT_TYPE);
            self.paths.lock().unwrap().push(path.to_string());
            Ok(format!("memory://{}", path))
        }
    }

    struct FailingStorage;

    #[async_trait]
    impl ObjectStorage for FailingStorage {
        async fn upload(&self, _path: &str, _bytes: &[u8], _content_type: &str) -> crate::store::Result<String> {
            Err(StoreError::Api {
                status: 503,
                body: "bucket unavailable".to_string(),
            })
        }
    }

    fn in_process_ticket(id: &str) -> LandfillTicketRecord {
        LandfillTicketRecord {
            id: id.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
            vessel: None,
            responsible: None,
            entry_weight: 120.5,
            exit_weight: None,
            entry_time: None,
            exit_time: None,
            created_at: Utc.with_ymd_and_hms(2024, 3, 2, 8, 0, 0).unwrap(),
            status: TicketStatus::InProcess,
            observations: None,
            document_url: None,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 2, 10, 30, 0).unwrap()
    }

    fn store_with(ticket: LandfillTicketRecord) -> MemoryStore {
        MemoryStore {
            tickets: Mutex::new(vec![ticket]),
            ..MemoryStore::default()
        }
    }

    #[tokio::test]
    async fn test_complete_ticket_publishes_document() {
        let config = Config::default();
        let ctx = DocumentContext::from_config(&config);
        let loader = AssetLoader::new(1).unwrap();
        let store = store_with(in_process_ticket("5"));
        let storage = MemoryStorage::default();
        let publisher = Publisher {
            store: &store,
            storage: &storage,
            loader: &loader,
            ctx: &ctx,
            paths: &config.storage,
        };

        let outcome = publisher
            .complete_ticket("5", 300.0, Some("Dry load".to_string()), None, now())
            .await
            .unwrap();

        assert_eq!(outcome.ticket.status, TicketStatus::Completed);
        assert_eq!(outcome.ticket.net_deposited(), Some(179.5));
        assert_eq!(
            outcome.document_url.as_deref(),
            Some("memory://basuron/Manifiesto_Basuron_5_2024-03-02.pdf")
        );
        assert!(outcome.document_error.is_none());

        let saved = store.tickets.lock().unwrap()[0].clone();
        assert_eq!(saved.status, TicketStatus::Completed);
        assert_eq!(saved.exit_time, Some(now()));
        assert_eq!(saved.observations.as_deref(), Some("Dry load"));
        assert_eq!(store.urls.lock().unwrap()[0].0, RecordKind::Ticket);
    }

    #[tokio::test]
    async fn test_completion_survives_upload_failure() {
        let config = Config::default();
        let ctx = DocumentContext::from_config(&config);
        let loader = AssetLoader::new(1).unwrap();
        let store = store_with(in_process_ticket("6"));
        let publisher = Publisher {
            store: &store,
            storage: &FailingStorage,
            loader: &loader,
            ctx: &ctx,
            paths: &config.storage,
        };

        let outcome = publisher
            .complete_ticket("6", 200.0, None, None, now())
            .await
            .unwrap();

        assert!(outcome.document_url.is_none());
        assert!(outcome.document_error.unwrap().contains("503"));
        assert_eq!(store.tickets.lock().unwrap()[0].status, TicketStatus::Completed);
        assert!(store.urls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_completion_survives_url_write_failure() {
        let config = Config::default();
        let ctx = DocumentContext::from_config(&config);
        let loader = AssetLoader::new(1).unwrap();
        let store = MemoryStore {
            reject_urls: true,
            ..store_with(in_process_ticket("10"))
        };
        let storage = MemoryStorage::default();
        let publisher = Publisher {
            store: &store,
            storage: &storage,
            loader: &loader,
            ctx: &ctx,
            paths: &config.storage,
        };

        let outcome = publisher
            .complete_ticket("10", 250.0, None, None, now())
            .await
            .unwrap();

        assert_eq!(storage.paths.lock().unwrap().len(), 1);
        assert!(outcome.document_url.is_none());
        assert!(outcome.ticket.document_url.is_none());
        assert!(outcome.document_error.unwrap().contains("409"));
        assert_eq!(store.tickets.lock().unwrap()[0].status, TicketStatus::Completed);
        assert_eq!(outcome.ticket.net_deposited(), Some(129.5));
    }

    #[tokio::test]
    async fn test_complete_rejects_invalid_requests() {
        let config = Config::default();
        let ctx = DocumentContext::from_config(&config);
        let loader = AssetLoader::new(1).unwrap();
        let mut done = in_process_ticket("7");
        done.status = TicketStatus::Completed;
        let store = store_with(done);
        let storage = MemoryStorage::default();
        let publisher = Publisher {
            store: &store,
            storage: &storage,
            loader: &loader,
            ctx: &ctx,
            paths: &config.storage,
        };

        let result = publisher.complete_ticket("7", 10.0, None, None, now()).await;
        assert!(matches!(result, Err(WorkflowError::NotInProcess { .. })));

        let result = publisher.complete_ticket("missing", 10.0, None, None, now()).await;
        assert!(matches!(
            result,
            Err(WorkflowError::Store(StoreError::NotFound { .. }))
        ));

        let store = store_with(in_process_ticket("8"));
        let publisher = Publisher {
            store: &store,
            ..publisher
        };
        let result = publisher.complete_ticket("8", -1.0, None, None, now()).await;
        assert!(matches!(result, Err(WorkflowError::InvalidExitWeight(_))));
        assert_eq!(store.tickets.lock().unwrap()[0].status, TicketStatus::InProcess);
    }

    #[tokio::test]
    async fn test_publish_ticket_propagates_upload_errors() {
        let config = Config::default();
        let ctx = DocumentContext::from_config(&config);
        let loader = AssetLoader::new(1).unwrap();
        let ticket = in_process_ticket("9");
        let store = store_with(ticket.clone());
        let publisher = Publisher {
            store: &store,
            storage: &FailingStorage,
            loader: &loader,
            ctx: &ctx,
            paths: &config.storage,
        };

        let result = publisher
            .publish_ticket(&ticket, None, NaiveDate::from_ymd_opt(2024, 3, 2).unwrap())
            .await;
        assert!(matches!(
            result,
            Err(WorkflowError::Store(StoreError::Api { status: 503, .. }))
        ));
    }

    #[tokio::test]
    async fn test_publish_manifest() {
        let config = Config::default();
        let ctx = DocumentContext::from_config(&config);
        let loader = AssetLoader::new(1).unwrap();
        let record = ManifestRecord {
            id: "12".to_string(),
            folio: "F-12".to_string(),
            issue_date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            vessel: None,
            principal: None,
            secondary: None,
            residues: None,
            digitization_status: DigitizationStatus::Pending,
            created_at: None,
            document_url: None,
        };
        let store = MemoryStore {
            manifests: vec![record.clone()],
            ..MemoryStore::default()
        };
        let storage = MemoryStorage::default();
        let publisher = Publisher {
            store: &store,
            storage: &storage,
            loader: &loader,
            ctx: &ctx,
            paths: &config.storage,
        };

        let signatures = ManifestSignatures::for_record(&record, &ctx);
        let published = publisher
            .publish_manifest(&record, &signatures, NaiveDate::from_ymd_opt(2024, 1, 6).unwrap())
            .await
            .unwrap();

        assert_eq!(published.url, "memory://manifests/manifiesto_F-12_2024-01-06.pdf");
        assert_eq!(
            store.urls.lock().unwrap()[0],
            (RecordKind::Manifest, "12".to_string(), published.url.clone())
        );
    }
}
