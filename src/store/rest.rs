//! Hosted backend: PostgREST-style tables and a storage bucket.

use super::rows::{
    resolve_manifests, resolve_tickets, ManifestRow, TicketRow, TicketUpdate, VesselRow,
};
use super::storage::ObjectStorage;
use super::{RecordKind, RecordStore, Result, StoreError};
use crate::config::StoreConfig;
use crate::models::{LandfillTicketRecord, ManifestRecord, VesselRecord};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

/// Shared HTTP plumbing for the table and storage endpoints.
#[derive(Clone)]
struct Backend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl Backend {
    fn new(base_url: &str, api_key: &str, timeout_seconds: u64) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if timeout_seconds > 0 {
            builder = builder.timeout(Duration::from_secs(timeout_seconds));
        }
        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Api { status, body })
    }
}

/// Record store backed by the hosted REST API.
pub struct RestStore {
    backend: Backend,
    config: StoreConfig,
}

impl RestStore {
    pub fn new(config: &StoreConfig, api_key: &str) -> Result<Self> {
        Ok(Self {
            backend: Backend::new(&config.url, api_key, config.timeout_seconds)?,
            config: config.clone(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.backend.base_url, table)
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        select: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let url = self.table_url(table);
        debug!("GET {} select={}", url, select);

        let mut query: Vec<(&str, String)> = vec![("select", select.to_string())];
        query.extend(filters.iter().cloned());

        let response = self
            .backend
            .request(reqwest::Method::GET, &url)
            .query(&query)
            .send()
            .await?;
        let response = Backend::check(response).await?;
        Ok(response.json().await?)
    }

    async fn patch(&self, table: &str, id: &str, body: serde_json::Value) -> Result<()> {
        let url = self.table_url(table);
        let response = self
            .backend
            .request(reqwest::Method::PATCH, &url)
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=minimal")
            .json(&body)
            .send()
            .await?;
        Backend::check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for RestStore {
    async fn manifests(&self) -> Result<Vec<ManifestRecord>> {
        let rows: Vec<ManifestRow> = self
            .select(&self.config.manifests_table, &self.config.manifests_select, &[])
            .await?;
        info!("Fetched {} manifest rows", rows.len());
        Ok(resolve_manifests(rows))
    }

    async fn tickets(&self) -> Result<Vec<LandfillTicketRecord>> {
        let rows: Vec<TicketRow> = self
            .select(&self.config.tickets_table, &self.config.tickets_select, &[])
            .await?;
        info!("Fetched {} ticket rows", rows.len());
        Ok(resolve_tickets(rows))
    }

    async fn vessels(&self) -> Result<Vec<VesselRecord>> {
        let rows: Vec<VesselRow> = self.select(&self.config.vessels_table, "*", &[]).await?;
        Ok(rows.into_iter().map(VesselRow::resolve).collect())
    }

    async fn manifest(&self, id: &str) -> Result<ManifestRecord> {
        let rows: Vec<ManifestRow> = self
            .select(
                &self.config.manifests_table,
                &self.config.manifests_select,
                &[("id", format!("eq.{}", id))],
            )
            .await?;
        resolve_manifests(rows)
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound {
                kind: RecordKind::Manifest,
                id: id.to_string(),
            })
    }

    async fn ticket(&self, id: &str) -> Result<LandfillTicketRecord> {
        let rows: Vec<TicketRow> = self
            .select(
                &self.config.tickets_table,
                &self.config.tickets_select,
                &[("id", format!("eq.{}", id))],
            )
            .await?;
        resolve_tickets(rows)
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound {
                kind: RecordKind::Ticket,
                id: id.to_string(),
            })
    }

    async fn save_ticket(&self, ticket: &LandfillTicketRecord) -> Result<()> {
        let body = serde_json::to_value(TicketUpdate::from(ticket))?;
        self.patch(&self.config.tickets_table, &ticket.id, body).await?;
        info!("Saved ticket {} ({})", ticket.id, ticket.status);
        Ok(())
    }

    async fn set_document_url(&self, kind: RecordKind, id: &str, url: &str) -> Result<()> {
        let table = match kind {
            RecordKind::Manifest => &self.config.manifests_table,
            RecordKind::Ticket => &self.config.tickets_table,
        };
        self.patch(table, id, json!({ "document_url": url })).await
    }
}

/// Storage bucket on the hosted backend.
pub struct RestObjectStorage {
    backend: Backend,
    bucket: String,
}

impl RestObjectStorage {
    pub fn new(config: &StoreConfig, bucket: &str, api_key: &str) -> Result<Self> {
        Ok(Self {
            backend: Backend::new(&config.url, api_key, config.timeout_seconds)?,
            bucket: bucket.to_string(),
        })
    }

    /// Public URL of an object in the bucket.
    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.backend.base_url, self.bucket, path
        )
    }
}

#[async_trait]
impl ObjectStorage for RestObjectStorage {
    async fn upload(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<String> {
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.backend.base_url, self.bucket, path
        );
        debug!("POST {} ({} bytes)", url, bytes.len());

        let response = self
            .backend
            .request(reqwest::Method::POST, &url)
            .header("Content-Type", content_type)
            .header("x-upsert", "true")
            .body(bytes.to_vec())
            .send()
            .await?;
        Backend::check(response).await?;

        let public = self.public_url(path);
        info!("Uploaded document to {}", public);
        Ok(public)
    }
}
