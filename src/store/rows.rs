//! Raw row shapes returned by the record store.
//!
//! Joined relations arrive either as a single object or as an array, ids as
//! numbers or strings, and numeric columns may be null or quoted. All of that
//! is resolved here, once, into the types in [`crate::models`].

use crate::models::{
    DigitizationStatus, LandfillTicketRecord, ManifestRecord, Person, Relation,
    ResidueBreakdown, TicketStatus, VesselRecord, VesselStatus,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Int(i64),
    Text(String),
}

fn flexible_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match IdRepr::deserialize(deserializer)? {
        IdRepr::Int(n) => n.to_string(),
        IdRepr::Text(s) => s,
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberRepr {
    Num(f64),
    Text(String),
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<NumberRepr>::deserialize(deserializer)? {
        Some(NumberRepr::Num(n)) => Some(n),
        Some(NumberRepr::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

/// Parse a date column that may also carry a time component.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn non_negative(value: Option<f64>, field: &str, owner: &str) -> f64 {
    match value {
        Some(v) if v < 0.0 => {
            warn!("Negative {} ({}) on manifest {}, treating as 0", field, v, owner);
            0.0
        }
        Some(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Vessel as joined or listed by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VesselRow {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub registration: Option<String>,
    #[serde(default)]
    pub status: Option<VesselStatus>,
    #[serde(default)]
    pub registration_complete: Option<bool>,
}

impl VesselRow {
    pub fn resolve(self) -> VesselRecord {
        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| self.id.clone());
        VesselRecord {
            id: self.id,
            name,
            registration: self.registration.filter(|r| !r.trim().is_empty()),
            status: self.status.unwrap_or_default(),
            registration_complete: self.registration_complete.unwrap_or(true),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonRow {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl PersonRow {
    /// A person without a usable name is treated as unassigned.
    pub fn resolve(self) -> Option<Person> {
        let name = self.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())?;
        Some(Person {
            id: self.id,
            name,
            role: self.role,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResidueRow {
    #[serde(default, deserialize_with = "lenient_number")]
    pub used_oil: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub oil_filters: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub diesel_filters: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub air_filters: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub general_waste: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub other: Option<f64>,
}

impl ResidueRow {
    fn resolve(self, owner: &str) -> ResidueBreakdown {
        ResidueBreakdown {
            used_oil: non_negative(self.used_oil, "used_oil", owner),
            oil_filters: non_negative(self.oil_filters, "oil_filters", owner),
            diesel_filters: non_negative(self.diesel_filters, "diesel_filters", owner),
            air_filters: non_negative(self.air_filters, "air_filters", owner),
            general_waste: non_negative(self.general_waste, "general_waste", owner),
            other: non_negative(self.other, "other", owner),
        }
    }
}

/// Manifest joined with vessel, people and residues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestRow {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    #[serde(default)]
    pub folio: Option<String>,
    pub issue_date: String,
    #[serde(default)]
    pub vessel: Option<Relation<VesselRow>>,
    #[serde(default)]
    pub principal: Option<Relation<PersonRow>>,
    #[serde(default)]
    pub secondary: Option<Relation<PersonRow>>,
    #[serde(default)]
    pub residues: Option<Relation<ResidueRow>>,
    #[serde(default)]
    pub digitization_status: Option<DigitizationStatus>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub document_url: Option<String>,
}

impl ManifestRow {
    /// Resolve into a [`ManifestRecord`]; `None` if the issue date is unusable.
    pub fn resolve(self) -> Option<ManifestRecord> {
        let Some(issue_date) = parse_date(&self.issue_date) else {
            warn!(
                "Skipping manifest {}: unparseable issue date {:?}",
                self.id, self.issue_date
            );
            return None;
        };

        let id = self.id;
        let residues = self
            .residues
            .and_then(Relation::into_first)
            .map(|row| row.resolve(&id));

        Some(ManifestRecord {
            folio: self
                .folio
                .filter(|f| !f.trim().is_empty())
                .unwrap_or_else(|| id.clone()),
            issue_date,
            vessel: self.vessel.and_then(Relation::into_first).map(VesselRow::resolve),
            principal: self
                .principal
                .and_then(Relation::into_first)
                .and_then(PersonRow::resolve),
            secondary: self
                .secondary
                .and_then(Relation::into_first)
                .and_then(PersonRow::resolve),
            residues,
            digitization_status: self.digitization_status.unwrap_or_default(),
            created_at: self.created_at,
            document_url: self.document_url,
            id,
        })
    }
}

/// Landfill ticket joined with vessel and responsible person.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketRow {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    pub date: String,
    #[serde(default)]
    pub vessel: Option<Relation<VesselRow>>,
    #[serde(default)]
    pub responsible: Option<Relation<PersonRow>>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub entry_weight: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub exit_weight: Option<f64>,
    #[serde(default)]
    pub entry_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub exit_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<TicketStatus>,
    #[serde(default)]
    pub observations: Option<String>,
    #[serde(default)]
    pub document_url: Option<String>,
}

impl TicketRow {
    /// Resolve into a [`LandfillTicketRecord`]; `None` if the date is unusable.
    pub fn resolve(self) -> Option<LandfillTicketRecord> {
        let Some(date) = parse_date(&self.date) else {
            warn!("Skipping ticket {}: unparseable date {:?}", self.id, self.date);
            return None;
        };

        let created_at = self
            .created_at
            .or_else(|| date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()))?;

        Some(LandfillTicketRecord {
            id: self.id,
            date,
            vessel: self.vessel.and_then(Relation::into_first).map(VesselRow::resolve),
            responsible: self
                .responsible
                .and_then(Relation::into_first)
                .and_then(PersonRow::resolve),
            entry_weight: self.entry_weight.filter(|w| w.is_finite()).unwrap_or(0.0),
            exit_weight: self.exit_weight.filter(|w| w.is_finite()),
            entry_time: self.entry_time,
            exit_time: self.exit_time,
            created_at,
            status: self.status.unwrap_or_default(),
            observations: self.observations.filter(|o| !o.trim().is_empty()),
            document_url: self.document_url,
        })
    }

    /// Copy the mutable workflow columns from a resolved ticket.
    pub fn apply(&mut self, ticket: &LandfillTicketRecord) {
        self.exit_weight = ticket.exit_weight;
        self.exit_time = ticket.exit_time;
        self.status = Some(ticket.status);
        self.observations = ticket.observations.clone();
        self.document_url = ticket.document_url.clone();
    }
}

/// Columns written back when a ticket changes state.
#[derive(Debug, Clone, Serialize)]
pub struct TicketUpdate {
    pub exit_weight: Option<f64>,
    pub exit_time: Option<DateTime<Utc>>,
    pub net_weight: Option<f64>,
    pub status: TicketStatus,
    pub observations: Option<String>,
}

impl From<&LandfillTicketRecord> for TicketUpdate {
    fn from(ticket: &LandfillTicketRecord) -> Self {
        Self {
            exit_weight: ticket.exit_weight,
            exit_time: ticket.exit_time,
            net_weight: ticket.net_deposited(),
            status: ticket.status,
            observations: ticket.observations.clone(),
        }
    }
}

/// Resolve a batch of manifest rows, dropping unusable ones.
pub fn resolve_manifests(rows: Vec<ManifestRow>) -> Vec<ManifestRecord> {
    rows.into_iter().filter_map(ManifestRow::resolve).collect()
}

/// Resolve a batch of ticket rows, dropping unusable ones.
pub fn resolve_tickets(rows: Vec<TicketRow>) -> Vec<LandfillTicketRecord> {
    rows.into_iter().filter_map(TicketRow::resolve).collect()
}
