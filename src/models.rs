//! Data models for manifests, landfill tickets and vessels.
//!
//! These are the resolved read models the rest of the crate works with.
//! Raw rows coming from the record store are converted into these types
//! once, in [`crate::store::rows`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Workflow state of a manifest's paperwork.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DigitizationStatus {
    #[default]
    #[serde(rename = "Pendiente", alias = "pending")]
    Pending,
    #[serde(rename = "En Proceso", alias = "in_process")]
    InProcess,
    #[serde(rename = "Completado", alias = "completed")]
    Completed,
    #[serde(rename = "Aprobado", alias = "approved")]
    Approved,
    #[serde(rename = "Rechazado", alias = "rejected")]
    Rejected,
}

impl DigitizationStatus {
    /// All statuses in workflow order.
    pub const ALL: [DigitizationStatus; 5] = [
        DigitizationStatus::Pending,
        DigitizationStatus::InProcess,
        DigitizationStatus::Completed,
        DigitizationStatus::Approved,
        DigitizationStatus::Rejected,
    ];
}

impl fmt::Display for DigitizationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DigitizationStatus::Pending => write!(f, "Pending"),
            DigitizationStatus::InProcess => write!(f, "In process"),
            DigitizationStatus::Completed => write!(f, "Completed"),
            DigitizationStatus::Approved => write!(f, "Approved"),
            DigitizationStatus::Rejected => write!(f, "Rejected"),
        }
    }
}

impl FromStr for DigitizationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "pending" | "pendiente" => Ok(DigitizationStatus::Pending),
            "in_process" | "en_proceso" => Ok(DigitizationStatus::InProcess),
            "completed" | "completado" => Ok(DigitizationStatus::Completed),
            "approved" | "aprobado" => Ok(DigitizationStatus::Approved),
            "rejected" | "rechazado" => Ok(DigitizationStatus::Rejected),
            _ => Err(format!("unknown digitization status: {}", s)),
        }
    }
}

/// State of a landfill weigh ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TicketStatus {
    #[default]
    #[serde(rename = "En Proceso", alias = "in_process")]
    InProcess,
    #[serde(rename = "Completado", alias = "completed")]
    Completed,
    #[serde(rename = "Cancelado", alias = "cancelled")]
    Cancelled,
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TicketStatus::InProcess => write!(f, "In process"),
            TicketStatus::Completed => write!(f, "Completed"),
            TicketStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// Operational state of a vessel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VesselStatus {
    #[default]
    #[serde(rename = "Activa", alias = "active")]
    Active,
    #[serde(rename = "Inactiva", alias = "inactive")]
    Inactive,
    #[serde(rename = "Mantenimiento", alias = "under_maintenance")]
    UnderMaintenance,
}

impl fmt::Display for VesselStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VesselStatus::Active => write!(f, "Active"),
            VesselStatus::Inactive => write!(f, "Inactive"),
            VesselStatus::UnderMaintenance => write!(f, "Under maintenance"),
        }
    }
}

fn normalize_label(s: &str) -> String {
    s.trim().to_lowercase().replace([' ', '-'], "_")
}

/// A 1:1 relation as returned by the data client: sometimes a single
/// object, sometimes a one-element array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Relation<T> {
    Many(Vec<T>),
    Single(T),
}

impl<T> Relation<T> {
    /// Collapse the relation to its first related row.
    pub fn into_first(self) -> Option<T> {
        match self {
            Relation::Single(item) => Some(item),
            Relation::Many(items) => items.into_iter().next(),
        }
    }
}

/// A responsible party (crew member or port official).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// A registered (or auto-created) vessel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VesselRecord {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration: Option<String>,
    #[serde(default)]
    pub status: VesselStatus,
    /// False for vessels created implicitly from a manifest reference.
    pub registration_complete: bool,
}

impl VesselRecord {
    /// Whether a human still has to complete this vessel's registration.
    pub fn needs_reconciliation(&self) -> bool {
        !self.registration_complete
    }
}

/// Residue categories carried by a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResidueCategory {
    UsedOil,
    OilFilters,
    DieselFilters,
    AirFilters,
    GeneralWaste,
    Other,
}

impl ResidueCategory {
    /// Categories in the order they appear on documents and charts.
    pub const ALL: [ResidueCategory; 6] = [
        ResidueCategory::UsedOil,
        ResidueCategory::OilFilters,
        ResidueCategory::DieselFilters,
        ResidueCategory::AirFilters,
        ResidueCategory::GeneralWaste,
        ResidueCategory::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ResidueCategory::UsedOil => "Used oil",
            ResidueCategory::OilFilters => "Oil filters",
            ResidueCategory::DieselFilters => "Diesel filters",
            ResidueCategory::AirFilters => "Air filters",
            ResidueCategory::GeneralWaste => "General waste",
            ResidueCategory::Other => "Other residues",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            ResidueCategory::UsedOil => "liters",
            ResidueCategory::OilFilters
            | ResidueCategory::DieselFilters
            | ResidueCategory::AirFilters => "pcs",
            ResidueCategory::GeneralWaste | ResidueCategory::Other => "kg",
        }
    }
}

impl fmt::Display for ResidueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Quantities surrendered for each residue category. Never negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResidueBreakdown {
    /// Used oil, liters.
    pub used_oil: f64,
    pub oil_filters: f64,
    pub diesel_filters: f64,
    pub air_filters: f64,
    /// General waste, kg.
    pub general_waste: f64,
    /// Residues outside the five fixed categories, kg.
    #[serde(default)]
    pub other: f64,
}

impl ResidueBreakdown {
    /// Total filter count across the three filter kinds.
    pub fn filters(&self) -> f64 {
        self.oil_filters + self.diesel_filters + self.air_filters
    }

    pub fn quantity(&self, category: ResidueCategory) -> f64 {
        match category {
            ResidueCategory::UsedOil => self.used_oil,
            ResidueCategory::OilFilters => self.oil_filters,
            ResidueCategory::DieselFilters => self.diesel_filters,
            ResidueCategory::AirFilters => self.air_filters,
            ResidueCategory::GeneralWaste => self.general_waste,
            ResidueCategory::Other => self.other,
        }
    }
}

/// A waste manifest joined with its vessel, responsible parties and residues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestRecord {
    pub id: String,
    pub folio: String,
    pub issue_date: NaiveDate,
    pub vessel: Option<VesselRecord>,
    pub principal: Option<Person>,
    pub secondary: Option<Person>,
    /// Absent when the residue join returned nothing.
    pub residues: Option<ResidueBreakdown>,
    pub digitization_status: DigitizationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_url: Option<String>,
}

impl ManifestRecord {
    /// Vessel display name, if the join produced one.
    pub fn vessel_name(&self) -> Option<&str> {
        self.vessel.as_ref().map(|v| v.name.as_str())
    }

    /// Residues with absent categories read as zero.
    pub fn residues_or_zero(&self) -> ResidueBreakdown {
        self.residues.unwrap_or_default()
    }
}

/// A weigh-in/weigh-out record for bulk waste delivered to the landfill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandfillTicketRecord {
    pub id: String,
    pub date: NaiveDate,
    pub vessel: Option<VesselRecord>,
    pub responsible: Option<Person>,
    /// Entry weight, kg.
    pub entry_weight: f64,
    /// Exit weight, kg. Absent while the ticket is in process.
    pub exit_weight: Option<f64>,
    pub entry_time: Option<DateTime<Utc>>,
    pub exit_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub status: TicketStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observations: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_url: Option<String>,
}

impl LandfillTicketRecord {
    /// Net deposited weight (exit - entry); `None` while exit is unknown.
    pub fn net_deposited(&self) -> Option<f64> {
        self.exit_weight.map(|exit| exit - self.entry_weight)
    }

    /// Net weight for summation, zero while the ticket is in process.
    pub fn net_for_totals(&self) -> f64 {
        self.net_deposited().unwrap_or(0.0)
    }

    /// Entry time, falling back to the record's creation timestamp.
    pub fn effective_entry_time(&self) -> DateTime<Utc> {
        self.entry_time.unwrap_or(self.created_at)
    }

    pub fn vessel_name(&self) -> Option<&str> {
        self.vessel.as_ref().map(|v| v.name.as_str())
    }
}

/// A hand-drawn signature captured as a base64 raster image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureImage {
    data: String,
}

impl SignatureImage {
    /// Wrap base64 data, accepting an optional `data:image/...;base64,` prefix.
    pub fn from_base64(data: impl Into<String>) -> Self {
        Self { data: data.into() }
    }

    /// The base64 payload without any data-URL prefix.
    pub fn payload(&self) -> &str {
        match self.data.split_once(";base64,") {
            Some((prefix, rest)) if prefix.starts_with("data:") => rest,
            _ => self.data.as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket(entry: f64, exit: Option<f64>, status: TicketStatus) -> LandfillTicketRecord {
        LandfillTicketRecord {
            id: "42".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            vessel: None,
            responsible: None,
            entry_weight: entry,
            exit_weight: exit,
            entry_time: None,
            exit_time: None,
            created_at: "2024-03-01T08:30:00Z".parse().unwrap(),
            status,
            observations: None,
            document_url: None,
        }
    }

    #[test]
    fn test_net_deposited_with_exit() {
        let t = ticket(120.5, Some(480.25), TicketStatus::Completed);
        let net = t.net_deposited().unwrap();
        assert!((net - 359.75).abs() < 1e-9);
        assert!((t.net_for_totals() - 359.75).abs() < 1e-9);
    }

    #[test]
    fn test_net_deposited_without_exit() {
        let t = ticket(120.5, None, TicketStatus::InProcess);
        assert_eq!(t.net_deposited(), None);
        assert_eq!(t.net_for_totals(), 0.0);
    }

    #[test]
    fn test_entry_time_falls_back_to_created_at() {
        let mut t = ticket(10.0, None, TicketStatus::InProcess);
        assert_eq!(t.effective_entry_time(), t.created_at);

        let explicit: DateTime<Utc> = "2024-03-01T09:00:00Z".parse().unwrap();
        t.entry_time = Some(explicit);
        assert_eq!(t.effective_entry_time(), explicit);
    }

    #[test]
    fn test_relation_single_and_many() {
        let single: Relation<Person> =
            serde_json::from_str(r#"{"id": "1", "name": "Ana"}"#).unwrap();
        assert_eq!(single.into_first().map(|p| p.name), Some("Ana".to_string()));

        let many: Relation<Person> =
            serde_json::from_str(r#"[{"id": "2", "name": "Luis"}]"#).unwrap();
        assert_eq!(many.into_first().map(|p| p.name), Some("Luis".to_string()));

        let empty: Relation<Person> = serde_json::from_str("[]").unwrap();
        assert!(empty.into_first().is_none());
    }

    #[test]
    fn test_status_labels() {
        let status: DigitizationStatus = serde_json::from_str("\"En Proceso\"").unwrap();
        assert_eq!(status, DigitizationStatus::InProcess);
        assert_eq!("approved".parse::<DigitizationStatus>(), Ok(DigitizationStatus::Approved));
        assert_eq!("En Proceso".parse::<DigitizationStatus>(), Ok(DigitizationStatus::InProcess));
        assert!("archived".parse::<DigitizationStatus>().is_err());

        let ticket: TicketStatus = serde_json::from_str("\"Cancelado\"").unwrap();
        assert_eq!(ticket, TicketStatus::Cancelled);
        assert_eq!(serde_json::to_string(&TicketStatus::Completed).unwrap(), "\"Completado\"");
    }

    #[test]
    fn test_residue_breakdown_helpers() {
        let residues = ResidueBreakdown {
            used_oil: 10.0,
            oil_filters: 2.0,
            diesel_filters: 1.0,
            air_filters: 3.0,
            general_waste: 0.0,
            other: 0.0,
        };
        assert_eq!(residues.filters(), 6.0);
        assert_eq!(residues.quantity(ResidueCategory::UsedOil), 10.0);
    }

    #[test]
    fn test_signature_payload_strips_data_url() {
        let sig = SignatureImage::from_base64("data:image/png;base64,iVBORw0KGgo=");
        assert_eq!(sig.payload(), "iVBORw0KGgo=");

        let raw = SignatureImage::from_base64("iVBORw0KGgo=");
        assert_eq!(raw.payload(), "iVBORw0KGgo=");
    }

    #[test]
    fn test_vessel_reconciliation_flag() {
        let vessel = VesselRecord {
            id: "v1".to_string(),
            name: "Don Chuy".to_string(),
            registration: None,
            status: VesselStatus::Active,
            registration_complete: false,
        };
        assert!(vessel.needs_reconciliation());
    }
}
