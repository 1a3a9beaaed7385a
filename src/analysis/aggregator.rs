//! Manifest aggregation for dashboards and reports.
//!
//! Every function here is a single pass over an unordered slice of
//! [`ManifestRecord`]s. Absent residue breakdowns contribute nothing to
//! sums; absent categories read as zero.

use super::landfill::{monthly_landfill_totals, summarize_tickets, LandfillSummary, MonthlyLandfill};
use crate::models::{
    DigitizationStatus, LandfillTicketRecord, ManifestRecord, ResidueCategory,
};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Number of vessels kept in the ranking.
pub const TOP_VESSEL_LIMIT: usize = 5;

/// Responsible-person label for manifests without one.
pub const UNASSIGNED: &str = "Unassigned";

/// Vessel label for manifests without a vessel join.
pub const UNKNOWN_VESSEL: &str = "Unknown vessel";

/// Per-category totals for one calendar month.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonthlyTotals {
    /// Bucket key, `YYYY-MM`.
    pub month: String,
    pub used_oil: f64,
    pub general_waste: f64,
    pub filters: f64,
    pub other: f64,
}

/// A vessel's position in the deposit ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VesselTotal {
    pub vessel: String,
    /// Used oil plus general waste.
    pub total: f64,
    pub manifests: usize,
}

/// Grand total of one residue category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: ResidueCategory,
    pub total: f64,
    pub unit: &'static str,
}

/// Number of manifests in one digitization status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCount {
    pub status: DigitizationStatus,
    pub count: usize,
}

/// Filters for the detailed report. Empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportFilter {
    /// Inclusive lower bound on the issue date.
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound on the issue date.
    pub to: Option<NaiveDate>,
    pub vessel_id: Option<String>,
    pub status: Option<DigitizationStatus>,
}

impl ReportFilter {
    pub fn matches(&self, record: &ManifestRecord) -> bool {
        if self.from.is_some_and(|from| record.issue_date < from) {
            return false;
        }
        if self.to.is_some_and(|to| record.issue_date > to) {
            return false;
        }
        if let Some(ref vessel_id) = self.vessel_id {
            if record.vessel.as_ref().map(|v| &v.id) != Some(vessel_id) {
                return false;
            }
        }
        if let Some(status) = self.status {
            if record.digitization_status != status {
                return false;
            }
        }
        true
    }
}

/// One residue line of the detailed report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailedRow {
    pub date: NaiveDate,
    pub folio: String,
    pub vessel: String,
    pub responsible: String,
    pub category: ResidueCategory,
    pub quantity: f64,
    pub unit: &'static str,
    pub status: DigitizationStatus,
}

/// Everything the dashboard renders.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub manifest_count: usize,
    pub monthly: Vec<MonthlyTotals>,
    pub top_vessels: Vec<VesselTotal>,
    pub categories: Vec<CategoryTotal>,
    pub statuses: Vec<StatusCount>,
    pub landfill: LandfillSummary,
    pub landfill_monthly: Vec<MonthlyLandfill>,
}

/// `YYYY-MM` bucket key for a calendar date.
pub fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// Monthly per-category totals, ascending by month.
pub fn monthly_totals(records: &[ManifestRecord]) -> Vec<MonthlyTotals> {
    let mut buckets: BTreeMap<String, MonthlyTotals> = BTreeMap::new();

    for record in records {
        let key = month_key(record.issue_date);
        let bucket = buckets.entry(key.clone()).or_insert_with(|| MonthlyTotals {
            month: key,
            ..MonthlyTotals::default()
        });

        if let Some(residues) = record.residues {
            bucket.used_oil += residues.used_oil;
            bucket.general_waste += residues.general_waste;
            bucket.filters += residues.filters();
            bucket.other += residues.other;
        }
    }

    buckets.into_values().collect()
}

/// Vessels ranked by used oil plus general waste, highest first.
///
/// Grouped by display name. Filters and other residues are not part of the
/// ranking metric. Ties keep the order vessels were first encountered.
pub fn top_vessels(records: &[ManifestRecord], n: usize) -> Vec<VesselTotal> {
    let mut ranking: Vec<VesselTotal> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in records {
        let name = record.vessel_name().unwrap_or(UNKNOWN_VESSEL).to_string();
        let slot = *index.entry(name.clone()).or_insert_with(|| {
            ranking.push(VesselTotal {
                vessel: name,
                total: 0.0,
                manifests: 0,
            });
            ranking.len() - 1
        });

        let entry = &mut ranking[slot];
        entry.manifests += 1;
        if let Some(residues) = record.residues {
            entry.total += residues.used_oil + residues.general_waste;
        }
    }

    // sort_by is stable, which keeps encounter order for ties
    ranking.sort_by(|a, b| b.total.partial_cmp(&a.total).unwrap_or(std::cmp::Ordering::Equal));
    ranking.truncate(n);
    ranking
}

/// Grand total per residue category, in document order.
pub fn category_distribution(records: &[ManifestRecord]) -> Vec<CategoryTotal> {
    ResidueCategory::ALL
        .iter()
        .map(|&category| CategoryTotal {
            category,
            total: records
                .iter()
                .filter_map(|r| r.residues)
                .map(|r| r.quantity(category))
                .sum(),
            unit: category.unit(),
        })
        .collect()
}

/// Manifest count per digitization status, in workflow order.
pub fn status_distribution(records: &[ManifestRecord]) -> Vec<StatusCount> {
    DigitizationStatus::ALL
        .iter()
        .map(|&status| StatusCount {
            status,
            count: records
                .iter()
                .filter(|r| r.digitization_status == status)
                .count(),
        })
        .collect()
}

/// Flatten manifests into one row per reported residue amount.
///
/// A record yields a used-oil row when it has used oil and a general-waste
/// row when it has general waste; records with neither yield nothing.
pub fn detailed_rows(records: &[ManifestRecord], filter: &ReportFilter) -> Vec<DetailedRow> {
    let mut rows = Vec::new();

    for record in records.iter().filter(|r| filter.matches(r)) {
        let residues = record.residues_or_zero();
        let vessel = record.vessel_name().unwrap_or(UNKNOWN_VESSEL);
        let responsible = record
            .principal
            .as_ref()
            .map(|p| p.name.as_str())
            .unwrap_or(UNASSIGNED);

        for category in [ResidueCategory::UsedOil, ResidueCategory::GeneralWaste] {
            let quantity = residues.quantity(category);
            if quantity > 0.0 {
                rows.push(DetailedRow {
                    date: record.issue_date,
                    folio: record.folio.clone(),
                    vessel: vessel.to_string(),
                    responsible: responsible.to_string(),
                    category,
                    quantity,
                    unit: category.unit(),
                    status: record.digitization_status,
                });
            }
        }
    }

    rows
}

/// Build every dashboard series from one snapshot of records.
pub fn build_dashboard(
    manifests: &[ManifestRecord],
    tickets: &[LandfillTicketRecord],
) -> Dashboard {
    Dashboard {
        manifest_count: manifests.len(),
        monthly: monthly_totals(manifests),
        top_vessels: top_vessels(manifests, TOP_VESSEL_LIMIT),
        categories: category_distribution(manifests),
        statuses: status_distribution(manifests),
        landfill: summarize_tickets(tickets),
        landfill_monthly: monthly_landfill_totals(tickets),
    }
}
