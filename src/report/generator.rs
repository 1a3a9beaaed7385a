//! Markdown and JSON report generation.
//!
//! This module renders dashboard aggregates and the detailed residue report
//! for people who read them outside the web dashboard.

use crate::analysis::{
    CategoryTotal, Dashboard, DetailedRow, LandfillSummary, MonthlyLandfill, MonthlyTotals,
    ReportFilter, StatusCount, VesselTotal,
};
use crate::config::ReportConfig;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Generate the dashboard as Markdown.
pub fn generate_dashboard_markdown(
    dashboard: &Dashboard,
    config: &ReportConfig,
    generated_at: DateTime<Utc>,
) -> String {
    let p = config.precision;
    let mut output = String::new();

    output.push_str(&format!("# {}\n\n", config.title));
    output.push_str(&format!(
        "*Generated {} · {} manifests*\n\n",
        generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        dashboard.manifest_count
    ));

    output.push_str(&generate_monthly_section(&dashboard.monthly, p));
    output.push_str(&generate_top_vessels_section(&dashboard.top_vessels, p));
    output.push_str(&generate_categories_section(&dashboard.categories, p));
    output.push_str(&generate_status_section(&dashboard.statuses));

    if config.include_landfill {
        output.push_str(&generate_landfill_section(
            &dashboard.landfill,
            &dashboard.landfill_monthly,
            p,
        ));
    }

    output.push_str(&generate_footer());

    output
}

/// Monthly residue totals table.
fn generate_monthly_section(monthly: &[MonthlyTotals], p: usize) -> String {
    let mut section = String::new();

    section.push_str("## Monthly Totals\n\n");
    if monthly.is_empty() {
        section.push_str("No manifests in this period.\n\n");
        return section;
    }

    section.push_str("| Month | Used oil (L) | General waste (kg) | Filters (pcs) | Other (kg) |\n");
    section.push_str("|:---|---:|---:|---:|---:|\n");
    for m in monthly {
        section.push_str(&format!(
            "| {} | {:.p$} | {:.p$} | {:.p$} | {:.p$} |\n",
            m.month, m.used_oil, m.general_waste, m.filters, m.other
        ));
    }
    section.push('\n');

    section
}

/// Vessel ranking table.
fn generate_top_vessels_section(vessels: &[VesselTotal], p: usize) -> String {
    if vessels.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Top Vessels\n\n");
    section.push_str("*Ranked by used oil + general waste.*\n\n");
    section.push_str("| # | Vessel | Total | Manifests |\n");
    section.push_str("|:---:|:---|---:|:---:|\n");
    for (i, v) in vessels.iter().enumerate() {
        section.push_str(&format!(
            "| {} | {} | {:.p$} | {} |\n",
            i + 1,
            v.vessel,
            v.total,
            v.manifests
        ));
    }
    section.push('\n');

    section
}

fn generate_categories_section(categories: &[CategoryTotal], p: usize) -> String {
    let mut section = String::new();

    section.push_str("## Residues by Category\n\n");
    section.push_str("| Category | Total | Unit |\n");
    section.push_str("|:---|---:|:---|\n");
    for c in categories {
        section.push_str(&format!(
            "| {} | {:.p$} | {} |\n",
            c.category, c.total, c.unit
        ));
    }
    section.push('\n');

    section
}

fn generate_status_section(statuses: &[StatusCount]) -> String {
    let mut section = String::new();

    section.push_str("## Digitization Status\n\n");
    section.push_str("| Status | Manifests |\n");
    section.push_str("|:---|:---:|\n");
    for s in statuses {
        section.push_str(&format!("| {} | {} |\n", s.status, s.count));
    }
    section.push('\n');

    section
}

fn generate_landfill_section(
    summary: &LandfillSummary,
    monthly: &[MonthlyLandfill],
    p: usize,
) -> String {
    let mut section = String::new();

    section.push_str("## Landfill Tickets\n\n");
    section.push_str(&format!("- **Completed:** {}\n", summary.completed));
    section.push_str(&format!("- **In process:** {}\n", summary.in_process));
    if summary.cancelled > 0 {
        section.push_str(&format!("- **Cancelled:** {}\n", summary.cancelled));
    }
    section.push_str(&format!(
        "- **Net deposited:** {:.p$} kg\n",
        summary.completed_net_total
    ));
    if summary.in_process > 0 {
        section.push_str(&format!(
            "- **Awaiting exit weighing:** {:.p$} kg entered\n",
            summary.pending_entry_weight
        ));
    }
    section.push('\n');

    if !monthly.is_empty() {
        section.push_str("| Month | Net deposited (kg) | Tickets |\n");
        section.push_str("|:---|---:|:---:|\n");
        for m in monthly {
            section.push_str(&format!(
                "| {} | {:.p$} | {} |\n",
                m.month, m.net_weight, m.tickets
            ));
        }
        section.push('\n');
    }

    section
}

/// Generate the detailed residue report as Markdown.
pub fn generate_detailed_markdown(
    rows: &[DetailedRow],
    filter: &ReportFilter,
    config: &ReportConfig,
) -> String {
    let p = config.precision;
    let mut output = String::new();

    output.push_str("# Detailed Residue Report\n\n");
    output.push_str(&generate_filter_section(filter));

    if rows.is_empty() {
        output.push_str("No residues match the selected filters.\n\n");
        output.push_str(&generate_footer());
        return output;
    }

    output.push_str("| Date | Folio | Vessel | Responsible | Residue | Quantity | Unit | Status |\n");
    output.push_str("|:---|:---|:---|:---|:---|---:|:---|:---|\n");
    for row in rows {
        output.push_str(&format!(
            "| {} | {} | {} | {} | {} | {:.p$} | {} | {} |\n",
            row.date, row.folio, row.vessel, row.responsible, row.category, row.quantity, row.unit,
            row.status
        ));
    }
    output.push_str(&format!("\n*{} rows*\n\n", rows.len()));

    output.push_str(&generate_footer());

    output
}

fn generate_filter_section(filter: &ReportFilter) -> String {
    let mut section = String::new();

    if let Some(from) = filter.from {
        section.push_str(&format!("- **From:** {}\n", from));
    }
    if let Some(to) = filter.to {
        section.push_str(&format!("- **To:** {}\n", to));
    }
    if let Some(ref vessel) = filter.vessel_id {
        section.push_str(&format!("- **Vessel:** {}\n", vessel));
    }
    if let Some(status) = filter.status {
        section.push_str(&format!("- **Status:** {}\n", status));
    }
    if !section.is_empty() {
        section.push('\n');
    }

    section
}

fn generate_footer() -> String {
    "---\n\n*Report generated by manifiesto*\n".to_string()
}

/// Generate a JSON report of any aggregate.
pub fn generate_json_report<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{build_dashboard, detailed_rows};
    use crate::models::{
        DigitizationStatus, LandfillTicketRecord, ManifestRecord, ResidueBreakdown, TicketStatus,
    };
    use chrono::NaiveDate;

    fn create_test_manifests() -> Vec<ManifestRecord> {
        vec![ManifestRecord {
            id: "1".to_string(),
            folio: "MAN-001".to_string(),
            issue_date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            vessel: None,
            principal: None,
            secondary: None,
            residues: Some(ResidueBreakdown {
                used_oil: 10.0,
                general_waste: 2.5,
                ..ResidueBreakdown::default()
            }),
            digitization_status: DigitizationStatus::Completed,
            created_at: None,
            document_url: None,
        }]
    }

    fn create_test_ticket() -> LandfillTicketRecord {
        LandfillTicketRecord {
            id: "9".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
            vessel: None,
            responsible: None,
            entry_weight: 120.5,
            exit_weight: None,
            entry_time: None,
            exit_time: None,
            created_at: Utc::now(),
            status: TicketStatus::InProcess,
            observations: None,
            document_url: None,
        }
    }

    #[test]
    fn test_generate_dashboard_markdown() {
        let dashboard = build_dashboard(&create_test_manifests(), &[create_test_ticket()]);
        let markdown =
            generate_dashboard_markdown(&dashboard, &ReportConfig::default(), Utc::now());

        assert!(markdown.contains("# Waste Reception Dashboard"));
        assert!(markdown.contains("## Monthly Totals"));
        assert!(markdown.contains("| 2024-01 | 10.00 | 2.50 | 0.00 | 0.00 |"));
        assert!(markdown.contains("Unknown vessel"));
        assert!(markdown.contains("- **In process:** 1"));
        assert!(markdown.contains("120.50 kg entered"));
    }

    #[test]
    fn test_dashboard_without_landfill_section() {
        let dashboard = build_dashboard(&create_test_manifests(), &[]);
        let config = ReportConfig {
            include_landfill: false,
            ..ReportConfig::default()
        };
        let markdown = generate_dashboard_markdown(&dashboard, &config, Utc::now());
        assert!(!markdown.contains("## Landfill Tickets"));
    }

    #[test]
    fn test_generate_detailed_markdown() {
        let filter = ReportFilter {
            status: Some(DigitizationStatus::Completed),
            ..ReportFilter::default()
        };
        let rows = detailed_rows(&create_test_manifests(), &filter);
        let markdown = generate_detailed_markdown(&rows, &filter, &ReportConfig::default());

        assert!(markdown.contains("- **Status:** Completed"));
        assert!(markdown.contains("| 2024-01-05 | MAN-001 |"));
        assert!(markdown.contains("| Used oil | 10.00 | liters |"));
        assert!(markdown.contains("*2 rows*"));
    }

    #[test]
    fn test_detailed_markdown_empty() {
        let markdown =
            generate_detailed_markdown(&[], &ReportFilter::default(), &ReportConfig::default());
        assert!(markdown.contains("No residues match"));
    }

    #[test]
    fn test_generate_json_report() {
        let dashboard = build_dashboard(&create_test_manifests(), &[]);
        let json = generate_json_report(&dashboard).unwrap();

        assert!(json.contains("\"monthly\""));
        assert!(json.contains("\"top_vessels\""));
        assert!(json.contains("\"used_oil\""));
    }
}
