//! Landfill ticket statistics.

use super::aggregator::month_key;
use crate::models::{LandfillTicketRecord, TicketStatus};
use serde::Serialize;
use std::collections::BTreeMap;

/// Ticket counts and deposited weight.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LandfillSummary {
    /// Completed tickets with an exit weight.
    pub completed: usize,
    /// Tickets still waiting for their exit weighing.
    pub in_process: usize,
    pub cancelled: usize,
    /// Net weight deposited by completed tickets, kg.
    pub completed_net_total: f64,
    /// Entry weight of tickets still in process, kg.
    pub pending_entry_weight: f64,
}

/// Completed net weight for one month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyLandfill {
    pub month: String,
    pub net_weight: f64,
    pub tickets: usize,
}

fn is_completed(ticket: &LandfillTicketRecord) -> bool {
    ticket.status == TicketStatus::Completed && ticket.exit_weight.is_some()
}

/// Summarize tickets. A ticket without exit weight is never "completed".
pub fn summarize_tickets(tickets: &[LandfillTicketRecord]) -> LandfillSummary {
    let mut summary = LandfillSummary::default();

    for ticket in tickets {
        if ticket.status == TicketStatus::Cancelled {
            summary.cancelled += 1;
        } else if is_completed(ticket) {
            summary.completed += 1;
            summary.completed_net_total += ticket.net_for_totals();
        } else {
            summary.in_process += 1;
            summary.pending_entry_weight += ticket.entry_weight;
        }
    }

    summary
}

/// Completed net weight per `YYYY-MM`, ascending.
pub fn monthly_landfill_totals(tickets: &[LandfillTicketRecord]) -> Vec<MonthlyLandfill> {
    let mut buckets: BTreeMap<String, MonthlyLandfill> = BTreeMap::new();

    for ticket in tickets.iter().filter(|t| is_completed(t)) {
        let key = month_key(ticket.date);
        let bucket = buckets.entry(key.clone()).or_insert_with(|| MonthlyLandfill {
            month: key,
            net_weight: 0.0,
            tickets: 0,
        });
        bucket.net_weight += ticket.net_for_totals();
        bucket.tickets += 1;
    }

    buckets.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn create_ticket(id: &str, day: &str, entry: f64, exit: Option<f64>, status: TicketStatus) -> LandfillTicketRecord {
        LandfillTicketRecord {
            id: id.to_string(),
            date: NaiveDate::parse_from_str(day, "%Y-%m-%d").unwrap(),
            vessel: None,
            responsible: None,
            entry_weight: entry,
            exit_weight: exit,
            entry_time: None,
            exit_time: None,
            created_at: "2024-03-01T08:00:00Z".parse().unwrap(),
            status,
            observations: None,
            document_url: None,
        }
    }

    #[test]
    fn test_in_process_ticket_is_excluded_from_completed_totals() {
        let tickets = vec![create_ticket("1", "2024-03-01", 120.50, None, TicketStatus::InProcess)];

        let summary = summarize_tickets(&tickets);

        assert_eq!(summary.in_process, 1);
        assert_eq!(summary.completed, 0);
        assert_eq!(summary.completed_net_total, 0.0);
        assert_eq!(summary.pending_entry_weight, 120.50);
    }

    #[test]
    fn test_completed_net_is_exit_minus_entry() {
        let tickets = vec![
            create_ticket("1", "2024-03-01", 100.25, Some(350.5), TicketStatus::Completed),
            create_ticket("2", "2024-03-09", 80.0, Some(200.0), TicketStatus::Completed),
            create_ticket("3", "2024-03-10", 70.0, None, TicketStatus::Completed),
            create_ticket("4", "2024-03-11", 70.0, Some(90.0), TicketStatus::Cancelled),
        ];

        let summary = summarize_tickets(&tickets);

        assert_eq!(summary.completed, 2);
        assert_eq!(summary.in_process, 1);
        assert_eq!(summary.cancelled, 1);
        assert!((summary.completed_net_total - (250.25 + 120.0)).abs() < 1e-9);
    }

    #[test]
    fn test_monthly_landfill_totals() {
        let tickets = vec![
            create_ticket("1", "2024-04-02", 10.0, Some(30.0), TicketStatus::Completed),
            create_ticket("2", "2024-03-02", 10.0, Some(15.0), TicketStatus::Completed),
            create_ticket("3", "2024-04-20", 10.0, Some(12.0), TicketStatus::Completed),
            create_ticket("4", "2024-04-21", 10.0, None, TicketStatus::InProcess),
        ];

        let monthly = monthly_landfill_totals(&tickets);

        assert_eq!(monthly.len(), 2);
        assert_eq!(monthly[0].month, "2024-03");
        assert_eq!(monthly[0].net_weight, 5.0);
        assert_eq!(monthly[1].month, "2024-04");
        assert_eq!(monthly[1].net_weight, 22.0);
        assert_eq!(monthly[1].tickets, 2);
    }
}
