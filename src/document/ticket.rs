//! Landfill weigh ticket document.

use super::assets::{AssetLoader, ImageSet, ImageSource};
use super::layout::{Block, Field, ImageSlot, SignatureBox, SignatureRole};
use super::{render, ticket_file_name, ComposedDocument, DocumentContext, PENDING};
use crate::analysis::{UNASSIGNED, UNKNOWN_VESSEL};
use crate::models::LandfillTicketRecord;
use crate::store::RecordKind;
use chrono::{DateTime, NaiveDate, Utc};
use tracing::info;

pub const TICKET_TITLE: &str = "LANDFILL WEIGH TICKET";

const NO_OBSERVATIONS: &str = "No observations.";

fn format_time(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M UTC").to_string()
}

fn format_weight(kg: f64) -> String {
    format!("{:.2} kg", kg)
}

/// Blocks for a ticket page.
pub fn ticket_blocks(
    record: &LandfillTicketRecord,
    ctx: &DocumentContext,
    images: &ImageSet,
) -> Vec<Block> {
    let pending = || PENDING.to_string();

    let fields = vec![
        Field::new("Ticket number", record.id.as_str()),
        Field::new("Date", record.date.format("%Y-%m-%d").to_string()),
        Field::new("Vessel", record.vessel_name().unwrap_or(UNKNOWN_VESSEL)),
        Field::new("Entry time", format_time(record.effective_entry_time())),
        Field::new("Exit time", record.exit_time.map_or_else(pending, format_time)),
        Field::new("Entry weight", format_weight(record.entry_weight)),
        Field::new("Exit weight", record.exit_weight.map_or_else(pending, format_weight)),
        Field::new("Net deposited", record.net_deposited().map_or_else(pending, format_weight)),
        Field::new(
            "Responsible",
            record
                .responsible
                .as_ref()
                .map_or(UNASSIGNED, |p| p.name.as_str()),
        ),
        Field::new("Status", record.status.to_string()),
    ];

    let slot = ImageSlot::Signature(SignatureRole::Responsible);
    let signature = SignatureBox {
        slot,
        image: images.size(slot),
        name: record
            .responsible
            .as_ref()
            .map_or_else(|| UNASSIGNED.to_string(), |p| p.name.clone()),
        role: record
            .responsible
            .as_ref()
            .and_then(|p| p.role.clone())
            .unwrap_or_else(|| "Responsible".to_string()),
    };

    let observations = record
        .observations
        .as_deref()
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .unwrap_or(NO_OBSERVATIONS);

    vec![
        ctx.header(TICKET_TITLE, images),
        Block::Spacer(8.0),
        Block::SectionTitle("Weighing".to_string()),
        Block::FieldList(fields),
        Block::Spacer(16.0),
        Block::TwoBoxFooter {
            left_title: "Responsible party".to_string(),
            signature,
            right_title: "Observations".to_string(),
            right_text: observations.to_string(),
            max_lines: None,
        },
        Block::Spacer(12.0),
        Block::FooterText(ctx.footer_lines.clone()),
    ]
}

/// Compose the ticket PDF, optionally with the responsible party's signature.
pub async fn compose_ticket(
    record: &LandfillTicketRecord,
    signature: Option<&ImageSource>,
    ctx: &DocumentContext,
    loader: &AssetLoader,
    generated_on: NaiveDate,
) -> ComposedDocument {
    let mut requests = ctx.logo_requests();
    if let Some(source) = signature {
        requests.push((ImageSlot::Signature(SignatureRole::Responsible), source.clone()));
    }

    let images = loader.load_many(&requests).await;
    let blocks = ticket_blocks(record, ctx, &images);
    let title = format!("Landfill ticket {}", record.id);
    let bytes = render(ctx, &blocks, &images, &title);

    info!("Composed landfill ticket {} ({} bytes)", record.id, bytes.len());

    ComposedDocument {
        kind: RecordKind::Ticket,
        file_name: ticket_file_name(&record.id, generated_on),
        bytes,
        missing_images: requests.len() - images.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::document::layout::{layout, DrawOp};
    use crate::models::{Person, TicketStatus};
    use chrono::TimeZone;

    fn create_test_ticket() -> LandfillTicketRecord {
        LandfillTicketRecord {
            id: "31".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
            vessel: None,
            responsible: Some(Person {
                id: "p2".to_string(),
                name: "Jorge Pech".to_string(),
                role: None,
            }),
            entry_weight: 120.5,
            exit_weight: None,
            entry_time: None,
            exit_time: None,
            created_at: Utc.with_ymd_and_hms(2024, 3, 2, 9, 15, 0).unwrap(),
            status: TicketStatus::InProcess,
            observations: None,
            document_url: None,
        }
    }

    fn field<'a>(blocks: &'a [Block], label: &str) -> &'a str {
        blocks
            .iter()
            .find_map(|b| match b {
                Block::FieldList(fields) => fields.iter().find(|f| f.label == label),
                _ => None,
            })
            .map(|f| f.value.as_str())
            .unwrap()
    }

    #[test]
    fn test_in_process_ticket_shows_pending() {
        let ctx = DocumentContext::from_config(&Config::default());
        let blocks = ticket_blocks(&create_test_ticket(), &ctx, &ImageSet::default());

        assert_eq!(field(&blocks, "Exit time"), PENDING);
        assert_eq!(field(&blocks, "Exit weight"), PENDING);
        assert_eq!(field(&blocks, "Net deposited"), PENDING);
        assert_eq!(field(&blocks, "Entry weight"), "120.50 kg");
        assert_eq!(field(&blocks, "Entry time"), "2024-03-02 09:15 UTC");
        assert_eq!(field(&blocks, "Vessel"), UNKNOWN_VESSEL);
        assert_eq!(field(&blocks, "Responsible"), "Jorge Pech");
    }

    #[test]
    fn test_completed_ticket_shows_net() {
        let ctx = DocumentContext::from_config(&Config::default());
        let mut ticket = create_test_ticket();
        ticket.exit_weight = Some(420.75);
        ticket.exit_time = Some(Utc.with_ymd_and_hms(2024, 3, 2, 11, 0, 0).unwrap());
        ticket.status = TicketStatus::Completed;
        let blocks = ticket_blocks(&ticket, &ctx, &ImageSet::default());

        assert_eq!(field(&blocks, "Net deposited"), "300.25 kg");
        assert_eq!(field(&blocks, "Exit time"), "2024-03-02 11:00 UTC");
        assert_eq!(field(&blocks, "Status"), "Completed");
    }

    #[test]
    fn test_observations_are_wrapped_into_footer() {
        let ctx = DocumentContext::from_config(&Config::default());
        let mut ticket = create_test_ticket();
        ticket.observations = Some(
            "Load contained wet cardboard and had to be weighed twice because the first \
             reading was taken before the truck fully cleared the platform."
                .to_string(),
        );
        let blocks = ticket_blocks(&ticket, &ctx, &ImageSet::default());
        let laid_out = layout(&blocks, &ctx.page);

        let observation_lines = laid_out
            .ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Text { text, x, .. } if *x > ctx.page.center() && text != "Observations"))
            .count();
        assert!(observation_lines >= 2);
        assert!(laid_out.bottom <= ctx.page.bottom());
    }

    #[test]
    fn test_very_long_observations_keep_footer_on_page() {
        let ctx = DocumentContext::from_config(&Config::default());
        let mut ticket = create_test_ticket();
        ticket.observations = Some(
            "The truck waited at the gate while the scale was recalibrated and the load was \
             split into separate containers for oil filters and mixed galley waste. "
                .repeat(16),
        );
        let blocks = ticket_blocks(&ticket, &ctx, &ImageSet::default());
        let laid_out = layout(&blocks, &ctx.page);

        assert!(laid_out.bottom <= ctx.page.bottom() + 1e-3);
        assert!(laid_out
            .ops
            .iter()
            .all(|op| !matches!(op, DrawOp::Text { y, .. } if *y > ctx.page.bottom())));

        let footer = ctx.footer_lines.last().unwrap();
        assert!(laid_out
            .ops
            .iter()
            .any(|op| matches!(op, DrawOp::Text { text, .. } if text == footer)));
    }

    #[test]
    fn test_blank_observations_use_placeholder() {
        let ctx = DocumentContext::from_config(&Config::default());
        let mut ticket = create_test_ticket();
        ticket.observations = Some("   ".to_string());
        let blocks = ticket_blocks(&ticket, &ctx, &ImageSet::default());

        assert!(blocks.iter().any(|b| matches!(
            b,
            Block::TwoBoxFooter { right_text, .. } if right_text == NO_OBSERVATIONS
        )));
    }

    #[tokio::test]
    async fn test_compose_ticket_without_signature() {
        let ctx = DocumentContext::from_config(&Config::default());
        let loader = AssetLoader::new(1).unwrap();
        let document = compose_ticket(
            &create_test_ticket(),
            None,
            &ctx,
            &loader,
            NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
        )
        .await;

        assert!(document.bytes.starts_with(b"%PDF-"));
        assert!(String::from_utf8_lossy(&document.bytes).contains("/Count 1"));
        assert_eq!(document.kind, RecordKind::Ticket);
        assert_eq!(document.file_name, "Manifiesto_Basuron_31_2024-03-02.pdf");
    }
}
