//! Waste reception manifest document.

use super::assets::{AssetLoader, ImageSet, ImageSource};
use super::layout::{Block, Field, ImageSlot, SignatureBox, SignatureRole};
use super::{manifest_file_name, render, ComposedDocument, DocumentContext};
use crate::analysis::{UNASSIGNED, UNKNOWN_VESSEL};
use crate::models::{ManifestRecord, Person, ResidueCategory};
use crate::store::RecordKind;
use chrono::NaiveDate;
use tracing::info;

pub const MANIFEST_TITLE: &str = "WASTE RECEPTION MANIFEST";

/// Categories printed in the residue table, in print order.
const TABLE_CATEGORIES: [ResidueCategory; 5] = [
    ResidueCategory::UsedOil,
    ResidueCategory::OilFilters,
    ResidueCategory::DieselFilters,
    ResidueCategory::AirFilters,
    ResidueCategory::GeneralWaste,
];

/// One signatory column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignatureParty {
    pub name: String,
    pub role: String,
    pub image: Option<ImageSource>,
}

/// The three signature columns of a manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestSignatures {
    pub recipient: SignatureParty,
    pub operator: SignatureParty,
    pub witness: SignatureParty,
}

impl ManifestSignatures {
    /// Parties for `record` without any signature images: the configured
    /// recipient official, the principal responsible as delivering operator
    /// and the secondary responsible as witness.
    pub fn for_record(record: &ManifestRecord, ctx: &DocumentContext) -> Self {
        Self {
            recipient: SignatureParty {
                name: ctx.recipient_name.clone(),
                role: ctx.recipient_role.clone(),
                image: None,
            },
            operator: party(record.principal.as_ref(), "Delivering operator"),
            witness: party(record.secondary.as_ref(), "Witness"),
        }
    }

    pub fn party_mut(&mut self, role: SignatureRole) -> Option<&mut SignatureParty> {
        match role {
            SignatureRole::Recipient => Some(&mut self.recipient),
            SignatureRole::Operator => Some(&mut self.operator),
            SignatureRole::Witness => Some(&mut self.witness),
            SignatureRole::Responsible => None,
        }
    }

    fn columns(&self) -> [(SignatureRole, &SignatureParty); 3] {
        [
            (SignatureRole::Recipient, &self.recipient),
            (SignatureRole::Operator, &self.operator),
            (SignatureRole::Witness, &self.witness),
        ]
    }
}

fn party(person: Option<&Person>, fallback_role: &str) -> SignatureParty {
    SignatureParty {
        name: person.map_or_else(|| UNASSIGNED.to_string(), |p| p.name.clone()),
        role: fallback_role.to_string(),
        image: None,
    }
}

fn format_quantity(category: ResidueCategory, quantity: f64) -> String {
    match category {
        ResidueCategory::OilFilters | ResidueCategory::DieselFilters | ResidueCategory::AirFilters => {
            format!("{:.0} {}", quantity, category.unit())
        }
        _ => format!("{:.2} {}", quantity, category.unit()),
    }
}

/// Blocks for a manifest page; `images` supplies sizes for loaded slots.
pub fn manifest_blocks(
    record: &ManifestRecord,
    signatures: &ManifestSignatures,
    ctx: &DocumentContext,
    images: &ImageSet,
    generated_on: NaiveDate,
) -> Vec<Block> {
    let vessel = record.vessel.as_ref();
    let responsible = |p: Option<&Person>| p.map_or_else(|| UNASSIGNED.to_string(), |p| p.name.clone());

    let fields = vec![
        Field::new("Folio", record.folio.as_str()),
        Field::new("Issue date", record.issue_date.format("%Y-%m-%d").to_string()),
        Field::new("Vessel", record.vessel_name().unwrap_or(UNKNOWN_VESSEL)),
        Field::new(
            "Registration",
            vessel.and_then(|v| v.registration.as_deref()).unwrap_or("-"),
        ),
        Field::new("Principal", responsible(record.principal.as_ref())),
        Field::new("Secondary", responsible(record.secondary.as_ref())),
        Field::new("Status", record.digitization_status.to_string()),
        Field::new("Generated", generated_on.format("%Y-%m-%d").to_string()),
    ];

    let residues = record.residues_or_zero();
    let rows = TABLE_CATEGORIES
        .iter()
        .map(|&c| Field::new(c.label(), format_quantity(c, residues.quantity(c))))
        .collect();

    let signature_row = signatures
        .columns()
        .into_iter()
        .map(|(role, party)| {
            let slot = ImageSlot::Signature(role);
            SignatureBox {
                slot,
                image: images.size(slot),
                name: party.name.clone(),
                role: party.role.clone(),
            }
        })
        .collect();

    vec![
        ctx.header(MANIFEST_TITLE, images),
        Block::Spacer(8.0),
        Block::SectionTitle("General information".to_string()),
        Block::FieldGrid(fields),
        Block::Spacer(12.0),
        Block::SectionTitle("Residues received".to_string()),
        Block::ItemTable(rows),
        Block::Spacer(24.0),
        Block::SectionTitle("Signatures".to_string()),
        Block::Spacer(16.0),
        Block::SignatureRow(signature_row),
    ]
}

/// Compose the manifest PDF for `record`.
///
/// Logos and signature images load concurrently; any that fail are left
/// blank.
pub async fn compose_manifest(
    record: &ManifestRecord,
    signatures: &ManifestSignatures,
    ctx: &DocumentContext,
    loader: &AssetLoader,
    generated_on: NaiveDate,
) -> ComposedDocument {
    let mut requests = ctx.logo_requests();
    for (role, party) in signatures.columns() {
        if let Some(ref source) = party.image {
            requests.push((ImageSlot::Signature(role), source.clone()));
        }
    }

    let images = loader.load_many(&requests).await;
    let blocks = manifest_blocks(record, signatures, ctx, &images, generated_on);
    let title = format!("Manifest {}", record.folio);
    let bytes = render(ctx, &blocks, &images, &title);

    info!(
        "Composed manifest {} ({} bytes, {}/{} images)",
        record.folio,
        bytes.len(),
        images.len(),
        requests.len()
    );

    ComposedDocument {
        kind: RecordKind::Manifest,
        file_name: manifest_file_name(&record.folio, generated_on),
        bytes,
        missing_images: requests.len() - images.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::document::layout::{layout, DrawOp};
    use crate::models::{DigitizationStatus, ResidueBreakdown, VesselRecord, VesselStatus};
    use std::path::PathBuf;

    fn create_test_manifest() -> ManifestRecord {
        ManifestRecord {
            id: "7".to_string(),
            folio: "MAN-2024/007".to_string(),
            issue_date: NaiveDate::from_ymd_opt(2024, 1, 20).unwrap(),
            vessel: Some(VesselRecord {
                id: "v1".to_string(),
                name: "Estrella del Mar".to_string(),
                registration: Some("PC-1234".to_string()),
                status: VesselStatus::Active,
                registration_complete: true,
            }),
            principal: Some(Person {
                id: "p1".to_string(),
                name: "Ana Ruiz".to_string(),
                role: Some("Captain".to_string()),
            }),
            secondary: None,
            residues: Some(ResidueBreakdown {
                used_oil: 5.0,
                oil_filters: 3.0,
                general_waste: 2.0,
                ..ResidueBreakdown::default()
            }),
            digitization_status: DigitizationStatus::InProcess,
            created_at: None,
            document_url: None,
        }
    }

    fn ctx() -> DocumentContext {
        DocumentContext::from_config(&Config::default())
    }

    fn texts(blocks: &[Block], ctx: &DocumentContext) -> Vec<String> {
        layout(blocks, &ctx.page)
            .ops
            .into_iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_signatures_default_to_record_parties() {
        let ctx = ctx();
        let signatures = ManifestSignatures::for_record(&create_test_manifest(), &ctx);

        assert_eq!(signatures.recipient.name, ctx.recipient_name);
        assert_eq!(signatures.operator.name, "Ana Ruiz");
        assert_eq!(signatures.witness.name, UNASSIGNED);
    }

    #[test]
    fn test_manifest_blocks_content() {
        let ctx = ctx();
        let record = create_test_manifest();
        let signatures = ManifestSignatures::for_record(&record, &ctx);
        let blocks = manifest_blocks(
            &record,
            &signatures,
            &ctx,
            &ImageSet::default(),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        );
        let texts = texts(&blocks, &ctx);

        assert!(texts.contains(&MANIFEST_TITLE.to_string()));
        assert!(texts.contains(&"MAN-2024/007".to_string()));
        assert!(texts.contains(&"Estrella del Mar".to_string()));
        assert!(texts.contains(&"5.00 liters".to_string()));
        assert!(texts.contains(&"3 pcs".to_string()));
        assert!(texts.contains(&"2.00 kg".to_string()));

        let table = blocks
            .iter()
            .find_map(|b| match b {
                Block::ItemTable(rows) => Some(rows.len()),
                _ => None,
            })
            .unwrap();
        assert_eq!(table, 5);
    }

    #[test]
    fn test_missing_breakdown_prints_zeroes() {
        let ctx = ctx();
        let mut record = create_test_manifest();
        record.residues = None;
        record.vessel = None;
        let signatures = ManifestSignatures::for_record(&record, &ctx);
        let blocks = manifest_blocks(
            &record,
            &signatures,
            &ctx,
            &ImageSet::default(),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        );
        let texts = texts(&blocks, &ctx);

        assert!(texts.contains(&"0.00 liters".to_string()));
        assert!(texts.contains(&UNKNOWN_VESSEL.to_string()));
    }

    #[tokio::test]
    async fn test_compose_without_signatures_is_one_page() {
        let ctx = ctx();
        let record = create_test_manifest();
        let signatures = ManifestSignatures::for_record(&record, &ctx);
        let loader = AssetLoader::new(1).unwrap();

        let document = compose_manifest(
            &record,
            &signatures,
            &ctx,
            &loader,
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        )
        .await;
        let text = String::from_utf8_lossy(&document.bytes);

        assert!(document.bytes.starts_with(b"%PDF-"));
        assert!(text.contains("/Count 1"));
        assert!(!text.contains("/Subtype /Image"));
        assert_eq!(document.missing_images, 0);
        assert_eq!(document.file_name, "manifiesto_MAN-2024-007_2024-02-01.pdf");
    }

    #[tokio::test]
    async fn test_compose_counts_missing_signature_images() {
        let ctx = ctx();
        let record = create_test_manifest();
        let mut signatures = ManifestSignatures::for_record(&record, &ctx);
        if let Some(party) = signatures.party_mut(SignatureRole::Witness) {
            party.image = Some(ImageSource::Path(PathBuf::from("/nonexistent/sig.png")));
        }
        let loader = AssetLoader::new(1).unwrap();

        let document = compose_manifest(
            &record,
            &signatures,
            &ctx,
            &loader,
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        )
        .await;

        assert_eq!(document.missing_images, 1);
        assert!(String::from_utf8_lossy(&document.bytes).contains("/Count 1"));
    }
}
