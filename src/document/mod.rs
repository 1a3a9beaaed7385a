//! Document composition.
//!
//! Composers turn one record into a list of layout blocks, [`layout`] folds
//! them into draw operations and [`pdf`] renders those to a single A4 page.

pub mod assets;
pub mod layout;
pub mod manifest;
pub mod metrics;
pub mod pdf;
pub mod ticket;

pub use assets::{AssetLoader, ImageSource};
pub use layout::{PageGeometry, SignatureRole};
pub use manifest::{compose_manifest, ManifestSignatures};
pub use ticket::compose_ticket;

use crate::config::Config;
use crate::store::RecordKind;
use assets::ImageSet;
use chrono::NaiveDate;
use layout::{Block, ImageSlot, Logo};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Printed wherever exit data has not been recorded yet.
pub const PENDING: &str = "Pending";

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Everything a composer needs besides the record itself.
///
/// Built once from [`Config`] and passed by reference.
#[derive(Debug, Clone)]
pub struct DocumentContext {
    pub page: PageGeometry,
    pub header_lines: Vec<String>,
    pub left_logo: Option<ImageSource>,
    pub right_logo: Option<ImageSource>,
    pub logo_height: f32,
    pub recipient_name: String,
    pub recipient_role: String,
    pub footer_lines: Vec<String>,
}

impl DocumentContext {
    pub fn from_config(config: &Config) -> Self {
        let institution = &config.institution;
        Self {
            page: PageGeometry::A4,
            header_lines: institution.header_lines.clone(),
            left_logo: institution.left_logo.as_deref().map(ImageSource::parse),
            right_logo: institution.right_logo.as_deref().map(ImageSource::parse),
            logo_height: config.assets.logo_height,
            recipient_name: institution.recipient_name.clone(),
            recipient_role: institution.recipient_role.clone(),
            footer_lines: institution.footer_lines.clone(),
        }
    }

    fn logo_requests(&self) -> Vec<(ImageSlot, ImageSource)> {
        [
            (ImageSlot::LeftLogo, &self.left_logo),
            (ImageSlot::RightLogo, &self.right_logo),
        ]
        .into_iter()
        .filter_map(|(slot, source)| source.clone().map(|s| (slot, s)))
        .collect()
    }

    fn header(&self, title: &str, images: &ImageSet) -> Block {
        Block::Header {
            lines: self.header_lines.clone(),
            title: title.to_string(),
            logo_height: self.logo_height,
            left: Logo {
                slot: ImageSlot::LeftLogo,
                size: images.size(ImageSlot::LeftLogo),
            },
            right: Logo {
                slot: ImageSlot::RightLogo,
                size: images.size(ImageSlot::RightLogo),
            },
        }
    }
}

/// A rendered document ready to save or upload.
#[derive(Debug, Clone)]
pub struct ComposedDocument {
    pub kind: RecordKind,
    pub file_name: String,
    pub bytes: Vec<u8>,
    /// Images that were requested but could not be loaded.
    pub missing_images: usize,
}

impl ComposedDocument {
    /// Write the document into `dir`, creating it if needed.
    pub async fn save(&self, dir: &Path) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(&self.file_name);
        tokio::fs::write(&path, &self.bytes).await?;
        Ok(path)
    }
}

/// Lay out `blocks` and render them with `images`.
fn render(ctx: &DocumentContext, blocks: &[Block], images: &ImageSet, title: &str) -> Vec<u8> {
    let laid_out = layout::layout(blocks, &ctx.page);
    if laid_out.bottom > ctx.page.bottom() {
        warn!(
            "{} overflows the page by {:.1}pt",
            title,
            laid_out.bottom - ctx.page.bottom()
        );
    }
    pdf::render_page(&ctx.page, &laid_out.ops, images, title)
}

/// `manifiesto_<folio>_<YYYY-MM-DD>.pdf`
pub fn manifest_file_name(folio: &str, date: NaiveDate) -> String {
    format!("manifiesto_{}_{}.pdf", sanitize(folio), date.format("%Y-%m-%d"))
}

/// `Manifiesto_Basuron_<id>_<YYYY-MM-DD>.pdf`
pub fn ticket_file_name(id: &str, date: NaiveDate) -> String {
    format!(
        "Manifiesto_Basuron_{}_{}.pdf",
        sanitize(id),
        date.format("%Y-%m-%d")
    )
}

fn sanitize(part: &str) -> String {
    part.trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' => '-',
            c if c.is_whitespace() => '-',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(
            manifest_file_name("MAN/2024 01", date),
            "manifiesto_MAN-2024-01_2024-03-09.pdf"
        );
        assert_eq!(
            ticket_file_name("42", date),
            "Manifiesto_Basuron_42_2024-03-09.pdf"
        );
    }

    #[test]
    fn test_context_from_config() {
        let mut config = Config::default();
        config.institution.left_logo = Some("https://example.org/left.png".to_string());
        let ctx = DocumentContext::from_config(&config);

        assert_eq!(ctx.logo_requests().len(), 1);
        assert_eq!(ctx.logo_requests()[0].0, ImageSlot::LeftLogo);
        assert_eq!(ctx.recipient_name, config.institution.recipient_name);
        assert_eq!(ctx.page, PageGeometry::A4);
    }

    #[tokio::test]
    async fn test_save_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let document = ComposedDocument {
            kind: RecordKind::Manifest,
            file_name: "manifiesto_1_2024-01-01.pdf".to_string(),
            bytes: b"%PDF-1.7".to_vec(),
            missing_images: 0,
        };

        let path = document.save(&dir.path().join("out")).await.unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"%PDF-1.7");
    }
}
