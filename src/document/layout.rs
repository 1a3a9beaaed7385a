//! Declarative page layout.
//!
//! A document is a list of [`Block`]s. Each block knows its own height, so
//! [`layout`] can fold the list into absolute positions in one pass and emit
//! the [`DrawOp`]s a renderer needs. Coordinates are points from the top-left
//! corner of the page; text `y` is the baseline.

use super::metrics::{fit_text, text_width, wrap_text};

const HEADER_FIRST_SIZE: f32 = 11.0;
const HEADER_LINE_SIZE: f32 = 9.0;
const TITLE_SIZE: f32 = 13.0;
const SECTION_SIZE: f32 = 11.0;
const LABEL_SIZE: f32 = 8.0;
const BODY_SIZE: f32 = 9.0;
const CAPTION_SIZE: f32 = 8.0;
const FOOTER_SIZE: f32 = 7.0;

const HEADER_LINE_STEP: f32 = 12.0;
const TITLE_STEP: f32 = 18.0;
const SECTION_HEIGHT: f32 = 26.0;
const CELL_PADDING: f32 = 4.0;
const SIGNATURE_IMAGE_HEIGHT: f32 = 45.0;
const SIGNATURE_ROW_HEIGHT: f32 = SIGNATURE_IMAGE_HEIGHT + 36.0;
const FIELD_LABEL_COLUMN: f32 = 150.0;
const BOX_GAP: f32 = 12.0;
const BOX_PADDING: f32 = 8.0;
const BOX_LINE_STEP: f32 = 11.0;
const BOX_TEXT_OFFSET: f32 = 26.0;
const FOOTER_LINE_STEP: f32 = 9.0;

/// Page size, margins and the fixed row increment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
    pub row_height: f32,
}

impl PageGeometry {
    /// A4 portrait, in points.
    pub const A4: PageGeometry = PageGeometry {
        width: 595.28,
        height: 841.89,
        margin: 40.0,
        row_height: 18.0,
    };

    pub fn left(&self) -> f32 {
        self.margin
    }

    pub fn right(&self) -> f32 {
        self.width - self.margin
    }

    pub fn content_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    pub fn center(&self) -> f32 {
        self.width / 2.0
    }

    /// Lowest y content may reach.
    pub fn bottom(&self) -> f32 {
        self.height - self.margin
    }
}

/// Who a signature belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureRole {
    /// Port official receiving the residues.
    Recipient,
    /// Vessel operator delivering the residues.
    Operator,
    Witness,
    /// Person responsible for a landfill ticket.
    Responsible,
}

/// A named place an image may be drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageSlot {
    LeftLogo,
    RightLogo,
    Signature(SignatureRole),
}

/// Width and height; natural pixel size before fitting, points after.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageSize {
    pub width: f32,
    pub height: f32,
}

impl ImageSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Scale to `height`, keeping the aspect ratio.
    pub fn scaled_to_height(&self, height: f32) -> ImageSize {
        if self.height <= 0.0 {
            return ImageSize::new(0.0, 0.0);
        }
        ImageSize::new(self.width * height / self.height, height)
    }

    /// Largest size with this aspect ratio inside `max_width` x `max_height`.
    pub fn fit_within(&self, max_width: f32, max_height: f32) -> ImageSize {
        if self.width <= 0.0 || self.height <= 0.0 {
            return ImageSize::new(0.0, 0.0);
        }
        let scale = (max_width / self.width).min(max_height / self.height);
        ImageSize::new(self.width * scale, self.height * scale)
    }
}

/// A primitive drawing instruction in page coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text {
        x: f32,
        y: f32,
        size: f32,
        bold: bool,
        text: String,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        width: f32,
    },
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        line_width: f32,
    },
    Image {
        slot: ImageSlot,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
}

/// A label/value pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub label: String,
    pub value: String,
}

impl Field {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// A logo position; `size` is `None` when the image could not be loaded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Logo {
    pub slot: ImageSlot,
    pub size: Option<ImageSize>,
}

/// One signature area: optional image above a baseline, captions below.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureBox {
    pub slot: ImageSlot,
    pub image: Option<ImageSize>,
    pub name: String,
    pub role: String,
}

/// Layout building blocks, stacked top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// Institutional header: logos at both sides, centered text.
    Header {
        lines: Vec<String>,
        title: String,
        logo_height: f32,
        left: Logo,
        right: Logo,
    },
    /// Bold title with a rule beneath it.
    SectionTitle(String),
    /// Bordered two-column grid of fields.
    FieldGrid(Vec<Field>),
    /// Label/value rows separated by thin lines.
    ItemTable(Vec<Field>),
    /// Signature areas side by side.
    SignatureRow(Vec<SignatureBox>),
    /// Single column of labeled fields.
    FieldList(Vec<Field>),
    /// Responsible-party box next to a word-wrapped text box.
    ///
    /// `max_lines` caps the wrapped text; [`layout`] sets it when the page
    /// would otherwise overflow.
    TwoBoxFooter {
        left_title: String,
        signature: SignatureBox,
        right_title: String,
        right_text: String,
        max_lines: Option<usize>,
    },
    /// Small centered lines (legal and contact text).
    FooterText(Vec<String>),
    Spacer(f32),
}

impl Block {
    /// Height this block occupies on `page`.
    pub fn height(&self, page: &PageGeometry) -> f32 {
        match self {
            Block::Header {
                lines, logo_height, ..
            } => {
                let text = lines.len() as f32 * HEADER_LINE_STEP + TITLE_STEP;
                text.max(*logo_height) + 10.0
            }
            Block::SectionTitle(_) => SECTION_HEIGHT,
            Block::FieldGrid(fields) => fields.len().div_ceil(2) as f32 * page.row_height,
            Block::ItemTable(rows) | Block::FieldList(rows) => rows.len() as f32 * page.row_height,
            Block::SignatureRow(_) => SIGNATURE_ROW_HEIGHT,
            Block::TwoBoxFooter {
                right_text,
                max_lines,
                ..
            } => {
                let lines = box_lines(right_text, *max_lines, page).len();
                two_box_height(lines)
            }
            Block::FooterText(lines) => {
                footer_lines(lines, page).len() as f32 * FOOTER_LINE_STEP + 8.0
            }
            Block::Spacer(height) => *height,
        }
    }

    fn draw(&self, top: f32, page: &PageGeometry, ops: &mut Vec<DrawOp>) {
        match self {
            Block::Header {
                lines,
                title,
                logo_height,
                left,
                right,
            } => draw_header(lines, title, *logo_height, left, right, top, page, ops),
            Block::SectionTitle(title) => {
                ops.push(text(page.left(), top + 15.0, SECTION_SIZE, true, title));
                ops.push(line(page.left(), top + 20.0, page.right(), top + 20.0, 0.6));
            }
            Block::FieldGrid(fields) => draw_field_grid(fields, top, page, ops),
            Block::ItemTable(rows) => draw_item_table(rows, top, page, ops),
            Block::SignatureRow(boxes) => {
                let column = page.content_width() / boxes.len().max(1) as f32;
                for (i, signature) in boxes.iter().enumerate() {
                    let x = page.left() + i as f32 * column;
                    draw_signature(signature, x, top, column, ops);
                }
            }
            Block::FieldList(fields) => {
                let value_width = page.content_width() - FIELD_LABEL_COLUMN;
                for (i, field) in fields.iter().enumerate() {
                    let baseline = top + i as f32 * page.row_height + 12.0;
                    ops.push(text(page.left(), baseline, BODY_SIZE, true, &field.label));
                    let value = fit_text(&field.value, BODY_SIZE, false, value_width);
                    ops.push(text(page.left() + FIELD_LABEL_COLUMN, baseline, BODY_SIZE, false, &value));
                }
            }
            Block::TwoBoxFooter {
                left_title,
                signature,
                right_title,
                right_text,
                max_lines,
            } => {
                let height = self.height(page) - 6.0;
                let width = box_width(page);
                let right_x = page.left() + width + BOX_GAP;

                ops.push(rect(page.left(), top, width, height));
                ops.push(text(page.left() + BOX_PADDING, top + 14.0, BODY_SIZE, true, left_title));
                draw_signature(signature, page.left(), top + 20.0, width, ops);

                ops.push(rect(right_x, top, width, height));
                ops.push(text(right_x + BOX_PADDING, top + 14.0, BODY_SIZE, true, right_title));
                let wrapped = box_lines(right_text, *max_lines, page);
                for (i, content) in wrapped.iter().enumerate() {
                    let baseline = top + 18.0 + (i + 1) as f32 * BOX_LINE_STEP;
                    ops.push(text(right_x + BOX_PADDING, baseline, BODY_SIZE, false, content));
                }
            }
            Block::FooterText(lines) => {
                for (i, content) in footer_lines(lines, page).iter().enumerate() {
                    let baseline = top + 4.0 + (i + 1) as f32 * FOOTER_LINE_STEP;
                    ops.push(centered(content, FOOTER_SIZE, false, page.center(), baseline));
                }
            }
            Block::Spacer(_) => {}
        }
    }

    /// A copy of this block at most `excess` points shorter, if it can shrink.
    fn shrunk_by(&self, excess: f32, page: &PageGeometry) -> Option<Block> {
        match self {
            Block::TwoBoxFooter {
                left_title,
                signature,
                right_title,
                right_text,
                max_lines,
            } => {
                let current = box_lines(right_text, *max_lines, page).len();
                let target = self.height(page) - excess - 6.0 - BOX_TEXT_OFFSET;
                let fitting = ((target / BOX_LINE_STEP).floor().max(1.0)) as usize;
                (fitting < current).then(|| Block::TwoBoxFooter {
                    left_title: left_title.clone(),
                    signature: signature.clone(),
                    right_title: right_title.clone(),
                    right_text: right_text.clone(),
                    max_lines: Some(fitting),
                })
            }
            _ => None,
        }
    }
}

fn two_box_height(text_lines: usize) -> f32 {
    let right = BOX_TEXT_OFFSET + text_lines as f32 * BOX_LINE_STEP;
    let left = 20.0 + SIGNATURE_ROW_HEIGHT;
    left.max(right) + 6.0
}

/// Wrapped box text, cut to `max_lines` with a trailing ellipsis.
fn box_lines(content: &str, max_lines: Option<usize>, page: &PageGeometry) -> Vec<String> {
    let width = box_text_width(page);
    let mut lines = wrap_text(content, BODY_SIZE, false, width);

    if let Some(max) = max_lines {
        let max = max.max(1);
        if lines.len() > max {
            lines.truncate(max);
            if let Some(last) = lines.last_mut() {
                *last = fit_text(&format!("{}...", last), BODY_SIZE, false, width);
            }
        }
    }
    lines
}

fn box_width(page: &PageGeometry) -> f32 {
    (page.content_width() - BOX_GAP) / 2.0
}

fn box_text_width(page: &PageGeometry) -> f32 {
    box_width(page) - 2.0 * BOX_PADDING
}

fn footer_lines(lines: &[String], page: &PageGeometry) -> Vec<String> {
    lines
        .iter()
        .flat_map(|l| wrap_text(l, FOOTER_SIZE, false, page.content_width()))
        .collect()
}

fn text(x: f32, y: f32, size: f32, bold: bool, content: &str) -> DrawOp {
    DrawOp::Text {
        x,
        y,
        size,
        bold,
        text: content.to_string(),
    }
}

fn centered(content: &str, size: f32, bold: bool, center: f32, y: f32) -> DrawOp {
    let x = center - text_width(content, size, bold) / 2.0;
    text(x, y, size, bold, content)
}

fn line(x1: f32, y1: f32, x2: f32, y2: f32, width: f32) -> DrawOp {
    DrawOp::Line {
        x1,
        y1,
        x2,
        y2,
        width,
    }
}

fn rect(x: f32, y: f32, width: f32, height: f32) -> DrawOp {
    DrawOp::Rect {
        x,
        y,
        width,
        height,
        line_width: 0.5,
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_header(
    lines: &[String],
    title: &str,
    logo_height: f32,
    left: &Logo,
    right: &Logo,
    top: f32,
    page: &PageGeometry,
    ops: &mut Vec<DrawOp>,
) {
    let mut widest: f32 = 0.0;

    if let Some(size) = left.size {
        let scaled = size.scaled_to_height(logo_height);
        widest = widest.max(scaled.width);
        ops.push(DrawOp::Image {
            slot: left.slot,
            x: page.left(),
            y: top,
            width: scaled.width,
            height: scaled.height,
        });
    }
    if let Some(size) = right.size {
        let scaled = size.scaled_to_height(logo_height);
        widest = widest.max(scaled.width);
        ops.push(DrawOp::Image {
            slot: right.slot,
            x: page.right() - scaled.width,
            y: top,
            width: scaled.width,
            height: scaled.height,
        });
    }

    // Header text keeps at least half the content width.
    let text_width_limit = (page.content_width() - 2.0 * (widest + CELL_PADDING))
        .max(page.content_width() / 2.0);
    let mut baseline = top;
    for (i, content) in lines.iter().enumerate() {
        baseline += HEADER_LINE_STEP;
        let (size, bold) = if i == 0 {
            (HEADER_FIRST_SIZE, true)
        } else {
            (HEADER_LINE_SIZE, false)
        };
        let fitted = fit_text(content, size, bold, text_width_limit);
        ops.push(centered(&fitted, size, bold, page.center(), baseline));
    }
    baseline += TITLE_STEP;
    let fitted = fit_text(title, TITLE_SIZE, true, text_width_limit);
    ops.push(centered(&fitted, TITLE_SIZE, true, page.center(), baseline));

    let rule = top + (lines.len() as f32 * HEADER_LINE_STEP + TITLE_STEP).max(logo_height) + 6.0;
    ops.push(line(page.left(), rule, page.right(), rule, 0.8));
}

fn draw_field_grid(fields: &[Field], top: f32, page: &PageGeometry, ops: &mut Vec<DrawOp>) {
    let column = page.content_width() / 2.0;
    let cells = fields.len().div_ceil(2) * 2;

    for i in 0..cells {
        let x = page.left() + (i % 2) as f32 * column;
        let y = top + (i / 2) as f32 * page.row_height;
        ops.push(rect(x, y, column, page.row_height));

        if let Some(field) = fields.get(i) {
            let label = format!("{}:", field.label);
            let baseline = y + 12.0;
            ops.push(text(x + CELL_PADDING, baseline, LABEL_SIZE, true, &label));

            let value_x = x + CELL_PADDING * 2.0 + text_width(&label, LABEL_SIZE, true);
            let available = column - (value_x - x) - CELL_PADDING;
            let value = fit_text(&field.value, BODY_SIZE, false, available);
            ops.push(text(value_x, baseline, BODY_SIZE, false, &value));
        }
    }
}

fn draw_item_table(rows: &[Field], top: f32, page: &PageGeometry, ops: &mut Vec<DrawOp>) {
    for (i, row) in rows.iter().enumerate() {
        let y = top + i as f32 * page.row_height;
        let baseline = y + 12.0;
        ops.push(text(page.left() + CELL_PADDING, baseline, BODY_SIZE, false, &row.label));

        let value_x = page.right() - CELL_PADDING - text_width(&row.value, BODY_SIZE, true);
        ops.push(text(value_x, baseline, BODY_SIZE, true, &row.value));

        let separator = y + page.row_height;
        ops.push(line(page.left(), separator, page.right(), separator, 0.3));
    }
}

fn draw_signature(signature: &SignatureBox, x: f32, top: f32, width: f32, ops: &mut Vec<DrawOp>) {
    let inset = 10.0;

    if let Some(size) = signature.image {
        let fitted = size.fit_within(width - 2.0 * inset, SIGNATURE_IMAGE_HEIGHT);
        ops.push(DrawOp::Image {
            slot: signature.slot,
            x: x + (width - fitted.width) / 2.0,
            y: top + SIGNATURE_IMAGE_HEIGHT - fitted.height,
            width: fitted.width,
            height: fitted.height,
        });
    }

    let baseline = top + SIGNATURE_IMAGE_HEIGHT + 4.0;
    ops.push(line(x + inset, baseline, x + width - inset, baseline, 0.7));

    let center = x + width / 2.0;
    let caption_width = width - 2.0 * inset;
    let name = fit_text(&signature.name, CAPTION_SIZE, true, caption_width);
    ops.push(centered(&name, CAPTION_SIZE, true, center, baseline + 14.0));
    let role = fit_text(&signature.role, CAPTION_SIZE, false, caption_width);
    ops.push(centered(&role, CAPTION_SIZE, false, center, baseline + 25.0));
}

/// Result of laying out a page.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub ops: Vec<DrawOp>,
    /// Top edge of every block, in input order.
    pub tops: Vec<f32>,
    /// Cursor position after the last block.
    pub bottom: f32,
}

/// Fold blocks into absolute positions starting at the top margin.
///
/// When the blocks are taller than the page, the first block that can
/// shrink (the observations box) is cut down to make them fit.
pub fn layout(blocks: &[Block], page: &PageGeometry) -> Layout {
    let total: f32 = blocks.iter().map(|b| b.height(page)).sum();
    let mut excess = page.margin + total - page.bottom();

    let mut cursor = page.margin;
    let mut tops = Vec::with_capacity(blocks.len());
    let mut ops = Vec::new();

    for block in blocks {
        let shrunk = if excess > 0.0 {
            block.shrunk_by(excess, page)
        } else {
            None
        };
        if let Some(ref smaller) = shrunk {
            excess -= block.height(page) - smaller.height(page);
        }
        let block = shrunk.as_ref().unwrap_or(block);

        tops.push(cursor);
        block.draw(cursor, page, &mut ops);
        cursor += block.height(page);
    }

    Layout {
        ops,
        tops,
        bottom: cursor,
    }
}
