//! Single-page PDF rendering of laid-out draw operations.

use super::assets::ImageSet;
use super::layout::{DrawOp, ImageSlot, PageGeometry};
use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect, Ref, Str, TextStr};
use std::collections::HashMap;

const REGULAR_FONT: Name<'static> = Name(b"F1");
const BOLD_FONT: Name<'static> = Name(b"F2");

struct RefAllocator(i32);

impl RefAllocator {
    fn next(&mut self) -> Ref {
        self.0 += 1;
        Ref::new(self.0)
    }
}

/// Render one page. Image ops whose slot has no loaded image are skipped.
pub fn render_page(page: &PageGeometry, ops: &[DrawOp], images: &ImageSet, title: &str) -> Vec<u8> {
    let mut refs = RefAllocator(0);
    let catalog_id = refs.next();
    let tree_id = refs.next();
    let page_id = refs.next();
    let content_id = refs.next();
    let regular_id = refs.next();
    let bold_id = refs.next();
    let info_id = refs.next();

    // One XObject per slot actually drawn, named Im1, Im2, ...
    let mut xobjects: HashMap<ImageSlot, (String, Ref)> = HashMap::new();
    for op in ops {
        if let DrawOp::Image { slot, .. } = op {
            if images.get(*slot).is_some() && !xobjects.contains_key(slot) {
                let name = format!("Im{}", xobjects.len() + 1);
                xobjects.insert(*slot, (name, refs.next()));
            }
        }
    }

    let mut pdf = Pdf::new();
    pdf.catalog(catalog_id).pages(tree_id);
    pdf.pages(tree_id).kids([page_id]).count(1);

    {
        let mut pdf_page = pdf.page(page_id);
        pdf_page.media_box(Rect::new(0.0, 0.0, page.width, page.height));
        pdf_page.parent(tree_id);
        pdf_page.contents(content_id);

        let mut resources = pdf_page.resources();
        resources
            .fonts()
            .pair(REGULAR_FONT, regular_id)
            .pair(BOLD_FONT, bold_id);
        if !xobjects.is_empty() {
            let mut dict = resources.x_objects();
            for (name, id) in xobjects.values() {
                dict.pair(Name(name.as_bytes()), *id);
            }
            dict.finish();
        }
        resources.finish();
        pdf_page.finish();
    }

    pdf.type1_font(regular_id)
        .base_font(Name(b"Helvetica"))
        .encoding_predefined(Name(b"WinAnsiEncoding"));
    pdf.type1_font(bold_id)
        .base_font(Name(b"Helvetica-Bold"))
        .encoding_predefined(Name(b"WinAnsiEncoding"));

    let content = draw_content(page, ops, &xobjects);
    pdf.stream(content_id, &content);

    for (slot, (_, id)) in &xobjects {
        if let Some(image) = images.get(*slot) {
            let mask_id = image.alpha.as_ref().map(|_| refs.next());

            {
                let mut xobject = pdf.image_xobject(*id, &image.rgb);
                xobject.filter(Filter::FlateDecode);
                xobject.width(image.width as i32);
                xobject.height(image.height as i32);
                xobject.color_space().device_rgb();
                xobject.bits_per_component(8);
                if let Some(mask_id) = mask_id {
                    xobject.s_mask(mask_id);
                }
            }

            if let (Some(mask_id), Some(alpha)) = (mask_id, image.alpha.as_ref()) {
                let mut mask = pdf.image_xobject(mask_id, alpha);
                mask.filter(Filter::FlateDecode);
                mask.width(image.width as i32);
                mask.height(image.height as i32);
                mask.color_space().device_gray();
                mask.bits_per_component(8);
            }
        }
    }

    pdf.document_info(info_id)
        .title(TextStr(title))
        .producer(TextStr("manifiesto"));

    pdf.finish()
}

fn draw_content(
    page: &PageGeometry,
    ops: &[DrawOp],
    xobjects: &HashMap<ImageSlot, (String, Ref)>,
) -> Vec<u8> {
    let flip = |y: f32| page.height - y;
    let mut content = Content::new();

    for op in ops {
        match op {
            DrawOp::Text {
                x,
                y,
                size,
                bold,
                text,
            } => {
                let font = if *bold { BOLD_FONT } else { REGULAR_FONT };
                content.begin_text();
                content.set_font(font, *size);
                content.next_line(*x, flip(*y));
                content.show(Str(&encode_win_ansi(text)));
                content.end_text();
            }
            DrawOp::Line {
                x1,
                y1,
                x2,
                y2,
                width,
            } => {
                content.set_line_width(*width);
                content.move_to(*x1, flip(*y1));
                content.line_to(*x2, flip(*y2));
                content.stroke();
            }
            DrawOp::Rect {
                x,
                y,
                width,
                height,
                line_width,
            } => {
                content.set_line_width(*line_width);
                content.rect(*x, flip(y + height), *width, *height);
                content.stroke();
            }
            DrawOp::Image {
                slot,
                x,
                y,
                width,
                height,
            } => {
                if let Some((name, _)) = xobjects.get(slot) {
                    content.save_state();
                    content.transform([*width, 0.0, 0.0, *height, *x, flip(y + height)]);
                    content.x_object(Name(name.as_bytes()));
                    content.restore_state();
                }
            }
        }
    }

    content.finish()
}

/// Encode `text` for the WinAnsi base fonts; unmapped characters become `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars().map(win_ansi_byte).collect()
}

fn win_ansi_byte(c: char) -> u8 {
    match c {
        '\u{20}'..='\u{7E}' | '\u{A0}'..='\u{FF}' => c as u8,
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8A,
        '‹' => 0x8B,
        'Œ' => 0x8C,
        'Ž' => 0x8E,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9A,
        '›' => 0x9B,
        'œ' => 0x9C,
        'ž' => 0x9E,
        'Ÿ' => 0x9F,
        _ => b'?',
    }
}
