//! # Page Renderer
//!
//! Draws the generated pages of an event document: the cover, the program
//! listing and the placeholder page used for pieces without an attached file.
//! Each call returns a complete, independently valid PDF.
//!
//! Content is decided first by the builders in `layout`, then drawn with
//! genpdf using the custom elements in `elements`.

pub mod elements;
pub mod fonts;
pub mod layout;

use crate::error::RenderError;
use chrono::Utc;
use chrono_tz::Tz;
use common::model::event::{EventSnapshot, PieceEntry};
use elements::{HeaderBand, PieceRow, Rule, ACCENT, INK, MUTED};
use genpdf::elements::{Break, LinearLayout, Paragraph, TableLayout};
use genpdf::fonts::{FontData, FontFamily};
use genpdf::style::{Style, StyledString};
use genpdf::{Alignment, Document, Element, Margins, PaperSize, SimplePageDecorator};
use layout::{CoverLayout, Field, PlaceholderLayout, ProgramLayout, TextBox, FOOTER_BRAND};
use std::path::Path;

const PAGE_MARGIN_MM: i32 = 18;
const BODY_FONT_SIZE: u8 = 11;
const BOX_PADDING_MM: f64 = 4.0;

/// Produces the generated pages of an event document as PDF bytes.
pub trait SheetRenderer: Send + Sync {
    fn render_cover(&self, event: &EventSnapshot) -> Result<Vec<u8>, RenderError>;

    fn render_program(&self, event: &EventSnapshot) -> Result<Vec<u8>, RenderError>;

    /// Page for a piece that has no usable attached document. `position` is the
    /// piece's 1-based place in program order, used for the fallback title.
    fn render_placeholder(&self, piece: &PieceEntry, position: usize) -> Result<Vec<u8>, RenderError>;
}

/// genpdf-backed renderer on A4 paper.
pub struct PdfRenderer {
    fonts: FontFamily<FontData>,
    time_zone: Tz,
}

impl PdfRenderer {
    pub fn new(fonts: FontFamily<FontData>, time_zone: Tz) -> PdfRenderer {
        PdfRenderer { fonts, time_zone }
    }

    pub fn from_font_dir(dir: &Path, family: &str, time_zone: Tz) -> Result<PdfRenderer, RenderError> {
        Ok(PdfRenderer::new(fonts::load_font_family(dir, family)?, time_zone))
    }

    fn new_document(&self, title: &str) -> Document {
        let mut doc = Document::new(self.fonts.clone());
        doc.set_title(title);
        doc.set_paper_size(PaperSize::A4);
        doc.set_font_size(BODY_FONT_SIZE);
        doc.set_line_spacing(1.15);
        let mut decorator = SimplePageDecorator::new();
        decorator.set_margins(PAGE_MARGIN_MM);
        doc.set_page_decorator(decorator);
        doc
    }
}

fn finish(doc: Document) -> Result<Vec<u8>, RenderError> {
    let mut buffer = Vec::new();
    doc.render(&mut buffer)?;
    Ok(buffer)
}

/// Label in bold followed by its value, one field per paragraph.
fn field_column(fields: &[Field]) -> LinearLayout {
    let mut column = LinearLayout::vertical();
    for field in fields {
        let mut label = Paragraph::new("");
        label.push(StyledString::new(
            field.label,
            Style::new().bold().with_color(INK),
        ));
        column.push(label);
        for line in field.value.lines() {
            column.push(Paragraph::new(line));
        }
        column.push(Break::new(0.4));
    }
    column
}

/// Framed block: title line, then the body text wrapped to the box width.
fn text_box(title: &str, body: &str) -> impl Element {
    let mut inner = LinearLayout::vertical();
    let mut heading = Paragraph::new("");
    heading.push(StyledString::new(
        title,
        Style::new().bold().with_font_size(13).with_color(INK),
    ));
    inner.push(heading);
    inner.push(Break::new(0.3));
    for line in body.lines() {
        inner.push(Paragraph::new(line));
    }
    inner.padded(Margins::all(BOX_PADDING_MM)).framed()
}

impl SheetRenderer for PdfRenderer {
    fn render_cover(&self, event: &EventSnapshot) -> Result<Vec<u8>, RenderError> {
        let layout = CoverLayout::build(event, self.time_zone, Utc::now());
        let mut doc = self.new_document(&layout.title);

        doc.push(HeaderBand::new(layout.title.clone(), layout.schedule.clone()));
        doc.push(Break::new(1));

        if !layout.left.is_empty() || !layout.right.is_empty() {
            let mut table = TableLayout::new(vec![1, 1]);
            table
                .row()
                .element(field_column(&layout.left))
                .element(field_column(&layout.right))
                .push()?;
            doc.push(table);
        }

        doc.push(Rule::new(ACCENT));
        doc.push(Break::new(0.5));

        for TextBox { title, body } in &layout.boxes {
            doc.push(text_box(title, body));
            doc.push(Break::new(0.8));
        }

        doc.push(Break::new(1));
        let mut footer = Paragraph::new("");
        footer.push(StyledString::new(
            format!("Generado el {} · {}", layout.generated_on, FOOTER_BRAND),
            Style::new().with_font_size(9).with_color(MUTED),
        ));
        doc.push(footer.aligned(Alignment::Center));

        finish(doc)
    }

    fn render_program(&self, event: &EventSnapshot) -> Result<Vec<u8>, RenderError> {
        let layout = ProgramLayout::build(event);
        let mut doc = self.new_document(&format!("{} - {}", layout.title, layout.subtitle));

        doc.push(HeaderBand::new(
            layout.title.clone(),
            Some(layout.subtitle.to_string()),
        ));
        doc.push(Break::new(1));
        for row in layout.rows {
            doc.push(PieceRow::new(row));
        }

        finish(doc)
    }

    fn render_placeholder(&self, piece: &PieceEntry, position: usize) -> Result<Vec<u8>, RenderError> {
        let layout = PlaceholderLayout::build(piece, position);
        let mut doc = self.new_document(&layout.title);

        doc.push(Break::new(4));
        let mut title = Paragraph::new("");
        title.push(StyledString::new(
            layout.title.clone(),
            Style::new().bold().with_font_size(22).with_color(INK),
        ));
        doc.push(title.aligned(Alignment::Center));
        doc.push(Break::new(0.5));
        doc.push(Rule::new(ACCENT));
        doc.push(Break::new(1));

        if let Some(notes) = &layout.performance_notes {
            doc.push(text_box(layout::PERFORMANCE_NOTES_TITLE, notes));
            doc.push(Break::new(0.8));
        }
        if let Some(notes) = &layout.general_notes {
            doc.push(text_box(layout::GENERAL_NOTES_TITLE, notes));
            doc.push(Break::new(0.8));
        }

        doc.push(Break::new(1));
        let mut notice = Paragraph::new("");
        notice.push(StyledString::new(
            layout.notice,
            Style::new().italic().with_color(MUTED),
        ));
        doc.push(notice.aligned(Alignment::Center));

        finish(doc)
    }
}
