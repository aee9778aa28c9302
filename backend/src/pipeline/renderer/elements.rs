//! Drawing primitives that genpdf does not ship: a filled header band, a
//! horizontal rule and the numbered program row.

use crate::pipeline::renderer::layout::ProgramRow;
use genpdf::error::Error;
use genpdf::render::Area;
use genpdf::style::{Color, Style};
use genpdf::{Context, Element, Mm, Position, RenderResult, Size};
use std::f64::consts::PI;

pub const INK: Color = Color::Rgb(44, 62, 80);
pub const ACCENT: Color = Color::Rgb(52, 152, 219);
pub const MUTED: Color = Color::Rgb(102, 102, 102);
const WHITE: Color = Color::Rgb(255, 255, 255);

const BAND_PADDING_MM: f64 = 6.0;
const BADGE_DIAMETER_MM: f64 = 9.0;
const BADGE_GAP_MM: f64 = 5.0;
const ROW_SPACING_MM: f64 = 3.0;
/// Distance between the strokes that fill the header band. genpdf strokes at a
/// fixed 1 pt (about 0.35 mm), so this leaves no gaps.
const BAND_STROKE_MM: f64 = 0.25;
const MAX_TITLE_LINES: usize = 3;
/// Heading and note caps keep a single row shorter than an empty page.
const MAX_HEADING_LINES: usize = 4;
const MAX_NOTE_LINES: usize = 12;

fn mm(value: f64) -> Mm {
    Mm::from(value)
}

fn does_not_fit() -> RenderResult {
    let mut result = RenderResult::default();
    result.has_more = true;
    result
}

/// Greedy word wrap against the measured width of `style`.
///
/// Explicit line breaks in `text` are kept; a single word wider than `width`
/// gets a line of its own.
pub fn wrap_text(context: &Context, style: Style, text: &str, width: Mm) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if current.is_empty() {
                current.push_str(word);
                continue;
            }
            let candidate = format!("{} {}", current, word);
            if style.str_width(&context.font_cache, &candidate) <= width {
                current = candidate;
            } else {
                lines.push(std::mem::replace(&mut current, word.to_string()));
            }
        }
        lines.push(current);
    }
    lines
}

/// Drops lines past `max`, marking the last kept one with an ellipsis.
pub fn truncate_lines(lines: &mut Vec<String>, max: usize) {
    if lines.len() > max {
        lines.truncate(max);
        if let Some(last) = lines.last_mut() {
            last.push_str(" …");
        }
    }
}

/// Vertical offsets of the horizontal strokes that fill a band of `height`.
fn band_stroke_offsets(height: Mm) -> Vec<Mm> {
    let mut offsets = Vec::new();
    let mut step = 0usize;
    loop {
        let y = mm(BAND_STROKE_MM) * step as f64;
        if y >= height {
            break;
        }
        offsets.push(y);
        step += 1;
    }
    offsets.push(height);
    offsets
}

fn centered_x(context: &Context, style: Style, text: &str, width: Mm) -> Mm {
    let x = (width - style.str_width(&context.font_cache, text)) * 0.5;
    if x < mm(0.0) {
        mm(0.0)
    } else {
        x
    }
}

/// Full-width filled band with a centered title and an optional subtitle.
pub struct HeaderBand {
    title: String,
    subtitle: Option<String>,
}

impl HeaderBand {
    pub fn new(title: impl Into<String>, subtitle: Option<String>) -> HeaderBand {
        HeaderBand {
            title: title.into(),
            subtitle,
        }
    }
}

impl Element for HeaderBand {
    fn render(
        &mut self,
        context: &Context,
        area: Area<'_>,
        style: Style,
    ) -> Result<RenderResult, Error> {
        let width = area.size().width;
        let title_style = style.bold().with_font_size(20).with_color(WHITE);
        let subtitle_style = style.with_font_size(12).with_color(WHITE);
        let inner_width = width - mm(2.0 * BAND_PADDING_MM);

        let mut title_lines = wrap_text(context, title_style, &self.title, inner_width);
        truncate_lines(&mut title_lines, MAX_TITLE_LINES);
        let title_height = title_style.line_height(&context.font_cache);
        let subtitle_height = subtitle_style.line_height(&context.font_cache);

        let mut band_height = title_height * title_lines.len() as f64 + mm(2.0 * BAND_PADDING_MM);
        if self.subtitle.is_some() {
            band_height = band_height + subtitle_height + mm(1.5);
        }
        if area.size().height < band_height {
            return Ok(does_not_fit());
        }

        let ink = Style::new().with_color(INK);
        for y in band_stroke_offsets(band_height) {
            area.draw_line(vec![Position::new(mm(0.0), y), Position::new(width, y)], ink);
        }

        let mut y = mm(BAND_PADDING_MM);
        for line in &title_lines {
            let x = centered_x(context, title_style, line, width);
            area.print_str(&context.font_cache, Position::new(x, y), title_style, line)?;
            y = y + title_height;
        }
        if let Some(subtitle) = &self.subtitle {
            y = y + mm(1.5);
            let x = centered_x(context, subtitle_style, subtitle, width);
            area.print_str(&context.font_cache, Position::new(x, y), subtitle_style, subtitle)?;
        }

        let mut result = RenderResult::default();
        result.size = Size::new(width, band_height);
        Ok(result)
    }
}

/// Horizontal rule across the full content width, at genpdf's 1 pt stroke.
pub struct Rule {
    color: Color,
}

impl Rule {
    pub fn new(color: Color) -> Rule {
        Rule { color }
    }
}

impl Element for Rule {
    fn render(
        &mut self,
        _context: &Context,
        area: Area<'_>,
        _style: Style,
    ) -> Result<RenderResult, Error> {
        let height = mm(2.5);
        if area.size().height < height {
            return Ok(does_not_fit());
        }
        let width = area.size().width;
        let y = height * 0.5;
        area.draw_line(
            vec![Position::new(mm(0.0), y), Position::new(width, y)],
            Style::new().with_color(self.color),
        );
        let mut result = RenderResult::default();
        result.size = Size::new(width, height);
        Ok(result)
    }
}

/// One program entry: circular badge with the number, heading, optional notes.
///
/// The row is drawn whole or not at all. When it does not fit in what is left
/// of the page it reports `has_more` without drawing, so the document moves it
/// to the next page.
pub struct PieceRow {
    row: ProgramRow,
}

impl PieceRow {
    pub fn new(row: ProgramRow) -> PieceRow {
        PieceRow { row }
    }
}

impl Element for PieceRow {
    fn render(
        &mut self,
        context: &Context,
        area: Area<'_>,
        style: Style,
    ) -> Result<RenderResult, Error> {
        let width = area.size().width;
        let text_x = mm(BADGE_DIAMETER_MM + BADGE_GAP_MM);
        let text_width = width - text_x;

        let heading_style = style.bold().with_font_size(12).with_color(INK);
        let notes_style = style.italic().with_font_size(10).with_color(MUTED);
        let heading_height = heading_style.line_height(&context.font_cache);
        let notes_height = notes_style.line_height(&context.font_cache);

        let mut heading_lines =
            wrap_text(context, heading_style, &self.row.heading(), text_width);
        truncate_lines(&mut heading_lines, MAX_HEADING_LINES);
        let mut note_lines = match &self.row.notes {
            Some(notes) => wrap_text(context, notes_style, notes, text_width),
            None => Vec::new(),
        };
        truncate_lines(&mut note_lines, MAX_NOTE_LINES);

        let text_height =
            heading_height * heading_lines.len() as f64 + notes_height * note_lines.len() as f64;
        let badge = mm(BADGE_DIAMETER_MM);
        let body_height = if text_height < badge { badge } else { text_height };
        let row_height = body_height + mm(ROW_SPACING_MM);
        if area.size().height < row_height {
            return Ok(does_not_fit());
        }

        let radius = mm(BADGE_DIAMETER_MM * 0.5);
        let center = Position::new(radius, radius);
        let circle: Vec<Position> = (0..=48)
            .map(|step| {
                let angle = 2.0 * PI * step as f64 / 48.0;
                Position::new(
                    center.x + radius * angle.cos(),
                    center.y + radius * angle.sin(),
                )
            })
            .collect();
        area.draw_line(circle, Style::new().with_color(ACCENT));

        let number = self.row.number.to_string();
        let number_style = style.bold().with_font_size(11).with_color(ACCENT);
        let number_height = number_style.line_height(&context.font_cache);
        let number_x = radius - number_style.str_width(&context.font_cache, &number) * 0.5;
        area.print_str(
            &context.font_cache,
            Position::new(number_x, radius - number_height * 0.5),
            number_style,
            &number,
        )?;

        let mut y = mm(0.0);
        for line in &heading_lines {
            area.print_str(&context.font_cache, Position::new(text_x, y), heading_style, line)?;
            y = y + heading_height;
        }
        for line in &note_lines {
            area.print_str(&context.font_cache, Position::new(text_x, y), notes_style, line)?;
            y = y + notes_height;
        }

        let mut result = RenderResult::default();
        result.size = Size::new(width, row_height);
        Ok(result)
    }
}
