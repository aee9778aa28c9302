use chrono_tz::Tz;
use common::model::event::EventSnapshot;

pub const UNDATED_FILENAME: &str = "evento-sin-fecha.pdf";
const EMPTY_SLUG: &str = "evento";

/// Lower-cased name with punctuation removed and whitespace runs turned into `-`.
pub fn slugify(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    let slug = kept.split_whitespace().collect::<Vec<_>>().join("-").to_lowercase();
    if slug.is_empty() {
        EMPTY_SLUG.to_string()
    } else {
        slug
    }
}

/// `{YYYY}-{MM}-{DD}-{HHmm}-{slug}.pdf`, using the event's local start time.
pub fn document_filename(event: &EventSnapshot, tz: Tz) -> String {
    match event.starts_at {
        Some(at) => format!(
            "{}-{}.pdf",
            at.with_timezone(&tz).format("%Y-%m-%d-%H%M"),
            slugify(event.name.as_deref().unwrap_or_default())
        ),
        None => UNDATED_FILENAME.to_string(),
    }
}
