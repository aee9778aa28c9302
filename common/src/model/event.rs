//! Denormalized view of one event as the document pipeline consumes it.
//!
//! An `EventSnapshot` is fetched fresh for every generation run and never
//! mutated by the pipeline. The nested pieces, songs and media attachments are
//! populated up front so that nothing downstream has to go back to storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::generation::GenerationRecord;

pub type EventId = i64;
pub type SongId = i64;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventSnapshot {
    pub id: EventId,
    pub name: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub venue: Option<String>,
    pub description: Option<String>,
    pub special_instructions: Option<String>,
    pub program_notes: Option<String>,
    pub vestment_requirement: Option<VestmentRequirement>,
    pub choir: Option<Choir>,
    #[serde(default)]
    pub pieces: Vec<PieceEntry>,
    /// Result of the previous generation run. Written back by the regeneration
    /// layer only; never an input to a new run.
    #[serde(default)]
    pub generation: GenerationRecord,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VestmentRequirement {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Choir {
    pub name: String,
}

/// One row of the musical program.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PieceEntry {
    /// Declared display order. `None` and `Some(0)` both mean "undeclared".
    pub performance_order: Option<u32>,
    pub notes: Option<String>,
    /// Song name copied onto the entry when it was saved.
    pub cached_title: Option<String>,
    pub song: Option<Song>,
    /// Liturgical moment the piece belongs to, shown as `[label]`.
    pub liturgical_moment: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Song {
    pub id: SongId,
    pub title: String,
    pub notes: Option<String>,
    #[serde(default)]
    pub media: Vec<MediaAttachment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MediaRole {
    Lyrics,
    SheetMusic,
    Recording,
    BackingTrack,
}

impl MediaRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaRole::Lyrics => "lyrics",
            MediaRole::SheetMusic => "sheetMusic",
            MediaRole::Recording => "recording",
            MediaRole::BackingTrack => "backingTrack",
        }
    }

    pub fn parse(value: &str) -> Option<MediaRole> {
        match value {
            "lyrics" => Some(MediaRole::Lyrics),
            "sheetMusic" | "sheet_music" => Some(MediaRole::SheetMusic),
            "recording" => Some(MediaRole::Recording),
            "backingTrack" | "backing_track" => Some(MediaRole::BackingTrack),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaAttachment {
    pub role: MediaRole,
    /// Storage URL as recorded by the upload layer, e.g. `/uploads/santo.pdf`.
    pub url: String,
    /// Declared MIME type, when the upload layer recorded one.
    pub mime: Option<String>,
    /// Declared extension including the dot, e.g. `.pdf`.
    pub ext: Option<String>,
}

impl MediaAttachment {
    /// Whether the declared format is a PDF document.
    ///
    /// The declared MIME type wins, then the declared extension; the URL's own
    /// extension is only consulted when neither was recorded.
    pub fn is_pdf(&self) -> bool {
        if let Some(mime) = self.mime.as_deref() {
            return mime.trim().eq_ignore_ascii_case("application/pdf");
        }
        if let Some(ext) = self.ext.as_deref() {
            return ext.trim().trim_start_matches('.').eq_ignore_ascii_case("pdf");
        }
        let path = self.url.split(['?', '#']).next().unwrap_or_default();
        path.rsplit_once('.')
            .map(|(_, ext)| ext.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false)
    }
}

/// Returns the trimmed text when it carries anything besides whitespace.
pub fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl EventSnapshot {
    pub fn display_name(&self) -> &str {
        non_blank(&self.name).unwrap_or("Evento sin nombre")
    }

    /// Pieces in program order, each paired with its 1-based position.
    ///
    /// Undeclared orders sort first; ties keep their stored relative order.
    pub fn ordered_pieces(&self) -> Vec<(usize, &PieceEntry)> {
        let mut pieces: Vec<&PieceEntry> = self.pieces.iter().collect();
        pieces.sort_by_key(|piece| piece.declared_order().unwrap_or(0));
        pieces
            .into_iter()
            .enumerate()
            .map(|(index, piece)| (index + 1, piece))
            .collect()
    }
}

impl PieceEntry {
    pub fn declared_order(&self) -> Option<u32> {
        self.performance_order.filter(|order| *order > 0)
    }

    /// Number shown in the program badge: the declared order, else the position.
    pub fn display_number(&self, position: usize) -> u32 {
        self.declared_order().unwrap_or(position as u32)
    }

    /// Song title, then cached title, then `Canto N`.
    pub fn display_title(&self, position: usize) -> String {
        if let Some(song) = &self.song {
            let title = song.title.trim();
            if !title.is_empty() {
                return title.to_string();
            }
        }
        match non_blank(&self.cached_title) {
            Some(title) => title.to_string(),
            None => format!("Canto {}", position),
        }
    }

    /// Pieces with neither a song nor a cached title contribute no content page.
    pub fn has_content_source(&self) -> bool {
        self.song.is_some() || non_blank(&self.cached_title).is_some()
    }
}
