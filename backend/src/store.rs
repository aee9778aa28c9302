//! SQLite adapter for the data the pipeline consumes.
//!
//! The pipeline never talks to the database directly. It sees two narrow
//! contracts: `EventSource` for the denormalized event snapshot and
//! `GenerationLog` for the sidecar result columns written back after a run.

use crate::error::StoreError;
use chrono::{DateTime, Utc};
use common::model::event::{
    Choir, EventId, EventSnapshot, MediaAttachment, MediaRole, PieceEntry, Song, SongId,
    VestmentRequirement,
};
use common::model::generation::GenerationRecord;
use log::{debug, info, warn};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

/// Fetches one event with everything the pipeline needs already attached.
pub trait EventSource: Send + Sync {
    fn fetch_event(&self, id: EventId) -> Result<Option<EventSnapshot>, StoreError>;
}

/// Where the regeneration layer reads and writes the last run's result.
pub trait GenerationLog: Send + Sync {
    fn last_generation(&self, id: EventId) -> Result<Option<GenerationRecord>, StoreError>;

    fn record_generation(&self, id: EventId, record: &GenerationRecord) -> Result<(), StoreError>;
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS choirs (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS vestment_requirements (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT
);
CREATE TABLE IF NOT EXISTS songs (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    notes TEXT
);
CREATE TABLE IF NOT EXISTS song_media (
    id INTEGER PRIMARY KEY,
    song_id INTEGER NOT NULL REFERENCES songs(id) ON DELETE CASCADE,
    role TEXT NOT NULL,
    url TEXT NOT NULL,
    mime TEXT,
    ext TEXT
);
CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY,
    name TEXT,
    starts_at TEXT,
    venue TEXT,
    description TEXT,
    special_instructions TEXT,
    program_notes TEXT,
    choir_id INTEGER REFERENCES choirs(id),
    vestment_id INTEGER REFERENCES vestment_requirements(id),
    pdf_path TEXT,
    pdf_filename TEXT,
    pdf_generated_at TEXT,
    pdf_error TEXT
);
CREATE TABLE IF NOT EXISTS event_pieces (
    id INTEGER PRIMARY KEY,
    event_id INTEGER NOT NULL REFERENCES events(id) ON DELETE CASCADE,
    position INTEGER NOT NULL DEFAULT 0,
    performance_order INTEGER,
    song_id INTEGER REFERENCES songs(id),
    cached_title TEXT,
    notes TEXT,
    liturgical_moment TEXT
);
";

/// Event store backed by one SQLite file. A connection is opened per call.
#[derive(Debug, Clone)]
pub struct SqliteEventStore {
    path: PathBuf,
}

impl SqliteEventStore {
    pub fn new(path: impl Into<PathBuf>) -> SqliteEventStore {
        SqliteEventStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(conn)
    }

    /// Creates the tables when they do not exist yet.
    pub fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.open()?;
        conn.execute_batch(SCHEMA)?;
        info!("Database schema ready at {}", self.path.display());
        Ok(())
    }

    /// Copies each linked song's current title into the piece's cached title.
    ///
    /// Returns the number of events that had at least one piece updated.
    pub fn sync_cached_titles(&self) -> Result<usize, StoreError> {
        let mut conn = self.open()?;
        let tx = conn.transaction()?;
        let touched: Vec<EventId> = {
            let mut stmt = tx.prepare(
                "SELECT DISTINCT p.event_id FROM event_pieces p
                 JOIN songs s ON s.id = p.song_id
                 WHERE p.cached_title IS NULL OR p.cached_title <> s.title
                 ORDER BY p.event_id",
            )?;
            let rows = stmt.query_map([], |row| row.get::<_, EventId>(0))?;
            rows.collect::<Result<_, _>>()?
        };
        let updated = tx.execute(
            "UPDATE event_pieces
             SET cached_title = (SELECT title FROM songs WHERE songs.id = event_pieces.song_id)
             WHERE song_id IS NOT NULL
               AND (cached_title IS NULL
                    OR cached_title <> (SELECT title FROM songs WHERE songs.id = event_pieces.song_id))",
            [],
        )?;
        tx.commit()?;
        info!(
            "Synced {} cached song titles across {} events",
            updated,
            touched.len()
        );
        Ok(touched.len())
    }

    fn load_pieces(&self, conn: &Connection, event_id: EventId) -> Result<Vec<PieceEntry>, StoreError> {
        let mut stmt = conn.prepare(
            "SELECT p.performance_order, p.notes, p.cached_title, p.liturgical_moment,
                    s.id, s.title, s.notes
             FROM event_pieces p
             LEFT JOIN songs s ON s.id = p.song_id
             WHERE p.event_id = ?1
             ORDER BY p.position, p.id",
        )?;
        let rows = stmt.query_map(params![event_id], |row| {
            let order: Option<i64> = row.get(0)?;
            let song_id: Option<SongId> = row.get(4)?;
            let song = match song_id {
                Some(id) => Some(Song {
                    id,
                    title: row.get(5)?,
                    notes: row.get(6)?,
                    media: Vec::new(),
                }),
                None => None,
            };
            Ok(PieceEntry {
                performance_order: order.and_then(|o| u32::try_from(o).ok()),
                notes: row.get(1)?,
                cached_title: row.get(2)?,
                song,
                liturgical_moment: row.get(3)?,
            })
        })?;

        let mut pieces = rows.collect::<Result<Vec<_>, _>>()?;
        for piece in &mut pieces {
            if let Some(song) = piece.song.as_mut() {
                song.media = load_media(conn, song.id)?;
            }
        }
        Ok(pieces)
    }
}

fn load_media(conn: &Connection, song_id: SongId) -> Result<Vec<MediaAttachment>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT role, url, mime, ext FROM song_media WHERE song_id = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![song_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, Option<String>>(3)?,
        ))
    })?;

    let mut media = Vec::new();
    for row in rows {
        let (role, url, mime, ext) = row?;
        match MediaRole::parse(&role) {
            Some(role) => media.push(MediaAttachment {
                role,
                url,
                mime,
                ext,
            }),
            None => warn!("Ignoring media of song {} with unknown role {:?}", song_id, role),
        }
    }
    Ok(media)
}

fn parse_timestamp(value: Option<String>) -> Result<Option<DateTime<Utc>>, StoreError> {
    match value {
        None => Ok(None),
        Some(text) if text.trim().is_empty() => Ok(None),
        Some(text) => DateTime::parse_from_rfc3339(text.trim())
            .map(|at| Some(at.with_timezone(&Utc)))
            .map_err(|e| StoreError::Invalid(format!("timestamp {:?}: {}", text, e))),
    }
}

impl EventSource for SqliteEventStore {
    fn fetch_event(&self, id: EventId) -> Result<Option<EventSnapshot>, StoreError> {
        let conn = self.open()?;
        let row = conn
            .query_row(
                "SELECT e.name, e.starts_at, e.venue, e.description, e.special_instructions,
                        e.program_notes, c.name, v.name, v.description,
                        e.pdf_path, e.pdf_filename, e.pdf_generated_at, e.pdf_error
                 FROM events e
                 LEFT JOIN choirs c ON c.id = e.choir_id
                 LEFT JOIN vestment_requirements v ON v.id = e.vestment_id
                 WHERE e.id = ?1",
                params![id],
                |row| {
                    Ok((
                        EventSnapshot {
                            id,
                            name: row.get(0)?,
                            venue: row.get(2)?,
                            description: row.get(3)?,
                            special_instructions: row.get(4)?,
                            program_notes: row.get(5)?,
                            choir: row.get::<_, Option<String>>(6)?.map(|name| Choir { name }),
                            vestment_requirement: row
                                .get::<_, Option<String>>(7)?
                                .map(|name| VestmentRequirement { name, description: None }),
                            ..EventSnapshot::default()
                        },
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(8)?,
                        GenerationRecord {
                            path: row.get(9)?,
                            filename: row.get(10)?,
                            generated_at: None,
                            error: row.get(12)?,
                        },
                        row.get::<_, Option<String>>(11)?,
                    ))
                },
            )
            .optional()?;

        let Some((mut event, starts_at, vestment_description, mut generation, generated_at)) = row
        else {
            debug!("Event {} not found", id);
            return Ok(None);
        };

        event.starts_at = parse_timestamp(starts_at)?;
        if let Some(vestment) = event.vestment_requirement.as_mut() {
            vestment.description = vestment_description;
        }
        generation.generated_at = parse_timestamp(generated_at)?;
        event.generation = generation;
        event.pieces = self.load_pieces(&conn, id)?;
        Ok(Some(event))
    }
}

impl GenerationLog for SqliteEventStore {
    fn last_generation(&self, id: EventId) -> Result<Option<GenerationRecord>, StoreError> {
        let conn = self.open()?;
        let row = conn
            .query_row(
                "SELECT pdf_path, pdf_filename, pdf_generated_at, pdf_error FROM events WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, Option<String>>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, Option<String>>(3)?,
                    ))
                },
            )
            .optional()?;

        match row {
            None => Ok(None),
            Some((path, filename, generated_at, error)) => Ok(Some(GenerationRecord {
                path,
                filename,
                generated_at: parse_timestamp(generated_at)?,
                error,
            })),
        }
    }

    fn record_generation(&self, id: EventId, record: &GenerationRecord) -> Result<(), StoreError> {
        let conn = self.open()?;
        let changed = conn.execute(
            "UPDATE events SET pdf_path = ?1, pdf_filename = ?2, pdf_generated_at = ?3, pdf_error = ?4
             WHERE id = ?5",
            params![
                record.path,
                record.filename,
                record.generated_at.map(|at| at.to_rfc3339()),
                record.error,
                id
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::Invalid(format!("event {} does not exist", id)));
        }
        Ok(())
    }
}
