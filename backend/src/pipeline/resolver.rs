//! # Content Resolver
//!
//! Decides, per piece, which page(s) it contributes to the final document: an
//! attached PDF from media storage when one exists on disk, otherwise a
//! generated placeholder written to scratch storage.

use crate::pipeline::page::ContentPage;
use crate::pipeline::renderer::SheetRenderer;
use crate::pipeline::scratch::ScratchArea;
use common::model::event::{EventId, EventSnapshot, MediaAttachment, MediaRole, PieceEntry, SongId};
use log::{debug, error, info, warn};
use std::path::{Component, Path, PathBuf};

/// Roles whose attachments may stand in for a piece, highest priority first.
const PAGE_ROLES: [MediaRole; 2] = [MediaRole::Lyrics, MediaRole::SheetMusic];

/// Maps stored media URLs onto the local filesystem.
#[derive(Debug, Clone)]
pub struct MediaLocator {
    public_dir: PathBuf,
}

impl MediaLocator {
    pub fn new(public_dir: impl Into<PathBuf>) -> MediaLocator {
        MediaLocator {
            public_dir: public_dir.into(),
        }
    }

    /// `/uploads/a.pdf` becomes `{public_dir}/uploads/a.pdf`.
    ///
    /// Remote URLs and paths that would climb out of the public directory do
    /// not resolve.
    pub fn locate(&self, url: &str) -> Option<PathBuf> {
        let url = url.trim();
        if url.is_empty() || url.contains("://") {
            return None;
        }
        let path = url.split(['?', '#']).next().unwrap_or_default();
        let relative = Path::new(path.trim_start_matches('/'));
        let mut resolved = self.public_dir.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                _ => return None,
            }
        }
        if resolved == self.public_dir {
            return None;
        }
        Some(resolved)
    }
}

/// Content chosen for one piece, with the metadata used for logging.
#[derive(Debug)]
pub struct ResolvedPiece {
    pub song_id: Option<SongId>,
    /// Number shown on the program row.
    pub order: u32,
    pub title: String,
    pub content: ContentPage,
}

pub struct ContentResolver<'a> {
    renderer: &'a dyn SheetRenderer,
    locator: &'a MediaLocator,
    scratch: &'a ScratchArea,
}

impl<'a> ContentResolver<'a> {
    pub fn new(
        renderer: &'a dyn SheetRenderer,
        locator: &'a MediaLocator,
        scratch: &'a ScratchArea,
    ) -> ContentResolver<'a> {
        ContentResolver {
            renderer,
            locator,
            scratch,
        }
    }

    /// First attachment, by role priority, that is a PDF present on disk.
    pub fn attached_document(&self, piece: &PieceEntry) -> Option<PathBuf> {
        let song = piece.song.as_ref()?;
        PAGE_ROLES.iter().find_map(|role| {
            song.media
                .iter()
                .filter(|media| media.role == *role)
                .find_map(|media| self.usable_path(song.id, media))
        })
    }

    fn usable_path(&self, song_id: SongId, media: &MediaAttachment) -> Option<PathBuf> {
        if !media.is_pdf() {
            debug!(
                "Song {}: {} attachment {} is not a PDF",
                song_id,
                media.role.as_str(),
                media.url
            );
            return None;
        }
        let Some(path) = self.locator.locate(&media.url) else {
            warn!("Song {}: cannot resolve media URL {}", song_id, media.url);
            return None;
        };
        if path.is_file() {
            Some(path)
        } else {
            warn!(
                "Song {}: {} file missing at {}",
                song_id,
                media.role.as_str(),
                path.display()
            );
            None
        }
    }

    /// Content pages for every piece that has a song or a cached title, in
    /// program order.
    pub fn resolve(&self, event: &EventSnapshot) -> Vec<ResolvedPiece> {
        let mut resolved = Vec::new();
        for (position, piece) in event.ordered_pieces() {
            if !piece.has_content_source() {
                debug!(
                    "Event {}: piece at position {} has no song or title, skipped",
                    event.id, position
                );
                continue;
            }
            if let Some(content) = self.content_for(event.id, piece, position) {
                resolved.push(ResolvedPiece {
                    song_id: piece.song.as_ref().map(|song| song.id),
                    order: piece.display_number(position),
                    title: piece.display_title(position),
                    content,
                });
            }
        }
        info!(
            "Event {}: resolved {} content pages",
            event.id,
            resolved.len()
        );
        resolved
    }

    fn content_for(&self, event_id: EventId, piece: &PieceEntry, position: usize) -> Option<ContentPage> {
        if let Some(path) = self.attached_document(piece) {
            debug!("Event {}: using attachment {}", event_id, path.display());
            return Some(ContentPage::Stored(path));
        }

        let bytes = match self.renderer.render_placeholder(piece, position) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(
                    "Event {}: placeholder for piece {} failed: {}",
                    event_id, position, e
                );
                return None;
            }
        };
        match self.scratch.write("placeholder", event_id, &bytes) {
            Ok(file) => Some(ContentPage::Scratch(file)),
            Err(e) => {
                warn!(
                    "Event {}: could not store placeholder for piece {}: {}",
                    event_id, position, e
                );
                // The merger writes in-memory pages to scratch itself.
                Some(ContentPage::Rendered(bytes))
            }
        }
    }
}
