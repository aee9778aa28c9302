//! # Event document pipeline
//!
//! Turns one event into a single PDF:
//!
//! `fetch → cover → program (when there are pieces) → piece content → merge`
//!
//! No stage is retried. A stage that fails absorbs its own failure: a page that
//! cannot be rendered is left out, an attachment that cannot be used becomes a
//! placeholder, and a failed merge degrades to the cover alone. The only error
//! a caller sees for an existing event is when not even a cover was produced.

pub mod filename;
pub mod merger;
pub mod page;
pub mod renderer;
pub mod resolver;
pub mod scratch;

#[cfg(test)]
pub(crate) mod fixtures;

use crate::error::PipelineError;
use crate::store::EventSource;
use chrono_tz::Tz;
use common::model::event::EventId;
use log::{error, info};
use merger::DocumentMerger;
use page::{ContentPage, PageSource};
use renderer::SheetRenderer;
use resolver::{ContentResolver, MediaLocator};
use scratch::ScratchArea;
use std::sync::Arc;

/// The assembled document and the name it should be saved or served under.
#[derive(Debug, Clone)]
pub struct GeneratedDocument {
    pub bytes: Vec<u8>,
    pub filename: String,
}

pub struct Pipeline {
    events: Arc<dyn EventSource>,
    renderer: Arc<dyn SheetRenderer>,
    locator: MediaLocator,
    scratch: ScratchArea,
    merger: DocumentMerger,
    time_zone: Tz,
}

impl Pipeline {
    pub fn new(
        events: Arc<dyn EventSource>,
        renderer: Arc<dyn SheetRenderer>,
        locator: MediaLocator,
        scratch: ScratchArea,
        time_zone: Tz,
    ) -> Pipeline {
        let merger = DocumentMerger::new(scratch.clone());
        Pipeline {
            events,
            renderer,
            locator,
            scratch,
            merger,
            time_zone,
        }
    }

    /// Replaces the default lopdf-backed merger.
    pub fn with_merger(mut self, merger: DocumentMerger) -> Pipeline {
        self.merger = merger;
        self
    }

    /// Builds the document for `event_id` from a freshly fetched snapshot.
    ///
    /// # Returns
    /// - `Ok(GeneratedDocument)` with the full document, or a shorter one when
    ///   some stages failed.
    /// - `Err(PipelineError::NotFound)` when the event does not exist.
    /// - `Err(PipelineError::Empty)` or `Err(PipelineError::Merge)` when not a
    ///   single page could be produced.
    pub fn generate(&self, event_id: EventId) -> Result<GeneratedDocument, PipelineError> {
        let event = self
            .events
            .fetch_event(event_id)?
            .ok_or(PipelineError::NotFound(event_id))?;
        let filename = filename::document_filename(&event, self.time_zone);
        info!(
            "Event {}: generating {} with {} pieces",
            event_id,
            filename,
            event.pieces.len()
        );

        let cover = match self.renderer.render_cover(&event) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                error!("Event {}: cover render failed: {}", event_id, e);
                None
            }
        };

        if event.pieces.is_empty() {
            return match cover {
                Some(bytes) => Ok(GeneratedDocument { bytes, filename }),
                None => Err(PipelineError::Empty(event_id)),
            };
        }

        let mut sources = Vec::with_capacity(event.pieces.len() + 2);
        if let Some(bytes) = cover {
            sources.push(PageSource::new("cover", ContentPage::Rendered(bytes)));
        }
        match self.renderer.render_program(&event) {
            Ok(bytes) => sources.push(PageSource::new("program", ContentPage::Rendered(bytes))),
            Err(e) => error!("Event {}: program render failed: {}", event_id, e),
        }

        let resolver = ContentResolver::new(self.renderer.as_ref(), &self.locator, &self.scratch);
        for piece in resolver.resolve(&event) {
            info!(
                "Event {}: piece {} {:?} (song {:?}) from {}",
                event_id,
                piece.order,
                piece.title,
                piece.song_id,
                if piece.content.is_temporary() { "placeholder" } else { "attachment" }
            );
            sources.push(PageSource::new(
                format!("piece-{}", piece.order),
                piece.content,
            ));
        }

        if sources.is_empty() {
            return Err(PipelineError::Empty(event_id));
        }
        let bytes = self.merger.merge(event_id, sources)?;
        Ok(GeneratedDocument { bytes, filename })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MergeError;
    use crate::pipeline::fixtures::{
        fixture_pdf, page_widths, MemoryStore, StubRenderer, COVER_WIDTH, PLACEHOLDER_BASE,
        PROGRAM_WIDTH,
    };
    use crate::pipeline::merger::{LopdfCombiner, PdfCombiner};
    use chrono::{TimeZone, Utc};
    use common::model::event::{EventSnapshot, MediaAttachment, MediaRole, PieceEntry, Song};
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingCombiner(Arc<AtomicUsize>);

    impl PdfCombiner for CountingCombiner {
        fn combine(&self, paths: &[PathBuf]) -> Result<Vec<u8>, MergeError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            LopdfCombiner.combine(paths)
        }
    }

    struct BrokenCombiner;

    impl PdfCombiner for BrokenCombiner {
        fn combine(&self, _paths: &[PathBuf]) -> Result<Vec<u8>, MergeError> {
            Err(MergeError::Structure("forced failure".to_string()))
        }
    }

    fn song_piece(order: u32, id: i64, title: &str) -> PieceEntry {
        PieceEntry {
            performance_order: Some(order),
            song: Some(Song {
                id,
                title: title.to_string(),
                notes: None,
                media: Vec::new(),
            }),
            ..PieceEntry::default()
        }
    }

    fn misa_dominical() -> EventSnapshot {
        EventSnapshot {
            id: 1,
            name: Some("Misa Dominical".to_string()),
            starts_at: Some(Utc.with_ymd_and_hms(2025, 6, 1, 17, 0, 0).unwrap()),
            venue: Some("Templo Mayor".to_string()),
            pieces: vec![song_piece(2, 11, "Santo"), song_piece(1, 10, "Entrada")],
            ..EventSnapshot::default()
        }
    }

    fn pipeline(root: &Path, event: EventSnapshot, renderer: StubRenderer) -> Pipeline {
        Pipeline::new(
            Arc::new(MemoryStore::with_event(event)),
            Arc::new(renderer),
            MediaLocator::new(root),
            ScratchArea::new(root.join(".temp")),
            chrono_tz::America::Mexico_City,
        )
    }

    fn scratch_is_empty(root: &Path) -> bool {
        fs::read_dir(root.join(".temp"))
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(true)
    }

    #[test]
    fn unknown_event_is_not_found() {
        let root = tempfile::tempdir().unwrap();
        let pipeline = pipeline(root.path(), misa_dominical(), StubRenderer::default());
        assert!(matches!(pipeline.generate(99), Err(PipelineError::NotFound(99))));
    }

    #[test]
    fn event_without_pieces_is_the_cover_alone() {
        let root = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let event = EventSnapshot {
            pieces: Vec::new(),
            ..misa_dominical()
        };
        let pipeline = pipeline(root.path(), event, StubRenderer::default()).with_merger(
            DocumentMerger::with_combiner(
                ScratchArea::new(root.path().join(".temp")),
                Box::new(CountingCombiner(calls.clone())),
            ),
        );

        let document = pipeline.generate(1).unwrap();
        assert_eq!(document.bytes, fixture_pdf(&[COVER_WIDTH]));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn scenario_pages_follow_program_order() {
        let root = tempfile::tempdir().unwrap();
        let pipeline = pipeline(root.path(), misa_dominical(), StubRenderer::default());

        let document = pipeline.generate(1).unwrap();
        assert_eq!(document.filename, "2025-06-01-1100-misa-dominical.pdf");
        assert_eq!(
            page_widths(&document.bytes),
            vec![
                COVER_WIDTH,
                PROGRAM_WIDTH,
                PLACEHOLDER_BASE + 1,
                PLACEHOLDER_BASE + 2
            ]
        );
        assert!(scratch_is_empty(root.path()));
    }

    #[test]
    fn attachments_replace_placeholders_in_place() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("uploads")).unwrap();
        fs::write(root.path().join("uploads/santo.pdf"), fixture_pdf(&[301, 302])).unwrap();

        let mut event = misa_dominical();
        event.pieces[0]
            .song
            .as_mut()
            .unwrap()
            .media
            .push(MediaAttachment {
                role: MediaRole::Lyrics,
                url: "/uploads/santo.pdf".to_string(),
                mime: Some("application/pdf".to_string()),
                ext: Some(".pdf".to_string()),
            });
        event.pieces.push(PieceEntry {
            performance_order: Some(3),
            cached_title: Some("Salida".to_string()),
            ..PieceEntry::default()
        });
        let pipeline = pipeline(root.path(), event, StubRenderer::default());

        let document = pipeline.generate(1).unwrap();
        assert_eq!(
            page_widths(&document.bytes),
            vec![
                COVER_WIDTH,
                PROGRAM_WIDTH,
                PLACEHOLDER_BASE + 1,
                301,
                302,
                PLACEHOLDER_BASE + 3
            ]
        );
        assert!(root.path().join("uploads/santo.pdf").exists());
        assert!(scratch_is_empty(root.path()));
    }

    #[test]
    fn forced_merge_failure_degrades_to_the_cover() {
        let root = tempfile::tempdir().unwrap();
        let pipeline = pipeline(root.path(), misa_dominical(), StubRenderer::default())
            .with_merger(DocumentMerger::with_combiner(
                ScratchArea::new(root.path().join(".temp")),
                Box::new(BrokenCombiner),
            ));

        let document = pipeline.generate(1).unwrap();
        assert_eq!(document.bytes, fixture_pdf(&[COVER_WIDTH]));
        assert!(scratch_is_empty(root.path()));
    }

    #[test]
    fn failed_pages_are_left_out() {
        let root = tempfile::tempdir().unwrap();
        let renderer = StubRenderer {
            fail_cover: true,
            fail_placeholders: vec![2],
            ..StubRenderer::default()
        };
        let pipeline = pipeline(root.path(), misa_dominical(), renderer);

        let document = pipeline.generate(1).unwrap();
        assert_eq!(
            page_widths(&document.bytes),
            vec![PROGRAM_WIDTH, PLACEHOLDER_BASE + 1]
        );
    }

    #[test]
    fn failed_program_page_is_left_out() {
        let root = tempfile::tempdir().unwrap();
        let renderer = StubRenderer {
            fail_program: true,
            ..StubRenderer::default()
        };
        let pipeline = pipeline(root.path(), misa_dominical(), renderer);

        let document = pipeline.generate(1).unwrap();
        assert_eq!(
            page_widths(&document.bytes),
            vec![COVER_WIDTH, PLACEHOLDER_BASE + 1, PLACEHOLDER_BASE + 2]
        );
        assert!(scratch_is_empty(root.path()));
    }

    #[test]
    fn nothing_rendered_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let renderer = StubRenderer {
            fail_cover: true,
            ..StubRenderer::default()
        };
        let event = EventSnapshot {
            pieces: Vec::new(),
            ..misa_dominical()
        };
        let pipeline = pipeline(root.path(), event, renderer);
        assert!(matches!(pipeline.generate(1), Err(PipelineError::Empty(1))));
    }
}
