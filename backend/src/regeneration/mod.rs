//! Regeneration of stored event documents after an event is saved.
//!
//! The save path only notifies; whether a run happens is decided here by the
//! `DebouncePolicy`. The resulting PDF is written below the public directory
//! and its location recorded through the `GenerationLog`, which never notifies
//! back.

pub mod policy;
pub mod state;

use crate::pipeline::{GeneratedDocument, Pipeline};
use crate::store::GenerationLog;
use chrono::{DateTime, Utc};
use common::model::event::EventId;
use common::model::generation::GenerationRecord;
use log::{error, info, warn};
use policy::DebouncePolicy;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

/// Public URL prefix of `output_dir`.
pub const EVENTS_URL_PREFIX: &str = "/uploads/events";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegenerationOutcome {
    /// A previous successful run is still within the debounce window.
    Skipped,
    Generated { path: String },
    Failed(String),
}

pub struct Regenerator {
    pipeline: Arc<Pipeline>,
    log: Arc<dyn GenerationLog>,
    policy: DebouncePolicy,
    output_dir: PathBuf,
}

impl Regenerator {
    pub fn new(
        pipeline: Arc<Pipeline>,
        log: Arc<dyn GenerationLog>,
        policy: DebouncePolicy,
        output_dir: impl Into<PathBuf>,
    ) -> Regenerator {
        Regenerator {
            pipeline,
            log,
            policy,
            output_dir: output_dir.into(),
        }
    }

    /// Regenerates the stored document for `event_id` unless debounced.
    pub fn regenerate(&self, event_id: EventId, now: DateTime<Utc>) -> RegenerationOutcome {
        let previous = match self.log.last_generation(event_id) {
            Ok(previous) => previous.unwrap_or_default(),
            Err(e) => {
                warn!("Event {}: could not read last generation: {}", event_id, e);
                GenerationRecord::default()
            }
        };
        if self.policy.is_fresh(&previous, now) {
            info!(
                "Event {}: PDF generated recently, skipping regeneration",
                event_id
            );
            return RegenerationOutcome::Skipped;
        }

        let result = match self.pipeline.generate(event_id) {
            Ok(document) => match self.store(&document) {
                Ok(path) => Ok((path, document.filename)),
                Err(e) => Err(format!("could not store {}: {}", document.filename, e)),
            },
            Err(e) => Err(e.to_string()),
        };

        let (record, outcome) = match result {
            Ok((path, filename)) => {
                info!("Event {}: PDF stored at {}", event_id, path);
                (
                    GenerationRecord {
                        path: Some(path.clone()),
                        filename: Some(filename),
                        generated_at: Some(now),
                        error: None,
                    },
                    RegenerationOutcome::Generated { path },
                )
            }
            Err(message) => {
                error!("Event {}: PDF regeneration failed: {}", event_id, message);
                (
                    GenerationRecord {
                        generated_at: Some(now),
                        error: Some(message.clone()),
                        ..previous
                    },
                    RegenerationOutcome::Failed(message),
                )
            }
        };

        if let Err(e) = self.log.record_generation(event_id, &record) {
            warn!("Event {}: could not record generation result: {}", event_id, e);
        }
        outcome
    }

    /// Writes the document under `output_dir` and returns its public URL.
    fn store(&self, document: &GeneratedDocument) -> io::Result<String> {
        fs::create_dir_all(&self.output_dir)?;
        let mut file = tempfile::NamedTempFile::new_in(&self.output_dir)?;
        file.write_all(&document.bytes)?;
        file.flush()?;
        file.persist(self.output_dir.join(&document.filename))
            .map_err(|e| e.error)?;
        Ok(format!("{}/{}", EVENTS_URL_PREFIX, document.filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::fixtures::{page_count, MemoryStore, StubRenderer};
    use crate::pipeline::resolver::MediaLocator;
    use crate::pipeline::scratch::ScratchArea;
    use chrono::TimeZone;
    use common::model::event::{EventSnapshot, PieceEntry};
    use std::path::Path;
    use std::sync::atomic::Ordering;

    fn regenerator(root: &Path, store: Arc<MemoryStore>) -> Regenerator {
        let pipeline = Pipeline::new(
            store.clone(),
            Arc::new(StubRenderer::default()),
            MediaLocator::new(root),
            ScratchArea::new(root.join(".temp")),
            chrono_tz::America::Mexico_City,
        );
        Regenerator::new(
            Arc::new(pipeline),
            store,
            DebouncePolicy::default(),
            root.join("uploads/events"),
        )
    }

    fn event() -> EventSnapshot {
        EventSnapshot {
            id: 7,
            name: Some("Concierto de Navidad".to_string()),
            starts_at: Some(Utc.with_ymd_and_hms(2025, 12, 24, 2, 30, 0).unwrap()),
            pieces: vec![PieceEntry {
                performance_order: Some(1),
                cached_title: Some("Noche de paz".to_string()),
                ..PieceEntry::default()
            }],
            ..EventSnapshot::default()
        }
    }

    #[test]
    fn writes_document_and_records_result() {
        let root = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::with_event(event()));
        let now = Utc.with_ymd_and_hms(2025, 12, 1, 10, 0, 0).unwrap();

        let outcome = regenerator(root.path(), store.clone()).regenerate(7, now);

        let expected = "/uploads/events/2025-12-23-2030-concierto-de-navidad.pdf";
        assert_eq!(
            outcome,
            RegenerationOutcome::Generated {
                path: expected.to_string()
            }
        );
        let written = root
            .path()
            .join("uploads/events/2025-12-23-2030-concierto-de-navidad.pdf");
        assert_eq!(page_count(&fs::read(written).unwrap()), 3);
        let record = store.generation(7);
        assert_eq!(record.path.as_deref(), Some(expected));
        assert_eq!(record.generated_at, Some(now));
        assert_eq!(record.error, None);
    }

    #[test]
    fn two_saves_within_the_window_generate_once() {
        let root = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::with_event(event()));
        let regenerator = regenerator(root.path(), store.clone());
        let first = Utc.with_ymd_and_hms(2025, 12, 1, 10, 0, 0).unwrap();

        assert!(matches!(
            regenerator.regenerate(7, first),
            RegenerationOutcome::Generated { .. }
        ));
        assert_eq!(
            regenerator.regenerate(7, first + chrono::Duration::seconds(10)),
            RegenerationOutcome::Skipped
        );
        assert_eq!(store.fetches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn two_saves_beyond_the_window_generate_twice() {
        let root = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::with_event(event()));
        let regenerator = regenerator(root.path(), store.clone());
        let first = Utc.with_ymd_and_hms(2025, 12, 1, 10, 0, 0).unwrap();
        let second = first + chrono::Duration::seconds(45);

        regenerator.regenerate(7, first);
        assert!(matches!(
            regenerator.regenerate(7, second),
            RegenerationOutcome::Generated { .. }
        ));
        assert_eq!(store.fetches.load(Ordering::SeqCst), 2);
        assert_eq!(store.generation(7).generated_at, Some(second));
    }

    #[test]
    fn failure_is_recorded_and_does_not_debounce() {
        let root = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::with_event(event()));
        // A file where the output directory should be makes the write fail.
        fs::create_dir_all(root.path().join("uploads")).unwrap();
        fs::write(root.path().join("uploads/events"), b"not a directory").unwrap();
        let regenerator = regenerator(root.path(), store.clone());
        let now = Utc.with_ymd_and_hms(2025, 12, 1, 10, 0, 0).unwrap();

        assert!(matches!(
            regenerator.regenerate(7, now),
            RegenerationOutcome::Failed(_)
        ));
        let record = store.generation(7);
        assert!(record.error.is_some());
        assert_eq!(record.generated_at, Some(now));

        assert!(matches!(
            regenerator.regenerate(7, now + chrono::Duration::seconds(1)),
            RegenerationOutcome::Failed(_)
        ));
        assert_eq!(store.fetches.load(Ordering::SeqCst), 2);
    }
}
