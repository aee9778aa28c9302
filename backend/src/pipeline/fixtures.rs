//! Test doubles shared by the pipeline, regeneration and service tests.
//!
//! Fixture PDFs tag every page by its `MediaBox` width, so the order of pages in
//! a merged document can be read back as a list of numbers.

use crate::error::{RenderError, StoreError};
use crate::pipeline::renderer::SheetRenderer;
use crate::store::{EventSource, GenerationLog};
use common::model::event::{EventId, EventSnapshot, PieceEntry};
use common::model::generation::GenerationRecord;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub const COVER_WIDTH: i64 = 100;
pub const PROGRAM_WIDTH: i64 = 200;
/// Placeholder pages are `PLACEHOLDER_BASE + position`.
pub const PLACEHOLDER_BASE: i64 = 1000;

/// A PDF with one page per entry, each page `width` points wide.
pub fn fixture_pdf(widths: &[i64]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        content.encode().unwrap_or_default(),
    ));

    let kids: Vec<Object> = widths
        .iter()
        .map(|&width| {
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(width),
                    Object::Integer(842),
                ],
            });
            Object::Reference(page_id)
        })
        .collect();

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => Object::Integer(widths.len() as i64),
            "Kids" => kids,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// Width of every page of `bytes`, in page order.
pub fn page_widths(bytes: &[u8]) -> Vec<i64> {
    let doc = Document::load_mem(bytes).unwrap();
    doc.get_pages()
        .values()
        .map(|&page_id| {
            let page = doc.get_dictionary(page_id).unwrap();
            let media_box = page.get(b"MediaBox").unwrap();
            let media_box = match media_box {
                Object::Reference(id) => doc.get_object(*id).unwrap(),
                other => other,
            };
            match &media_box.as_array().unwrap()[2] {
                Object::Integer(width) => *width,
                Object::Real(width) => *width as i64,
                other => panic!("unexpected MediaBox entry {:?}", other),
            }
        })
        .collect()
}

pub fn page_count(bytes: &[u8]) -> usize {
    Document::load_mem(bytes).unwrap().get_pages().len()
}

/// Renderer producing fixture pages instead of drawing anything.
#[derive(Default)]
pub struct StubRenderer {
    pub fail_cover: bool,
    pub fail_program: bool,
    /// Positions whose placeholder render fails.
    pub fail_placeholders: Vec<usize>,
    pub placeholder_calls: AtomicUsize,
}

impl SheetRenderer for StubRenderer {
    fn render_cover(&self, _event: &EventSnapshot) -> Result<Vec<u8>, RenderError> {
        if self.fail_cover {
            return Err(RenderError::Fonts("stub cover failure".to_string()));
        }
        Ok(fixture_pdf(&[COVER_WIDTH]))
    }

    fn render_program(&self, _event: &EventSnapshot) -> Result<Vec<u8>, RenderError> {
        if self.fail_program {
            return Err(RenderError::Fonts("stub program failure".to_string()));
        }
        Ok(fixture_pdf(&[PROGRAM_WIDTH]))
    }

    fn render_placeholder(&self, _piece: &PieceEntry, position: usize) -> Result<Vec<u8>, RenderError> {
        self.placeholder_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_placeholders.contains(&position) {
            return Err(RenderError::Fonts("stub placeholder failure".to_string()));
        }
        Ok(fixture_pdf(&[PLACEHOLDER_BASE + position as i64]))
    }
}

/// In-memory event store that also keeps the generation log.
#[derive(Default)]
pub struct MemoryStore {
    pub events: Mutex<HashMap<EventId, EventSnapshot>>,
    pub fetches: AtomicUsize,
}

impl MemoryStore {
    pub fn with_event(event: EventSnapshot) -> MemoryStore {
        let store = MemoryStore::default();
        store.events.lock().unwrap().insert(event.id, event);
        store
    }

    pub fn generation(&self, id: EventId) -> GenerationRecord {
        self.events.lock().unwrap()[&id].generation.clone()
    }
}

impl EventSource for MemoryStore {
    fn fetch_event(&self, id: EventId) -> Result<Option<EventSnapshot>, StoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.events.lock().unwrap().get(&id).cloned())
    }
}

impl GenerationLog for MemoryStore {
    fn last_generation(&self, id: EventId) -> Result<Option<GenerationRecord>, StoreError> {
        Ok(self.events.lock().unwrap().get(&id).map(|e| e.generation.clone()))
    }

    fn record_generation(&self, id: EventId, record: &GenerationRecord) -> Result<(), StoreError> {
        match self.events.lock().unwrap().get_mut(&id) {
            Some(event) => {
                event.generation = record.clone();
                Ok(())
            }
            None => Err(StoreError::Invalid(format!("event {} does not exist", id))),
        }
    }
}
