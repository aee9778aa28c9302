//! # Document Merger
//!
//! Concatenates an ordered list of page sources into one PDF.
//!
//! ## Workflow
//!
//! 1.  **Materialize**: in-memory buffers are written to scratch files so the
//!     combine step only ever works from files on disk.
//! 2.  **Verify**: right before combining, every path is checked for existence;
//!     missing ones are skipped with a warning.
//! 3.  **Combine**: a `PdfCombiner` (by default `LopdfCombiner`) joins the files
//!     strictly in input order. Unreadable inputs are skipped.
//! 4.  **Fallback**: if combining fails as a whole, the first source alone (the
//!     cover) is returned instead of the error.
//! 5.  **Cleanup**: every scratch file, whether created here or handed over by
//!     the resolver, is removed before returning.

use crate::error::MergeError;
use crate::pipeline::page::{ContentPage, PageSource};
use crate::pipeline::scratch::{ScratchArea, ScratchFile};
use common::model::event::EventId;
use log::{debug, error, info, warn};
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Joins PDF files, in the given order, into one document.
pub trait PdfCombiner: Send + Sync {
    fn combine(&self, paths: &[PathBuf]) -> Result<Vec<u8>, MergeError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfCombiner;

impl PdfCombiner for LopdfCombiner {
    fn combine(&self, paths: &[PathBuf]) -> Result<Vec<u8>, MergeError> {
        let mut max_id = 1;
        let mut pages: Vec<(ObjectId, Dictionary)> = Vec::new();
        let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

        for path in paths {
            let mut doc = match Document::load(path) {
                Ok(doc) => doc,
                Err(e) => {
                    warn!("Skipping unreadable PDF {}: {}", path.display(), e);
                    continue;
                }
            };
            doc.renumber_objects_with(max_id);
            max_id = doc.max_id + 1;

            match collect_pages(&doc) {
                Ok(doc_pages) if doc_pages.is_empty() => {
                    warn!("Skipping PDF without pages: {}", path.display());
                }
                Ok(doc_pages) => {
                    debug!("Adding {} page(s) from {}", doc_pages.len(), path.display());
                    pages.extend(doc_pages);
                    objects.extend(doc.objects);
                }
                Err(e) => warn!("Skipping malformed PDF {}: {}", path.display(), e),
            }
        }

        if pages.is_empty() {
            return Err(MergeError::NoPages);
        }

        let mut merged = Document::with_version("1.5");
        let mut catalog: Option<(ObjectId, Dictionary)> = None;
        let mut page_trees: BTreeMap<ObjectId, Dictionary> = BTreeMap::new();

        for (id, object) in objects {
            let kind = dictionary_type(&object).map(<[u8]>::to_vec);
            match kind.as_deref() {
                Some(b"Catalog") => {
                    if catalog.is_none() {
                        catalog = object.as_dict().ok().map(|d| (id, d.clone()));
                    }
                }
                Some(b"Pages") => {
                    if let Ok(dict) = object.as_dict() {
                        page_trees.insert(id, dict.clone());
                    }
                }
                // Pages are re-inserted below; outlines point into the old trees.
                Some(b"Page") | Some(b"Outlines") | Some(b"Outline") => {}
                _ => {
                    merged.objects.insert(id, object);
                }
            }
        }

        let (catalog_id, mut catalog) =
            catalog.ok_or_else(|| MergeError::Structure("no catalog found".to_string()))?;
        // The first document's root node becomes the only page tree node.
        let root_tree = catalog.get(b"Pages").and_then(|p| p.as_reference()).ok();
        let (tree_id, mut tree) = root_tree
            .and_then(|id| page_trees.remove(&id).map(|tree| (id, tree)))
            .or_else(|| page_trees.into_iter().next())
            .ok_or_else(|| MergeError::Structure("no page tree found".to_string()))?;

        let kids: Vec<Object> = pages.iter().map(|(id, _)| Object::Reference(*id)).collect();
        let count = pages.len() as i64;
        for (id, mut page) in pages {
            page.set("Parent", tree_id);
            merged.objects.insert(id, Object::Dictionary(page));
        }

        tree.set("Kids", kids);
        tree.set("Count", count);
        tree.remove(b"Parent");
        merged.objects.insert(tree_id, Object::Dictionary(tree));

        catalog.set("Pages", tree_id);
        catalog.remove(b"Outlines");
        merged.objects.insert(catalog_id, Object::Dictionary(catalog));

        merged.trailer.set("Root", catalog_id);
        merged.max_id = merged.objects.keys().map(|(number, _)| *number).max().unwrap_or(0);
        merged.renumber_objects();
        merged.compress();

        let mut buffer = Vec::new();
        merged
            .save_to(&mut buffer)
            .map_err(|e| MergeError::Write(e.to_string()))?;
        Ok(buffer)
    }
}

fn dictionary_type(object: &Object) -> Option<&[u8]> {
    object.as_dict().ok()?.get(b"Type").ok()?.as_name().ok()
}

/// Pages of `doc` in page order, with inherited attributes made explicit.
fn collect_pages(doc: &Document) -> Result<Vec<(ObjectId, Dictionary)>, lopdf::Error> {
    let mut pages = Vec::new();
    for (_, page_id) in doc.get_pages() {
        let mut page = doc.get_object(page_id).and_then(|o| o.as_dict())?.clone();
        for key in INHERITABLE {
            if !page.has(key) {
                if let Some(value) = inherited_attribute(doc, &page, key) {
                    page.set(key.to_vec(), value);
                }
            }
        }
        pages.push((page_id, page));
    }
    Ok(pages)
}

fn inherited_attribute(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut parent = page.get(b"Parent").and_then(|p| p.as_reference()).ok();
    // Guards against cyclic Parent chains in damaged files.
    let mut depth = 0;
    while let Some(id) = parent {
        let node = doc.get_object(id).and_then(|o| o.as_dict()).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        parent = node.get(b"Parent").and_then(|p| p.as_reference()).ok();
        depth += 1;
        if depth > 64 {
            break;
        }
    }
    None
}

/// What can still be returned if the combine step fails.
enum FirstPage {
    Bytes(Vec<u8>),
    File(PathBuf),
}

impl FirstPage {
    fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            FirstPage::Bytes(bytes) => Some(bytes),
            FirstPage::File(path) => match fs::read(&path) {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    error!("Fallback page {} is unreadable: {}", path.display(), e);
                    None
                }
            },
        }
    }
}

pub struct DocumentMerger {
    scratch: ScratchArea,
    combiner: Box<dyn PdfCombiner>,
}

impl DocumentMerger {
    pub fn new(scratch: ScratchArea) -> DocumentMerger {
        DocumentMerger::with_combiner(scratch, Box::new(LopdfCombiner))
    }

    pub fn with_combiner(scratch: ScratchArea, combiner: Box<dyn PdfCombiner>) -> DocumentMerger {
        DocumentMerger { scratch, combiner }
    }

    /// Merges `sources` in order and removes every scratch file afterwards.
    ///
    /// # Returns
    /// - `Ok(bytes)` with the merged document, or the first source alone when
    ///   the combine step failed.
    /// - `Err(MergeError)` only when the combine step failed and the first
    ///   source could not be produced either.
    pub fn merge(&self, event_id: EventId, sources: Vec<PageSource>) -> Result<Vec<u8>, MergeError> {
        let total = sources.len();
        let mut owned: Vec<ScratchFile> = Vec::new();
        let mut inputs: Vec<(String, PathBuf)> = Vec::with_capacity(total);
        let mut first: Option<FirstPage> = None;

        for (index, PageSource { label, content }) in sources.into_iter().enumerate() {
            let path = match content {
                ContentPage::Rendered(bytes) => {
                    let written = self.scratch.write(&label, event_id, &bytes);
                    if index == 0 {
                        first = Some(FirstPage::Bytes(bytes));
                    }
                    match written {
                        Ok(file) => {
                            let path = file.path().to_path_buf();
                            owned.push(file);
                            path
                        }
                        Err(e) => {
                            warn!("Could not stage {} for merging: {}", label, e);
                            continue;
                        }
                    }
                }
                ContentPage::Stored(path) => path,
                ContentPage::Scratch(file) => {
                    let path = file.path().to_path_buf();
                    owned.push(file);
                    path
                }
            };
            if index == 0 && first.is_none() {
                first = Some(FirstPage::File(path.clone()));
            }
            inputs.push((label, path));
        }

        let mut paths = Vec::with_capacity(inputs.len());
        for (label, path) in inputs {
            if path.is_file() {
                paths.push(path);
            } else {
                warn!("PDF file not found for {}: {}", label, path.display());
            }
        }

        let result = if paths.is_empty() {
            Err(MergeError::NoPages)
        } else {
            self.combiner.combine(&paths)
        };

        let outcome = match result {
            Ok(bytes) => {
                info!(
                    "Event {}: merged {} of {} page sources ({} bytes)",
                    event_id,
                    paths.len(),
                    total,
                    bytes.len()
                );
                Ok(bytes)
            }
            Err(e) => {
                error!("Event {}: error merging PDFs: {}", event_id, e);
                warn!("Event {}: falling back to the first page only", event_id);
                first.and_then(FirstPage::into_bytes).ok_or(e)
            }
        };

        for file in owned {
            file.remove();
        }
        outcome
    }
}
