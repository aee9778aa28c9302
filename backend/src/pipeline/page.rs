use crate::pipeline::scratch::ScratchFile;
use std::path::{Path, PathBuf};

/// One unit the merger consumes.
#[derive(Debug)]
pub enum ContentPage {
    /// Freshly rendered bytes, still in memory.
    Rendered(Vec<u8>),
    /// An attached document in media storage. Never deleted by the pipeline.
    Stored(PathBuf),
    /// A file this run wrote and must remove before it ends.
    Scratch(ScratchFile),
}

impl ContentPage {
    pub fn is_temporary(&self) -> bool {
        matches!(self, ContentPage::Scratch(_))
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            ContentPage::Rendered(_) => None,
            ContentPage::Stored(path) => Some(path),
            ContentPage::Scratch(file) => Some(file.path()),
        }
    }
}

/// A labelled entry in the ordered merge list.
#[derive(Debug)]
pub struct PageSource {
    pub label: String,
    pub content: ContentPage,
}

impl PageSource {
    pub fn new(label: impl Into<String>, content: ContentPage) -> PageSource {
        PageSource {
            label: label.into(),
            content,
        }
    }
}
