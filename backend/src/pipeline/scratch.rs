//! Per-run temporary files.
//!
//! Every intermediate PDF the pipeline writes lives in one scratch directory and
//! is represented by a `ScratchFile`. Removing it explicitly logs any failure;
//! dropping it removes the file silently, so no exit path leaves a file behind.

use common::model::event::EventId;
use log::{debug, warn};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tempfile::TempPath;

#[derive(Debug, Clone)]
pub struct ScratchArea {
    dir: PathBuf,
}

impl ScratchArea {
    pub fn new(dir: impl Into<PathBuf>) -> ScratchArea {
        ScratchArea { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `bytes` to a new file named `{kind}-{event}-{nanos}-{random}.pdf`.
    ///
    /// The event id and a nanosecond timestamp keep names apart between
    /// concurrent runs; the random suffix from `tempfile` settles the rest.
    pub fn write(&self, kind: &str, event_id: EventId, bytes: &[u8]) -> io::Result<ScratchFile> {
        fs::create_dir_all(&self.dir)?;
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let prefix = format!("{}-{}-{}-", kind, event_id, nanos);
        let mut file = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(".pdf")
            .tempfile_in(&self.dir)?;
        file.write_all(bytes)?;
        file.flush()?;
        let path = file.into_temp_path();
        debug!("Scratch file written: {}", path.display());
        Ok(ScratchFile { path })
    }
}

/// A temporary file owned by the current run.
#[derive(Debug)]
pub struct ScratchFile {
    path: TempPath,
}

impl ScratchFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Deletes the file now. Failures are logged and never propagated.
    pub fn remove(self) {
        let display = self.path.display().to_string();
        if let Err(e) = self.path.close() {
            warn!("Error cleaning up temporary file {}: {}", display, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_creates_directory_and_names_file_after_event() {
        let root = tempfile::tempdir().unwrap();
        let scratch = ScratchArea::new(root.path().join("nested/.temp"));
        let file = scratch.write("cover", 42, b"%PDF-1.5").unwrap();
        let name = file.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("cover-42-"));
        assert!(name.ends_with(".pdf"));
        assert_eq!(fs::read(file.path()).unwrap(), b"%PDF-1.5");
    }

    #[test]
    fn remove_and_drop_both_delete_the_file() {
        let root = tempfile::tempdir().unwrap();
        let scratch = ScratchArea::new(root.path());
        let removed = scratch.write("a", 1, b"x").unwrap();
        let removed_path = removed.path().to_path_buf();
        removed.remove();
        assert!(!removed_path.exists());

        let dropped_path = {
            let dropped = scratch.write("b", 1, b"y").unwrap();
            dropped.path().to_path_buf()
        };
        assert!(!dropped_path.exists());
    }

    #[test]
    fn concurrent_names_do_not_collide() {
        let root = tempfile::tempdir().unwrap();
        let scratch = ScratchArea::new(root.path());
        let a = scratch.write("cover", 5, b"1").unwrap();
        let b = scratch.write("cover", 5, b"2").unwrap();
        assert_ne!(a.path(), b.path());
    }
}
