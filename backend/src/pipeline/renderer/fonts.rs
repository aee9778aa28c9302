use crate::error::RenderError;
use genpdf::fonts::{self, FontData, FontFamily};
use log::{debug, info};
use std::path::{Path, PathBuf};

/// System locations searched when the configured family is not available.
const SYSTEM_FONT_DIRS: [&str; 4] = [
    "/usr/share/fonts/truetype/liberation",
    "/usr/share/fonts/truetype/dejavu",
    "/usr/share/fonts/TTF",
    "/usr/share/fonts/dejavu",
];
const SYSTEM_FAMILIES: [&str; 2] = ["LiberationSans", "DejaVuSans"];

/// Loads `family` from `dir`, then falls back to well-known system fonts.
///
/// Both `{family}-Regular/-Bold/-Italic/-BoldItalic.ttf` and the DejaVu-style
/// `{family}.ttf` + `-Oblique` naming are accepted.
pub fn load_font_family(dir: &Path, family: &str) -> Result<FontFamily<FontData>, RenderError> {
    let mut candidates: Vec<(PathBuf, &str)> = vec![(dir.to_path_buf(), family)];
    for system_dir in SYSTEM_FONT_DIRS {
        for system_family in SYSTEM_FAMILIES {
            candidates.push((PathBuf::from(system_dir), system_family));
        }
    }

    for (dir, name) in &candidates {
        match load_from(dir, name) {
            Ok(loaded) => {
                info!("Using font family {} from {}", name, dir.display());
                return Ok(loaded);
            }
            Err(e) => debug!("Font family {} not usable in {}: {}", name, dir.display(), e),
        }
    }
    Err(RenderError::Fonts(format!(
        "family {} not found in {} or system font directories",
        family,
        dir.display()
    )))
}

fn load_from(dir: &Path, name: &str) -> Result<FontFamily<FontData>, genpdf::error::Error> {
    if let Ok(family) = fonts::from_files(dir, name, None) {
        return Ok(family);
    }
    let load = |suffix: &str| FontData::load(dir.join(format!("{}{}.ttf", name, suffix)), None);
    Ok(FontFamily {
        regular: load("")?,
        bold: load("-Bold")?,
        italic: load("-Oblique")?,
        bold_italic: load("-BoldOblique")?,
    })
}
