/// Typeface loading for the table renderer
///
/// `load_typeface` always returns something usable: the configured font file
/// when it loads, otherwise the built-in font set. The fallback may lack CJK
/// glyphs, which degrades the image but never stops the render.

use log::{debug, warn};
use resvg::usvg::fontdb;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Generic family used when no configured font could be loaded
pub const FALLBACK_FAMILY: &str = "sans-serif";

/// Where the loaded typeface came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypefaceSource {
    /// Loaded from the configured font file
    File(PathBuf),
    /// Built-in font set (system fonts under the generic family)
    Builtin,
}

/// A font database plus the family name the renderer should ask for
#[derive(Clone)]
pub struct Typeface {
    database: Arc<fontdb::Database>,
    family: String,
    source: TypefaceSource,
}

impl Typeface {
    /// The built-in fallback typeface
    pub fn builtin() -> Self {
        let mut database = fontdb::Database::new();
        database.load_system_fonts();
        debug!("built-in typeface has {} faces", database.len());
        Typeface { database: Arc::new(database), family: FALLBACK_FAMILY.to_string(), source: TypefaceSource::Builtin }
    }

    /// Font database handed to the SVG rasterizer
    pub fn database(&self) -> Arc<fontdb::Database> {
        Arc::clone(&self.database)
    }

    /// Value for the SVG `font-family` attribute
    pub fn font_family(&self) -> String {
        if self.is_fallback() {
            FALLBACK_FAMILY.to_string()
        } else {
            format!("'{}', {}", self.family, FALLBACK_FAMILY)
        }
    }

    pub fn source(&self) -> &TypefaceSource {
        &self.source
    }

    pub fn is_fallback(&self) -> bool {
        self.source == TypefaceSource::Builtin
    }
}

/// Load the configured font, falling back to the built-in typeface.
///
/// Called once per render; the result is held for the whole render.
pub fn load_typeface(path: Option<&Path>) -> Typeface {
    let Some(path) = path else {
        debug!("no font configured, using built-in typeface");
        return Typeface::builtin();
    };

    match load_font_file(path) {
        Ok(typeface) => typeface,
        Err(e) => {
            warn!("Failed to load font {}: {}; falling back to built-in typeface", path.display(), e);
            Typeface::builtin()
        }
    }
}

fn load_font_file(path: &Path) -> Result<Typeface, String> {
    let mut database = fontdb::Database::new();
    database.load_font_file(path).map_err(|e| e.to_string())?;

    let family = database
        .faces()
        .next()
        .and_then(|face| face.families.first().map(|(name, _)| name.clone()))
        .ok_or_else(|| "font file contains no usable faces".to_string())?;

    // Generic family lookups resolve to the configured font too
    database.set_sans_serif_family(family.clone());

    debug!("loaded typeface '{}' from {}", family, path.display());
    Ok(Typeface { database: Arc::new(database), family, source: TypefaceSource::File(path.to_path_buf()) })
}
