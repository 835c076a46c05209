use std::path::Path;

use resvg::usvg;
use tiny_skia::{Pixmap, Transform};

use crate::error::{Error, Result};

const LOCAL_FONTS_DIR: &str = "fonts";

pub fn svg_to_png(svg: &str, scale: f32) -> Result<Vec<u8>> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(Error::Render(format!("invalid PNG scale: {}", scale)));
    }

    let mut opts = usvg::Options::default();
    {
        let fontdb = opts.fontdb_mut();
        fontdb.load_system_fonts();
        let local_fonts = Path::new(LOCAL_FONTS_DIR);
        if local_fonts.is_dir() {
            fontdb.load_fonts_dir(local_fonts);
        }

        let fallbacks = FontFallbacks::pick(
            fontdb.faces().flat_map(|face| face.families.iter().map(|(f, _)| f.as_str())),
        );
        if let Some(family) = fallbacks.sans() {
            fontdb.set_sans_serif_family(family);
        }
        if let Some(family) = fallbacks.serif() {
            fontdb.set_serif_family(family);
        }
        if let Some(family) = fallbacks.mono() {
            fontdb.set_monospace_family(family);
        }
    }

    let tree = usvg::Tree::from_str(svg, &opts)
        .map_err(|e| Error::Render(format!("failed to parse SVG: {}", e)))?;

    let width = (tree.size().width() * scale).ceil() as u32;
    let height = (tree.size().height() * scale).ceil() as u32;
    let mut pixmap = Pixmap::new(width, height)
        .ok_or_else(|| Error::Render(format!("cannot allocate a {}x{} pixmap", width, height)))?;

    resvg::render(&tree, Transform::from_scale(scale, scale), &mut pixmap.as_mut());

    pixmap
        .encode_png()
        .map_err(|e| Error::Render(format!("failed to encode PNG: {}", e)))
}

pub fn svg_to_pdf(svg: &str) -> Result<Vec<u8>> {
    use svg2pdf::usvg::fontdb;

    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    let local_fonts = Path::new(LOCAL_FONTS_DIR);
    if local_fonts.is_dir() {
        db.load_fonts_dir(local_fonts);
    }

    let families = db
        .faces()
        .flat_map(|face| face.families.iter().map(|(family, _)| family.as_str()));
    let fallbacks = FontFallbacks::pick(families);
    if let Some(family) = fallbacks.sans() {
        db.set_sans_serif_family(family);
    }
    if let Some(family) = fallbacks.serif() {
        db.set_serif_family(family);
    }
    if let Some(family) = fallbacks.mono() {
        db.set_monospace_family(family);
    }

    let mut opts = svg2pdf::usvg::Options::default();
    opts.fontdb = std::sync::Arc::new(db);
    let tree = svg2pdf::usvg::Tree::from_str(svg, &opts)
        .map_err(|e| Error::Render(format!("failed to parse SVG: {}", e)))?;

    // Text goes out as paths so names survive missing fonts in the viewer.
    let mut options = svg2pdf::ConversionOptions::default();
    options.embed_text = false;

    svg2pdf::to_pdf(&tree, options, svg2pdf::PageOptions::default())
        .map_err(|e| Error::Render(format!("failed to convert SVG to PDF: {}", e)))
}

/// Generic family names resolved against whatever fonts are installed.
///
/// resvg and svg2pdf each link their own `fontdb`, so the choice is made
/// over plain family names and applied to both databases.
#[derive(Debug, Default, PartialEq)]
struct FontFallbacks {
    first: Option<String>,
    sans: Option<String>,
    serif: Option<String>,
    mono: Option<String>,
}

impl FontFallbacks {
    fn pick<'a>(families: impl Iterator<Item = &'a str>) -> Self {
        let mut picked = Self::default();
        for family in families {
            if picked.first.is_none() {
                picked.first = Some(family.to_string());
            }
            let lower = family.to_ascii_lowercase();
            if picked.sans.is_none() && lower.contains("sans") {
                picked.sans = Some(family.to_string());
            }
            if picked.serif.is_none() && lower.contains("serif") {
                picked.serif = Some(family.to_string());
            }
            if picked.mono.is_none() && (lower.contains("mono") || lower.contains("code")) {
                picked.mono = Some(family.to_string());
            }
        }
        picked
    }

    fn sans(&self) -> Option<&str> {
        self.sans.as_deref().or(self.first.as_deref())
    }

    fn serif(&self) -> Option<&str> {
        self.serif.as_deref().or(self.first.as_deref())
    }

    fn mono(&self) -> Option<&str> {
        self.mono
            .as_deref()
            .or(self.sans.as_deref())
            .or(self.first.as_deref())
    }
}
