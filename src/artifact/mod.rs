//! Rendering artifacts: the interactive document, the persisted roster and
//! static snapshots, plus the sinks that receive them.

mod html;
mod payload;
mod raster;
mod svg;

pub use html::render_html;
pub use payload::{ArtifactNode, ArtifactPayload, ViewerMetrics};
pub use raster::{svg_to_pdf, svg_to_png};
pub use svg::render_svg;

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};

use crate::error::{Error, Result};
use crate::fonts::{CosmicTextMeasure, TextMeasure};
use crate::layout::{LayoutEngine, LayoutMetrics, LayoutState};
use crate::roster::{roster_to_json, MemberRecord};
use crate::theme::Theme;
use crate::tree::Forest;

const SNAPSHOT_PADDING: f32 = 24.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Html,
    Json,
    Svg,
    Png,
    Pdf,
}

impl OutputFormat {
    /// Pick the format from the output path's extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .ok_or_else(|| {
                Error::UnsupportedOutput(format!("{} has no extension", path.display()))
            })?;

        match ext.as_str() {
            "html" | "htm" => Ok(Self::Html),
            "json" => Ok(Self::Json),
            "svg" => Ok(Self::Svg),
            "png" => Ok(Self::Png),
            "pdf" => Ok(Self::Pdf),
            other => Err(Error::UnsupportedOutput(format!(".{}", other))),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Json => "json",
            Self::Svg => "svg",
            Self::Png => "png",
            Self::Pdf => "pdf",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Html => "HTML",
            Self::Json => "JSON",
            Self::Svg => "SVG",
            Self::Png => "PNG",
            Self::Pdf => "PDF",
        })
    }
}

/// A finished artifact in its serialized form.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub format: OutputFormat,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }
}

/// Receives finished artifacts.
pub trait ArtifactSink {
    fn accept(&mut self, artifact: &Artifact) -> Result<()>;
}

/// Writes each artifact to one path, creating missing parent directories.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ArtifactSink for FileSink {
    fn accept(&mut self, artifact: &Artifact) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, &artifact.bytes)?;
        tracing::info!(
            format = %artifact.format,
            bytes = artifact.bytes.len(),
            "saved to {}",
            self.path.display()
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemorySink {
    pub artifacts: Vec<Artifact>,
}

impl ArtifactSink for MemorySink {
    fn accept(&mut self, artifact: &Artifact) -> Result<()> {
        self.artifacts.push(artifact.clone());
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub title: String,
    pub theme: Theme,
    pub metrics: LayoutMetrics,
    /// Depth shown when the document opens (roots are depth 0).
    pub initial_depth: usize,
    /// Snapshots only: draw every branch expanded.
    pub expand_all: bool,
    pub png_scale: f32,
    pub generated_at: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            title: "Organization Chart".to_string(),
            theme: Theme::default(),
            metrics: LayoutMetrics::default(),
            initial_depth: 1,
            expand_all: false,
            png_scale: 1.0,
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

/// Serialize `forest` in the requested format, measuring snapshot labels
/// against the system fonts.
pub fn emit(forest: &Forest, options: &RenderOptions, format: OutputFormat) -> Result<Artifact> {
    match format {
        OutputFormat::Html | OutputFormat::Json => {
            emit_with_measure(forest, options, format, &mut NoMeasure)
        }
        _ => emit_with_measure(forest, options, format, &mut CosmicTextMeasure::new()),
    }
}

pub fn emit_with_measure<T: TextMeasure>(
    forest: &Forest,
    options: &RenderOptions,
    format: OutputFormat,
    measure: &mut T,
) -> Result<Artifact> {
    let bytes = match format {
        OutputFormat::Html => {
            let payload = ArtifactPayload::new(
                forest,
                &options.title,
                &options.generated_at,
                &options.theme,
                options.metrics,
                options.initial_depth,
            );
            render_html(&payload)?.into_bytes()
        }
        OutputFormat::Json => {
            let members: Vec<MemberRecord> = forest.nodes().map(|n| n.record.clone()).collect();
            roster_to_json(&members)?.into_bytes()
        }
        OutputFormat::Svg => snapshot(forest, options, measure).into_bytes(),
        OutputFormat::Png => svg_to_png(&snapshot(forest, options, measure), options.png_scale)?,
        OutputFormat::Pdf => svg_to_pdf(&snapshot(forest, options, measure))?,
    };

    tracing::debug!(%format, bytes = bytes.len(), nodes = forest.len(), "artifact rendered");
    Ok(Artifact { format, bytes })
}

fn snapshot<T: TextMeasure>(forest: &Forest, options: &RenderOptions, measure: &mut T) -> String {
    let mut state = if options.expand_all {
        let mut state = LayoutState::new();
        state.expand_all(forest);
        state
    } else {
        LayoutState::with_depth(forest, options.initial_depth)
    };
    let layout = LayoutEngine::new(options.metrics).layout(forest, &mut state);
    render_svg(forest, &layout, &state, &options.theme, measure, SNAPSHOT_PADDING)
}

/// Formats without label fitting never measure text.
struct NoMeasure;

impl TextMeasure for NoMeasure {
    fn measure_text(&mut self, _text: &str, _font_size: f32, _is_bold: bool) -> f32 {
        0.0
    }
}
