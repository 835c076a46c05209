//! Error types for orgtree.

use thiserror::Error;

/// Errors surfaced by the roster pipeline, providers and artifact emitters.
///
/// Malformed nested attributes, ambiguous superiors and unresolved superiors
/// are recovered where they occur and never show up here.
#[derive(Error, Debug)]
pub enum Error {
    /// No members remained after merging every source batch.
    #[error("no members found after merging all sources")]
    EmptyInput,

    /// A persisted roster document is not a list of flat member records.
    #[error("invalid roster document: {0}")]
    InvalidArtifactInput(String),

    /// The provider token environment variable is unset or blank.
    #[error("missing credentials: environment variable {var} is not set")]
    MissingCredentials { var: String },

    /// The retrieval collaborator gave up on a source.
    #[error("failed to fetch '{source_id}': {message}")]
    Provider { source_id: String, message: String },

    /// Configuration file could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// SVG parsing, PNG encoding or PDF conversion failed.
    #[error("render failed: {0}")]
    Render(String),

    /// Output path extension is not a supported format.
    #[error("unsupported output format: {0} (use .html, .json, .svg, .png or .pdf)")]
    UnsupportedOutput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
