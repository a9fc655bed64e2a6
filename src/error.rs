use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum KeggError {
    #[error("parse error at line {line}: {reason} (`{content}`)")]
    #[diagnostic(help("every record inherits the open category/subcategory/pathway context, so the whole file is rejected"))]
    Parse {
        line: usize,
        content: String,
        reason: String,
    },

    #[error("hierarchy integrity error: {0}")]
    Integrity(String),

    #[error("reference document unavailable for ko{pathway_id}: {reason}")]
    FetchUnavailable { pathway_id: String, reason: String },

    #[error("malformed reference document for ko{pathway_id}: {reason}")]
    MalformedReferenceDocument { pathway_id: String, reason: String },

    #[error("KEGG request failed: {0}")]
    Http(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to read keg file {path}: {message}")]
    Input { path: PathBuf, message: String },
}
