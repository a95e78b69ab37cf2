/// Error taxonomy for mesh ingestion
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MeshError>;

#[derive(Debug, Error)]
pub enum MeshError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("no '{entry}' entry in {}", archive.display())]
    MissingEntry { archive: PathBuf, entry: String },

    /// The header does not describe a readable element stream
    #[error("malformed header at line {line}: {reason}")]
    Header { line: usize, reason: String },

    /// The element stream ended or broke mid-element
    #[error("malformed element data: {0}")]
    Data(String),
}
