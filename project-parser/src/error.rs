/// Error taxonomy for project document parsing
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures raised while resolving and parsing a project document.
///
/// `Resolution` and `Syntax` abort the unit being built (a referenced
/// subtree, a chunk, a whole document); `Decode` marks a single malformed
/// element and is caught by the array dispatcher, which skips the element
/// and keeps scanning its siblings.
#[derive(Debug, Error)]
pub enum Error {
    /// A referenced file or archive entry is missing or unreadable
    #[error("cannot resolve '{}': {reason}", path.display())]
    Resolution { path: PathBuf, reason: String },

    /// Malformed tag structure; stream position is no longer trustworthy
    #[error("malformed XML stream: {0}")]
    Syntax(#[from] quick_xml::Error),

    #[error("malformed XML attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("unexpected end of stream inside <{0}>")]
    UnexpectedEof(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A single element could not be decoded; never escalates past the
    /// enclosing array
    #[error("malformed <{element}> element: {reason}")]
    Decode {
        element: &'static str,
        reason: String,
    },
}

impl Error {
    pub(crate) fn decode(element: &'static str, reason: impl Into<String>) -> Self {
        Error::Decode {
            element,
            reason: reason.into(),
        }
    }

    pub(crate) fn resolution(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::Resolution {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
