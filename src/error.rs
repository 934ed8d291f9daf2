//! Error types for the compile/patch pipeline.

use std::io;
use std::path::PathBuf;

/// Pipeline error. Every variant that concerns a file carries its path so a
/// failed run can be re-tried after fixing the offending artifact.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to remove {}: {source}", path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to move {} to {}: {source}", from.display(), to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed XML: {source}")]
    MalformedXml {
        #[source]
        source: roxmltree::Error,
    },
    #[error("malformed XML in {}: {source}", path.display())]
    MalformedXmlFile {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },
    #[error("missing <{element}> element in {}", path.display())]
    MissingElement { element: String, path: PathBuf },
    #[error("missing attribute '{attribute}' on <{element}> in {}", path.display())]
    MissingAttribute {
        element: String,
        attribute: String,
        path: PathBuf,
    },
    #[error("no namespace declaration found in {}", path.display())]
    MissingNamespace { path: PathBuf },
    #[error("{} has no parent directory", path.display())]
    NoParentDir { path: PathBuf },
    #[error("failed to load configuration {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
}

impl Error {
    /// Attach a file path to a pathless XML parse error.
    pub fn at_path(self, path: &std::path::Path) -> Self {
        match self {
            Error::MalformedXml { source } => Error::MalformedXmlFile {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        }
    }
}
