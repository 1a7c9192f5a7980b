//! Error types for the parsing engine.
//!
//! Every failure is fatal to the current generation run. Errors carry the
//! originating file and the 1-based line number that was active when the
//! failure occurred; the location is attached once, at the file-parse
//! boundary (or at the registration site for reference errors surfaced
//! during finalize).

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failure categories of the parsing engine.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// The block parser failed to advance past a line.
    #[error("cannot parse input: {0}")]
    Stalled(String),
    /// A property declaration parsed as neither a style list nor JSON.
    #[error("invalid property declaration: {0}")]
    InvalidProps(String),
    /// A table row's column count differs from the separator-declared width.
    #[error("inconsistent table row length: {0}")]
    TableRowLength(String),
    /// A list-derived table produced no rows.
    #[error("table has no rows")]
    EmptyTable,
    /// An inline tag name is not recognized.
    #[error("invalid inline tag: \\\\{0}")]
    InvalidInlineTag(String),
    /// A named style is not present in the stylesheet.
    #[error("style not defined: {0}")]
    UndefinedStyle(String),
    /// An `insert` definition name is not defined.
    #[error("definition not found: {0}")]
    UndefinedDefinition(String),
    /// A forward reference id was never registered.
    #[error("reference not found: {0}")]
    ReferenceNotFound(String),
    /// An include/image directive without a file pattern.
    #[error("missing file name in \\\\{0}(...) tag")]
    MissingFileName(String),
    /// A transclusion pattern matched no files.
    #[error("transclusion file not found: {0}")]
    FileNotFound(String),
    /// A transclusion match has an unsupported extension.
    #[error("unknown file type: {0}")]
    UnknownFileType(String),
    /// No generator was registered for a generated-content file.
    #[error("generator not registered: {0}")]
    UnknownGenerator(String),
    /// A source or configuration file could not be read.
    #[error("cannot read {0}: {1}")]
    Io(PathBuf, #[source] io::Error),
    /// Invalid JSON in a configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] serde_json::Error),
}

/// Source location of a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: PathBuf,
    /// 1-based line number.
    pub line: usize,
}

/// An engine error, optionally carrying its source location.
#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub location: Option<Location>,
}

impl Error {
    /// Attach a location unless one is already present.
    ///
    /// Errors from nested file parses keep their inner location when they
    /// propagate through the including file.
    pub fn locate(mut self, file: &Path, line: usize) -> Self {
        if self.location.is_none() {
            self.location = Some(Location {
                file: file.to_path_buf(),
                line,
            });
        }
        self
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self {
            kind,
            location: None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(loc) = &self.location {
            write!(f, " ({}:{})", loc.file.display(), loc.line)?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}
