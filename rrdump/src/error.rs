//! Error types for the rrdump archive dumper.

use thiserror::Error;

/// The main error type for all rrdump operations.
///
/// Errors are grouped by the phase that produced them: opening and decoding a
/// file, selecting an archive, and reading rows during a traversal. The end of
/// a traversal is not an error; [`Dumper::next_row`](crate::Dumper::next_row)
/// reports it as `Ok(None)`.
#[derive(Error, Debug)]
pub enum RrdError {
    /// Error opening a file or decoding its header.
    #[error("open error: {0}")]
    Open(#[from] OpenError),

    /// Error selecting or traversing an archive.
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// Error reading row data after a successful open.
    #[error("read error: {0}")]
    Read(#[from] ReadError),
}

/// Errors that can occur when opening a round-robin file.
#[derive(Error, Debug)]
pub enum OpenError {
    /// The file does not exist.
    #[error("no such file '{path}': {source}")]
    NotFound {
        /// The path that was requested.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file exists but cannot be read by this process.
    #[error("permission denied for '{path}': {source}")]
    PermissionDenied {
        /// The path that was requested.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Any other failure while opening the file.
    #[error("failed to open '{path}': {source}")]
    Io {
        /// The path that was requested.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Memory mapping failed.
    #[error("memory mapping failed for file '{path}': {source}")]
    Map {
        /// The file path that failed to map.
        path: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The header failed structural validation.
    #[error("'{path}' is not a valid round-robin file: {reason}")]
    InvalidFormat {
        /// The file path.
        path: String,
        /// Description of what was invalid.
        reason: String,
    },
}

impl OpenError {
    /// Classifies an I/O error raised while opening `path`.
    pub(crate) fn from_io(path: &str, source: std::io::Error) -> Self {
        let path = path.to_string();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path, source },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path, source },
            _ => Self::Io { path, source },
        }
    }
}

/// Errors that can occur while selecting or traversing an archive.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// No archive uses the requested consolidation function.
    #[error("no archive with consolidation function '{cf_name}' (available: {})", available.join(", "))]
    NotFound {
        /// The requested consolidation function name.
        cf_name: String,
        /// Consolidation function names present in the file, in header order.
        available: Vec<String>,
    },

    /// Rows were requested before any archive was selected.
    #[error("no archive selected")]
    NotSelected,

    /// A previous read failed; the archive must be selected again.
    #[error("traversal of archive {archive_index} was aborted by an earlier read failure")]
    TraversalAborted {
        /// Index of the archive whose traversal failed.
        archive_index: usize,
    },
}

/// Errors that can occur while reading row data.
#[derive(Error, Debug)]
pub enum ReadError {
    /// The read would extend past the end of the file.
    #[error("read beyond end of '{path}': offset {offset} + length {length} > file size {file_size}")]
    Truncated {
        /// The file path.
        path: String,
        /// The attempted offset.
        offset: u64,
        /// The attempted read length.
        length: u64,
        /// The actual file size.
        file_size: u64,
    },
}

/// Type alias for `Result<T, RrdError>`.
pub type Result<T> = std::result::Result<T, RrdError>;
