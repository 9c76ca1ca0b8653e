//! Read-only access to a round-robin file.
//!
//! [`RrdFile`] owns a read-only memory mapping of the file together with its
//! decoded [`RrdHeader`]. The header is decoded exactly once, when the file is
//! opened; row data is read on demand through [`RrdFile::read_at`], which
//! bounds-checks every access against the mapped length.
//!
//! # Safety
//!
//! Mapping a file is only sound while no other process truncates it. rrdtool
//! never shrinks an existing file, and writers take the engine's own lock;
//! this module adds no locking of its own.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use crate::error::{OpenError, ReadError, Result};
use crate::header::RrdHeader;

/// An open round-robin file: mapping plus decoded header.
///
/// Dropping an `RrdFile` unmaps the file. Every early return in
/// [`RrdFile::open`] releases whatever had been acquired so far.
#[derive(Debug)]
pub struct RrdFile {
    /// Read-only mapping of the whole file.
    mmap: Mmap,
    /// Header decoded from the start of the mapping.
    header: RrdHeader,
    /// Path to the file (for error reporting).
    path: String,
}

impl RrdFile {
    /// Opens and maps `path`, then decodes and validates its header.
    ///
    /// # Errors
    ///
    /// - [`OpenError::NotFound`] if the path does not exist
    /// - [`OpenError::PermissionDenied`] if it cannot be read
    /// - [`OpenError::Io`] / [`OpenError::Map`] for other I/O failures
    /// - [`OpenError::InvalidFormat`] if the header fails validation
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use rrdump::file::RrdFile;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let file = RrdFile::open("traffic.rrd")?;
    /// println!("{} archives", file.header().archives().len());
    /// # Ok(())
    /// # }
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.to_string_lossy().to_string();

        let file = File::open(path).map_err(|e| OpenError::from_io(&path_str, e))?;
        let file_len = file
            .metadata()
            .map_err(|e| OpenError::from_io(&path_str, e))?
            .len();
        if file_len == 0 {
            return Err(OpenError::InvalidFormat {
                path: path_str,
                reason: "file too small: 0 bytes".to_string(),
            }
            .into());
        }

        // SAFETY: The mapping is read-only and never outlives `self`. Reads go
        // through `read_at`, which checks every range against the mapped length.
        // See the module docs for the truncation caveat.
        let mmap = unsafe {
            Mmap::map(&file).map_err(|e| OpenError::Map {
                path: path_str.clone(),
                source: e,
            })?
        };
        drop(file);

        let header = RrdHeader::decode(&mmap, &path_str)?;

        tracing::debug!(
            path = %path_str,
            version = header.version(),
            step = header.step(),
            data_sources = header.ds_count(),
            archives = header.archives().len(),
            header_len = header.header_len(),
            "opened round-robin file"
        );

        Ok(Self {
            mmap,
            header,
            path: path_str,
        })
    }

    /// Returns the decoded header.
    pub fn header(&self) -> &RrdHeader {
        &self.header
    }

    /// Returns the path this file was opened from.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the size of the file in bytes.
    pub fn len(&self) -> u64 {
        self.mmap.len() as u64
    }

    /// Returns whether the file is empty. An opened file never is.
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// Returns `length` bytes starting at absolute byte `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::Truncated`] if the range extends past the end of
    /// the file.
    pub fn read_at(&self, offset: u64, length: u64) -> Result<&[u8]> {
        let truncated = || ReadError::Truncated {
            path: self.path.clone(),
            offset,
            length,
            file_size: self.len(),
        };

        let start = usize::try_from(offset).map_err(|_| truncated())?;
        let len = usize::try_from(length).map_err(|_| truncated())?;
        start
            .checked_add(len)
            .and_then(|end| self.mmap.get(start..end))
            .ok_or_else(|| truncated().into())
    }

    /// Closes the file, releasing the mapping and the decoded header.
    pub fn close(self) {
        tracing::debug!(path = %self.path, "closed round-robin file");
    }
}
