//! Archive dumper: ordered, timestamped traversal of one archive.
//!
//! An archive is a circular buffer. Its write cursor (`cur_row`) marks the most
//! recently written row, so the oldest row sits just after it and the logical
//! sequence runs from there to the physical end of the buffer, then wraps to
//! physical row 0 and continues up to the cursor.
//!
//! ```text
//! physical:  [ row 0 | row 1 | row 2 | row 3 | row 4 ]
//!                              ^cur_row
//! logical:     3rd     4th     5th     1st     2nd
//! ```
//!
//! The dumper keeps two counters: `rows_emitted` decides when the traversal
//! ends, `physical_row` decides when to jump back to the start of the buffer.
//!
//! # Example
//!
//! ```rust,no_run
//! use rrdump::Dumper;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut dumper = Dumper::open("traffic.rrd")?;
//! dumper.select_archive("AVERAGE")?;
//! while let Some(row) = dumper.next_row()? {
//!     println!("{} {:?}", row.timestamp, row.values);
//! }
//! dumper.close();
//! # Ok(())
//! # }
//! ```

use std::iter::FusedIterator;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ArchiveError, Result};
use crate::file::RrdFile;
use crate::header::{ArchiveDef, RrdHeader};
use crate::layout;
use crate::value::unknown_as_null;

/// One row of an archive: a timestamp and one value per data source.
///
/// Values are index-aligned with [`RrdHeader::data_sources`]. NaN marks an
/// unknown sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowDump {
    /// Seconds since the epoch at the end of the consolidation interval.
    pub timestamp: i64,
    /// One value per data source.
    #[serde(with = "unknown_as_null")]
    pub values: Vec<f64>,
}

/// Snapshot of the traversal state of the selected archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveCursor {
    /// Index of the selected archive in the header.
    pub archive_index: usize,
    /// Absolute byte offset of the archive's data.
    pub archive_base: u64,
    /// Absolute byte offset of physical row 0; the wraparound target.
    pub segment_start: u64,
    /// Absolute byte offset of the next read.
    pub cursor_pos: u64,
    /// Physical row index of the next read, before wrap detection.
    pub physical_row: u64,
    /// Rows produced since the archive was selected.
    pub rows_emitted: u64,
    /// Rows between the next row and the most recent one, as a negative count.
    pub timeline_offset: i64,
}

/// Traversal state plus the per-archive constants it needs.
#[derive(Debug)]
struct Selection {
    cursor: ArchiveCursor,
    rows: u64,
    row_size: u64,
    row_span: i64,
    aborted: bool,
}

/// Lazily dumps the rows of one archive of a round-robin file.
///
/// A dumper owns its file mapping exclusively. Every operation that moves the
/// traversal takes `&mut self`, so sharing one dumper across threads requires
/// external locking; independent dumpers over the same file need none.
#[derive(Debug)]
pub struct Dumper {
    file: RrdFile,
    selection: Option<Selection>,
}

impl Dumper {
    /// Opens `path` and decodes its header. No archive is selected yet.
    ///
    /// # Errors
    ///
    /// Returns [`OpenError`](crate::error::OpenError) if the file cannot be
    /// opened or its header is invalid.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            file: RrdFile::open(path)?,
            selection: None,
        })
    }

    /// Returns the decoded header.
    pub fn header(&self) -> &RrdHeader {
        self.file.header()
    }

    /// Returns the path the dumper was opened on.
    pub fn path(&self) -> &str {
        self.file.path()
    }

    /// Returns the selected archive, if any.
    pub fn selected_archive(&self) -> Option<&ArchiveDef> {
        self.selection
            .as_ref()
            .map(|selection| &self.header().archives()[selection.cursor.archive_index])
    }

    /// Returns a snapshot of the traversal state, or `None` if nothing is selected.
    pub fn cursor(&self) -> Option<ArchiveCursor> {
        self.selection.as_ref().map(|selection| selection.cursor)
    }

    /// Selects the first archive whose consolidation function is exactly
    /// `cf_name` and positions the traversal at its oldest row.
    ///
    /// Selecting again, with the same or another name, restarts the traversal.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::NotFound`] if no archive matches. The current
    /// selection, if any, is left as it was.
    pub fn select_archive(&mut self, cf_name: &str) -> Result<()> {
        let header = self.file.header();
        let Some(archive_index) = header.find_archive(cf_name) else {
            return Err(ArchiveError::NotFound {
                cf_name: cf_name.to_string(),
                available: header
                    .archives()
                    .iter()
                    .map(|archive| archive.cf_name.clone())
                    .collect(),
            }
            .into());
        };

        let archive = &header.archives()[archive_index];
        let row_size = layout::row_size(header);
        let archive_base = layout::archive_offset(header, archive_index);
        let segment_start = archive_base;
        let oldest_row = (archive.cur_row + 1) % archive.rows;

        #[allow(clippy::cast_possible_wrap)] // decode bounds rows * span by i64::MAX
        let timeline_offset = 1 - archive.rows as i64;

        let cursor = ArchiveCursor {
            archive_index,
            archive_base,
            segment_start,
            cursor_pos: segment_start + oldest_row * row_size,
            physical_row: oldest_row,
            rows_emitted: 0,
            timeline_offset,
        };

        tracing::debug!(
            path = %self.file.path(),
            cf = cf_name,
            archive_index,
            rows = archive.rows,
            cur_row = archive.cur_row,
            oldest_row,
            archive_base,
            "selected archive"
        );

        self.selection = Some(Selection {
            cursor,
            rows: archive.rows,
            row_size,
            row_span: layout::row_span(header, archive_index),
            aborted: false,
        });
        Ok(())
    }

    /// Produces the next row, oldest first, or `Ok(None)` once every row of
    /// the archive has been produced.
    ///
    /// After the end is reached, further calls keep returning `Ok(None)`
    /// until an archive is selected again.
    ///
    /// # Errors
    ///
    /// - [`ArchiveError::NotSelected`] if no archive has been selected
    /// - [`ReadError::Truncated`](crate::error::ReadError::Truncated) if the
    ///   row lies past the end of the file; the traversal is aborted
    /// - [`ArchiveError::TraversalAborted`] on every call after such a failure
    pub fn next_row(&mut self) -> Result<Option<RowDump>> {
        let Some(selection) = self.selection.as_mut() else {
            return Err(ArchiveError::NotSelected.into());
        };
        let cursor = &mut selection.cursor;

        if selection.aborted {
            return Err(ArchiveError::TraversalAborted {
                archive_index: cursor.archive_index,
            }
            .into());
        }

        if cursor.rows_emitted >= selection.rows {
            return Ok(None);
        }

        if cursor.physical_row >= selection.rows {
            tracing::trace!(
                archive_index = cursor.archive_index,
                rows_emitted = cursor.rows_emitted,
                "wrapped to start of archive"
            );
            cursor.cursor_pos = cursor.segment_start;
            cursor.physical_row = 0;
        }

        let timestamp = layout::row_timestamp(
            self.file.header().last_update(),
            selection.row_span,
            cursor.timeline_offset,
        );

        let bytes = match self.file.read_at(cursor.cursor_pos, selection.row_size) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(
                    path = %self.file.path(),
                    archive_index = cursor.archive_index,
                    offset = cursor.cursor_pos,
                    "aborting archive traversal: {e}"
                );
                selection.aborted = true;
                return Err(e);
            }
        };

        let values = bytes
            .chunks_exact(size_of::<f64>())
            .map(|chunk| {
                let mut word = [0u8; size_of::<f64>()];
                word.copy_from_slice(chunk);
                f64::from_le_bytes(word)
            })
            .collect();

        cursor.cursor_pos += selection.row_size;
        cursor.physical_row += 1;
        cursor.rows_emitted += 1;
        cursor.timeline_offset += 1;

        Ok(Some(RowDump { timestamp, values }))
    }

    /// Returns an iterator over the remaining rows of the selected archive.
    ///
    /// The iterator ends after the last row or after the first error, which
    /// it yields.
    pub fn rows(&mut self) -> Rows<'_> {
        Rows {
            dumper: self,
            done: false,
        }
    }

    /// Closes the dumper, releasing the file mapping and the decoded header.
    ///
    /// Works whether or not an archive was ever selected.
    pub fn close(self) {
        self.file.close();
    }
}

/// Iterator over the rows of a [`Dumper`]'s selected archive.
///
/// Created by [`Dumper::rows`].
#[derive(Debug)]
pub struct Rows<'a> {
    dumper: &'a mut Dumper,
    done: bool,
}

impl Iterator for Rows<'_> {
    type Item = Result<RowDump>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.dumper.next_row() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }

    #[allow(clippy::cast_possible_truncation)] // hint only
    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.dumper.selection {
            Some(selection) if !self.done && !selection.aborted => {
                let remaining = selection.rows.saturating_sub(selection.cursor.rows_emitted);
                (0, Some(remaining as usize))
            }
            Some(_) if self.done => (0, Some(0)),
            _ => (0, Some(1)),
        }
    }
}

impl FusedIterator for Rows<'_> {}
