//! Byte layout and timeline arithmetic over a decoded header.
//!
//! Everything here is a pure function of an [`RrdHeader`]. Archive sizes and
//! offsets are recomputed on every call rather than cached, so they always
//! agree with the header they were derived from.
//!
//! ```text
//! header_len
//! |
//! v
//! [ archive 0: rows0 x (ds x 8) ][ archive 1: rows1 x (ds x 8) ] ...
//!   row 0 | row 1 | ... | row rows0-1
//!   each row: ds0 ds1 ... dsN (f64)
//! ```
//!
//! [`RrdHeader::decode`] has already verified that none of these products or
//! sums overflow, so plain arithmetic is used.

use crate::header::{RrdHeader, VALUE_SIZE};

/// Returns the byte width of one row (one value per data source).
pub fn row_size(header: &RrdHeader) -> u64 {
    header.ds_count() as u64 * VALUE_SIZE
}

/// Returns the byte size of archive `index`.
///
/// # Panics
///
/// Panics if `index` is not a valid archive index.
pub fn archive_size(header: &RrdHeader, index: usize) -> u64 {
    header.archives()[index].rows * row_size(header)
}

/// Returns the absolute byte offset where archive `index` begins.
///
/// This is the header length plus the sizes of all archives declared before
/// it. `index` may equal the archive count, in which case the offset is the
/// end of the data region.
///
/// # Panics
///
/// Panics if `index` is greater than the archive count.
pub fn archive_offset(header: &RrdHeader, index: usize) -> u64 {
    header.header_len()
        + (0..index)
            .map(|i| archive_size(header, i))
            .sum::<u64>()
}

/// Returns the total byte size of all archive data.
pub fn data_size(header: &RrdHeader) -> u64 {
    (0..header.archives().len())
        .map(|i| archive_size(header, i))
        .sum()
}

/// Returns the file size a well-formed file with this header should have.
pub fn expected_file_size(header: &RrdHeader) -> u64 {
    header.header_len() + data_size(header)
}

/// Returns the number of seconds covered by one row of archive `index`.
///
/// # Panics
///
/// Panics if `index` is not a valid archive index.
#[allow(clippy::cast_possible_wrap)] // decode rejects spans that do not fit i64
pub fn row_span(header: &RrdHeader, index: usize) -> i64 {
    (header.archives()[index].pdp_per_row * header.step()) as i64
}

/// Computes the timestamp of a row relative to the latest update.
///
/// The latest update is aligned down to the nearest row boundary, then moved
/// by `timeline_offset` whole rows. Offset 0 is the most recent consolidated
/// row; `-(rows - 1)` is the oldest.
///
/// [`RrdHeader::decode`] rejects headers whose oldest row would fall outside
/// `i64`, so for a decoded header every offset in the archive gives the exact
/// timestamp. Outside that range the result clamps to `i64::MIN`/`i64::MAX`.
///
/// # Panics
///
/// Panics if `row_span` is zero.
pub fn row_timestamp(last_update: i64, row_span: i64, timeline_offset: i64) -> i64 {
    let aligned = last_update
        .checked_sub(last_update.rem_euclid(row_span))
        .unwrap_or(i64::MIN);
    aligned.saturating_add(timeline_offset.saturating_mul(row_span))
}
