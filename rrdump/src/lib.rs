//! # rrdump
//!
//! Read-only archive dumper for round-robin database files.
//!
//! rrdump opens a file written by rrdtool, decodes its header, and walks one
//! consolidation archive from the oldest row to the newest, attaching a
//! timestamp to every row. Archives are circular buffers, so the physical
//! order on disk rarely matches the time order; the dumper handles the
//! wraparound and the timestamp arithmetic.
//!
//! **Status**: This crate is in early development. The API is not yet stable.
//!
//! ## Key Properties
//!
//! - Read-only memory mapping; the header is decoded once and never changes
//! - Lazy traversal: one row per call, no buffering of the archive
//! - Every read is bounds-checked; a damaged file yields errors, never panics
//! - Unknown samples (NaN) are ordinary values, serialized as JSON `null`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rrdump::Dumper;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut dumper = Dumper::open("traffic.rrd")?;
//!
//! let names: Vec<_> = dumper
//!     .header()
//!     .data_sources()
//!     .iter()
//!     .map(|ds| ds.name.clone())
//!     .collect();
//! println!("sources: {names:?}");
//!
//! // Walk the first AVERAGE archive, oldest row first
//! dumper.select_archive("AVERAGE")?;
//! for row in dumper.rows() {
//!     let row = row?;
//!     println!("{}: {:?}", row.timestamp, row.values);
//! }
//!
//! dumper.close();
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`Dumper`] — Top-level handle; owns the file, selects an archive, yields rows
//! - [`RowDump`] — One timestamped row, values in data source order
//! - [`ArchiveCursor`] — Snapshot of the traversal state
//! - [`RrdInfo`] — `rrdtool info` style key/value report of a header
//!
//! ## Modules
//!
//! For lower-level access, the individual modules are also public:
//!
//! - [`dumper`] — Archive selection and row traversal
//! - [`header`] — Header decoding and validation
//! - [`layout`] — Byte offsets and timestamp arithmetic
//! - [`file`] — Memory-mapped file lifecycle and bounded reads
//! - [`info`] — Header report
//! - [`value`] — Unknown values and value formatting
//! - [`error`] — Error types

pub mod dumper;
pub mod error;
pub mod file;
pub mod header;
pub mod info;
pub mod layout;
pub mod value;

#[cfg(test)]
mod testutil;

// Re-export primary API types at crate root for convenience.
pub use dumper::{ArchiveCursor, Dumper, RowDump, Rows};
pub use error::{Result, RrdError};
pub use header::RrdHeader;
pub use info::{InfoValue, RrdInfo, info};
