//! Header decoding for round-robin database files.
//!
//! A round-robin file starts with a packed header that describes its data
//! sources and archives, followed by the archive row data. The layout is the
//! one rrdtool writes on 64-bit little-endian hosts: every integer is an
//! 8-byte `unsigned long`, timestamps are 8-byte `time_t`, and every value is
//! an IEEE-754 `f64`.
//!
//! # File Format
//!
//! ```text
//! [0..128)                 stat_head   cookie, version, float cookie, counts, step
//! [.. + ds * 120)          ds_def      name, type, heartbeat, min, max
//! [.. + rra * 120)         rra_def     cf name, rows, pdp per row, xff
//! [.. + 16)                live_head   last update (+ usec for version >= 3)
//! [.. + ds * 112)          pdp_prep    last_ds, unknown seconds, value
//! [.. + rra * ds * 80)     cdp_prep    consolidation scratch per archive/source
//! [.. + rra * 8)           rra_ptr     write cursor per archive
//! [header_len..)           archive data, archives in header order
//! ```
//!
//! The header is decoded once into an immutable [`RrdHeader`]; all offset
//! arithmetic over it lives in [`crate::layout`].

use crate::error::{OpenError, Result};

/// Width in bytes of one stored value.
pub const VALUE_SIZE: u64 = 8;

/// Magic bytes identifying a round-robin file.
const COOKIE: [u8; 4] = *b"RRD\0";

/// Float written into every header to detect foreign byte order and layout.
const FLOAT_COOKIE: f64 = 8.642135E130;

/// Oldest and newest format versions whose header layout is understood.
const MIN_VERSION: u32 = 1;
const MAX_VERSION: u32 = 4;

/// First version that stores microseconds in the live head.
const USEC_VERSION: u32 = 3;

const STAT_HEAD_SIZE: usize = 128;
const DS_DEF_SIZE: usize = 120;
const RRA_DEF_SIZE: usize = 120;
const LIVE_HEAD_SIZE: usize = 16;
const LEGACY_LIVE_HEAD_SIZE: usize = 8;
const PDP_PREP_SIZE: usize = 112;
const CDP_PREP_SIZE: usize = 80;
const RRA_PTR_SIZE: usize = 8;

/// Width of data source names, data source types, and consolidation function names.
const NAME_SIZE: usize = 20;

/// Width of the textual last-reading field in `pdp_prep`.
const LAST_DS_SIZE: usize = 30;

/// One data source (value channel) as declared in the header.
#[derive(Debug, Clone)]
pub struct DataSource {
    /// Data source name.
    pub name: String,
    /// Data source type (`GAUGE`, `COUNTER`, `DERIVE`, `ABSOLUTE`, `COMPUTE`, ...).
    pub source_type: String,
    /// Maximum seconds between updates before the value becomes unknown.
    pub minimal_heartbeat: u64,
    /// Lower bound for accepted values (NaN when unbounded).
    pub min: f64,
    /// Upper bound for accepted values (NaN when unbounded).
    pub max: f64,
    /// Last raw reading, as text.
    pub last_ds: String,
    /// Accumulated value of the primary data point being built.
    pub value: f64,
    /// Seconds of the current primary data point that are unknown.
    pub unknown_sec: u64,
}

/// Consolidation scratch state for one archive and one data source.
#[derive(Debug, Clone, Copy)]
pub struct CdpPrep {
    /// Partially consolidated value.
    pub value: f64,
    /// Number of unknown primary data points seen so far.
    pub unknown_datapoints: u64,
}

/// One round-robin archive as declared in the header.
#[derive(Debug, Clone)]
pub struct ArchiveDef {
    /// Consolidation function name (`AVERAGE`, `MAX`, ...).
    pub cf_name: String,
    /// Row capacity of the circular buffer.
    pub rows: u64,
    /// Base intervals consolidated into one row (the step multiplier).
    pub pdp_per_row: u64,
    /// X-files factor: the fraction of unknown inputs a row tolerates.
    pub xff: f64,
    /// Index of the most recently written row.
    pub cur_row: u64,
    /// Consolidation scratch state, one entry per data source.
    pub cdp_prep: Vec<CdpPrep>,
}

/// Decoded, immutable header of a round-robin file.
#[derive(Debug, Clone)]
pub struct RrdHeader {
    version: u32,
    step: u64,
    data_sources: Vec<DataSource>,
    archives: Vec<ArchiveDef>,
    last_update: i64,
    last_update_usec: i64,
    header_len: u64,
}

impl RrdHeader {
    /// Decodes and validates the header at the start of `bytes`.
    ///
    /// `path` is only used for error reporting.
    ///
    /// # Errors
    ///
    /// Returns [`OpenError::InvalidFormat`] if the magic, version, or float
    /// cookie do not match, if any count or archive geometry is invalid, or if
    /// `bytes` is shorter than the header it describes.
    pub fn decode(bytes: &[u8], path: &str) -> Result<Self> {
        if bytes.len() < STAT_HEAD_SIZE {
            return Err(invalid(
                path,
                format!(
                    "file too small: {} bytes, expected at least {STAT_HEAD_SIZE}",
                    bytes.len()
                ),
            ));
        }

        let reader = FieldReader { bytes, path };

        let cookie = reader.slice(0, COOKIE.len())?;
        if cookie != COOKIE {
            return Err(invalid(
                path,
                format!("invalid magic bytes: expected {COOKIE:?}, found {cookie:?}"),
            ));
        }

        let version = parse_version(reader.slice(4, 5)?).ok_or_else(|| {
            invalid(path, "version field is not a four digit number".to_string())
        })?;
        if !(MIN_VERSION..=MAX_VERSION).contains(&version) {
            return Err(invalid(
                path,
                format!("unsupported version {version:04} (supported: {MIN_VERSION:04}-{MAX_VERSION:04})"),
            ));
        }

        let float_cookie = reader.f64(16)?;
        if float_cookie.to_bits() != FLOAT_COOKIE.to_bits() {
            return Err(invalid(
                path,
                "float cookie mismatch: file was written on a different architecture".to_string(),
            ));
        }

        let ds_count = reader.count(24, "data source")?;
        let rra_count = reader.count(32, "archive")?;
        let step = reader.u64(40)?;
        if step == 0 {
            return Err(invalid(path, "step cannot be zero".to_string()));
        }

        let live_head_size = if version >= USEC_VERSION {
            LIVE_HEAD_SIZE
        } else {
            LEGACY_LIVE_HEAD_SIZE
        };
        let header_len = header_length(ds_count, rra_count, live_head_size)
            .ok_or_else(|| invalid(path, "header size overflows".to_string()))?;
        if bytes.len() < header_len {
            return Err(invalid(
                path,
                format!(
                    "file too small: {} bytes, header of {ds_count} data sources and {rra_count} archives needs {header_len}",
                    bytes.len()
                ),
            ));
        }

        let mut offset = STAT_HEAD_SIZE;

        let mut data_sources = Vec::with_capacity(ds_count);
        for _ in 0..ds_count {
            data_sources.push(DataSource {
                name: reader.text(offset, NAME_SIZE)?,
                source_type: reader.text(offset + NAME_SIZE, NAME_SIZE)?,
                minimal_heartbeat: reader.u64(offset + 40)?,
                min: reader.f64(offset + 48)?,
                max: reader.f64(offset + 56)?,
                last_ds: String::new(),
                value: f64::NAN,
                unknown_sec: 0,
            });
            offset += DS_DEF_SIZE;
        }

        let mut archives = Vec::with_capacity(rra_count);
        for _ in 0..rra_count {
            archives.push(ArchiveDef {
                cf_name: reader.text(offset, NAME_SIZE)?,
                rows: reader.u64(offset + 24)?,
                pdp_per_row: reader.u64(offset + 32)?,
                xff: reader.f64(offset + 40)?,
                cur_row: 0,
                cdp_prep: Vec::with_capacity(ds_count),
            });
            offset += RRA_DEF_SIZE;
        }

        let last_update = reader.i64(offset)?;
        let last_update_usec = if version >= USEC_VERSION {
            reader.i64(offset + 8)?
        } else {
            0
        };
        offset += live_head_size;

        for ds in &mut data_sources {
            ds.last_ds = reader.text(offset, LAST_DS_SIZE)?;
            ds.unknown_sec = reader.u64(offset + 32)?;
            ds.value = reader.f64(offset + 40)?;
            offset += PDP_PREP_SIZE;
        }

        for archive in &mut archives {
            for _ in 0..ds_count {
                archive.cdp_prep.push(CdpPrep {
                    value: reader.f64(offset)?,
                    unknown_datapoints: reader.u64(offset + 8)?,
                });
                offset += CDP_PREP_SIZE;
            }
        }

        for archive in &mut archives {
            archive.cur_row = reader.u64(offset)?;
            offset += RRA_PTR_SIZE;
        }
        debug_assert_eq!(offset, header_len);

        let header = Self {
            version,
            step,
            data_sources,
            archives,
            last_update,
            last_update_usec,
            header_len: header_len as u64,
        };
        header.validate(path)?;
        Ok(header)
    }

    /// Checks archive geometry and that every derived size fits its integer type.
    fn validate(&self, path: &str) -> Result<()> {
        let row_size = (self.data_sources.len() as u64)
            .checked_mul(VALUE_SIZE)
            .ok_or_else(|| invalid(path, "row size overflows".to_string()))?;

        let mut end = self.header_len;
        for (index, archive) in self.archives.iter().enumerate() {
            if archive.rows == 0 {
                return Err(invalid(path, format!("archive {index} has zero rows")));
            }
            if archive.pdp_per_row == 0 {
                return Err(invalid(
                    path,
                    format!("archive {index} has zero primary data points per row"),
                ));
            }
            if archive.cur_row >= archive.rows {
                return Err(invalid(
                    path,
                    format!(
                        "archive {index} write cursor {} is outside its {} rows",
                        archive.cur_row, archive.rows
                    ),
                ));
            }

            let span = archive
                .pdp_per_row
                .checked_mul(self.step)
                .and_then(|span| i64::try_from(span).ok())
                .ok_or_else(|| invalid(path, format!("archive {index} time span overflows")))?;
            let history = i64::try_from(archive.rows)
                .ok()
                .and_then(|rows| rows.checked_mul(span))
                .ok_or_else(|| invalid(path, format!("archive {index} time span overflows")))?;

            // Oldest row timestamp: aligned last update minus (rows - 1) spans.
            let oldest = self
                .last_update
                .checked_sub(self.last_update.rem_euclid(span))
                .and_then(|aligned| aligned.checked_sub(history - span));
            if oldest.is_none() {
                return Err(invalid(
                    path,
                    format!(
                        "archive {index} timeline before last update {} is out of range",
                        self.last_update
                    ),
                ));
            }

            end = archive
                .rows
                .checked_mul(row_size)
                .and_then(|size| end.checked_add(size))
                .ok_or_else(|| invalid(path, format!("archive {index} byte size overflows")))?;
        }

        Ok(())
    }

    /// Returns the numeric format version.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Returns the base sample interval in seconds.
    pub fn step(&self) -> u64 {
        self.step
    }

    /// Returns the data sources in file order.
    pub fn data_sources(&self) -> &[DataSource] {
        &self.data_sources
    }

    /// Returns the number of data sources (values per row).
    pub fn ds_count(&self) -> usize {
        self.data_sources.len()
    }

    /// Returns the archives in file order.
    pub fn archives(&self) -> &[ArchiveDef] {
        &self.archives
    }

    /// Returns the timestamp (seconds since the epoch) of the latest update.
    pub fn last_update(&self) -> i64 {
        self.last_update
    }

    /// Returns the microsecond part of the latest update (0 before version 3).
    pub fn last_update_usec(&self) -> i64 {
        self.last_update_usec
    }

    /// Returns the size of the header region; archive data starts here.
    pub fn header_len(&self) -> u64 {
        self.header_len
    }

    /// Returns the index of the first archive whose consolidation function is `cf_name`.
    pub fn find_archive(&self, cf_name: &str) -> Option<usize> {
        self.archives.iter().position(|archive| archive.cf_name == cf_name)
    }
}

/// Bounds-checked little-endian field access over the header bytes.
struct FieldReader<'a> {
    bytes: &'a [u8],
    path: &'a str,
}

impl<'a> FieldReader<'a> {
    fn slice(&self, offset: usize, len: usize) -> Result<&'a [u8]> {
        offset
            .checked_add(len)
            .and_then(|end| self.bytes.get(offset..end))
            .ok_or_else(|| invalid(self.path, format!("header truncated at byte {offset}")))
    }

    fn word(&self, offset: usize) -> Result<[u8; 8]> {
        let mut word = [0u8; 8];
        word.copy_from_slice(self.slice(offset, 8)?);
        Ok(word)
    }

    fn u64(&self, offset: usize) -> Result<u64> {
        self.word(offset).map(u64::from_le_bytes)
    }

    fn i64(&self, offset: usize) -> Result<i64> {
        self.word(offset).map(i64::from_le_bytes)
    }

    fn f64(&self, offset: usize) -> Result<f64> {
        self.word(offset).map(f64::from_le_bytes)
    }

    /// Reads a non-zero element count that must also fit in memory.
    fn count(&self, offset: usize, what: &str) -> Result<usize> {
        let raw = self.u64(offset)?;
        if raw == 0 {
            return Err(invalid(self.path, format!("{what} count cannot be zero")));
        }
        usize::try_from(raw)
            .map_err(|_| invalid(self.path, format!("{what} count {raw} is too large")))
    }

    /// Reads a NUL-terminated string stored in a fixed-width field.
    fn text(&self, offset: usize, width: usize) -> Result<String> {
        let field = self.slice(offset, width)?;
        let end = field.iter().position(|&b| b == 0).unwrap_or(width);
        Ok(String::from_utf8_lossy(&field[..end]).into_owned())
    }
}

/// Parses a `"NNNN\0"` version field.
fn parse_version(field: &[u8]) -> Option<u32> {
    let (digits, terminator) = field.split_at(4);
    if terminator != [0] || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(digits).ok()?.parse().ok()
}

/// Total header size for the given counts, or `None` on overflow.
fn header_length(ds_count: usize, rra_count: usize, live_head_size: usize) -> Option<usize> {
    let ds_defs = ds_count.checked_mul(DS_DEF_SIZE)?;
    let rra_defs = rra_count.checked_mul(RRA_DEF_SIZE)?;
    let pdp_preps = ds_count.checked_mul(PDP_PREP_SIZE)?;
    let cdp_preps = rra_count.checked_mul(ds_count)?.checked_mul(CDP_PREP_SIZE)?;
    let rra_ptrs = rra_count.checked_mul(RRA_PTR_SIZE)?;

    STAT_HEAD_SIZE
        .checked_add(ds_defs)?
        .checked_add(rra_defs)?
        .checked_add(live_head_size)?
        .checked_add(pdp_preps)?
        .checked_add(cdp_preps)?
        .checked_add(rra_ptrs)
}

fn invalid(path: &str, reason: String) -> crate::error::RrdError {
    OpenError::InvalidFormat {
        path: path.to_string(),
        reason,
    }
    .into()
}
