//! Key/value report of a file's header, in the shape of `rrdtool info`.
//!
//! Keys are emitted in a fixed order: file-level fields, then each data
//! source, then each archive with its consolidation scratch state.
//!
//! ```text
//! filename = "traffic.rrd"
//! rrd_version = "0003"
//! step = 300
//! ds[in].type = "COUNTER"
//! rra[0].cf = "AVERAGE"
//! rra[0].cdp_prep[0].value = NaN
//! ```

use std::fmt;
use std::path::Path;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::error::Result;
use crate::file::RrdFile;
use crate::header::RrdHeader;
use crate::layout;
use crate::value::{format_value, known};

/// Consolidation functions that carry an xff and per-source scratch state.
const CLASSIC_CFS: [&str; 4] = ["AVERAGE", "MIN", "MAX", "LAST"];

/// A single value in an [`RrdInfo`] report.
#[derive(Debug, Clone)]
pub enum InfoValue {
    /// Text, printed quoted.
    Str(String),
    /// Signed integer, used for timestamps.
    Int(i64),
    /// Unsigned count or size.
    Count(u64),
    /// Floating point value; NaN is unknown.
    Value(f64),
}

impl fmt::Display for InfoValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "\"{s}\""),
            Self::Int(i) => write!(f, "{i}"),
            Self::Count(c) => write!(f, "{c}"),
            Self::Value(v) => f.write_str(&format_value(*v)),
        }
    }
}

impl Serialize for InfoValue {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Str(s) => serializer.serialize_str(s),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Count(c) => serializer.serialize_u64(*c),
            Self::Value(v) => known(*v).serialize(serializer),
        }
    }
}

/// Ordered key/value report describing one round-robin file.
///
/// Serializes to a JSON object with keys in report order, unknown values as
/// `null`. `Display` prints one `key = value` line per entry.
#[derive(Debug, Clone, Default)]
pub struct RrdInfo {
    entries: Vec<(String, InfoValue)>,
}

impl RrdInfo {
    /// Builds the report for a decoded header.
    pub fn from_header(filename: &str, header: &RrdHeader) -> Self {
        let mut info = Self::default();

        info.push("filename", InfoValue::Str(filename.to_string()));
        info.push(
            "rrd_version",
            InfoValue::Str(format!("{:04}", header.version())),
        );
        info.push("step", InfoValue::Count(header.step()));
        info.push("last_update", InfoValue::Int(header.last_update()));
        info.push("header_size", InfoValue::Count(header.header_len()));
        info.push("data_size", InfoValue::Count(layout::data_size(header)));

        for (index, ds) in header.data_sources().iter().enumerate() {
            let key = |field: &str| format!("ds[{}].{field}", ds.name);

            info.push(key("index"), InfoValue::Count(index as u64));
            info.push(key("type"), InfoValue::Str(ds.source_type.clone()));
            if ds.source_type != "COMPUTE" {
                info.push(
                    key("minimal_heartbeat"),
                    InfoValue::Count(ds.minimal_heartbeat),
                );
                info.push(key("min"), InfoValue::Value(ds.min));
                info.push(key("max"), InfoValue::Value(ds.max));
            }
            info.push(key("last_ds"), InfoValue::Str(ds.last_ds.clone()));
            info.push(key("value"), InfoValue::Value(ds.value));
            info.push(key("unknown_sec"), InfoValue::Count(ds.unknown_sec));
        }

        for (index, archive) in header.archives().iter().enumerate() {
            let key = |field: &str| format!("rra[{index}].{field}");

            info.push(key("cf"), InfoValue::Str(archive.cf_name.clone()));
            info.push(key("rows"), InfoValue::Count(archive.rows));
            info.push(key("cur_row"), InfoValue::Count(archive.cur_row));
            info.push(key("pdp_per_row"), InfoValue::Count(archive.pdp_per_row));

            if !CLASSIC_CFS.contains(&archive.cf_name.as_str()) {
                continue;
            }
            info.push(key("xff"), InfoValue::Value(archive.xff));
            for (ds, prep) in archive.cdp_prep.iter().enumerate() {
                info.push(
                    key(&format!("cdp_prep[{ds}].value")),
                    InfoValue::Value(prep.value),
                );
                info.push(
                    key(&format!("cdp_prep[{ds}].unknown_datapoints")),
                    InfoValue::Count(prep.unknown_datapoints),
                );
            }
        }

        info
    }

    fn push(&mut self, key: impl Into<String>, value: InfoValue) {
        self.entries.push((key.into(), value));
    }

    /// Returns the entries in report order.
    pub fn entries(&self) -> &[(String, InfoValue)] {
        &self.entries
    }

    /// Looks up a value by its full key, e.g. `ds[in].type`.
    pub fn get(&self, key: &str) -> Option<&InfoValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the report has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for RrdInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.entries {
            writeln!(f, "{key} = {value}")?;
        }
        Ok(())
    }
}

impl Serialize for RrdInfo {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Opens `path`, builds its [`RrdInfo`] report and closes it again.
///
/// # Errors
///
/// Returns an [`OpenError`](crate::error::OpenError) if the file cannot be
/// opened or its header is invalid.
///
/// # Examples
///
/// ```rust,no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let report = rrdump::info("traffic.rrd")?;
/// print!("{report}");
/// # Ok(())
/// # }
/// ```
pub fn info<P: AsRef<Path>>(path: P) -> Result<RrdInfo> {
    let file = RrdFile::open(path)?;
    let report = RrdInfo::from_header(file.path(), file.header());
    file.close();
    Ok(report)
}
