//! Fixture writer for unit tests.
//!
//! Produces files in the same packed layout [`crate::header`] decodes.

#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]

use std::path::{Path, PathBuf};

#[path = "../tests/common/mod.rs"]
mod integration_fixture;

const FLOAT_COOKIE: f64 = 8.642135E130;

struct FixtureArchive {
    cf_name: String,
    rows: u64,
    pdp_per_row: u64,
    cur_row: u64,
    values: Option<Vec<f64>>,
}

/// Builds round-robin file images for tests.
pub(crate) struct FixtureBuilder {
    version: u32,
    step: u64,
    last_update: i64,
    data_sources: Vec<(String, String)>,
    archives: Vec<FixtureArchive>,
}

impl FixtureBuilder {
    pub(crate) fn new(step: u64, last_update: i64) -> Self {
        Self {
            version: 3,
            step,
            last_update,
            data_sources: Vec::new(),
            archives: Vec::new(),
        }
    }

    /// One GAUGE source, one AVERAGE archive of 3 rows, step 300, last update
    /// 1000, write cursor at row 1.
    pub(crate) fn single_archive() -> Self {
        Self::new(300, 1_000)
            .data_source("ds0", "GAUGE")
            .archive("AVERAGE", 3, 1, 1)
    }

    pub(crate) fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub(crate) fn data_source(mut self, name: &str, source_type: &str) -> Self {
        self.data_sources.push((name.to_string(), source_type.to_string()));
        self
    }

    pub(crate) fn archive(mut self, cf_name: &str, rows: u64, pdp_per_row: u64, cur_row: u64) -> Self {
        self.archives.push(FixtureArchive {
            cf_name: cf_name.to_string(),
            rows,
            pdp_per_row,
            cur_row,
            values: None,
        });
        self
    }

    /// Replaces the physical row data of the most recently added archive.
    pub(crate) fn values(mut self, values: Vec<f64>) -> Self {
        if let Some(archive) = self.archives.last_mut() {
            archive.values = Some(values);
        }
        self
    }

    /// Default cell value: `archive * 1000 + physical_row * 10 + ds`.
    pub(crate) fn cell(archive: usize, row: u64, ds: usize) -> f64 {
        (archive * 1000 + row as usize * 10 + ds) as f64
    }

    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        let ds_count = self.data_sources.len();
        let mut out = Vec::new();

        // stat_head
        out.extend_from_slice(b"RRD\0");
        out.extend_from_slice(format!("{:04}\0", self.version).as_bytes());
        out.resize(16, 0);
        out.extend_from_slice(&FLOAT_COOKIE.to_le_bytes());
        out.extend_from_slice(&(ds_count as u64).to_le_bytes());
        out.extend_from_slice(&(self.archives.len() as u64).to_le_bytes());
        out.extend_from_slice(&self.step.to_le_bytes());
        pad(&mut out, 80);

        // ds_def
        for (name, source_type) in &self.data_sources {
            text(&mut out, name, 20);
            text(&mut out, source_type, 20);
            out.extend_from_slice(&(self.step * 2).to_le_bytes());
            out.extend_from_slice(&0.0f64.to_le_bytes());
            out.extend_from_slice(&f64::NAN.to_le_bytes());
            pad(&mut out, 56);
        }

        // rra_def
        for archive in &self.archives {
            text(&mut out, &archive.cf_name, 20);
            pad(&mut out, 4);
            out.extend_from_slice(&archive.rows.to_le_bytes());
            out.extend_from_slice(&archive.pdp_per_row.to_le_bytes());
            out.extend_from_slice(&0.5f64.to_le_bytes());
            pad(&mut out, 72);
        }

        // live_head
        out.extend_from_slice(&self.last_update.to_le_bytes());
        if self.version >= 3 {
            out.extend_from_slice(&0i64.to_le_bytes());
        }

        // pdp_prep
        for _ in &self.data_sources {
            text(&mut out, "U", 30);
            pad(&mut out, 2);
            out.extend_from_slice(&0u64.to_le_bytes());
            out.extend_from_slice(&0.0f64.to_le_bytes());
            pad(&mut out, 64);
        }

        // cdp_prep
        for _ in &self.archives {
            for _ in &self.data_sources {
                out.extend_from_slice(&f64::NAN.to_le_bytes());
                out.extend_from_slice(&0u64.to_le_bytes());
                pad(&mut out, 64);
            }
        }

        // rra_ptr
        for archive in &self.archives {
            out.extend_from_slice(&archive.cur_row.to_le_bytes());
        }

        // data
        for (index, archive) in self.archives.iter().enumerate() {
            match &archive.values {
                Some(values) => {
                    for value in values {
                        out.extend_from_slice(&value.to_le_bytes());
                    }
                }
                None => {
                    for row in 0..archive.rows {
                        for ds in 0..ds_count {
                            out.extend_from_slice(&Self::cell(index, row, ds).to_le_bytes());
                        }
                    }
                }
            }
        }

        out
    }

    /// Writes the image into `dir` and returns its path.
    pub(crate) fn write(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, self.to_bytes()).unwrap();
        path
    }
}

fn pad(out: &mut Vec<u8>, len: usize) {
    out.resize(out.len() + len, 0);
}

fn text(out: &mut Vec<u8>, value: &str, width: usize) {
    let bytes = value.as_bytes();
    out.extend_from_slice(&bytes[..bytes.len().min(width - 1)]);
    pad(out, width - bytes.len().min(width - 1));
}

#[cfg(test)]
mod tests {
    use super::integration_fixture::{ArchiveSpec, Fixture};
    use super::*;

    #[test]
    fn test_matches_integration_fixture() {
        let unit = FixtureBuilder::new(300, 1_700_000_123)
            .data_source("in", "GAUGE")
            .data_source("out", "GAUGE")
            .archive("AVERAGE", 5, 1, 2)
            .archive("MAX", 3, 12, 0)
            .to_bytes();
        let integration = Fixture::new(300, 1_700_000_123, &["in", "out"])
            .archive(ArchiveSpec::new("AVERAGE", 5, 1, 2))
            .archive(ArchiveSpec::new("MAX", 3, 12, 0))
            .bytes();

        assert_eq!(unit.len(), integration.len());
        assert!(unit == integration, "fixture writers disagree");
    }

    #[test]
    fn test_explicit_values_match_integration_fixture() {
        let values = vec![f64::NAN, 1.5, -2.0];
        let unit = FixtureBuilder::new(60, 6_000)
            .data_source("ds0", "GAUGE")
            .archive("LAST", 3, 1, 1)
            .values(values.clone())
            .to_bytes();
        let integration = Fixture::new(60, 6_000, &["ds0"])
            .archive(ArchiveSpec::new("LAST", 3, 1, 1).with_values(values))
            .bytes();

        assert!(unit == integration, "fixture writers disagree");
    }
}
