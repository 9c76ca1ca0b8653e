//! Shared fixture writer for integration tests.
//!
//! Writes version 3 files with the 64-bit little-endian header layout.
//! Physical row `r` of archive `a` holds `a * 1000 + r * 10 + ds` for each
//! data source unless explicit values are given.
//!
//! Output must stay byte-identical to the library's unit-test builder for
//! GAUGE sources; `src/testutil.rs` compiles this file and compares the two.

#![allow(dead_code, clippy::cast_precision_loss, clippy::cast_possible_truncation)]

use std::path::{Path, PathBuf};

/// One archive: consolidation function, rows, PDPs per row, write cursor.
pub struct ArchiveSpec {
    pub cf: &'static str,
    pub rows: u64,
    pub pdp_per_row: u64,
    pub cur_row: u64,
    pub values: Option<Vec<f64>>,
}

impl ArchiveSpec {
    pub fn new(cf: &'static str, rows: u64, pdp_per_row: u64, cur_row: u64) -> Self {
        Self {
            cf,
            rows,
            pdp_per_row,
            cur_row,
            values: None,
        }
    }

    pub fn with_values(mut self, values: Vec<f64>) -> Self {
        self.values = Some(values);
        self
    }
}

/// A whole file image.
pub struct Fixture {
    pub step: u64,
    pub last_update: i64,
    pub sources: Vec<&'static str>,
    pub archives: Vec<ArchiveSpec>,
}

impl Fixture {
    pub fn new(step: u64, last_update: i64, sources: &[&'static str]) -> Self {
        Self {
            step,
            last_update,
            sources: sources.to_vec(),
            archives: Vec::new(),
        }
    }

    pub fn archive(mut self, archive: ArchiveSpec) -> Self {
        self.archives.push(archive);
        self
    }

    pub fn header_len(&self) -> u64 {
        let ds = self.sources.len() as u64;
        let rra = self.archives.len() as u64;
        128 + ds * 120 + rra * 120 + 16 + ds * 112 + rra * ds * 80 + rra * 8
    }

    pub fn bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();

        out.extend_from_slice(b"RRD\x000003\0");
        out.resize(16, 0);
        put_f64(&mut out, 8.642135E130);
        put_u64(&mut out, self.sources.len() as u64);
        put_u64(&mut out, self.archives.len() as u64);
        put_u64(&mut out, self.step);
        out.resize(128, 0);

        for name in &self.sources {
            put_text(&mut out, name, 20);
            put_text(&mut out, "GAUGE", 20);
            put_u64(&mut out, self.step * 2);
            put_f64(&mut out, 0.0);
            put_f64(&mut out, f64::NAN);
            put_zeros(&mut out, 56);
        }

        for archive in &self.archives {
            put_text(&mut out, archive.cf, 24);
            put_u64(&mut out, archive.rows);
            put_u64(&mut out, archive.pdp_per_row);
            put_f64(&mut out, 0.5);
            put_zeros(&mut out, 72);
        }

        out.extend_from_slice(&self.last_update.to_le_bytes());
        put_u64(&mut out, 0);

        for _ in &self.sources {
            put_text(&mut out, "U", 32);
            put_u64(&mut out, 0);
            put_f64(&mut out, 0.0);
            put_zeros(&mut out, 64);
        }

        for _ in 0..self.archives.len() * self.sources.len() {
            put_f64(&mut out, f64::NAN);
            put_u64(&mut out, 0);
            put_zeros(&mut out, 64);
        }

        for archive in &self.archives {
            put_u64(&mut out, archive.cur_row);
        }
        assert_eq!(out.len() as u64, self.header_len());

        for (a, archive) in self.archives.iter().enumerate() {
            if let Some(values) = &archive.values {
                values.iter().for_each(|v| put_f64(&mut out, *v));
                continue;
            }
            for row in 0..archive.rows {
                for ds in 0..self.sources.len() {
                    put_f64(&mut out, cell(a, row, ds));
                }
            }
        }

        out
    }

    pub fn write(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, self.bytes()).unwrap();
        path
    }
}

/// Default value stored at physical `row` of archive `archive` for source `ds`.
pub fn cell(archive: usize, row: u64, ds: usize) -> f64 {
    (archive * 1000 + row as usize * 10 + ds) as f64
}

fn put_u64(out: &mut Vec<u8>, v: u64) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_f64(out: &mut Vec<u8>, v: f64) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_zeros(out: &mut Vec<u8>, n: usize) {
    out.resize(out.len() + n, 0);
}

fn put_text(out: &mut Vec<u8>, s: &str, width: usize) {
    out.extend_from_slice(s.as_bytes());
    put_zeros(out, width - s.len());
}
