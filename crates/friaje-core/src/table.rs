//! The statistics table: one row per (district, band), the system's single
//! source of truth and its durable CSV artifact.
//!
//! Column names follow the original field schema of the boundary layer
//! (shapefile-truncated `DEPARTAMEN`) and the `TMIN_` prefix of the exported
//! artifact, so a table written here reloads byte-compatibly in later
//! sessions. Float statistics of a zero-count row serialize as literal
//! `NaN`, which reloads as NaN.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::boundary::District;
use crate::error::ZonalError;

/// One zonal statistic record joined to its district attributes.
///
/// `count` is authoritative for validity: `count == 0` means the district
/// footprint covered no valid raster cell and all float statistics are NaN.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatRow {
    #[serde(rename = "UBIGEO")]
    pub ubigeo: String,
    #[serde(rename = "DEPARTAMEN")]
    pub department: String,
    #[serde(rename = "PROVINCIA")]
    pub province: String,
    #[serde(rename = "DISTRITO")]
    pub district: String,
    #[serde(rename = "TMIN_count")]
    pub count: u32,
    #[serde(rename = "TMIN_mean")]
    pub mean: f64,
    #[serde(rename = "TMIN_min")]
    pub min: f64,
    #[serde(rename = "TMIN_max")]
    pub max: f64,
    #[serde(rename = "TMIN_std")]
    pub std: f64,
    #[serde(rename = "TMIN_p10")]
    pub p10: f64,
    #[serde(rename = "TMIN_p90")]
    pub p90: f64,
    #[serde(rename = "TMIN_range")]
    pub range: f64,
    #[serde(rename = "TMIN_band")]
    pub band: u32,
    #[serde(rename = "TMIN_year")]
    pub year: i32,
}

impl StatRow {
    /// The zero-count record: a valid outcome, all statistics NaN.
    pub fn empty(district: &District, band: u32, year: i32) -> Self {
        Self {
            ubigeo: district.ubigeo.clone(),
            department: district.department.clone(),
            province: district.province.clone(),
            district: district.district.clone(),
            count: 0,
            mean: f64::NAN,
            min: f64::NAN,
            max: f64::NAN,
            std: f64::NAN,
            p10: f64::NAN,
            p90: f64::NAN,
            range: f64::NAN,
            band,
            year,
        }
    }
}

/// Immutable cross product of districts × bands.
///
/// Built once per raster ingestion; every ranking or cohort afterwards is a
/// derived view that never writes back.
#[derive(Debug, Clone)]
pub struct StatisticsTable {
    rows: Vec<StatRow>,
}

impl StatisticsTable {
    /// Assemble a table, enforcing the unique (UBIGEO, band) key.
    pub fn new(rows: Vec<StatRow>) -> Result<Self, ZonalError> {
        if rows.is_empty() {
            return Err(ZonalError::EmptyInput("statistics table has no rows".into()));
        }
        let mut keys = std::collections::HashSet::new();
        for r in &rows {
            if !keys.insert((r.ubigeo.clone(), r.band)) {
                return Err(ZonalError::InvalidParameter(format!(
                    "duplicate (UBIGEO, band) key: ({}, {})",
                    r.ubigeo, r.band
                )));
            }
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[StatRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Most recent observation year in the table.
    pub fn latest_year(&self) -> i32 {
        self.rows.iter().map(|r| r.year).max().unwrap_or(0)
    }

    /// Rows of one observation year, in table order.
    pub fn year_slice(&self, year: i32) -> Vec<&StatRow> {
        self.rows.iter().filter(|r| r.year == year).collect()
    }

    /// Top-`n` districts of `year` by mean Tmin, coldest first when
    /// `ascending`. Zero-count rows (NaN mean) are skipped.
    pub fn ranking(&self, year: i32, n: usize, ascending: bool) -> Vec<&StatRow> {
        let mut rows: Vec<&StatRow> = self
            .rows
            .iter()
            .filter(|r| r.year == year && r.count > 0)
            .collect();
        rows.sort_by(|a, b| {
            let ord = a.mean.total_cmp(&b.mean);
            if ascending {
                ord
            } else {
                ord.reverse()
            }
        });
        rows.truncate(n);
        rows
    }

    // ── CSV artifact ─────────────────────────────────────────────────────

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), ZonalError> {
        let mut w = csv::Writer::from_writer(writer);
        for row in &self.rows {
            w.serialize(row)?;
        }
        w.flush()?;
        Ok(())
    }

    pub fn write_csv_path<P: AsRef<Path>>(&self, path: P) -> Result<(), ZonalError> {
        self.write_csv(File::create(path)?)
    }

    pub fn read_csv<R: Read>(reader: R) -> Result<Self, ZonalError> {
        let mut r = csv::Reader::from_reader(reader);
        let rows: Result<Vec<StatRow>, csv::Error> = r.deserialize().collect();
        Self::new(rows?)
    }

    pub fn read_csv_path<P: AsRef<Path>>(path: P) -> Result<Self, ZonalError> {
        Self::read_csv(File::open(path)?)
    }
}
