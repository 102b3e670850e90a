//! Percentile targeting: select the coldest cohort of districts.
//!
//! The threshold is taken over the *flattened* multi-year table (optionally
//! scoped to a department set), so a district qualifies if it was ever at or
//! below the low percentile; its cohort row then carries the minimum mean
//! observed across its years, crediting the most extreme event on record.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;

use crate::error::ZonalError;
use crate::normalize::normalize;
use crate::stats::{mean, quantile};
use crate::table::StatisticsTable;

/// One district of the cohort, deduplicated by UBIGEO.
#[derive(Debug, Clone, Serialize)]
pub struct CohortRow {
    pub ubigeo: String,
    pub department: String,
    pub province: String,
    pub district: String,
    /// Minimum mean Tmin observed for this district across all its
    /// selected rows.
    pub tmin_mean: f64,
}

/// A derived cohort view plus its summary aggregates. Never writes back to
/// the statistics table.
#[derive(Debug, Clone, Serialize)]
pub struct CohortTable {
    /// The quantile threshold the selection used.
    pub threshold: f64,
    /// Cohort districts, coldest first (ties broken by UBIGEO).
    pub rows: Vec<CohortRow>,
    /// Sorted unique departments represented in the cohort.
    pub departments: Vec<String>,
    /// Mean of the cohort rows' means.
    pub overall_mean: f64,
    /// Per-department mean of the cohort rows' means, sorted by department.
    pub department_means: Vec<(String, f64)>,
}

/// Select the districts whose mean Tmin sits at or below the `percentile`
/// quantile (0–1 fraction) of the table, optionally scoped to a department
/// set (matched case-insensitively through the name normalizer).
///
/// Zero-count rows carry NaN means: they are excluded from the threshold
/// computation and can never be selected. The threshold comparison is
/// inclusive (`<=`), which keeps the cohort monotonic in `percentile`.
pub fn low_percentile_cohort(
    table: &StatisticsTable,
    percentile: f64,
    scope: Option<&[&str]>,
) -> Result<CohortTable, ZonalError> {
    if !percentile.is_finite() || !(0.0..=1.0).contains(&percentile) {
        return Err(ZonalError::InvalidParameter(format!(
            "percentile must be in [0, 1], got {percentile}"
        )));
    }

    let scope_set: Option<HashSet<String>> =
        scope.map(|names| names.iter().map(|n| normalize(n)).collect());

    let scoped: Vec<_> = table
        .rows()
        .iter()
        .filter(|r| match &scope_set {
            Some(set) => set.contains(&normalize(&r.department)),
            None => true,
        })
        .collect();

    if scoped.is_empty() {
        return Err(ZonalError::EmptyScope(format!(
            "departments {:?} match no rows",
            scope.unwrap_or(&[])
        )));
    }

    let means: Vec<f64> = scoped
        .iter()
        .filter(|r| r.count > 0)
        .map(|r| r.mean)
        .collect();
    if means.is_empty() {
        return Err(ZonalError::EmptyInput(
            "no rows with valid pixels to take a quantile over".into(),
        ));
    }
    let threshold = quantile(&means, percentile);

    // Per-district minimum over the selected rows.
    let mut by_district: BTreeMap<String, CohortRow> = BTreeMap::new();
    for r in scoped.iter().filter(|r| r.count > 0 && r.mean <= threshold) {
        by_district
            .entry(r.ubigeo.clone())
            .and_modify(|c| {
                if r.mean < c.tmin_mean {
                    c.tmin_mean = r.mean;
                }
            })
            .or_insert_with(|| CohortRow {
                ubigeo: r.ubigeo.clone(),
                department: r.department.clone(),
                province: r.province.clone(),
                district: r.district.clone(),
                tmin_mean: r.mean,
            });
    }

    let mut rows: Vec<CohortRow> = by_district.into_values().collect();
    rows.sort_by(|a, b| {
        a.tmin_mean
            .total_cmp(&b.tmin_mean)
            .then_with(|| a.ubigeo.cmp(&b.ubigeo))
    });

    let departments: Vec<String> = rows
        .iter()
        .map(|r| r.department.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let cohort_means: Vec<f64> = rows.iter().map(|r| r.tmin_mean).collect();
    let overall_mean = mean(&cohort_means);

    let mut dept_groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for r in &rows {
        dept_groups
            .entry(r.department.clone())
            .or_default()
            .push(r.tmin_mean);
    }
    let department_means = dept_groups
        .into_iter()
        .map(|(d, v)| (d, mean(&v)))
        .collect();

    Ok(CohortTable {
        threshold,
        rows,
        departments,
        overall_mean,
        department_means,
    })
}
