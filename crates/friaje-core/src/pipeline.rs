//! Two-phase pipeline: build the statistics table once, derive views from
//! it as often as needed.
//!
//! The build phase walks every raster band through the zonal engine and
//! concatenates the per-band tables row-wise, so each row is self-contained
//! (district attributes repeated per band). After that the table is
//! immutable; rankings and cohorts are cheap derivations that can run
//! repeatedly, including from a table reloaded out of the CSV artifact.

use crate::boundary::DistrictLayer;
use crate::cohort::{low_percentile_cohort, CohortTable};
use crate::error::ZonalError;
use crate::raster::TminRaster;
use crate::table::{StatRow, StatisticsTable};
use crate::zonal::compute_stats;

pub struct ZonalPipeline {
    table: StatisticsTable,
}

impl ZonalPipeline {
    /// Run the zonal engine over every band and assemble the full table.
    pub fn build(layer: &DistrictLayer, raster: &TminRaster) -> Result<Self, ZonalError> {
        if layer.is_empty() {
            return Err(ZonalError::EmptyInput("boundary layer has no features".into()));
        }
        if raster.band_count() == 0 {
            return Err(ZonalError::EmptyInput("raster has no bands".into()));
        }
        let mut rows = Vec::with_capacity(layer.len() * raster.band_count());
        for band in raster.iter_bands() {
            rows.extend(compute_stats(layer, &band)?);
        }
        Ok(Self {
            table: StatisticsTable::new(rows)?,
        })
    }

    /// Rehydrate from a previously exported statistics table.
    pub fn from_table(table: StatisticsTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &StatisticsTable {
        &self.table
    }

    pub fn latest_year(&self) -> i32 {
        self.table.latest_year()
    }

    /// Coldest `n` districts of `year` by mean Tmin.
    pub fn coldest(&self, year: i32, n: usize) -> Vec<&StatRow> {
        self.table.ranking(year, n, true)
    }

    /// Warmest `n` districts of `year` by mean Tmin.
    pub fn warmest(&self, year: i32, n: usize) -> Vec<&StatRow> {
        self.table.ranking(year, n, false)
    }

    /// Low-percentile cohort over the full table, or over a department
    /// scope.
    pub fn cohort(
        &self,
        percentile: f64,
        scope: Option<&[&str]>,
    ) -> Result<CohortTable, ZonalError> {
        low_percentile_cohort(&self.table, percentile, scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::District;
    use crate::raster::GridTransform;
    use approx::assert_relative_eq;
    use geo_types::{polygon, MultiPolygon};

    const NODATA: f32 = -9999.0;

    fn rect_district(ubigeo: &str, dept: &str, x0: f64, y0: f64, x1: f64, y1: f64) -> District {
        District {
            ubigeo: ubigeo.to_string(),
            department: dept.to_string(),
            province: "P".to_string(),
            district: format!("D{ubigeo}"),
            geometry: MultiPolygon(vec![polygon![
                (x: x0, y: y0),
                (x: x1, y: y0),
                (x: x1, y: y1),
                (x: x0, y: y1),
            ]]),
        }
    }

    /// Two districts side by side on a 4x2 grid, three bands with the east
    /// half one degree warmer and each year 0.5 warmer than the last.
    fn two_district_pipeline() -> ZonalPipeline {
        let layer = DistrictLayer::new(vec![
            rect_district("210101", "PUNO", -0.5, -0.5, 2.5, 2.5),
            rect_district("160101", "LORETO", 1.5, -0.5, 4.5, 2.5),
        ])
        .unwrap();

        let mut raster =
            TminRaster::new(4, 2, GridTransform::new(0.0, 2.0, 1.0, 1.0), NODATA).unwrap();
        for b in 0..3 {
            let offset = b as f32 * 0.5;
            let band: Vec<f32> = (0..2)
                .flat_map(|_| {
                    (0..4).map(move |c| {
                        let east = if c < 2 { 0.0 } else { 1.0 };
                        east + offset
                    })
                })
                .collect();
            raster.push_band(band).unwrap();
        }
        ZonalPipeline::build(&layer, &raster).unwrap()
    }

    #[test]
    fn build_yields_bands_times_districts_rows() {
        let p = two_district_pipeline();
        assert_eq!(p.table().len(), 3 * 2);
        // Unique (UBIGEO, band) keys are enforced by StatisticsTable::new;
        // check years derived per band.
        assert_eq!(p.latest_year(), 2022);
        assert_eq!(p.table().year_slice(2020).len(), 2);
        assert_eq!(p.table().year_slice(2022).len(), 2);
    }

    #[test]
    fn rankings_and_cohort_agree_on_the_coldest_district() {
        let p = two_district_pipeline();
        let coldest = p.coldest(2020, 1);
        assert_eq!(coldest[0].ubigeo, "210101");
        let warmest = p.warmest(2020, 1);
        assert_eq!(warmest[0].ubigeo, "160101");

        let cohort = p.cohort(0.10, None).unwrap();
        assert_eq!(cohort.rows[0].ubigeo, "210101");
        // Credited with its coldest year (band 1).
        assert_relative_eq!(cohort.rows[0].tmin_mean, p.coldest(2020, 1)[0].mean);
    }

    #[test]
    fn scoped_cohort_matches_departments() {
        let p = two_district_pipeline();
        let cohort = p.cohort(1.0, Some(&["loreto"])).unwrap();
        assert_eq!(cohort.departments, vec!["LORETO".to_string()]);
        assert_eq!(cohort.rows.len(), 1);

        assert!(matches!(
            p.cohort(1.0, Some(&["CUSCO"])),
            Err(ZonalError::EmptyScope(_))
        ));
    }

    #[test]
    fn empty_inputs_fail_the_build() {
        let layer = DistrictLayer::new(vec![]).unwrap();
        let raster =
            TminRaster::new(4, 2, GridTransform::new(0.0, 2.0, 1.0, 1.0), NODATA).unwrap();
        assert!(matches!(
            ZonalPipeline::build(&layer, &raster),
            Err(ZonalError::EmptyInput(_))
        ));

        let layer =
            DistrictLayer::new(vec![rect_district("210101", "PUNO", 0.0, 0.0, 1.0, 1.0)]).unwrap();
        // Raster with zero bands.
        assert!(matches!(
            ZonalPipeline::build(&layer, &raster),
            Err(ZonalError::EmptyInput(_))
        ));
    }

    #[test]
    fn table_round_trips_through_csv_into_a_new_pipeline() {
        let p = two_district_pipeline();
        let mut buf = Vec::new();
        p.table().write_csv(&mut buf).unwrap();

        let reloaded = ZonalPipeline::from_table(StatisticsTable::read_csv(buf.as_slice()).unwrap());
        assert_eq!(reloaded.table().len(), p.table().len());
        let a = p.cohort(0.25, None).unwrap();
        let b = reloaded.cohort(0.25, None).unwrap();
        assert_eq!(a.rows.len(), b.rows.len());
        assert_relative_eq!(a.threshold, b.threshold, epsilon = 1e-9);
    }
}
