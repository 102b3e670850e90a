//! Zonal statistics engine: per-district raster masking and reduction.
//!
//! Inclusion rule (held fixed): a raster cell belongs to a district iff the
//! cell's *center point* lies strictly inside the district's multipolygon.
//! Cells equal to the nodata sentinel are excluded from the reduction. A
//! district whose footprint covers no valid cell yields a normal record with
//! `count = 0` and NaN statistics.

use geo::{BoundingRect, Contains};
use geo_types::Point;

#[cfg(feature = "threading")]
use rayon::prelude::*;

use crate::boundary::{District, DistrictLayer};
use crate::error::ZonalError;
use crate::raster::BandView;
use crate::stats::{mean, population_std, quantile_sorted};
use crate::table::StatRow;

/// Year preceding band 1: band 1 observes 2020, band 2 observes 2021, …
pub const BASE_YEAR: i32 = 2019;

/// Compute one statistics row per district for a single raster band.
///
/// Districts are reduced independently; with the `threading` feature the
/// per-district map runs on rayon without changing results. Rows come back
/// in layer order. The caller concatenates per-band outputs row-wise to form
/// the full statistics table.
pub fn compute_stats(
    layer: &DistrictLayer,
    band: &BandView<'_>,
) -> Result<Vec<StatRow>, ZonalError> {
    if layer.is_empty() {
        return Err(ZonalError::EmptyInput(format!(
            "no boundary features for band {}",
            band.number
        )));
    }

    #[cfg(feature = "threading")]
    let rows = layer
        .districts()
        .par_iter()
        .map(|d| district_row(d, band))
        .collect();

    #[cfg(not(feature = "threading"))]
    let rows = layer
        .districts()
        .iter()
        .map(|d| district_row(d, band))
        .collect();

    Ok(rows)
}

fn district_row(district: &District, band: &BandView<'_>) -> StatRow {
    let values = covered_values(district, band);
    let year = BASE_YEAR + band.number as i32;

    if values.is_empty() {
        return StatRow::empty(district, band.number as u32, year);
    }

    let mut sorted = values.clone();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let min = sorted[0];
    let max = sorted[sorted.len() - 1];

    StatRow {
        ubigeo: district.ubigeo.clone(),
        department: district.department.clone(),
        province: district.province.clone(),
        district: district.district.clone(),
        count: values.len() as u32,
        mean: mean(&values),
        min,
        max,
        std: population_std(&values),
        p10: quantile_sorted(&sorted, 0.10),
        p90: quantile_sorted(&sorted, 0.90),
        range: max - min,
        band: band.number as u32,
        year,
    }
}

/// Gather the valid sample values of all cells whose center falls inside the
/// district footprint. The scan is restricted to the pixel window of the
/// geometry's bounding rect, clamped to the raster extent.
fn covered_values(district: &District, band: &BandView<'_>) -> Vec<f64> {
    let rect = match district.geometry.bounding_rect() {
        Some(r) => r,
        None => return Vec::new(),
    };
    let t = band.transform();

    // Window of candidate cells; an empty intersection with the raster
    // extent is the "polygon fully outside" case.
    let col_min = t.world_to_col(rect.min().x).floor().max(0.0) as usize;
    let col_max = (t.world_to_col(rect.max().x).ceil() as isize).min(band.width() as isize);
    let row_min = t.world_to_row(rect.max().y).floor().max(0.0) as usize;
    let row_max = (t.world_to_row(rect.min().y).ceil() as isize).min(band.height() as isize);
    if col_max <= col_min as isize || row_max <= row_min as isize {
        return Vec::new();
    }

    let mut values = Vec::new();
    for row in row_min..row_max as usize {
        for col in col_min..col_max as usize {
            let (x, y) = t.cell_center(row, col);
            if !district.geometry.contains(&Point::new(x, y)) {
                continue;
            }
            let v = band.get(row, col);
            if band.is_nodata(v) {
                continue;
            }
            values.push(v as f64);
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{GridTransform, TminRaster};
    use approx::assert_relative_eq;
    use geo_types::{polygon, MultiPolygon};

    const NODATA: f32 = -9999.0;

    fn rect_district(ubigeo: &str, x0: f64, y0: f64, x1: f64, y1: f64) -> District {
        District {
            ubigeo: ubigeo.to_string(),
            department: "JUNIN".to_string(),
            province: "HUANCAYO".to_string(),
            district: format!("D{ubigeo}"),
            geometry: MultiPolygon(vec![polygon![
                (x: x0, y: y0),
                (x: x1, y: y0),
                (x: x1, y: y1),
                (x: x0, y: y1),
            ]]),
        }
    }

    /// 4x4 raster over x 0..4, y 0..4, one-degree pixels, north-up.
    fn raster_4x4(fill: f32) -> TminRaster {
        let mut r = TminRaster::new(4, 4, GridTransform::new(0.0, 4.0, 1.0, 1.0), NODATA).unwrap();
        r.push_band(vec![fill; 16]).unwrap();
        r
    }

    #[test]
    fn covering_and_outside_districts() {
        // A covers the 2x2 block x 0..2, y 2..4 (cell centers 0.5/1.5);
        // B sits entirely east of the raster.
        let layer = DistrictLayer::new(vec![
            rect_district("A", -0.1, 1.9, 2.1, 4.1),
            rect_district("B", 10.0, 0.0, 12.0, 2.0),
        ])
        .unwrap();
        let raster = raster_4x4(5.0);
        let rows = compute_stats(&layer, &raster.band(1).unwrap()).unwrap();
        assert_eq!(rows.len(), 2);

        let a = &rows[0];
        assert_eq!(a.count, 4);
        assert_relative_eq!(a.mean, 5.0);
        assert_relative_eq!(a.min, 5.0);
        assert_relative_eq!(a.max, 5.0);
        assert_relative_eq!(a.std, 0.0);
        assert_relative_eq!(a.p10, 5.0);
        assert_relative_eq!(a.p90, 5.0);
        assert_relative_eq!(a.range, 0.0);
        assert_eq!(a.band, 1);
        assert_eq!(a.year, 2020);

        let b = &rows[1];
        assert_eq!(b.count, 0);
        assert!(b.mean.is_nan());
        assert!(b.min.is_nan());
        assert!(b.max.is_nan());
        assert!(b.std.is_nan());
        assert!(b.p10.is_nan());
        assert!(b.p90.is_nan());
        assert!(b.range.is_nan());
        assert_eq!(b.band, 1);
        assert_eq!(b.year, 2020);
    }

    #[test]
    fn nodata_cells_are_excluded() {
        let mut r =
            TminRaster::new(2, 2, GridTransform::new(0.0, 2.0, 1.0, 1.0), NODATA).unwrap();
        r.push_band(vec![3.0, NODATA, 7.0, NODATA]).unwrap();
        let layer = DistrictLayer::new(vec![rect_district("A", -0.5, -0.5, 2.5, 2.5)]).unwrap();

        let rows = compute_stats(&layer, &r.band(1).unwrap()).unwrap();
        assert_eq!(rows[0].count, 2);
        assert_relative_eq!(rows[0].mean, 5.0);
        assert_relative_eq!(rows[0].range, 4.0);
    }

    #[test]
    fn all_nodata_footprint_is_a_zero_count_record_not_an_error() {
        let mut r =
            TminRaster::new(2, 2, GridTransform::new(0.0, 2.0, 1.0, 1.0), NODATA).unwrap();
        r.push_band(vec![NODATA; 4]).unwrap();
        let layer = DistrictLayer::new(vec![rect_district("A", -0.5, -0.5, 2.5, 2.5)]).unwrap();
        let rows = compute_stats(&layer, &r.band(1).unwrap()).unwrap();
        assert_eq!(rows[0].count, 0);
        assert!(rows[0].mean.is_nan());
    }

    #[test]
    fn order_statistics_are_consistent() {
        // Values 1..=16 across the full grid.
        let mut r =
            TminRaster::new(4, 4, GridTransform::new(0.0, 4.0, 1.0, 1.0), NODATA).unwrap();
        r.push_band((1..=16).map(|v| v as f32).collect()).unwrap();
        let layer = DistrictLayer::new(vec![rect_district("A", -0.5, -0.5, 4.5, 4.5)]).unwrap();

        let row = &compute_stats(&layer, &r.band(1).unwrap()).unwrap()[0];
        assert_eq!(row.count, 16);
        assert!(row.min <= row.p10);
        assert!(row.p10 <= row.mean);
        assert!(row.mean <= row.p90);
        assert!(row.p90 <= row.max);
        assert_relative_eq!(row.range, row.max - row.min);
        // p10 of 1..=16 at rank 1.5: 2.5; p90 at rank 13.5: 14.5.
        assert_relative_eq!(row.p10, 2.5);
        assert_relative_eq!(row.p90, 14.5);
    }

    #[test]
    fn partial_overlap_uses_cell_center_rule() {
        // Polygon covers only the western half of the top-left cell, so the
        // cell center (0.5, 3.5) is inside; the polygon edge at x = 0.6
        // leaves every other center out.
        let layer = DistrictLayer::new(vec![rect_district("A", -0.5, 3.0, 0.6, 4.5)]).unwrap();
        let raster = raster_4x4(2.0);
        let rows = compute_stats(&layer, &raster.band(1).unwrap()).unwrap();
        assert_eq!(rows[0].count, 1);
        assert_relative_eq!(rows[0].mean, 2.0);
    }

    #[test]
    fn empty_layer_is_an_error() {
        let layer = DistrictLayer::new(vec![]).unwrap();
        let raster = raster_4x4(1.0);
        assert!(matches!(
            compute_stats(&layer, &raster.band(1).unwrap()),
            Err(ZonalError::EmptyInput(_))
        ));
    }

    #[test]
    fn band_two_maps_to_year_2021() {
        let mut r =
            TminRaster::new(2, 2, GridTransform::new(0.0, 2.0, 1.0, 1.0), NODATA).unwrap();
        r.push_band(vec![1.0; 4]).unwrap();
        r.push_band(vec![2.0; 4]).unwrap();
        let layer = DistrictLayer::new(vec![rect_district("A", -0.5, -0.5, 2.5, 2.5)]).unwrap();
        let rows = compute_stats(&layer, &r.band(2).unwrap()).unwrap();
        assert_eq!(rows[0].band, 2);
        assert_eq!(rows[0].year, 2021);
        assert_relative_eq!(rows[0].mean, 2.0);
    }
}
