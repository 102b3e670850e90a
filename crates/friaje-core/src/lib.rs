//! District-level zonal statistics for Peru minimum-temperature rasters.
//!
//! The library turns an administrative boundary layer and a multi-band Tmin
//! raster into a per-district, per-band statistics table, then derives
//! rankings and low-percentile "coldest cohort" views from it. The table is
//! built once and never mutated; every view is a cheap derivation.

pub mod boundary;
pub mod cohort;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod raster;
pub mod stats;
pub mod table;
pub mod zonal;

pub use boundary::{District, DistrictLayer};
pub use cohort::{low_percentile_cohort, CohortRow, CohortTable};
pub use error::ZonalError;
pub use normalize::normalize;
pub use pipeline::ZonalPipeline;
pub use raster::{BandView, GridTransform, TminRaster};
pub use table::{StatRow, StatisticsTable};
pub use zonal::{compute_stats, BASE_YEAR};
