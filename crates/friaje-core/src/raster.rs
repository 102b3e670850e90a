//! Multi-band Tmin raster: row-major f32 grids under one affine transform.
//! Pixel coordinate math uses f64; sample values are f32.

use serde::{Deserialize, Serialize};

use crate::error::ZonalError;

/// North-up affine pixel-to-world mapping.
///
/// `(origin_x, origin_y)` is the world coordinate of the *outer corner* of
/// pixel (row 0, col 0). Columns advance east by `pixel_width`; rows advance
/// south, so world y decreases by `pixel_height` per row. Both pixel sizes
/// are strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl GridTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        }
    }

    /// World coordinate of the center of cell (row, col).
    #[inline]
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.origin_x + (col as f64 + 0.5) * self.pixel_width,
            self.origin_y - (row as f64 + 0.5) * self.pixel_height,
        )
    }

    /// Fractional column index of world x (0.0 at the west edge of col 0).
    #[inline]
    pub fn world_to_col(&self, x: f64) -> f64 {
        (x - self.origin_x) / self.pixel_width
    }

    /// Fractional row index of world y (0.0 at the north edge of row 0).
    #[inline]
    pub fn world_to_row(&self, y: f64) -> f64 {
        (self.origin_y - y) / self.pixel_height
    }

    fn validate(&self) -> Result<(), ZonalError> {
        let ok = self.pixel_width.is_finite()
            && self.pixel_height.is_finite()
            && self.pixel_width > 0.0
            && self.pixel_height > 0.0
            && self.origin_x.is_finite()
            && self.origin_y.is_finite();
        if ok {
            Ok(())
        } else {
            Err(ZonalError::ShapeMismatch(format!(
                "degenerate transform: origin ({}, {}), pixel ({} x {})",
                self.origin_x, self.origin_y, self.pixel_width, self.pixel_height
            )))
        }
    }
}

/// A multi-band minimum-temperature raster.
///
/// All bands share the same shape, transform, and nodata sentinel; that
/// invariant is enforced at construction. Band numbers are 1-based,
/// following GeoTIFF convention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TminRaster {
    width: usize,
    height: usize,
    transform: GridTransform,
    nodata: f32,
    bands: Vec<Vec<f32>>,
}

impl TminRaster {
    /// Create an empty raster with validated shape and transform.
    pub fn new(
        width: usize,
        height: usize,
        transform: GridTransform,
        nodata: f32,
    ) -> Result<Self, ZonalError> {
        if width == 0 || height == 0 {
            return Err(ZonalError::ShapeMismatch(format!(
                "zero-sized raster: {width} x {height}"
            )));
        }
        transform.validate()?;
        Ok(Self {
            width,
            height,
            transform,
            nodata,
            bands: Vec::new(),
        })
    }

    /// Append a band buffer. Fails if the buffer does not match the raster
    /// shape.
    pub fn push_band(&mut self, data: Vec<f32>) -> Result<(), ZonalError> {
        if data.len() != self.width * self.height {
            return Err(ZonalError::ShapeMismatch(format!(
                "band {} has {} samples, raster shape is {} x {}",
                self.bands.len() + 1,
                data.len(),
                self.width,
                self.height
            )));
        }
        self.bands.push(data);
        Ok(())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn transform(&self) -> &GridTransform {
        &self.transform
    }

    pub fn nodata(&self) -> f32 {
        self.nodata
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// Borrow band `number` (1-based). None if out of range.
    pub fn band(&self, number: usize) -> Option<BandView<'_>> {
        if number == 0 || number > self.bands.len() {
            return None;
        }
        Some(BandView {
            number,
            data: &self.bands[number - 1],
            width: self.width,
            height: self.height,
            transform: &self.transform,
            nodata: self.nodata,
        })
    }

    /// Iterate bands in order, 1-based numbers attached.
    pub fn iter_bands(&self) -> impl Iterator<Item = BandView<'_>> {
        (1..=self.bands.len()).map(move |n| self.band(n).unwrap())
    }
}

/// A borrowed view of one raster band plus the shared grid metadata.
#[derive(Debug, Clone, Copy)]
pub struct BandView<'a> {
    /// 1-based band number.
    pub number: usize,
    data: &'a [f32],
    width: usize,
    height: usize,
    transform: &'a GridTransform,
    nodata: f32,
}

impl<'a> BandView<'a> {
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.width + col]
    }

    /// A sample is invalid if it equals the nodata sentinel or is NaN.
    #[inline]
    pub fn is_nodata(&self, value: f32) -> bool {
        value == self.nodata || value.is_nan()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn transform(&self) -> &GridTransform {
        self.transform
    }
}
