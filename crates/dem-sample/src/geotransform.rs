//! Affine geotransform between pixel and map coordinates.

use crate::{Result, SampleError};

/// Smallest determinant magnitude accepted when inverting a geotransform.
const MIN_DETERMINANT: f64 = 1e-15;

/// Six-coefficient affine transform in GDAL order.
///
/// `[x0, dx, rx, y0, ry, dy]` maps a pixel position `(col, row)` to
///
/// ```text
/// map_x = x0 + col * dx + row * rx
/// map_y = y0 + col * ry + row * dy
/// ```
///
/// For a north-up raster `rx` and `ry` are zero and `dy` is negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform(pub [f64; 6]);

impl GeoTransform {
    /// Transform with unit pixels and no offset.
    pub const fn identity() -> Self {
        Self([0.0, 1.0, 0.0, 0.0, 0.0, 1.0])
    }

    /// Build a north-up transform from the upper-left corner and pixel size.
    pub fn north_up(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self([origin_x, pixel_width, 0.0, origin_y, 0.0, -pixel_height])
    }

    /// The raw coefficients.
    pub fn coefficients(&self) -> [f64; 6] {
        self.0
    }

    /// Apply the transform to a position.
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let [x0, dx, rx, y0, ry, dy] = self.0;
        (x0 + x * dx + y * rx, y0 + x * ry + y * dy)
    }

    /// Compute the inverse transform.
    ///
    /// Returns [`SampleError::TransformInversion`] when the linear part is
    /// singular.
    pub fn invert(&self) -> Result<GeoTransform> {
        let [x0, dx, rx, y0, ry, dy] = self.0;
        let det = dx * dy - rx * ry;

        if !det.is_finite() || det.abs() < MIN_DETERMINANT {
            return Err(SampleError::TransformInversion(self.0));
        }

        let inv = 1.0 / det;
        Ok(GeoTransform([
            (rx * y0 - x0 * dy) * inv,
            dy * inv,
            -rx * inv,
            (-dx * y0 + x0 * ry) * inv,
            -ry * inv,
            dx * inv,
        ]))
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl From<[f64; 6]> for GeoTransform {
    fn from(coefficients: [f64; 6]) -> Self {
        Self(coefficients)
    }
}
