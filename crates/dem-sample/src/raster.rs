//! In-memory raster representation and single-pixel reads.

use crate::crs::SpatialReference;
use crate::decode::PixelType;
use crate::geotransform::GeoTransform;
use crate::{geotiff, Result, SampleError};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Integer pixel position, `(col, row)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelIndex {
    /// Column (x direction).
    pub col: i64,
    /// Row (y direction).
    pub row: i64,
}

impl PixelIndex {
    /// Floor a fractional pixel position.
    ///
    /// Rounds toward negative infinity, so `-0.5` becomes `-1`. Returns `None`
    /// for NaN or infinite input.
    pub fn from_fractional(col: f64, row: f64) -> Option<Self> {
        if !col.is_finite() || !row.is_finite() {
            return None;
        }
        Some(Self {
            col: col.floor() as i64,
            row: row.floor() as i64,
        })
    }
}

/// One band of pixel data.
#[derive(Debug, Clone)]
pub struct Band {
    pixel_type: PixelType,
    /// Samples in row-major order, little-endian.
    data: Vec<u8>,
    no_data: Option<f64>,
}

impl Band {
    /// Wrap little-endian, row-major sample bytes.
    pub fn new(pixel_type: PixelType, data: Vec<u8>) -> Self {
        Self {
            pixel_type,
            data,
            no_data: None,
        }
    }

    /// Build a band from `i16` samples.
    pub fn from_i16(values: &[i16]) -> Self {
        Self::new(PixelType::Int16, values.iter().flat_map(|v| v.to_le_bytes()).collect())
    }

    /// Build a band from `f32` samples.
    pub fn from_f32(values: &[f32]) -> Self {
        Self::new(PixelType::Float32, values.iter().flat_map(|v| v.to_le_bytes()).collect())
    }

    /// Set the no-data value.
    pub fn with_no_data(mut self, no_data: Option<f64>) -> Self {
        self.no_data = no_data;
        self
    }

    /// Declared pixel encoding.
    pub fn pixel_type(&self) -> PixelType {
        self.pixel_type
    }

    /// No-data value, if the source declared one.
    pub fn no_data(&self) -> Option<f64> {
        self.no_data
    }

    fn sample_count(&self) -> usize {
        self.data.len() / self.pixel_type.size()
    }
}

/// A georeferenced raster held in memory.
#[derive(Debug, Clone)]
pub struct Raster {
    path: PathBuf,
    width: u32,
    height: u32,
    spatial_ref: SpatialReference,
    geo_transform: GeoTransform,
    inverse: GeoTransform,
    bands: Vec<Band>,
}

impl Raster {
    /// Load a GeoTIFF.
    ///
    /// Fails with [`SampleError::RasterOpen`] when the file cannot be read or
    /// declares no usable projection, and with
    /// [`SampleError::TransformInversion`] when the geotransform is singular.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let parts = geotiff::read(path)?;
        let raster = Self::assemble(
            path.to_path_buf(),
            parts.width,
            parts.height,
            parts.spatial_ref,
            parts.geo_transform,
            parts.bands,
        )?;

        info!(
            "Opened raster {} ({}x{}, {} band(s))",
            path.display(),
            raster.width,
            raster.height,
            raster.bands.len()
        );
        info!("Raster coordinate reference system: {}", raster.spatial_ref);
        info!("Raster band 1 data type: {}", raster.bands[0].pixel_type);
        debug!("Raster forward geotransform: {:?}", raster.geo_transform.0);
        debug!("Raster reverse geotransform: {:?}", raster.inverse.0);

        Ok(raster)
    }

    /// Build a raster from pixel data already in memory.
    pub fn from_parts(
        width: u32,
        height: u32,
        spatial_ref: SpatialReference,
        geo_transform: GeoTransform,
        bands: Vec<Band>,
    ) -> Result<Self> {
        Self::assemble(
            PathBuf::from("<memory>"),
            width,
            height,
            spatial_ref,
            geo_transform,
            bands,
        )
    }

    fn assemble(
        path: PathBuf,
        width: u32,
        height: u32,
        spatial_ref: SpatialReference,
        geo_transform: GeoTransform,
        bands: Vec<Band>,
    ) -> Result<Self> {
        let open_error = |reason: String| SampleError::RasterOpen {
            path: path.clone(),
            reason,
        };

        if bands.is_empty() {
            return Err(open_error("raster has no bands".to_string()));
        }

        let pixels = width as usize * height as usize;
        for (i, band) in bands.iter().enumerate() {
            if band.data.len() % band.pixel_type.size() != 0 || band.sample_count() != pixels {
                return Err(open_error(format!(
                    "band {} holds {} bytes, expected {} {} samples",
                    i + 1,
                    band.data.len(),
                    pixels,
                    band.pixel_type
                )));
            }
        }

        let inverse = geo_transform.invert()?;

        Ok(Self {
            path,
            width,
            height,
            spatial_ref,
            geo_transform,
            inverse,
            bands,
        })
    }

    /// Source path, or `<memory>`.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Width and height in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Native spatial reference.
    pub fn spatial_ref(&self) -> &SpatialReference {
        &self.spatial_ref
    }

    /// Forward (pixel to map) transform.
    pub fn geo_transform(&self) -> &GeoTransform {
        &self.geo_transform
    }

    /// Inverse (map to pixel) transform.
    pub fn inverse_transform(&self) -> &GeoTransform {
        &self.inverse
    }

    /// Number of bands.
    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// Band by 1-based number.
    pub fn band(&self, number: usize) -> Option<&Band> {
        number.checked_sub(1).and_then(|i| self.bands.get(i))
    }

    /// Whether an index lies inside the raster.
    pub fn contains(&self, index: PixelIndex) -> bool {
        index.col >= 0
            && index.row >= 0
            && index.col < i64::from(self.width)
            && index.row < i64::from(self.height)
    }

    /// Raw bytes of one pixel of band `band` (1-based).
    pub fn read_pixel(&self, band: usize, index: PixelIndex) -> Result<&[u8]> {
        if !self.contains(index) {
            return Err(SampleError::OutOfExtent {
                col: index.col,
                row: index.row,
                width: self.width,
                height: self.height,
            });
        }

        let data = self.band(band).ok_or_else(|| SampleError::PixelRead {
            band,
            col: index.col,
            row: index.row,
            reason: format!("raster has {} band(s)", self.bands.len()),
        })?;

        let size = data.pixel_type.size();
        let offset = (index.row as usize * self.width as usize + index.col as usize) * size;
        Ok(&data.data[offset..offset + size])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raster_4x4() -> Raster {
        let values: Vec<i16> = (0..16).collect();
        Raster::from_parts(
            4,
            4,
            SpatialReference::web_mercator(),
            GeoTransform::identity(),
            vec![Band::from_i16(&values)],
        )
        .unwrap()
    }

    #[test]
    fn test_floor_toward_negative_infinity() {
        assert_eq!(PixelIndex::from_fractional(-0.5, 0.5), Some(PixelIndex { col: -1, row: 0 }));
        assert_eq!(PixelIndex::from_fractional(2.999, -1.0), Some(PixelIndex { col: 2, row: -1 }));
        assert_eq!(PixelIndex::from_fractional(f64::NAN, 0.0), None);
        assert_eq!(PixelIndex::from_fractional(0.0, f64::INFINITY), None);
    }

    #[test]
    fn test_read_pixel_row_major() {
        let raster = raster_4x4();
        let bytes = raster.read_pixel(1, PixelIndex { col: 2, row: 1 }).unwrap();
        assert_eq!(bytes, &6i16.to_le_bytes());
    }

    #[test]
    fn test_read_pixel_out_of_extent() {
        let raster = raster_4x4();
        for (col, row) in [(-1, 0), (0, -1), (4, 0), (0, 4)] {
            let err = raster.read_pixel(1, PixelIndex { col, row }).unwrap_err();
            assert!(matches!(err, SampleError::OutOfExtent { width: 4, height: 4, .. }));
        }
    }

    #[test]
    fn test_read_pixel_missing_band() {
        let raster = raster_4x4();
        let err = raster.read_pixel(2, PixelIndex { col: 0, row: 0 }).unwrap_err();
        assert!(matches!(err, SampleError::PixelRead { band: 2, .. }));
        assert!(raster.band(0).is_none());
    }

    #[test]
    fn test_band_size_validated() {
        let result = Raster::from_parts(
            4,
            4,
            SpatialReference::web_mercator(),
            GeoTransform::identity(),
            vec![Band::from_i16(&[0; 15])],
        );
        assert!(matches!(result, Err(SampleError::RasterOpen { .. })));
    }

    #[test]
    fn test_degenerate_transform_rejected() {
        let result = Raster::from_parts(
            1,
            1,
            SpatialReference::web_mercator(),
            GeoTransform([0.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
            vec![Band::from_f32(&[1.0])],
        );
        assert!(matches!(result, Err(SampleError::TransformInversion(_))));
    }
}
