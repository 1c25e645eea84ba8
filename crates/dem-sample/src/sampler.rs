//! Point sampling: reproject, locate the pixel, read and decode it.

use crate::config::{AxisOrderPolicy, SampleOptions};
use crate::crs::{AxisOrder, CoordinateTransformation, SpatialReference};
use crate::decode::{DecoderRegistry, Elevation, PixelType};
use crate::points::{FeatureId, PointLayer};
use crate::raster::{PixelIndex, Raster};
use crate::{Result, SampleError};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, trace};

/// Result of sampling one point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// X in the raster's reference.
    pub map_x: f64,
    /// Y in the raster's reference.
    pub map_y: f64,
    /// Pixel that was read.
    pub pixel: PixelIndex,
    /// Decoded value.
    pub elevation: Elevation,
}

/// Row produced from a vector layer: raster-CRS coordinates and the value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PointSample {
    /// X in the raster's reference.
    pub x: f64,
    /// Y in the raster's reference.
    pub y: f64,
    /// Decoded value.
    pub elevation: Elevation,
}

/// Row produced from an indexed point list: input coordinates and the value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndexedSample {
    /// Index of the input point.
    pub index: usize,
    /// Input x (EPSG:3857).
    pub x: f64,
    /// Input y (EPSG:3857).
    pub y: f64,
    /// Decoded value.
    pub elevation: Elevation,
}

/// Row that keeps the feature's identity and attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledFeature {
    /// Feature id, if any.
    pub fid: Option<FeatureId>,
    /// X in the raster's reference.
    pub x: f64,
    /// Y in the raster's reference.
    pub y: f64,
    /// Decoded value.
    pub elevation: Elevation,
    /// Attributes of the input feature.
    pub properties: Map<String, Value>,
}

/// Samples one band of a raster at points given in a source reference.
///
/// The coordinate transformation is built once and reused for every point.
#[derive(Debug)]
pub struct Sampler<'r> {
    raster: &'r Raster,
    transform: CoordinateTransformation,
    options: SampleOptions,
    pixel_type: PixelType,
    registry: DecoderRegistry,
}

impl<'r> Sampler<'r> {
    /// Create a sampler for points in `source`.
    pub fn new(raster: &'r Raster, source: &SpatialReference, options: SampleOptions) -> Result<Self> {
        Self::with_registry(raster, source, options, DecoderRegistry::default())
    }

    /// Create a sampler with a custom decoder registry.
    pub fn with_registry(
        raster: &'r Raster,
        source: &SpatialReference,
        options: SampleOptions,
        registry: DecoderRegistry,
    ) -> Result<Self> {
        options.validate()?;

        let band = raster.band(options.band).ok_or_else(|| {
            SampleError::Config(format!(
                "band {} requested but {} has {} band(s)",
                options.band,
                raster.path().display(),
                raster.band_count()
            ))
        })?;
        let pixel_type = options.decoding.resolve(band.pixel_type());
        if !registry.supports(pixel_type) {
            return Err(SampleError::Config(format!("no decoder registered for {pixel_type}")));
        }

        let transform = CoordinateTransformation::new(source, raster.spatial_ref())?;
        info!(
            "Sampling band {} ({}) as {} from {} to {}",
            options.band,
            band.pixel_type(),
            pixel_type,
            source.name(),
            raster.spatial_ref().name()
        );
        debug!("Point transform: {:?}, axis order {}", transform, options.axis_order);

        Ok(Self {
            raster,
            transform,
            options,
            pixel_type,
            registry,
        })
    }

    /// The pixel type values are decoded as.
    pub fn pixel_type(&self) -> PixelType {
        self.pixel_type
    }

    /// Reproject a point and resolve the axis order to raster `(x, y)`.
    pub fn to_map(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let (first, second) = self.transform.transform_point(x, y)?;
        let swap = match self.options.axis_order {
            AxisOrderPolicy::Swap => true,
            AxisOrderPolicy::Authority => {
                self.raster.spatial_ref().axis_order() == AxisOrder::NorthEast
            }
        };
        Ok(if swap { (second, first) } else { (first, second) })
    }

    /// Find the pixel containing a map coordinate.
    pub fn pixel_at(&self, map_x: f64, map_y: f64) -> Result<PixelIndex> {
        let (col, row) = self.raster.inverse_transform().apply(map_x, map_y);
        PixelIndex::from_fractional(col, row).ok_or(SampleError::NonFinitePixel { x: map_x, y: map_y })
    }

    /// Sample one point given in the source reference.
    pub fn sample(&self, x: f64, y: f64) -> Result<Sample> {
        let (map_x, map_y) = self.to_map(x, y)?;
        let pixel = self.pixel_at(map_x, map_y)?;
        let bytes = self.raster.read_pixel(self.options.band, pixel)?;
        let elevation = self.registry.decode(self.pixel_type, bytes)?;

        trace!(
            "({x}, {y}) -> map ({map_x}, {map_y}) -> pixel ({}, {}) = {elevation}",
            pixel.col,
            pixel.row
        );

        Ok(Sample {
            map_x,
            map_y,
            pixel,
            elevation,
        })
    }

    /// Sample every feature of a layer in order, stopping at the first error.
    pub fn sample_layer(&self, layer: &PointLayer) -> Result<Vec<SampledFeature>> {
        layer
            .features()
            .iter()
            .map(|feature| {
                let sample = self.sample(feature.x, feature.y)?;
                Ok(SampledFeature {
                    fid: feature.fid.clone(),
                    x: sample.map_x,
                    y: sample.map_y,
                    elevation: sample.elevation,
                    properties: feature.properties.clone(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::Decoding;
    use crate::geotransform::GeoTransform;
    use crate::points::IndexedPoint;
    use crate::raster::Band;

    fn identity_raster(width: u32, height: u32) -> Raster {
        let values: Vec<i16> = (0..(width * height)).map(|v| v as i16).collect();
        Raster::from_parts(
            width,
            height,
            SpatialReference::web_mercator(),
            GeoTransform::identity(),
            vec![Band::from_i16(&values)],
        )
        .unwrap()
    }

    #[test]
    fn test_identity_selects_floor() {
        let raster = identity_raster(8, 8);
        let sampler =
            Sampler::new(&raster, &SpatialReference::web_mercator(), SampleOptions::default())
                .unwrap();

        for (x, y) in [(0.0, 0.0), (3.7, 5.2), (7.999, 0.5), (2.0, 6.0)] {
            let sample = sampler.sample(x, y).unwrap();
            assert_eq!(sample.pixel.col, x.floor() as i64);
            assert_eq!(sample.pixel.row, y.floor() as i64);
            assert_eq!(sample.elevation, Elevation::Int(sample.pixel.row * 8 + sample.pixel.col));
        }
    }

    #[test]
    fn test_negative_fraction_is_out_of_extent() {
        let raster = identity_raster(4, 4);
        let sampler =
            Sampler::new(&raster, &SpatialReference::web_mercator(), SampleOptions::default())
                .unwrap();

        assert_eq!(sampler.pixel_at(-0.5, 0.5).unwrap(), PixelIndex { col: -1, row: 0 });
        let err = sampler.sample(-0.5, 0.5).unwrap_err();
        assert!(matches!(err, SampleError::OutOfExtent { col: -1, row: 0, .. }));
    }

    #[test]
    fn test_north_up_end_to_end() {
        let mut values = vec![0i16; 16];
        values[4 + 2] = 350;
        let raster = Raster::from_parts(
            4,
            4,
            SpatialReference::web_mercator(),
            GeoTransform([0.0, 1.0, 0.0, 0.0, 0.0, -1.0]),
            vec![Band::from_i16(&values)],
        )
        .unwrap();

        let sampler = Sampler::new(
            &raster,
            &SpatialReference::web_mercator(),
            SampleOptions::with_decoding(Decoding::Fixed(PixelType::Int16)),
        )
        .unwrap();
        let sample = sampler.sample(2.5, -1.5).unwrap();
        assert_eq!(sample.pixel, PixelIndex { col: 2, row: 1 });
        assert_eq!(sample.elevation, Elevation::Int(350));
    }

    #[test]
    fn test_fixed_decoding_ignores_declared_type() {
        let raster = Raster::from_parts(
            1,
            1,
            SpatialReference::web_mercator(),
            GeoTransform::identity(),
            vec![Band::from_f32(&[1.0])],
        )
        .unwrap();
        let source = SpatialReference::web_mercator();

        let native = Sampler::new(&raster, &source, SampleOptions::default()).unwrap();
        assert_eq!(native.sample(0.5, 0.5).unwrap().elevation, Elevation::Float(1.0));

        // Four Float32 bytes cannot be read as a two-byte Int16
        let int16 = Sampler::new(
            &raster,
            &source,
            SampleOptions::with_decoding(Decoding::Fixed(PixelType::Int16)),
        )
        .unwrap();
        assert!(matches!(
            int16.sample(0.5, 0.5),
            Err(SampleError::PixelDecode { pixel_type: "Int16", len: 4 })
        ));
    }

    #[test]
    fn test_axis_order_policies_on_geographic_raster() {
        // 10 x 10 one-degree pixels, upper-left corner at (0E, 10N)
        let values: Vec<i16> = (0..100).collect();
        let raster = Raster::from_parts(
            10,
            10,
            SpatialReference::from_epsg(4326).unwrap(),
            GeoTransform::north_up(0.0, 10.0, 1.0, 1.0),
            vec![Band::from_i16(&values)],
        )
        .unwrap();
        let source = SpatialReference::crs84();

        // EPSG:4326 declares latitude first, so both policies swap back to (lon, lat)
        for axis_order in [AxisOrderPolicy::Authority, AxisOrderPolicy::Swap] {
            let options = SampleOptions {
                axis_order,
                ..SampleOptions::default()
            };
            let sampler = Sampler::new(&raster, &source, options).unwrap();
            let (x, y) = sampler.to_map(3.5, 7.5).unwrap();
            assert!((x - 3.5).abs() < 1e-9 && (y - 7.5).abs() < 1e-9);
            assert_eq!(sampler.sample(3.5, 7.5).unwrap().elevation, Elevation::Int(2 * 10 + 3));
        }
    }

    #[test]
    fn test_swap_policy_on_projected_raster() {
        let raster = identity_raster(300, 300);
        let options = SampleOptions {
            axis_order: AxisOrderPolicy::Swap,
            ..SampleOptions::default()
        };
        let sampler = Sampler::new(&raster, &SpatialReference::web_mercator(), options).unwrap();
        let sample = sampler.sample(100.0, 200.0).unwrap();
        assert_eq!(sample.pixel, PixelIndex { col: 200, row: 100 });
    }

    #[test]
    fn test_sample_layer_keeps_order_and_ids() {
        let raster = identity_raster(4, 4);
        let layer = PointLayer::web_mercator(&[
            IndexedPoint::new(10, 3.5, 0.5),
            IndexedPoint::new(11, 0.5, 3.5),
        ]);
        let sampler =
            Sampler::new(&raster, layer.spatial_ref(), SampleOptions::default()).unwrap();
        let rows = sampler.sample_layer(&layer).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].fid, Some(FeatureId::Number(10.into())));
        assert_eq!(rows[0].elevation, Elevation::Int(3));
        assert_eq!(rows[1].fid, Some(FeatureId::Number(11.into())));
        assert_eq!(rows[1].elevation, Elevation::Int(12));
    }

    #[test]
    fn test_sample_layer_aborts_on_first_error() {
        let raster = identity_raster(4, 4);
        let layer = PointLayer::web_mercator(&[
            IndexedPoint::new(0, 1.0, 1.0),
            IndexedPoint::new(1, 40.0, 1.0),
            IndexedPoint::new(2, 2.0, 2.0),
        ]);
        let sampler =
            Sampler::new(&raster, layer.spatial_ref(), SampleOptions::default()).unwrap();
        assert!(matches!(
            sampler.sample_layer(&layer),
            Err(SampleError::OutOfExtent { col: 40, .. })
        ));
    }

    #[test]
    fn test_missing_band_rejected() {
        let raster = identity_raster(2, 2);
        let options = SampleOptions {
            band: 3,
            ..SampleOptions::default()
        };
        let result = Sampler::new(&raster, &SpatialReference::web_mercator(), options);
        assert!(matches!(result, Err(SampleError::Config(_))));
    }
}
