//! # dem-sample
//!
//! Sample Digital Elevation Model (DEM) rasters at point locations.
//!
//! The crate reads a GeoTIFF DEM, reprojects query points into the raster's
//! coordinate reference system, maps each point to a pixel through the
//! inverse geotransform, and decodes the single pixel it lands in.
//!
//! ## Overview
//!
//! Points come from one of two sources:
//! - a GeoJSON point layer that declares its CRS (the legacy `crs` member);
//! - an in-memory list of `(index, x, y)` points in Web Mercator (EPSG:3857).
//!
//! Pixels are floored, never interpolated, and a point outside the raster
//! aborts the whole run. Decoding is either fixed (the two legacy entry points
//! read `Int16` and `Float32` respectively) or driven by the band's declared
//! pixel type.
//!
//! ## Examples
//!
//! ### Sampling a GeoJSON layer
//!
//! ```no_run
//! use dem_sample::{values_at_points, write_elevation_csv};
//!
//! let rows = values_at_points("dem.tif", "waypoints.geojson")?;
//! write_elevation_csv("waypoints_elevation.csv", &rows)?;
//! # Ok::<(), dem_sample::SampleError>(())
//! ```
//!
//! ### Sampling Web Mercator points
//!
//! ```no_run
//! use dem_sample::{sample_from_points_list, IndexedPoint};
//!
//! let points = [IndexedPoint::new(0, -13_617_947.0, 6_041_627.0)];
//! for row in sample_from_points_list("dem.tif", &points)? {
//!     println!("{}: {}", row.index, row.elevation);
//! }
//! # Ok::<(), dem_sample::SampleError>(())
//! ```

mod config;
mod crs;
mod decode;
mod error;
mod geotiff;
mod geotransform;
mod output;
mod points;
mod raster;
mod sampler;

pub use config::{AxisOrderPolicy, SampleOptions};
pub use crs::{AxisOrder, CoordinateTransformation, SpatialReference, EPSG_WEB_MERCATOR, EPSG_WGS84};
pub use decode::{DecodeFn, DecoderRegistry, Decoding, Elevation, PixelType};
pub use error::SampleError;
pub use geotransform::GeoTransform;
pub use output::{write_elevation_csv, write_feature_csv, write_indexed_csv, ELEVATION_HEADER, INDEXED_HEADER};
pub use points::{FeatureId, IndexedPoint, PointFeature, PointLayer};
pub use raster::{Band, PixelIndex, Raster};
pub use sampler::{IndexedSample, PointSample, Sample, SampledFeature, Sampler};

use std::path::Path;

/// Result type for sampling operations.
pub type Result<T> = std::result::Result<T, SampleError>;

/// Sample a DEM at Web Mercator points, decoding pixels as little-endian `Int16`.
///
/// Output rows keep the input index and coordinates.
pub fn sample_from_points_list<P: AsRef<Path>>(
    raster_path: P,
    points: &[IndexedPoint],
) -> Result<Vec<IndexedSample>> {
    let options = SampleOptions::with_decoding(Decoding::Fixed(PixelType::Int16));
    sample_from_points_list_with_options(raster_path, points, &options)
}

/// [`sample_from_points_list`] with explicit options.
pub fn sample_from_points_list_with_options<P: AsRef<Path>>(
    raster_path: P,
    points: &[IndexedPoint],
    options: &SampleOptions,
) -> Result<Vec<IndexedSample>> {
    let raster = Raster::open(raster_path)?;
    sample_points_in_raster(&raster, points, options)
}

/// Sample an already opened raster at Web Mercator points.
pub fn sample_points_in_raster(
    raster: &Raster,
    points: &[IndexedPoint],
    options: &SampleOptions,
) -> Result<Vec<IndexedSample>> {
    let sampler = Sampler::new(raster, &SpatialReference::web_mercator(), *options)?;

    points
        .iter()
        .map(|point| {
            let sample = sampler.sample(point.x, point.y)?;
            Ok(IndexedSample {
                index: point.index,
                x: point.x,
                y: point.y,
                elevation: sample.elevation,
            })
        })
        .collect()
}

/// Sample a DEM at the points of a GeoJSON layer, decoding pixels as `Float32`.
///
/// Rows hold the raster-CRS coordinates of each point; feature ids and
/// attributes are dropped (see [`sample_features`] to keep them).
pub fn values_at_points<P: AsRef<Path>, Q: AsRef<Path>>(
    raster_path: P,
    vector_path: Q,
) -> Result<Vec<PointSample>> {
    let options = SampleOptions::with_decoding(Decoding::Fixed(PixelType::Float32));
    values_at_points_with_options(raster_path, vector_path, &options)
}

/// [`values_at_points`] with explicit options.
pub fn values_at_points_with_options<P: AsRef<Path>, Q: AsRef<Path>>(
    raster_path: P,
    vector_path: Q,
    options: &SampleOptions,
) -> Result<Vec<PointSample>> {
    let rows = sample_features(raster_path, vector_path, options)?;
    Ok(rows
        .into_iter()
        .map(|row| PointSample {
            x: row.x,
            y: row.y,
            elevation: row.elevation,
        })
        .collect())
}

/// Sample a DEM at the points of a GeoJSON layer, keeping ids and attributes.
pub fn sample_features<P: AsRef<Path>, Q: AsRef<Path>>(
    raster_path: P,
    vector_path: Q,
    options: &SampleOptions,
) -> Result<Vec<SampledFeature>> {
    let raster = Raster::open(raster_path)?;
    let layer = PointLayer::open(vector_path)?;
    let sampler = Sampler::new(&raster, layer.spatial_ref(), *options)?;
    sampler.sample_layer(&layer)
}
