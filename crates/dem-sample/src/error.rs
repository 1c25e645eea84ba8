//! Error types for the sampling crate.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while sampling a DEM at points.
#[derive(Debug, Error)]
pub enum SampleError {
    /// The raster could not be opened, decoded, or has no readable projection.
    #[error("Cannot open raster {path}: {reason}")]
    RasterOpen {
        /// Raster path (or `<memory>` for in-memory rasters).
        path: PathBuf,
        /// Reason for failure.
        reason: String,
    },

    /// The forward geotransform is degenerate and cannot be inverted.
    #[error("Geotransform {0:?} is not invertible")]
    TransformInversion([f64; 6]),

    /// The point file could not be read or is not a point layer.
    #[error("Cannot open point layer {path}: {reason}")]
    VectorOpen {
        /// Vector file path.
        path: PathBuf,
        /// Reason for failure.
        reason: String,
    },

    /// The point layer declares no spatial reference.
    #[error("Point layer {path} declares no spatial reference")]
    MissingCrs {
        /// Vector file path.
        path: PathBuf,
    },

    /// A spatial reference definition could not be resolved.
    #[error("Unknown spatial reference: {0}")]
    UnknownCrs(String),

    /// Reprojecting a coordinate failed.
    #[error("Cannot transform ({x}, {y}): {reason}")]
    Reprojection {
        /// Input x (easting or longitude).
        x: f64,
        /// Input y (northing or latitude).
        y: f64,
        /// Reason for failure.
        reason: String,
    },

    /// The inverse geotransform produced NaN or infinity.
    #[error("Map coordinate ({x}, {y}) has no finite pixel position")]
    NonFinitePixel {
        /// Map x in raster CRS.
        x: f64,
        /// Map y in raster CRS.
        y: f64,
    },

    /// The pixel index lies outside the raster.
    #[error("Pixel ({col}, {row}) is outside the {width}x{height} raster")]
    OutOfExtent {
        /// Pixel column.
        col: i64,
        /// Pixel row.
        row: i64,
        /// Raster width in pixels.
        width: u32,
        /// Raster height in pixels.
        height: u32,
    },

    /// Reading a pixel failed for a reason other than extent.
    #[error("Cannot read pixel ({col}, {row}) from band {band}: {reason}")]
    PixelRead {
        /// 1-based band number.
        band: usize,
        /// Pixel column.
        col: i64,
        /// Pixel row.
        row: i64,
        /// Reason for failure.
        reason: String,
    },

    /// The raw pixel bytes do not fit the selected decoder.
    #[error("Cannot decode {len}-byte pixel as {pixel_type}")]
    PixelDecode {
        /// Name of the pixel type the decoder expects.
        pixel_type: &'static str,
        /// Number of raw bytes read.
        len: usize,
    },

    /// Writing the CSV output failed.
    #[error("Cannot write {path}: {source}")]
    FileWrite {
        /// Output path.
        path: PathBuf,
        /// Underlying CSV/I/O error.
        #[source]
        source: csv::Error,
    },

    /// Invalid sampling options.
    #[error("Invalid configuration: {0}")]
    Config(String),
}
