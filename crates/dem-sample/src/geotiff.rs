//! GeoTIFF decoding: pixel data, geotransform, and spatial reference.

use crate::crs::SpatialReference;
use crate::decode::PixelType;
use crate::geotransform::GeoTransform;
use crate::raster::Band;
use crate::{Result, SampleError};
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tracing::{debug, warn};

// GeoTIFF tags
const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
const TAG_MODEL_TIEPOINT: u16 = 33922;
const TAG_MODEL_TRANSFORMATION: u16 = 34264;
const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
const TAG_GDAL_NODATA: u16 = 42113;

// GeoKeys
const GEO_KEY_RASTER_TYPE: u16 = 1025;
const GEO_KEY_GEOGRAPHIC_TYPE: u16 = 2048;
const GEO_KEY_PROJECTED_CRS: u16 = 3072;

const RASTER_PIXEL_IS_POINT: u16 = 2;
const USER_DEFINED: u16 = 32767;

/// Everything [`crate::Raster`] needs from a GeoTIFF.
#[derive(Debug)]
pub(crate) struct GeoTiffParts {
    pub width: u32,
    pub height: u32,
    pub spatial_ref: SpatialReference,
    pub geo_transform: GeoTransform,
    pub bands: Vec<Band>,
}

fn tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

/// Decode a GeoTIFF file.
pub(crate) fn read(path: &Path) -> Result<GeoTiffParts> {
    let open_error = |reason: String| SampleError::RasterOpen {
        path: path.to_path_buf(),
        reason,
    };

    let file = File::open(path).map_err(|e| open_error(e.to_string()))?;
    let mut decoder = Decoder::new(BufReader::new(file)).map_err(|e| open_error(e.to_string()))?;

    // DEM tiles can be large: a 10812 x 10812 f32 tile is ~466 MB
    let mut limits = Limits::default();
    limits.decoding_buffer_size = 1024 * 1024 * 1024; // 1 GB
    limits.intermediate_buffer_size = 1024 * 1024 * 1024; // 1 GB
    limits.ifd_value_size = 1024 * 1024 * 1024;
    decoder = decoder.with_limits(limits);

    let (width, height) = decoder.dimensions().map_err(|e| open_error(e.to_string()))?;

    let geo_keys = read_geo_keys(&mut decoder);
    let spatial_ref = spatial_ref_from_geo_keys(&geo_keys).map_err(open_error)?;

    let pixel_is_point = geo_key(&geo_keys, GEO_KEY_RASTER_TYPE) == Some(RASTER_PIXEL_IS_POINT);
    let geo_transform = match read_geo_transform(&mut decoder, pixel_is_point) {
        Some(gt) => gt,
        None => {
            warn!(
                "{} has no georeferencing tags, using the identity geotransform",
                path.display()
            );
            GeoTransform::identity()
        }
    };

    let no_data = decoder
        .get_tag_ascii_string(tag(TAG_GDAL_NODATA))
        .ok()
        .and_then(|s| s.trim().trim_end_matches('\0').parse::<f64>().ok());

    let image = decoder.read_image().map_err(|e| open_error(e.to_string()))?;
    let (pixel_type, samples) = flatten(image);

    let pixels = width as usize * height as usize;
    let sample_count = samples.len() / pixel_type.size();
    if pixels == 0 || sample_count % pixels != 0 {
        return Err(open_error(format!(
            "{sample_count} samples do not fill a {width}x{height} image"
        )));
    }

    let band_count = sample_count / pixels;
    debug!(
        "Decoded {} {} sample(s) per pixel from {}",
        band_count,
        pixel_type,
        path.display()
    );

    let bands = deinterleave(&samples, pixel_type, band_count)
        .into_iter()
        .map(|data| Band::new(pixel_type, data).with_no_data(no_data))
        .collect();

    Ok(GeoTiffParts {
        width,
        height,
        spatial_ref,
        geo_transform,
        bands,
    })
}

/// Read the GeoKey directory as `(key, value)` pairs of inline SHORT values.
fn read_geo_keys<R: Read + Seek>(decoder: &mut Decoder<R>) -> Vec<(u16, u16)> {
    let Ok(directory) = decoder.get_tag_u16_vec(tag(TAG_GEO_KEY_DIRECTORY)) else {
        return Vec::new();
    };

    // Header: KeyDirectoryVersion, KeyRevision, MinorRevision, NumberOfKeys
    // Entries: KeyID, TIFFTagLocation, Count, Value_Offset
    if directory.len() < 4 {
        return Vec::new();
    }
    let num_keys = directory[3] as usize;

    directory[4..]
        .chunks_exact(4)
        .take(num_keys)
        .filter(|entry| entry[1] == 0)
        .map(|entry| (entry[0], entry[3]))
        .collect()
}

fn geo_key(keys: &[(u16, u16)], id: u16) -> Option<u16> {
    keys.iter().find(|(k, _)| *k == id).map(|(_, v)| *v)
}

fn spatial_ref_from_geo_keys(keys: &[(u16, u16)]) -> std::result::Result<SpatialReference, String> {
    let code = [GEO_KEY_PROJECTED_CRS, GEO_KEY_GEOGRAPHIC_TYPE]
        .into_iter()
        .filter_map(|id| geo_key(keys, id))
        .find(|code| *code > 0)
        .ok_or_else(|| "no readable projection (missing GeoKey directory)".to_string())?;

    if code == USER_DEFINED {
        return Err("no readable projection (user-defined CRS is not supported)".to_string());
    }

    SpatialReference::from_epsg(code).map_err(|e| format!("no readable projection: {e}"))
}

fn read_geo_transform<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    pixel_is_point: bool,
) -> Option<GeoTransform> {
    let mut coefficients = None;

    if let Ok(m) = decoder.get_tag_f64_vec(tag(TAG_MODEL_TRANSFORMATION)) {
        // 4x4 row-major matrix; only the 2D affine part is used
        if m.len() >= 16 {
            coefficients = Some([m[3], m[0], m[1], m[7], m[4], m[5]]);
        }
    }

    if coefficients.is_none() {
        let tiepoint = decoder.get_tag_f64_vec(tag(TAG_MODEL_TIEPOINT));
        let scale = decoder.get_tag_f64_vec(tag(TAG_MODEL_PIXEL_SCALE));
        if let (Ok(tp), Ok(scale)) = (tiepoint, scale) {
            // Tiepoint: [i, j, k, x, y, z] ties raster (i, j) to model (x, y)
            if tp.len() >= 6 && scale.len() >= 2 {
                let (sx, sy) = (scale[0], scale[1]);
                coefficients = Some([tp[3] - tp[0] * sx, sx, 0.0, tp[4] + tp[1] * sy, 0.0, -sy]);
            }
        }
    }

    let mut gt = coefficients?;
    if pixel_is_point {
        gt[0] -= 0.5 * gt[1] + 0.5 * gt[2];
        gt[3] -= 0.5 * gt[4] + 0.5 * gt[5];
    }
    Some(GeoTransform(gt))
}

/// Convert decoded samples to little-endian bytes.
fn flatten(result: DecodingResult) -> (PixelType, Vec<u8>) {
    match result {
        DecodingResult::U8(data) => (PixelType::Byte, data),
        DecodingResult::I8(data) => (PixelType::Int8, data.iter().flat_map(|v| v.to_le_bytes()).collect()),
        DecodingResult::U16(data) => (PixelType::UInt16, data.iter().flat_map(|v| v.to_le_bytes()).collect()),
        DecodingResult::I16(data) => (PixelType::Int16, data.iter().flat_map(|v| v.to_le_bytes()).collect()),
        DecodingResult::U32(data) => (PixelType::UInt32, data.iter().flat_map(|v| v.to_le_bytes()).collect()),
        DecodingResult::I32(data) => (PixelType::Int32, data.iter().flat_map(|v| v.to_le_bytes()).collect()),
        DecodingResult::U64(data) => (PixelType::UInt64, data.iter().flat_map(|v| v.to_le_bytes()).collect()),
        DecodingResult::I64(data) => (PixelType::Int64, data.iter().flat_map(|v| v.to_le_bytes()).collect()),
        DecodingResult::F32(data) => (PixelType::Float32, data.iter().flat_map(|v| v.to_le_bytes()).collect()),
        DecodingResult::F64(data) => (PixelType::Float64, data.iter().flat_map(|v| v.to_le_bytes()).collect()),
    }
}

/// Split chunky (pixel-interleaved) samples into one buffer per band.
fn deinterleave(samples: &[u8], pixel_type: PixelType, band_count: usize) -> Vec<Vec<u8>> {
    if band_count == 1 {
        return vec![samples.to_vec()];
    }

    let size = pixel_type.size();
    let per_band = samples.len() / band_count;
    let mut bands = vec![Vec::with_capacity(per_band); band_count];
    for (i, sample) in samples.chunks_exact(size).enumerate() {
        bands[i % band_count].extend_from_slice(sample);
    }
    bands
}
