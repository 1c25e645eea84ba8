//! Point sources: GeoJSON point layers and in-memory Web Mercator lists.

use crate::crs::SpatialReference;
use crate::{Result, SampleError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt;
use std::path::Path;
use tracing::info;

/// A point given as `(index, x, y)` in EPSG:3857.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexedPoint {
    /// Caller-assigned identifier, carried through to the output.
    pub index: usize,
    /// Easting in metres.
    pub x: f64,
    /// Northing in metres.
    pub y: f64,
}

impl IndexedPoint {
    /// Create a point.
    pub fn new(index: usize, x: f64, y: f64) -> Self {
        Self { index, x, y }
    }
}

impl From<(usize, f64, f64)> for IndexedPoint {
    fn from((index, x, y): (usize, f64, f64)) -> Self {
        Self { index, x, y }
    }
}

/// GeoJSON feature identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureId {
    /// Numeric id, integral or not.
    Number(Number),
    /// String id.
    String(String),
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureId::Number(n) => write!(f, "{n}"),
            FeatureId::String(s) => f.write_str(s),
        }
    }
}

/// A point feature with its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct PointFeature {
    /// Feature id, if the source had one.
    pub fid: Option<FeatureId>,
    /// First coordinate (easting or longitude).
    pub x: f64,
    /// Second coordinate (northing or latitude).
    pub y: f64,
    /// Attributes in source order.
    pub properties: Map<String, Value>,
}

/// An ordered set of points sharing one spatial reference.
#[derive(Debug, Clone)]
pub struct PointLayer {
    spatial_ref: SpatialReference,
    features: Vec<PointFeature>,
}

impl PointLayer {
    /// Build a layer from parts.
    pub fn new(spatial_ref: SpatialReference, features: Vec<PointFeature>) -> Self {
        Self {
            spatial_ref,
            features,
        }
    }

    /// Tag a list of indexed points as EPSG:3857.
    ///
    /// Coordinates are not checked; the caller guarantees they are Web
    /// Mercator metres.
    pub fn web_mercator(points: &[IndexedPoint]) -> Self {
        let features = points
            .iter()
            .map(|p| PointFeature {
                fid: Some(FeatureId::Number(Number::from(p.index))),
                x: p.x,
                y: p.y,
                properties: Map::new(),
            })
            .collect();
        Self::new(SpatialReference::web_mercator(), features)
    }

    /// Read a GeoJSON `FeatureCollection` of points.
    ///
    /// The layer's spatial reference comes from the collection's `crs`
    /// member; a collection without one is rejected with
    /// [`SampleError::MissingCrs`].
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| SampleError::VectorOpen {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let layer = Self::from_geojson_str(&text, path)?;
        info!(
            "Opened point layer {} ({} feature(s), {})",
            path.display(),
            layer.len(),
            layer.spatial_ref.name()
        );
        Ok(layer)
    }

    /// Parse GeoJSON text; `path` is only used in error messages.
    pub fn from_geojson_str(text: &str, path: &Path) -> Result<Self> {
        let vector_error = |reason: String| SampleError::VectorOpen {
            path: path.to_path_buf(),
            reason,
        };

        let collection: FeatureCollection =
            serde_json::from_str(text).map_err(|e| vector_error(e.to_string()))?;
        if collection.kind != "FeatureCollection" {
            return Err(vector_error(format!(
                "expected a FeatureCollection, found {}",
                collection.kind
            )));
        }

        let crs = collection.crs.ok_or_else(|| SampleError::MissingCrs {
            path: path.to_path_buf(),
        })?;
        let spatial_ref = crs.resolve()?;

        let features = collection
            .features
            .into_iter()
            .enumerate()
            .map(|(i, feature)| feature.into_point(i).map_err(&vector_error))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::new(spatial_ref, features))
    }

    /// Spatial reference of all points.
    pub fn spatial_ref(&self) -> &SpatialReference {
        &self.spatial_ref
    }

    /// Features in source order.
    pub fn features(&self) -> &[PointFeature] {
        &self.features
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the layer has no points.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

// ============================================================================
// GeoJSON schema
// ============================================================================

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(rename = "type")]
    kind: String,
    crs: Option<NamedCrs>,
    #[serde(default)]
    features: Vec<Feature>,
}

/// Legacy (GeoJSON 2008) `crs` member.
#[derive(Debug, Deserialize)]
struct NamedCrs {
    #[serde(rename = "type")]
    kind: String,
    properties: CrsProperties,
}

#[derive(Debug, Deserialize)]
struct CrsProperties {
    name: Option<String>,
    code: Option<u16>,
}

impl NamedCrs {
    fn resolve(&self) -> Result<SpatialReference> {
        match (self.kind.as_str(), &self.properties) {
            ("name", CrsProperties { name: Some(name), .. }) => {
                SpatialReference::from_user_input(name)
            }
            ("EPSG", CrsProperties { code: Some(code), .. }) => SpatialReference::from_epsg(*code),
            _ => Err(SampleError::UnknownCrs(format!("crs member of type '{}'", self.kind))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Feature {
    id: Option<FeatureId>,
    geometry: Option<Geometry>,
    properties: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: Value,
}

impl Feature {
    fn into_point(self, position: usize) -> std::result::Result<PointFeature, String> {
        let geometry = self
            .geometry
            .ok_or_else(|| format!("feature {position} has no geometry"))?;
        if geometry.kind != "Point" {
            return Err(format!("feature {position} is a {}, not a Point", geometry.kind));
        }
        let ordinates = geometry.coordinates.as_array().map(Vec::as_slice).unwrap_or_default();
        let (x, y) = match ordinates {
            [x, y, ..] => match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => (x, y),
                _ => return Err(format!("feature {position} has non-numeric coordinates")),
            },
            _ => return Err(format!("feature {position} has fewer than two coordinates")),
        };

        Ok(PointFeature {
            fid: self.id,
            x,
            y,
            properties: self.properties.unwrap_or_default(),
        })
    }
}
