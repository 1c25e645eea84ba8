//! Spatial references and coordinate transformation.
//!
//! Definitions come from the `crs-definitions` EPSG database or from PROJ.4
//! strings; the math is done by `proj4rs` (pure Rust).

use crate::{Result, SampleError};
use proj4rs::proj::Proj;
use std::fmt;

/// EPSG code of WGS 84 / Pseudo-Mercator.
pub const EPSG_WEB_MERCATOR: u16 = 3857;

/// EPSG code of WGS 84 geographic coordinates.
pub const EPSG_WGS84: u16 = 4326;

const WEB_MERCATOR_PROJ4: &str = "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +nadgrids=@null +no_defs";

/// Order of the two horizontal axes a spatial reference declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisOrder {
    /// Easting (or longitude) first.
    EastNorth,
    /// Northing (or latitude) first, as EPSG geographic systems declare.
    NorthEast,
}

/// A coordinate reference system definition.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialReference {
    name: String,
    epsg: Option<u16>,
    proj4: String,
    axis_order: AxisOrder,
}

impl SpatialReference {
    /// Look up an EPSG code in the bundled definition database.
    pub fn from_epsg(code: u16) -> Result<Self> {
        let def = crs_definitions::from_code(code)
            .ok_or_else(|| SampleError::UnknownCrs(format!("EPSG:{code}")))?;
        let proj4 = normalize_proj4(def.proj4);
        let axis_order = if is_geographic(&proj4) {
            AxisOrder::NorthEast
        } else {
            AxisOrder::EastNorth
        };

        Ok(Self {
            name: format!("EPSG:{code}"),
            epsg: Some(code),
            proj4,
            axis_order,
        })
    }

    /// Build a reference from a PROJ.4 string.
    ///
    /// PROJ.4 definitions carry no authority, so the axis order is always
    /// easting first.
    pub fn from_proj4(definition: &str) -> Result<Self> {
        let proj4 = normalize_proj4(definition);
        if !proj4.starts_with("+proj=") {
            return Err(SampleError::UnknownCrs(definition.to_string()));
        }
        Proj::from_proj_string(&proj4)
            .map_err(|e| SampleError::UnknownCrs(format!("{definition}: {e:?}")))?;

        Ok(Self {
            name: proj4.clone(),
            epsg: None,
            proj4,
            axis_order: AxisOrder::EastNorth,
        })
    }

    /// Parse a user supplied definition.
    ///
    /// Accepts `EPSG:<code>`, `urn:ogc:def:crs:EPSG:[version]:<code>`,
    /// `CRS84` / `urn:ogc:def:crs:OGC:1.3:CRS84` and `+proj=` strings.
    pub fn from_user_input(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.starts_with("+proj=") {
            return Self::from_proj4(input);
        }

        let upper = input.to_ascii_uppercase();
        if upper == "CRS84" || upper.ends_with(":CRS84") {
            return Ok(Self::crs84());
        }

        let code = if let Some(code) = upper.strip_prefix("EPSG:") {
            Some(code)
        } else if let Some(rest) = upper.strip_prefix("URN:OGC:DEF:CRS:EPSG:") {
            rest.rsplit(':').next()
        } else {
            None
        };

        code.and_then(|c| c.trim().parse::<u16>().ok())
            .ok_or_else(|| SampleError::UnknownCrs(input.to_string()))
            .and_then(Self::from_epsg)
    }

    /// WGS 84 / Pseudo-Mercator (EPSG:3857).
    pub fn web_mercator() -> Self {
        let proj4 = crs_definitions::from_code(EPSG_WEB_MERCATOR)
            .map(|def| normalize_proj4(def.proj4))
            .unwrap_or_else(|| WEB_MERCATOR_PROJ4.to_string());

        Self {
            name: format!("EPSG:{EPSG_WEB_MERCATOR}"),
            epsg: Some(EPSG_WEB_MERCATOR),
            proj4,
            axis_order: AxisOrder::EastNorth,
        }
    }

    /// WGS 84 geographic coordinates in longitude, latitude order.
    pub fn crs84() -> Self {
        Self {
            name: "OGC:CRS84".to_string(),
            epsg: None,
            proj4: "+proj=longlat +datum=WGS84 +no_defs".to_string(),
            axis_order: AxisOrder::EastNorth,
        }
    }

    /// Human readable identifier.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// EPSG code, if the reference came from the EPSG registry.
    pub fn epsg(&self) -> Option<u16> {
        self.epsg
    }

    /// PROJ.4 definition.
    pub fn proj4(&self) -> &str {
        &self.proj4
    }

    /// Declared axis order.
    pub fn axis_order(&self) -> AxisOrder {
        self.axis_order
    }

    /// Whether coordinates are angular (degrees).
    pub fn is_geographic(&self) -> bool {
        is_geographic(&self.proj4)
    }

    /// Whether both references describe the same coordinate space.
    ///
    /// Axis order is ignored: it only affects how tuples are ordered.
    pub fn same_definition(&self, other: &SpatialReference) -> bool {
        match (self.epsg, other.epsg) {
            (Some(a), Some(b)) if a == b => true,
            _ => self.proj4 == other.proj4,
        }
    }
}

impl fmt::Display for SpatialReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.proj4)
    }
}

fn normalize_proj4(definition: &str) -> String {
    definition.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_geographic(proj4: &str) -> bool {
    proj4.contains("+proj=longlat") || proj4.contains("+proj=latlong")
}

/// A reusable transformation from one spatial reference to another.
pub struct CoordinateTransformation {
    source: SpatialReference,
    target: SpatialReference,
    /// `None` when source and target share a definition.
    projs: Option<(Proj, Proj)>,
}

impl fmt::Debug for CoordinateTransformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoordinateTransformation")
            .field("source", &self.source.name)
            .field("target", &self.target.name)
            .field("noop", &self.projs.is_none())
            .finish()
    }
}

impl CoordinateTransformation {
    /// Build a transformation from `source` to `target`.
    pub fn new(source: &SpatialReference, target: &SpatialReference) -> Result<Self> {
        let projs = if source.same_definition(target) {
            None
        } else {
            let src = Proj::from_proj_string(source.proj4())
                .map_err(|e| SampleError::UnknownCrs(format!("{}: {e:?}", source.name())))?;
            let dst = Proj::from_proj_string(target.proj4())
                .map_err(|e| SampleError::UnknownCrs(format!("{}: {e:?}", target.name())))?;
            Some((src, dst))
        };

        Ok(Self {
            source: source.clone(),
            target: target.clone(),
            projs,
        })
    }

    /// Source reference.
    pub fn source(&self) -> &SpatialReference {
        &self.source
    }

    /// Target reference.
    pub fn target(&self) -> &SpatialReference {
        &self.target
    }

    /// Whether points pass through unchanged.
    pub fn is_noop(&self) -> bool {
        self.projs.is_none()
    }

    /// Transform a point.
    ///
    /// The input is in easting/longitude-first order. The output follows the
    /// target's declared [`AxisOrder`], so an EPSG geographic target yields
    /// `(latitude, longitude)`.
    pub fn transform_point(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let (east, north) = match &self.projs {
            None => (x, y),
            Some((src, dst)) => {
                let mut point = if self.source.is_geographic() {
                    (x.to_radians(), y.to_radians(), 0.0)
                } else {
                    (x, y, 0.0)
                };

                proj4rs::transform::transform(src, dst, &mut point).map_err(|e| {
                    SampleError::Reprojection {
                        x,
                        y,
                        reason: format!("{e:?}"),
                    }
                })?;

                if self.target.is_geographic() {
                    (point.0.to_degrees(), point.1.to_degrees())
                } else {
                    (point.0, point.1)
                }
            }
        };

        if !east.is_finite() || !north.is_finite() {
            return Err(SampleError::Reprojection {
                x,
                y,
                reason: "result is not finite".to_string(),
            });
        }

        Ok(match self.target.axis_order() {
            AxisOrder::EastNorth => (east, north),
            AxisOrder::NorthEast => (north, east),
        })
    }
}
