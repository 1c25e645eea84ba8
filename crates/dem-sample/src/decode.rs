//! Pixel encodings and the decoders that turn raw pixel bytes into elevations.

use crate::{Result, SampleError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Pixel encoding of a raster band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelType {
    /// Unsigned 8-bit integer.
    Byte,
    /// Signed 8-bit integer.
    Int8,
    /// Unsigned 16-bit integer.
    UInt16,
    /// Signed 16-bit integer.
    Int16,
    /// Unsigned 32-bit integer.
    UInt32,
    /// Signed 32-bit integer.
    Int32,
    /// Unsigned 64-bit integer.
    UInt64,
    /// Signed 64-bit integer.
    Int64,
    /// IEEE 754 single precision.
    Float32,
    /// IEEE 754 double precision.
    Float64,
}

impl PixelType {
    /// All supported pixel types.
    pub const ALL: [PixelType; 10] = [
        PixelType::Byte,
        PixelType::Int8,
        PixelType::UInt16,
        PixelType::Int16,
        PixelType::UInt32,
        PixelType::Int32,
        PixelType::UInt64,
        PixelType::Int64,
        PixelType::Float32,
        PixelType::Float64,
    ];

    /// Size of one sample in bytes.
    pub fn size(&self) -> usize {
        match self {
            PixelType::Byte | PixelType::Int8 => 1,
            PixelType::UInt16 | PixelType::Int16 => 2,
            PixelType::UInt32 | PixelType::Int32 | PixelType::Float32 => 4,
            PixelType::UInt64 | PixelType::Int64 | PixelType::Float64 => 8,
        }
    }

    /// GDAL-style type name.
    pub fn name(&self) -> &'static str {
        match self {
            PixelType::Byte => "Byte",
            PixelType::Int8 => "Int8",
            PixelType::UInt16 => "UInt16",
            PixelType::Int16 => "Int16",
            PixelType::UInt32 => "UInt32",
            PixelType::Int32 => "Int32",
            PixelType::UInt64 => "UInt64",
            PixelType::Int64 => "Int64",
            PixelType::Float32 => "Float32",
            PixelType::Float64 => "Float64",
        }
    }
}

impl fmt::Display for PixelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PixelType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let ty = match lower.as_str() {
            "byte" | "uint8" | "u8" => PixelType::Byte,
            "int8" | "i8" => PixelType::Int8,
            "uint16" | "u16" => PixelType::UInt16,
            "int16" | "i16" => PixelType::Int16,
            "uint32" | "u32" => PixelType::UInt32,
            "int32" | "i32" => PixelType::Int32,
            "uint64" | "u64" => PixelType::UInt64,
            "int64" | "i64" => PixelType::Int64,
            "float32" | "f32" => PixelType::Float32,
            "float64" | "f64" => PixelType::Float64,
            _ => return Err(format!("unknown pixel type '{s}'")),
        };
        Ok(ty)
    }
}

/// A decoded pixel value.
///
/// Integer encodings stay integral so they print without a fractional part.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Elevation {
    /// Value from an integer encoding.
    Int(i64),
    /// Value from a floating point encoding (or a u64 beyond `i64::MAX`).
    Float(f64),
}

impl Elevation {
    /// The value as a float.
    pub fn as_f64(&self) -> f64 {
        match *self {
            Elevation::Int(v) => v as f64,
            Elevation::Float(v) => v,
        }
    }
}

impl fmt::Display for Elevation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Elevation::Int(v) => write!(f, "{v}"),
            Elevation::Float(v) => write!(f, "{v:?}"),
        }
    }
}

/// How raw pixel bytes are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum Decoding {
    /// Use the band's declared pixel type.
    #[default]
    Native,
    /// Always decode as this type, whatever the band declares.
    Fixed(PixelType),
}

impl Decoding {
    /// Pick the pixel type to decode a band of `declared` type with.
    pub fn resolve(&self, declared: PixelType) -> PixelType {
        match *self {
            Decoding::Native => declared,
            Decoding::Fixed(ty) => ty,
        }
    }
}

impl fmt::Display for Decoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decoding::Native => f.write_str("native"),
            Decoding::Fixed(ty) => write!(f, "{}", ty.name().to_ascii_lowercase()),
        }
    }
}

impl FromStr for Decoding {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("native") {
            Ok(Decoding::Native)
        } else {
            s.parse().map(Decoding::Fixed)
        }
    }
}

impl TryFrom<String> for Decoding {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

/// Function turning the raw bytes of one pixel into a value.
pub type DecodeFn = fn(&[u8]) -> Option<Elevation>;

/// Decoders keyed by pixel type.
#[derive(Clone)]
pub struct DecoderRegistry {
    decoders: HashMap<PixelType, DecodeFn>,
}

impl fmt::Debug for DecoderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.decoders.keys()).finish()
    }
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(PixelType::Byte, |b| Some(Elevation::Int(i64::from(*b.first()?))));
        registry.register(PixelType::Int8, |b| {
            Some(Elevation::Int(i64::from(i8::from_le_bytes(b.try_into().ok()?))))
        });
        registry.register(PixelType::UInt16, |b| {
            Some(Elevation::Int(i64::from(u16::from_le_bytes(b.try_into().ok()?))))
        });
        registry.register(PixelType::Int16, |b| {
            Some(Elevation::Int(i64::from(i16::from_le_bytes(b.try_into().ok()?))))
        });
        registry.register(PixelType::UInt32, |b| {
            Some(Elevation::Int(i64::from(u32::from_le_bytes(b.try_into().ok()?))))
        });
        registry.register(PixelType::Int32, |b| {
            Some(Elevation::Int(i64::from(i32::from_le_bytes(b.try_into().ok()?))))
        });
        registry.register(PixelType::UInt64, |b| {
            let v = u64::from_le_bytes(b.try_into().ok()?);
            Some(i64::try_from(v).map_or(Elevation::Float(v as f64), Elevation::Int))
        });
        registry.register(PixelType::Int64, |b| {
            Some(Elevation::Int(i64::from_le_bytes(b.try_into().ok()?)))
        });
        registry.register(PixelType::Float32, |b| {
            Some(Elevation::Float(f64::from(f32::from_le_bytes(b.try_into().ok()?))))
        });
        registry.register(PixelType::Float64, |b| {
            Some(Elevation::Float(f64::from_le_bytes(b.try_into().ok()?)))
        });
        registry
    }
}

impl DecoderRegistry {
    /// A registry with no decoders.
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Register (or replace) the decoder for a pixel type.
    pub fn register(&mut self, pixel_type: PixelType, decoder: DecodeFn) {
        self.decoders.insert(pixel_type, decoder);
    }

    /// Whether a decoder exists for `pixel_type`.
    pub fn supports(&self, pixel_type: PixelType) -> bool {
        self.decoders.contains_key(&pixel_type)
    }

    /// Decode the bytes of one pixel as `pixel_type`.
    ///
    /// The byte count must match the type exactly.
    pub fn decode(&self, pixel_type: PixelType, bytes: &[u8]) -> Result<Elevation> {
        let mismatch = || SampleError::PixelDecode {
            pixel_type: pixel_type.name(),
            len: bytes.len(),
        };

        if bytes.len() != pixel_type.size() {
            return Err(mismatch());
        }

        let decoder = self.decoders.get(&pixel_type).ok_or_else(mismatch)?;
        decoder(bytes).ok_or_else(mismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int16_little_endian() {
        let registry = DecoderRegistry::default();
        assert_eq!(registry.decode(PixelType::Int16, &[0x01, 0x00]).unwrap(), Elevation::Int(1));
        assert_eq!(
            registry.decode(PixelType::Int16, &350i16.to_le_bytes()).unwrap(),
            Elevation::Int(350)
        );
        assert_eq!(registry.decode(PixelType::Int16, &[0xFF, 0xFF]).unwrap(), Elevation::Int(-1));
    }

    #[test]
    fn test_float32() {
        let registry = DecoderRegistry::default();
        assert_eq!(
            registry.decode(PixelType::Float32, &[0x00, 0x00, 0x80, 0x3F]).unwrap(),
            Elevation::Float(1.0)
        );
        assert_eq!(
            registry.decode(PixelType::Float32, &1234.5f32.to_le_bytes()).unwrap(),
            Elevation::Float(1234.5)
        );
    }

    #[test]
    fn test_size_mismatch() {
        let registry = DecoderRegistry::default();
        let err = registry.decode(PixelType::Int16, &1.0f32.to_le_bytes()).unwrap_err();
        assert!(matches!(err, SampleError::PixelDecode { pixel_type: "Int16", len: 4 }));
    }

    #[test]
    fn test_every_type_registered() {
        let registry = DecoderRegistry::default();
        for ty in PixelType::ALL {
            assert!(registry.supports(ty), "{ty} has no decoder");
            let zeros = vec![0u8; ty.size()];
            assert_eq!(registry.decode(ty, &zeros).unwrap().as_f64(), 0.0);
        }
    }

    #[test]
    fn test_custom_decoder() {
        let mut registry = DecoderRegistry::empty();
        assert!(registry.decode(PixelType::UInt16, &[0, 0]).is_err());

        // Decimetre-encoded DEM
        registry.register(PixelType::UInt16, |b| {
            Some(Elevation::Float(f64::from(u16::from_le_bytes(b.try_into().ok()?)) / 10.0))
        });
        assert_eq!(
            registry.decode(PixelType::UInt16, &1234u16.to_le_bytes()).unwrap(),
            Elevation::Float(123.4)
        );
    }

    #[test]
    fn test_decoding_parse() {
        assert_eq!("native".parse::<Decoding>().unwrap(), Decoding::Native);
        assert_eq!("int16".parse::<Decoding>().unwrap(), Decoding::Fixed(PixelType::Int16));
        assert_eq!("Float32".parse::<Decoding>().unwrap(), Decoding::Fixed(PixelType::Float32));
        assert!("int12".parse::<Decoding>().is_err());
        assert_eq!(Decoding::Fixed(PixelType::Float32).to_string(), "float32");
    }

    #[test]
    fn test_elevation_display() {
        assert_eq!(Elevation::Int(350).to_string(), "350");
        assert_eq!(Elevation::Float(1.0).to_string(), "1.0");
        assert_eq!(Elevation::Float(-12.25).to_string(), "-12.25");
    }
}
