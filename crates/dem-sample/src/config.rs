//! Sampling options, loadable from YAML.
//!
//! ```yaml
//! band: 1
//! decoding: native      # or int16, float32, ...
//! axis_order: authority # or swap
//! ```

use crate::decode::Decoding;
use crate::{Result, SampleError};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// How the two coordinates returned by a transformation map to `(x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum AxisOrderPolicy {
    /// Swap only if the raster's reference declares northing first.
    #[default]
    Authority,
    /// Always treat the first coordinate as y.
    Swap,
}

impl fmt::Display for AxisOrderPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisOrderPolicy::Authority => f.write_str("authority"),
            AxisOrderPolicy::Swap => f.write_str("swap"),
        }
    }
}

impl FromStr for AxisOrderPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "authority" => Ok(AxisOrderPolicy::Authority),
            "swap" => Ok(AxisOrderPolicy::Swap),
            _ => Err(format!("unknown axis order policy '{s}' (expected authority or swap)")),
        }
    }
}

impl TryFrom<String> for AxisOrderPolicy {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

/// Options controlling how points are sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SampleOptions {
    /// 1-based band number.
    pub band: usize,
    /// Pixel decoding rule.
    pub decoding: Decoding,
    /// Axis order handling after reprojection.
    pub axis_order: AxisOrderPolicy,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self {
            band: 1,
            decoding: Decoding::Native,
            axis_order: AxisOrderPolicy::Authority,
        }
    }
}

impl SampleOptions {
    /// Options with a fixed decoding.
    pub fn with_decoding(decoding: Decoding) -> Self {
        Self {
            decoding,
            ..Self::default()
        }
    }

    /// Parse options from YAML; missing fields take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let options: Self =
            serde_yaml::from_str(yaml).map_err(|e| SampleError::Config(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Load options from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| SampleError::Config(format!("{}: {e}", path.display())))?;
        Self::from_yaml_str(&yaml)
    }

    /// Check option ranges.
    pub fn validate(&self) -> Result<()> {
        if self.band == 0 {
            return Err(SampleError::Config("band numbers start at 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::PixelType;

    #[test]
    fn test_defaults() {
        let options = SampleOptions::default();
        assert_eq!(options.band, 1);
        assert_eq!(options.decoding, Decoding::Native);
        assert_eq!(options.axis_order, AxisOrderPolicy::Authority);
        assert_eq!(SampleOptions::from_yaml_str("{}").unwrap(), options);
    }

    #[test]
    fn test_from_yaml() {
        let options = SampleOptions::from_yaml_str(
            "band: 2\ndecoding: int16\naxis_order: swap\n",
        )
        .unwrap();
        assert_eq!(options.band, 2);
        assert_eq!(options.decoding, Decoding::Fixed(PixelType::Int16));
        assert_eq!(options.axis_order, AxisOrderPolicy::Swap);
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(
            SampleOptions::from_yaml_str("decoding: int12"),
            Err(SampleError::Config(_))
        ));
        assert!(matches!(
            SampleOptions::from_yaml_str("band: 0"),
            Err(SampleError::Config(_))
        ));
        assert!(matches!(
            SampleOptions::from_yaml_str("bands: 1"),
            Err(SampleError::Config(_))
        ));
    }

    #[test]
    fn test_axis_policy_parse() {
        assert_eq!("Swap".parse::<AxisOrderPolicy>().unwrap(), AxisOrderPolicy::Swap);
        assert!("sideways".parse::<AxisOrderPolicy>().is_err());
    }
}
