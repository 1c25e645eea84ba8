//! Command-line front end for `dem-sample`.
//!
//! Samples a DEM at the points of a GeoJSON layer and writes a CSV.

use clap::{ArgAction, Parser};
use dem_sample::{
    sample_features, write_elevation_csv, write_feature_csv, AxisOrderPolicy, Decoding, PixelType,
    PointSample, SampleOptions,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Sample a DEM raster at GeoJSON points and write `x,y,elevation` rows.
#[derive(Parser, Debug)]
#[command(name = "dem-sample", version, about)]
pub struct Cli {
    /// DEM raster (GeoTIFF)
    pub inraster: PathBuf,

    /// Point layer (GeoJSON FeatureCollection with a `crs` member)
    pub inpoints: PathBuf,

    /// Output CSV, overwritten if it exists
    pub outfile: PathBuf,

    /// Pixel decoding: native, or a fixed type such as int16 or float32 [default: float32]
    #[arg(long)]
    pub decoding: Option<Decoding>,

    /// Axis order after reprojection: authority or swap [default: authority]
    #[arg(long)]
    pub axis_order: Option<AxisOrderPolicy>,

    /// 1-based band number [default: 1]
    #[arg(long)]
    pub band: Option<usize>,

    /// YAML file with sampling options; flags take precedence
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Also write feature ids and attributes
    #[arg(long)]
    pub with_attributes: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Options from the config file (if any) with flags applied on top.
    pub fn sample_options(&self) -> dem_sample::Result<SampleOptions> {
        let mut options = match &self.config {
            Some(path) => SampleOptions::from_file(path)?,
            None => SampleOptions::with_decoding(Decoding::Fixed(PixelType::Float32)),
        };

        if let Some(decoding) = self.decoding {
            options.decoding = decoding;
        }
        if let Some(axis_order) = self.axis_order {
            options.axis_order = axis_order;
        }
        if let Some(band) = self.band {
            options.band = band;
        }

        options.validate()?;
        Ok(options)
    }
}

/// Install a `fmt` subscriber on stderr. `RUST_LOG` overrides the verbosity.
pub fn init_logging(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Sample and write the output file. Returns the number of rows written.
pub fn run(cli: &Cli) -> dem_sample::Result<usize> {
    let options = cli.sample_options()?;
    let rows = sample_features(&cli.inraster, &cli.inpoints, &options)?;
    let count = rows.len();

    if cli.with_attributes {
        write_feature_csv(&cli.outfile, &rows)?;
    } else {
        let rows: Vec<PointSample> = rows
            .into_iter()
            .map(|row| PointSample {
                x: row.x,
                y: row.y,
                elevation: row.elevation,
            })
            .collect();
        write_elevation_csv(&cli.outfile, &rows)?;
    }

    info!("Sampled {} point(s) into {}", count, cli.outfile.display());
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dem_sample::SampleError;

    fn parse(args: &[&str]) -> Cli {
        let argv = ["dem-sample", "dem.tif", "points.geojson", "out.csv"]
            .iter()
            .chain(args.iter());
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_positional_arguments() {
        let cli = parse(&[]);
        assert_eq!(cli.inraster, PathBuf::from("dem.tif"));
        assert_eq!(cli.inpoints, PathBuf::from("points.geojson"));
        assert_eq!(cli.outfile, PathBuf::from("out.csv"));
        assert!(!cli.with_attributes);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_missing_positional() {
        assert!(Cli::try_parse_from(["dem-sample", "dem.tif", "points.geojson"]).is_err());
    }

    #[test]
    fn test_default_options_read_float32() {
        let options = parse(&[]).sample_options().unwrap();
        assert_eq!(options.decoding, Decoding::Fixed(PixelType::Float32));
        assert_eq!(options.axis_order, AxisOrderPolicy::Authority);
        assert_eq!(options.band, 1);
    }

    #[test]
    fn test_flags_override() {
        let cli = parse(&["--decoding", "native", "--axis-order", "swap", "--band", "2", "-vv"]);
        assert_eq!(cli.verbose, 2);

        let options = cli.sample_options().unwrap();
        assert_eq!(options.decoding, Decoding::Native);
        assert_eq!(options.axis_order, AxisOrderPolicy::Swap);
        assert_eq!(options.band, 2);
    }

    #[test]
    fn test_invalid_flag_values() {
        let argv = ["dem-sample", "a", "b", "c", "--decoding", "int12"];
        assert!(Cli::try_parse_from(argv).is_err());
        let argv = ["dem-sample", "a", "b", "c", "--axis-order", "sideways"];
        assert!(Cli::try_parse_from(argv).is_err());

        let cli = parse(&["--band", "0"]);
        assert!(matches!(cli.sample_options(), Err(SampleError::Config(_))));
    }

    #[test]
    fn test_config_file_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("sample.yaml");
        std::fs::write(&config, "band: 3\ndecoding: int16\n").unwrap();
        let config = config.to_string_lossy().into_owned();

        let options = parse(&["--config", config.as_str()]).sample_options().unwrap();
        assert_eq!(options.band, 3);
        assert_eq!(options.decoding, Decoding::Fixed(PixelType::Int16));

        let options = parse(&["--config", config.as_str(), "--band", "1"]).sample_options().unwrap();
        assert_eq!(options.band, 1);
        assert_eq!(options.decoding, Decoding::Fixed(PixelType::Int16));
    }

    #[test]
    fn test_missing_config_file() {
        let cli = parse(&["--config", "/nonexistent/sample.yaml"]);
        assert!(matches!(cli.sample_options(), Err(SampleError::Config(_))));
    }

    #[test]
    fn test_run_missing_raster() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.csv");
        let out_arg = out.to_string_lossy().into_owned();
        let cli = Cli::try_parse_from([
            "dem-sample",
            "/nonexistent/dem.tif",
            "/nonexistent/points.geojson",
            out_arg.as_str(),
        ])
        .unwrap();

        assert!(matches!(run(&cli), Err(SampleError::RasterOpen { .. })));
        assert!(!out.exists());
    }
}
