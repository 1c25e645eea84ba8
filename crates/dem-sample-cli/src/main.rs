//! dem-sample: write the DEM elevation under every point of a GeoJSON layer.

use clap::Parser;
use std::process;

use dem_sample_cli::{init_logging, run, Cli};

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
