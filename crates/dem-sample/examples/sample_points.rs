//! Example: Sample a DEM at Web Mercator points.
//!
//! Usage: cargo run --example sample_points -- <dem.tif> <x> <y> [<x> <y> ...]

use dem_sample::{sample_from_points_list, IndexedPoint, Raster};
use std::env;
use std::time::Instant;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 4 || (args.len() - 2) % 2 != 0 {
        eprintln!("Usage: {} <dem.tif> <x> <y> [<x> <y> ...]", args[0]);
        eprintln!("Example: {} dem.tif -13617947.0 6041627.0", args[0]);
        std::process::exit(1);
    }

    let dem_path = &args[1];
    let points: Vec<IndexedPoint> = args[2..]
        .chunks(2)
        .enumerate()
        .map(|(index, pair)| {
            let x: f64 = pair[0].parse().expect("Invalid x");
            let y: f64 = pair[1].parse().expect("Invalid y");
            IndexedPoint::new(index, x, y)
        })
        .collect();

    let start = Instant::now();
    let raster = Raster::open(dem_path).expect("Failed to open DEM");
    let (width, height) = raster.dimensions();
    println!(
        "Opened {} ({}x{}, {}) in {:.3}s",
        dem_path,
        width,
        height,
        raster.spatial_ref(),
        start.elapsed().as_secs_f64()
    );

    let start = Instant::now();
    match sample_from_points_list(dem_path, &points) {
        Ok(rows) => {
            for row in &rows {
                println!("#{} ({:.2}, {:.2}): {}", row.index, row.x, row.y, row.elevation);
            }
            println!("Sampled {} point(s) in {:.3}s", rows.len(), start.elapsed().as_secs_f64());
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
