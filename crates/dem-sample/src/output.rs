//! CSV output of sampled rows.

use crate::sampler::{IndexedSample, PointSample, SampledFeature};
use crate::{Result, SampleError};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tracing::info;

/// Header of the elevation CSV.
pub const ELEVATION_HEADER: [&str; 3] = ["x", "y", "elevation"];

/// Header of the indexed CSV.
pub const INDEXED_HEADER: [&str; 4] = ["index", "x", "y", "elevation"];

/// Write `x,y,elevation` rows, overwriting `path`.
pub fn write_elevation_csv<P: AsRef<Path>>(path: P, rows: &[PointSample]) -> Result<()> {
    write_serialized(path.as_ref(), &ELEVATION_HEADER, rows)
}

/// Write `index,x,y,elevation` rows, overwriting `path`.
pub fn write_indexed_csv<P: AsRef<Path>>(path: P, rows: &[IndexedSample]) -> Result<()> {
    write_serialized(path.as_ref(), &INDEXED_HEADER, rows)
}

/// Write rows with their feature id and attributes, overwriting `path`.
///
/// Columns are `fid,x,y,elevation` followed by every attribute name in the
/// order it is first seen. Missing attributes are left empty; strings are
/// written as-is and other values as JSON.
pub fn write_feature_csv<P: AsRef<Path>>(path: P, rows: &[SampledFeature]) -> Result<()> {
    let path = path.as_ref();

    let mut attributes: Vec<&str> = Vec::new();
    for row in rows {
        for key in row.properties.keys() {
            if !attributes.contains(&key.as_str()) {
                attributes.push(key);
            }
        }
    }

    write_with(path, |writer| {
        let header = ["fid", "x", "y", "elevation"]
            .into_iter()
            .chain(attributes.iter().copied());
        writer.write_record(header)?;

        for row in rows {
            let mut record = vec![
                row.fid.as_ref().map(ToString::to_string).unwrap_or_default(),
                format_number(row.x),
                format_number(row.y),
                row.elevation.to_string(),
            ];
            record.extend(attributes.iter().map(|key| match row.properties.get(*key) {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            }));
            writer.write_record(&record)?;
        }
        Ok(rows.len())
    })
}

fn write_serialized<R: Serialize>(path: &Path, header: &[&str], rows: &[R]) -> Result<()> {
    write_with(path, |writer| {
        writer.write_record(header)?;
        for row in rows {
            writer.serialize(row)?;
        }
        Ok(rows.len())
    })
}

fn write_with<F>(path: &Path, write_rows: F) -> Result<()>
where
    F: FnOnce(&mut csv::Writer<std::fs::File>) -> std::result::Result<usize, csv::Error>,
{
    let write_error = |source: csv::Error| SampleError::FileWrite {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(write_error)?;
    let count = write_rows(&mut writer).map_err(write_error)?;
    writer.flush().map_err(|e| write_error(e.into()))?;

    info!("Wrote {} row(s) to {}", count, path.display());
    Ok(())
}

/// Format a float the way the `csv` serializer does (`1.0`, `2.5`).
fn format_number(value: f64) -> String {
    format!("{value:?}")
}
