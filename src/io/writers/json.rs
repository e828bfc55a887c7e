use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::core::grid::GriddedResult;
use crate::error::Result;

#[derive(Serialize)]
struct Coords<'a> {
    lat: &'a [f64],
    lon: &'a [f64],
    #[serde(skip_serializing_if = "Option::is_none")]
    time: Option<Vec<String>>,
}

#[derive(Serialize)]
struct Variable<'a> {
    dims: &'a [&'static str],
    shape: Vec<usize>,
    /// Row-major values, NaN as null
    data: Vec<Option<f64>>,
}

#[derive(Serialize)]
struct Document<'a> {
    dims: &'a [&'static str],
    coords: Coords<'a>,
    data_vars: BTreeMap<&'a str, Variable<'a>>,
    attrs: &'a BTreeMap<String, String>,
}

/// Write a gridded result as a self-describing JSON document.
pub fn write_gridded_json(
    result: &GriddedResult,
    attrs: &BTreeMap<String, String>,
    path: &Path,
) -> Result<()> {
    let data_vars = result
        .data_vars
        .iter()
        .map(|(name, var)| {
            let data = var
                .iter()
                .map(|&v| if v.is_nan() { None } else { Some(v) })
                .collect();
            (
                name.as_str(),
                Variable {
                    dims: &result.dims,
                    shape: var.shape().to_vec(),
                    data,
                },
            )
        })
        .collect();

    let doc = Document {
        dims: &result.dims,
        coords: Coords {
            lat: &result.lat,
            lon: &result.lon,
            time: result
                .time
                .as_ref()
                .map(|t| t.iter().map(|d| d.format("%Y-%m-%d").to_string()).collect()),
        },
        data_vars,
        attrs,
    };

    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(writer, &doc)?;
    info!("Saved gridded result to {:?}", path);
    Ok(())
}
