use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{
    Array, AsArray, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array,
    LargeListArray, ListArray, StringArray,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Eem, EemDataset, MetadataValue};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load an EEM dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – Parquet file with `emission`, `excitation` and `intensity`
///   list columns (recommended)
/// * `.json`    – `[{ "emission": [...], "excitation": [...],
///   "intensity": [...], ...meta }, ...]`
///
/// The `intensity` list is the row-major flattened grid, one value per
/// (emission, excitation) pair.
pub fn load_dataset(path: &Path) -> Result<EemDataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let dataset = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        other => bail!("Unsupported file extension: .{other}"),
    }?;
    log::info!(
        "loaded {} EEMs with {} metadata columns from {}",
        dataset.len(),
        dataset.column_names.len(),
        path.display()
    );
    Ok(dataset)
}

const GRID_COLUMNS: [&str; 3] = ["emission", "excitation", "intensity"];

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented):
///
/// ```json
/// [
///   {
///     "emission":   [300.0, 302.0, ...],
///     "excitation": [240.0, 245.0, ...],
///     "intensity":  [0.12, 0.14, ...],
///     "sample": "A",
///     "dilution": 1.5
///   },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<EemDataset> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut eems = Vec::with_capacity(records.len());

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        let emission = json_array_to_f64(obj.get("emission"), i, "emission")?;
        let excitation = json_array_to_f64(obj.get("excitation"), i, "excitation")?;
        let intensity = json_array_to_f64(obj.get("intensity"), i, "intensity")?;

        let mut metadata = BTreeMap::new();
        for (key, val) in obj {
            if GRID_COLUMNS.contains(&key.as_str()) {
                continue;
            }
            metadata.insert(key.clone(), json_to_metadata(val));
        }

        let eem = Eem::new(emission, excitation, intensity, metadata)
            .with_context(|| format!("Row {i}: invalid EEM grid"))?;
        eems.push(eem);
    }

    Ok(EemDataset::from_eems(eems))
}

fn json_array_to_f64(val: Option<&JsonValue>, row: usize, col: &str) -> Result<Vec<f64>> {
    let arr = val
        .and_then(|v| v.as_array())
        .with_context(|| format!("Row {row}: missing or invalid '{col}' array"))?;

    arr.iter()
        .enumerate()
        .map(|(j, v)| {
            // null encodes NaN, the JSON writer's spelling for it
            if v.is_null() {
                return Ok(f64::NAN);
            }
            v.as_f64()
                .with_context(|| format!("Row {row}, {col}[{j}]: not a number"))
        })
        .collect()
}

fn json_to_metadata(val: &JsonValue) -> MetadataValue {
    match val {
        JsonValue::String(s) => MetadataValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                MetadataValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                MetadataValue::Float(f)
            } else {
                MetadataValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => MetadataValue::Bool(*b),
        JsonValue::Null => MetadataValue::Null,
        other => MetadataValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file containing an EEM dataset.
///
/// Expected schema:
/// - `emission`:   List<Float64> or LargeList<Float64> – emission axes
/// - `excitation`: List<Float64> or LargeList<Float64> – excitation axes
/// - `intensity`:  List<Float64> or LargeList<Float64> – row-major grids
/// - Any other columns are treated as metadata (strings, ints, floats, bools)
///
/// Works with files written by [`save_parquet`](super::writer::save_parquet)
/// as well as by Pandas (`df.to_parquet()`) and Polars
/// (`df.write_parquet()`) with matching columns.
fn load_parquet(path: &Path) -> Result<EemDataset> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut eems = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();
        let n_rows = batch.num_rows();

        let grid_idx: Vec<usize> = GRID_COLUMNS
            .iter()
            .map(|name| {
                schema
                    .index_of(name)
                    .map_err(|_| anyhow::anyhow!("Parquet file missing '{name}' column"))
            })
            .collect::<Result<_>>()?;

        // Collect metadata column indices (everything except the grid columns)
        let meta_cols: Vec<(usize, String)> = schema
            .fields()
            .iter()
            .enumerate()
            .filter(|(i, _)| !grid_idx.contains(i))
            .map(|(i, f)| (i, f.name().clone()))
            .collect();

        for row in 0..n_rows {
            let emission = extract_f64_list(batch.column(grid_idx[0]), row)
                .with_context(|| format!("Row {row}: failed to read 'emission'"))?;
            let excitation = extract_f64_list(batch.column(grid_idx[1]), row)
                .with_context(|| format!("Row {row}: failed to read 'excitation'"))?;
            let intensity = extract_f64_list(batch.column(grid_idx[2]), row)
                .with_context(|| format!("Row {row}: failed to read 'intensity'"))?;

            let mut metadata = BTreeMap::new();
            for (col_idx, col_name) in &meta_cols {
                let col_array = batch.column(*col_idx);
                let value = extract_metadata_value(col_array, row);
                metadata.insert(col_name.clone(), value);
            }

            let eem = Eem::new(emission, excitation, intensity, metadata)
                .with_context(|| format!("Row {row}: invalid EEM grid"))?;
            eems.push(eem);
        }
    }

    Ok(EemDataset::from_eems(eems))
}

// -- Parquet / Arrow helpers --

/// Extract a `Vec<f64>` from a List or LargeList column at the given row.
fn extract_f64_list(col: &Arc<dyn Array>, row: usize) -> Result<Vec<f64>> {
    if col.is_null(row) {
        bail!("null value in list column");
    }

    let values_array = match col.data_type() {
        DataType::List(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<ListArray>()
                .context("expected ListArray")?;
            list_arr.value(row)
        }
        DataType::LargeList(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<LargeListArray>()
                .context("expected LargeListArray")?;
            list_arr.value(row)
        }
        other => bail!("Expected List or LargeList column, got {other:?}"),
    };

    // The inner array can be Float64 or Float32
    if let Some(f64_arr) = values_array.as_any().downcast_ref::<Float64Array>() {
        Ok(f64_arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    } else if let Some(f32_arr) = values_array.as_any().downcast_ref::<Float32Array>() {
        Ok(f32_arr.iter().map(|v| v.unwrap_or(f32::NAN) as f64).collect())
    } else {
        bail!(
            "List inner type is {:?}, expected Float64 or Float32",
            values_array.data_type()
        )
    }
}

/// Extract a single metadata value from an Arrow column at a given row.
fn extract_metadata_value(col: &Arc<dyn Array>, row: usize) -> MetadataValue {
    if col.is_null(row) {
        return MetadataValue::Null;
    }
    match col.data_type() {
        DataType::Utf8 | DataType::LargeUtf8 => {
            if let Some(s) = col.as_any().downcast_ref::<StringArray>() {
                MetadataValue::String(s.value(row).to_string())
            } else {
                // LargeStringArray
                let s = col.as_string::<i64>();
                MetadataValue::String(s.value(row).to_string())
            }
        }
        DataType::Int32 => {
            let arr = col.as_any().downcast_ref::<Int32Array>().unwrap();
            MetadataValue::Integer(arr.value(row) as i64)
        }
        DataType::Int64 => {
            let arr = col.as_any().downcast_ref::<Int64Array>().unwrap();
            MetadataValue::Integer(arr.value(row))
        }
        DataType::Float32 => {
            let arr = col.as_any().downcast_ref::<Float32Array>().unwrap();
            MetadataValue::Float(arr.value(row) as f64)
        }
        DataType::Float64 => {
            let arr = col.as_any().downcast_ref::<Float64Array>().unwrap();
            MetadataValue::Float(arr.value(row))
        }
        DataType::Boolean => {
            let arr = col.as_any().downcast_ref::<BooleanArray>().unwrap();
            MetadataValue::Bool(arr.value(row))
        }
        _ => MetadataValue::String(format!("{:?}", col.data_type())),
    }
}
