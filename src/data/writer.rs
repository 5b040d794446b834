use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{
    ArrayRef, BooleanArray, Float64Array, Float64Builder, Int64Array, ListBuilder, StringArray,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use serde_json::{Map as JsonMap, Value as JsonValue};

use super::model::{Eem, EemDataset, MetadataValue};

// ---------------------------------------------------------------------------
// Parquet writer
// ---------------------------------------------------------------------------

/// Write the dataset as a Parquet file with `emission`, `excitation` and
/// `intensity` list columns plus one column per metadata key, the inverse of
/// [`load_dataset`](super::loader::load_dataset).
///
/// Each metadata column is written with its dominant scalar type; values that
/// don't fit the column type become null.
pub fn save_parquet(dataset: &EemDataset, path: &Path) -> Result<()> {
    let mut fields = vec![
        list_field("emission"),
        list_field("excitation"),
        list_field("intensity"),
    ];
    let mut columns: Vec<ArrayRef> = vec![
        build_list_column(dataset, Eem::emission),
        build_list_column(dataset, Eem::excitation),
        build_list_column(dataset, Eem::intensities),
    ];

    for col in &dataset.column_names {
        let (field, array) = build_metadata_column(dataset, col);
        fields.push(field);
        columns.push(array);
    }

    let schema = Arc::new(Schema::new(fields));
    let batch =
        RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;

    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing record batch")?;
    writer.close().context("closing parquet writer")?;

    log::info!("wrote {} EEMs to {}", dataset.len(), path.display());
    Ok(())
}

fn list_field(name: &str) -> Field {
    Field::new(
        name,
        DataType::List(Arc::new(Field::new("item", DataType::Float64, true))),
        false,
    )
}

fn build_list_column(dataset: &EemDataset, values: for<'a> fn(&'a Eem) -> &'a [f64]) -> ArrayRef {
    let mut builder = ListBuilder::new(Float64Builder::new());
    for eem in &dataset.eems {
        let inner = builder.values();
        for &v in values(eem) {
            inner.append_value(v);
        }
        builder.append(true);
    }
    Arc::new(builder.finish())
}

// -- Metadata column typing --

#[derive(Clone, Copy, PartialEq)]
enum ColumnKind {
    Integer,
    Float,
    Bool,
    Text,
}

/// Dominant scalar type of a metadata column: integers stay integers, a mix
/// of integers and floats widens to float, anything else falls back to text.
fn column_kind(dataset: &EemDataset, col: &str) -> ColumnKind {
    let mut kind: Option<ColumnKind> = None;
    for eem in &dataset.eems {
        let next = match eem.metadata.get(col) {
            None | Some(MetadataValue::Null) => continue,
            Some(MetadataValue::Integer(_)) => ColumnKind::Integer,
            Some(MetadataValue::Float(_)) => ColumnKind::Float,
            Some(MetadataValue::Bool(_)) => ColumnKind::Bool,
            Some(MetadataValue::String(_)) | Some(MetadataValue::Date(_)) => ColumnKind::Text,
        };
        kind = Some(match (kind, next) {
            (None, n) => n,
            (Some(k), n) if k == n => k,
            (Some(ColumnKind::Integer), ColumnKind::Float)
            | (Some(ColumnKind::Float), ColumnKind::Integer) => ColumnKind::Float,
            _ => ColumnKind::Text,
        });
    }
    kind.unwrap_or(ColumnKind::Text)
}

fn build_metadata_column(dataset: &EemDataset, col: &str) -> (Field, ArrayRef) {
    match column_kind(dataset, col) {
        ColumnKind::Integer => {
            let values: Vec<Option<i64>> = dataset
                .eems
                .iter()
                .map(|eem| match eem.metadata.get(col) {
                    Some(MetadataValue::Integer(i)) => Some(*i),
                    _ => None,
                })
                .collect();
            (
                Field::new(col, DataType::Int64, true),
                Arc::new(Int64Array::from(values)),
            )
        }
        ColumnKind::Float => {
            let values: Vec<Option<f64>> = dataset
                .eems
                .iter()
                .map(|eem| eem.metadata.get(col).and_then(MetadataValue::as_f64))
                .collect();
            (
                Field::new(col, DataType::Float64, true),
                Arc::new(Float64Array::from(values)),
            )
        }
        ColumnKind::Bool => {
            let values: Vec<Option<bool>> = dataset
                .eems
                .iter()
                .map(|eem| match eem.metadata.get(col) {
                    Some(MetadataValue::Bool(b)) => Some(*b),
                    _ => None,
                })
                .collect();
            (
                Field::new(col, DataType::Boolean, true),
                Arc::new(BooleanArray::from(values)),
            )
        }
        ColumnKind::Text => {
            let values: Vec<Option<String>> = dataset
                .eems
                .iter()
                .map(|eem| match eem.metadata.get(col) {
                    None | Some(MetadataValue::Null) => None,
                    Some(v) => Some(v.to_string()),
                })
                .collect();
            (
                Field::new(col, DataType::Utf8, true),
                Arc::new(StringArray::from(values)),
            )
        }
    }
}

// ---------------------------------------------------------------------------
// JSON writer
// ---------------------------------------------------------------------------

/// Write the dataset in the records-oriented JSON layout accepted by
/// [`load_dataset`](super::loader::load_dataset). NaN intensities (JSON has
/// no spelling for them) are written as `null` and read back as NaN.
pub fn save_json(dataset: &EemDataset, path: &Path) -> Result<()> {
    let mut records = Vec::with_capacity(dataset.len());
    for eem in &dataset.eems {
        let mut obj = JsonMap::new();
        obj.insert("emission".into(), float_array(eem.emission()));
        obj.insert("excitation".into(), float_array(eem.excitation()));
        obj.insert("intensity".into(), float_array(eem.intensities()));
        for (key, val) in &eem.metadata {
            let json = serde_json::to_value(val).context("serializing metadata value")?;
            obj.insert(key.clone(), json);
        }
        records.push(JsonValue::Object(obj));
    }

    let text = serde_json::to_string_pretty(&JsonValue::Array(records))
        .context("serializing dataset")?;
    std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;

    log::info!("wrote {} EEMs to {}", dataset.len(), path.display());
    Ok(())
}

fn float_array(values: &[f64]) -> JsonValue {
    JsonValue::Array(values.iter().map(|&v| JsonValue::from(v)).collect())
}
