use std::fs::File;
use std::path::Path;

use anyhow::{bail, Context, Result};
use polars::{frame::DataFrame, io::SerReader, prelude::CsvReadOptions};
use shapefile::dbase::{FieldValue, Record};
use shapefile::{Reader, Shape};

/// Reads a delimited text file into a DataFrame with every column as String.
///
/// Census tables mix zero-padded codes with counts; schema inference would
/// strip leading zeros from the code columns, so numeric coercion is left to
/// the schema layer.
pub(crate) fn read_table(path: &Path) -> Result<DataFrame> {
    let file = File::open(path)
        .with_context(|| format!("[common::data] Failed to open table: {}", path.display()))?;
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(file)
        .finish()
        .with_context(|| format!("[common::data] Failed to read table from {:?}", path))
}

/// Reads all shapes + attribute records from a given `.shp` file path.
pub(crate) fn read_shapefile(path: &Path) -> Result<Vec<(Shape, Record)>> {
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("[common::data] Failed to open shapefile: {}", path.display()))?;

    let mut items = Vec::with_capacity(reader.shape_count()?);
    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result.context("[common::data] Error reading shape+record")?;
        items.push((shape, record));
    }
    Ok(items)
}

/// Get the value of a character field from a dBase record.
pub(crate) fn character_field(record: &Record, field: &str) -> Result<String> {
    match record.get(field) {
        Some(FieldValue::Character(Some(s))) => Ok(s.trim().to_string()),
        _ => bail!("[common::data] missing or invalid character field: {}", field),
    }
}

/// Get an integer field from a dBase record, accepting numeric or character storage.
pub(crate) fn integer_field(record: &Record, field: &str) -> Result<i64> {
    match record.get(field) {
        Some(FieldValue::Numeric(Some(n))) => Ok(*n as i64),
        Some(FieldValue::Integer(n)) => Ok(*n as i64),
        Some(FieldValue::Character(Some(s))) => s.trim().parse::<i64>()
            .with_context(|| format!("[common::data] field {} is not an integer: {:?}", field, s)),
        _ => bail!("[common::data] missing or invalid integer field: {}", field),
    }
}
