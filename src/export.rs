#![forbid(unsafe_code)]

//! Dataset export: one file per record kind and format.
//!
//! Files land in `<root>/<format>/<stem>.<ext>`, e.g. `data/csv/member_of.csv`.
//! Kinds without records produce no file; the loader treats the absence as a
//! skipped table.

use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use arrow_array::{ArrayRef, BooleanArray, Int64Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, info};

use crate::error::{BenchError, Result};
use crate::generator::{AuthGraph, Record, RecordKind};
use crate::store::{table_spec, ColumnSpec, ColumnType};

/// On-disk encoding of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    /// Row-record CSV with a header line.
    Csv,
    /// A JSON array of objects.
    Json,
    /// Snappy-compressed Parquet, one row group per file.
    Parquet,
}

impl DataFormat {
    /// Every supported format.
    pub const ALL: [DataFormat; 3] = [DataFormat::Csv, DataFormat::Json, DataFormat::Parquet];

    /// File extension, also used as the format directory name.
    pub fn extension(self) -> &'static str {
        match self {
            DataFormat::Csv => "csv",
            DataFormat::Json => "json",
            DataFormat::Parquet => "parquet",
        }
    }

    /// Detects the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "csv" => Some(DataFormat::Csv),
            "json" => Some(DataFormat::Json),
            "parquet" => Some(DataFormat::Parquet),
            _ => None,
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for DataFormat {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(DataFormat::Csv),
            "json" => Ok(DataFormat::Json),
            "parquet" => Ok(DataFormat::Parquet),
            other => Err(BenchError::invalid(format!("unknown data format {other:?}"))),
        }
    }
}

/// Path of the file holding `kind` in `format` under `root`.
pub fn dataset_path(root: &Path, format: DataFormat, kind: RecordKind) -> PathBuf {
    root.join(format.extension())
        .join(format!("{}.{}", kind.file_stem(), format.extension()))
}

/// Writes every non-empty kind of `graph` in `format`.
///
/// Returns the paths written, in [`RecordKind::ALL`] order.
pub fn export_graph(graph: &AuthGraph, root: &Path, format: DataFormat) -> Result<Vec<PathBuf>> {
    let dir = root.join(format.extension());
    fs::create_dir_all(&dir)?;

    let mut written = Vec::with_capacity(RecordKind::ALL.len());
    let mut push = |path: Option<PathBuf>| {
        if let Some(path) = path {
            written.push(path);
        }
    };
    push(write_records(root, format, &graph.users)?);
    push(write_records(root, format, &graph.resources)?);
    push(write_records(root, format, &graph.groups)?);
    push(write_records(root, format, &graph.memberships)?);
    push(write_records(root, format, &graph.user_permissions)?);
    push(write_records(root, format, &graph.group_permissions)?);
    push(write_records(root, format, &graph.inheritance)?);

    info!(
        format = %format,
        dir = %dir.display(),
        files = written.len(),
        "export.dataset.completed"
    );
    Ok(written)
}

/// Writes `records` to their kind's file; `None` when there is nothing to write.
pub fn write_records<R: Record>(
    root: &Path,
    format: DataFormat,
    records: &[R],
) -> Result<Option<PathBuf>> {
    if records.is_empty() {
        debug!(kind = %R::KIND, format = %format, "export.kind.empty");
        return Ok(None);
    }
    let path = dataset_path(root, format, R::KIND);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(&path)?;
    match format {
        DataFormat::Csv => {
            let mut writer = csv::Writer::from_writer(file);
            for record in records {
                writer.serialize(record)?;
            }
            writer.flush()?;
        }
        DataFormat::Json => {
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, records)?;
            writer.flush()?;
        }
        DataFormat::Parquet => write_parquet(file, records)?,
    }
    debug!(
        kind = %R::KIND,
        rows = records.len(),
        path = %path.display(),
        "export.kind.written"
    );
    Ok(Some(path))
}

/// Arrow type a column is stored as in Parquet files.
pub fn arrow_type(ty: ColumnType) -> DataType {
    match ty {
        ColumnType::Text | ColumnType::Timestamp => DataType::Utf8,
        ColumnType::Boolean => DataType::Boolean,
        ColumnType::Integer => DataType::Int64,
    }
}

/// Writes `records` as a single Snappy-compressed record batch whose columns
/// follow the table schema of the kind.
fn write_parquet<R: Record>(file: File, records: &[R]) -> Result<()> {
    let spec = table_spec(R::KIND);
    let rows = records
        .iter()
        .map(|record| match serde_json::to_value(record)? {
            JsonValue::Object(map) => Ok(map),
            other => Err(BenchError::invalid(format!(
                "{} record serialized as {other}",
                R::KIND
            ))),
        })
        .collect::<Result<Vec<_>>>()?;

    let fields: Vec<Field> = spec
        .columns
        .iter()
        .map(|c| Field::new(c.name, arrow_type(c.ty), true))
        .collect();
    let columns: Vec<ArrayRef> = spec
        .columns
        .iter()
        .map(|c| column_array(c, &rows))
        .collect();
    let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?;

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn column_array(column: &ColumnSpec, rows: &[Map<String, JsonValue>]) -> ArrayRef {
    let cells = rows.iter().map(|row| row.get(column.name));
    match column.ty {
        ColumnType::Boolean => Arc::new(
            cells
                .map(|v| v.and_then(JsonValue::as_bool))
                .collect::<BooleanArray>(),
        ),
        ColumnType::Integer => Arc::new(
            cells
                .map(|v| v.and_then(JsonValue::as_i64))
                .collect::<Int64Array>(),
        ),
        ColumnType::Text | ColumnType::Timestamp => Arc::new(
            cells
                .map(|v| match v {
                    None | Some(JsonValue::Null) => None,
                    Some(JsonValue::String(s)) => Some(s.clone()),
                    Some(other) => Some(other.to_string()),
                })
                .collect::<StringArray>(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{generate, GenerationConfig, User};
    use tempfile::tempdir;

    #[test]
    fn csv_has_header_and_one_row_per_record() {
        let dir = tempdir().unwrap();
        let graph = generate(&GenerationConfig::small()).unwrap();
        let paths = export_graph(&graph, dir.path(), DataFormat::Csv).unwrap();
        let non_empty = RecordKind::ALL
            .iter()
            .filter(|&&kind| graph.len_of(kind) > 0)
            .count();
        assert_eq!(paths.len(), non_empty);

        let users = dataset_path(dir.path(), DataFormat::Csv, RecordKind::Users);
        let mut reader = csv::Reader::from_path(&users).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "id");
        let parsed: Vec<User> = reader.deserialize().collect::<std::result::Result<_, _>>().unwrap();
        assert_eq!(parsed, graph.users);
    }

    #[test]
    fn empty_kinds_produce_no_file() {
        let dir = tempdir().unwrap();
        let config = GenerationConfig {
            users: 10,
            resources: 5,
            groups: 0,
            ..GenerationConfig::default()
        };
        let graph = generate(&config).unwrap();
        let paths = export_graph(&graph, dir.path(), DataFormat::Json).unwrap();
        assert_eq!(paths.len(), 3);
        assert!(!dataset_path(dir.path(), DataFormat::Json, RecordKind::Groups).exists());
    }

    #[test]
    fn format_detection() {
        assert_eq!(
            DataFormat::from_path(Path::new("x/users.json")),
            Some(DataFormat::Json)
        );
        assert_eq!(
            DataFormat::from_path(Path::new("x/users.parquet")),
            Some(DataFormat::Parquet)
        );
        assert_eq!(DataFormat::from_path(Path::new("x/users.avro")), None);
        assert_eq!("CSV".parse::<DataFormat>().unwrap(), DataFormat::Csv);
        assert_eq!("parquet".parse::<DataFormat>().unwrap(), DataFormat::Parquet);
        assert!("avro".parse::<DataFormat>().is_err());
    }

    #[test]
    fn parquet_columns_follow_the_table_schema() {
        use arrow_array::cast::AsArray;
        use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

        let dir = tempdir().unwrap();
        let graph = generate(&GenerationConfig::small()).unwrap();
        export_graph(&graph, dir.path(), DataFormat::Parquet).unwrap();

        let path = dataset_path(dir.path(), DataFormat::Parquet, RecordKind::UserPermissions);
        assert!(path.exists());
        let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(&path).unwrap()).unwrap();
        let names: Vec<String> = builder
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        let expected: Vec<&str> = table_spec(RecordKind::UserPermissions)
            .columns
            .iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, expected);

        let batches: Vec<RecordBatch> = builder
            .build()
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap();
        let rows: usize = batches.iter().map(RecordBatch::num_rows).sum();
        assert_eq!(rows, graph.user_permissions.len());

        let first = &graph.user_permissions[0];
        let batch = &batches[0];
        let from = batch.column_by_name("from").unwrap().as_string::<i32>();
        let read = batch.column_by_name("can_read").unwrap().as_boolean();
        assert_eq!(from.value(0), first.user_id);
        assert_eq!(read.value(0), first.can_read);
    }
}
