//! [`GraphStore`] over an SQLite database file.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use arrow_array::cast::AsArray;
use arrow_array::types::Int64Type;
use arrow_array::{Array, ArrayRef};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection, ToSql};
use tracing::debug;

use super::{schema, ColumnSpec, ColumnType, GraphStore, QueryParams, ResultRow, TableSpec, Value};
use crate::error::{BenchError, Result};
use crate::export::DataFormat;

/// File name of the database inside a store directory.
pub const DB_FILE: &str = "graph.sqlite3";

/// SQLite-backed store. One database file per store directory.
pub struct SqliteStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Opens (or creates) the database inside `dir`.
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(DB_FILE);
        let conn = Connection::open(&path)?;
        Self::configure(&conn)?;
        Ok(Self {
            conn,
            path: Some(path),
        })
    }

    /// Opens the existing database inside `dir`; fails when none was loaded.
    pub fn open_existing(dir: &Path) -> Result<Self> {
        let path = dir.join(DB_FILE);
        if !path.exists() {
            return Err(BenchError::missing_input(path));
        }
        Self::open(dir)
    }

    /// Private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure(&conn)?;
        Ok(Self { conn, path: None })
    }

    /// Database file, if the store is file-backed.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn configure(conn: &Connection) -> Result<()> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(())
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn sql_type(ty: ColumnType) -> &'static str {
    match ty {
        ColumnType::Text | ColumnType::Timestamp => "TEXT",
        ColumnType::Boolean | ColumnType::Integer => "INTEGER",
    }
}

fn create_table_sql(spec: &TableSpec) -> String {
    let mut columns: Vec<String> = spec
        .columns
        .iter()
        .map(|c| {
            let mut def = format!("{} {}", quote_ident(c.name), sql_type(c.ty));
            if spec.primary_key == Some(c.name) {
                def.push_str(" PRIMARY KEY");
            }
            def
        })
        .collect();
    if let Some((from, to)) = spec.endpoints {
        columns.push(format!(
            "FOREIGN KEY (\"from\") REFERENCES {} (\"id\")",
            quote_ident(from)
        ));
        columns.push(format!(
            "FOREIGN KEY (\"to\") REFERENCES {} (\"id\")",
            quote_ident(to)
        ));
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_ident(spec.name()),
        columns.join(", ")
    )
}

fn insert_sql(spec: &TableSpec) -> String {
    let names: Vec<String> = spec.columns.iter().map(|c| quote_ident(c.name)).collect();
    let slots: Vec<String> = (1..=spec.columns.len()).map(|i| format!("?{i}")).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(spec.name()),
        names.join(", "),
        slots.join(", ")
    )
}

fn lookup_table(table: &str) -> Result<TableSpec> {
    schema()
        .into_iter()
        .find(|spec| spec.name() == table)
        .ok_or_else(|| BenchError::invalid(format!("unknown table {table:?}")))
}

fn parse_flag(column: &ColumnSpec, raw: &str) -> Result<SqlValue> {
    match raw {
        "true" | "True" | "1" => Ok(SqlValue::Integer(1)),
        "false" | "False" | "0" => Ok(SqlValue::Integer(0)),
        other => Err(BenchError::invalid(format!(
            "column {} expects a boolean, got {other:?}",
            column.name
        ))),
    }
}

fn csv_value(column: &ColumnSpec, raw: &str) -> Result<SqlValue> {
    match column.ty {
        ColumnType::Boolean => parse_flag(column, raw),
        ColumnType::Integer => raw.parse::<i64>().map(SqlValue::Integer).map_err(|e| {
            BenchError::invalid(format!("column {} expects an integer: {e}", column.name))
        }),
        ColumnType::Text | ColumnType::Timestamp => Ok(SqlValue::Text(raw.to_string())),
    }
}

fn json_value(column: &ColumnSpec, raw: Option<&serde_json::Value>) -> Result<SqlValue> {
    use serde_json::Value as J;
    Ok(match raw {
        None | Some(J::Null) => SqlValue::Null,
        Some(J::Bool(b)) => SqlValue::Integer(i64::from(*b)),
        Some(J::Number(n)) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Some(J::String(s)) if column.ty == ColumnType::Boolean => parse_flag(column, s)?,
        Some(J::String(s)) => SqlValue::Text(s.clone()),
        Some(other) => SqlValue::Text(other.to_string()),
    })
}

fn arrow_value(column: &ColumnSpec, array: &ArrayRef, row: usize) -> Result<SqlValue> {
    if array.is_null(row) {
        return Ok(SqlValue::Null);
    }
    let mismatch = || {
        BenchError::invalid(format!(
            "column {} has unexpected type {}",
            column.name,
            array.data_type()
        ))
    };
    Ok(match column.ty {
        ColumnType::Boolean => {
            let flags = array.as_boolean_opt().ok_or_else(mismatch)?;
            SqlValue::Integer(i64::from(flags.value(row)))
        }
        ColumnType::Integer => {
            let ints = array.as_primitive_opt::<Int64Type>().ok_or_else(mismatch)?;
            SqlValue::Integer(ints.value(row))
        }
        ColumnType::Text | ColumnType::Timestamp => {
            let text = array.as_string_opt::<i32>().ok_or_else(mismatch)?;
            SqlValue::Text(text.value(row).to_string())
        }
    })
}

fn row_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Real(f),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Blob(b.to_vec()),
    }
}

impl GraphStore for SqliteStore {
    fn create_schema(&mut self, tables: &[TableSpec]) -> Result<()> {
        let tx = self.conn.transaction()?;
        for spec in tables {
            tx.execute(&create_table_sql(spec), [])?;
            if spec.endpoints.is_some() {
                for column in ["from", "to"] {
                    tx.execute(
                        &format!(
                            "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
                            quote_ident(&format!("idx_{}_{column}", spec.name())),
                            quote_ident(spec.name()),
                            quote_ident(column)
                        ),
                        [],
                    )?;
                }
            }
        }
        tx.commit()?;
        debug!(tables = tables.len(), "store.sqlite.schema_created");
        Ok(())
    }

    fn bulk_load(&mut self, table: &str, path: &Path) -> Result<u64> {
        if !path.exists() {
            return Err(BenchError::missing_input(path));
        }
        let spec = lookup_table(table)?;
        let format = DataFormat::from_path(path).ok_or_else(|| {
            BenchError::invalid(format!("unsupported dataset file {}", path.display()))
        })?;

        let tx = self.conn.transaction()?;
        let mut inserted = 0u64;
        {
            let mut insert = tx.prepare(&insert_sql(&spec))?;
            match format {
                DataFormat::Csv => {
                    let mut reader = csv::Reader::from_path(path)?;
                    let headers = reader.headers()?.clone();
                    let positions = spec
                        .columns
                        .iter()
                        .map(|c| {
                            headers.iter().position(|h| h == c.name).ok_or_else(|| {
                                BenchError::invalid(format!(
                                    "{} lacks column {:?}",
                                    path.display(),
                                    c.name
                                ))
                            })
                        })
                        .collect::<Result<Vec<_>>>()?;
                    for record in reader.records() {
                        let record = record?;
                        let values = spec
                            .columns
                            .iter()
                            .zip(&positions)
                            .map(|(c, &pos)| csv_value(c, record.get(pos).unwrap_or_default()))
                            .collect::<Result<Vec<_>>>()?;
                        insert.execute(params_from_iter(values))?;
                        inserted += 1;
                    }
                }
                DataFormat::Json => {
                    let reader = BufReader::new(File::open(path)?);
                    let rows: Vec<serde_json::Map<String, serde_json::Value>> =
                        serde_json::from_reader(reader)?;
                    for row in &rows {
                        let values = spec
                            .columns
                            .iter()
                            .map(|c| json_value(c, row.get(c.name)))
                            .collect::<Result<Vec<_>>>()?;
                        insert.execute(params_from_iter(values))?;
                        inserted += 1;
                    }
                }
                DataFormat::Parquet => {
                    let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?
                        .build()?;
                    for batch in reader {
                        let batch = batch?;
                        let arrays = spec
                            .columns
                            .iter()
                            .map(|c| {
                                batch.column_by_name(c.name).ok_or_else(|| {
                                    BenchError::invalid(format!(
                                        "{} lacks column {:?}",
                                        path.display(),
                                        c.name
                                    ))
                                })
                            })
                            .collect::<Result<Vec<_>>>()?;
                        for row in 0..batch.num_rows() {
                            let values = spec
                                .columns
                                .iter()
                                .zip(&arrays)
                                .map(|(c, array)| arrow_value(c, array, row))
                                .collect::<Result<Vec<_>>>()?;
                            insert.execute(params_from_iter(values))?;
                            inserted += 1;
                        }
                    }
                }
            }
        }
        tx.commit()?;
        debug!(table, rows = inserted, path = %path.display(), "store.sqlite.bulk_loaded");
        Ok(inserted)
    }

    fn query(
        &mut self,
        query: &str,
        params: &QueryParams,
        visit: &mut dyn FnMut(&ResultRow),
    ) -> Result<u64> {
        let mut stmt = self.conn.prepare_cached(query)?;
        let columns = stmt.column_count();
        let names: Vec<String> = params.keys().map(|k| format!(":{k}")).collect();
        let bound: Vec<(&str, &dyn ToSql)> = names
            .iter()
            .zip(params.values())
            .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
            .collect();

        let mut rows = stmt.query(bound.as_slice())?;
        let mut buf = Vec::with_capacity(columns);
        let mut visited = 0u64;
        while let Some(row) = rows.next()? {
            buf.clear();
            for i in 0..columns {
                buf.push(row_value(row.get_ref(i)?));
            }
            visit(buf.as_slice());
            visited += 1;
        }
        Ok(visited)
    }

    fn count(&mut self, table: &str) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
        let n: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(u64::try_from(n).unwrap_or_default())
    }
}
