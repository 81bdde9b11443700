#![forbid(unsafe_code)]

//! The store capability the benchmark runner drives.
//!
//! The runner never talks to a database directly: it creates a schema,
//! bulk-loads dataset files and streams query rows through [`GraphStore`].
//! [`sqlite::SqliteStore`] is the bundled implementation.

pub mod sqlite;

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::Result;
use crate::generator::RecordKind;

pub use sqlite::SqliteStore;
use ColumnType::{Boolean, Text, Timestamp};

/// Named query parameters, e.g. `user_id -> user_000042`.
pub type QueryParams = BTreeMap<String, String>;

/// Column type of the table schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// UTF-8 text.
    Text,
    /// RFC 3339 timestamp.
    Timestamp,
    /// Boolean flag.
    Boolean,
    /// Signed integer.
    Integer,
}

/// One column of a [`TableSpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Column name as it appears in dataset files.
    pub name: &'static str,
    /// Column type.
    pub ty: ColumnType,
}

const fn col(name: &'static str, ty: ColumnType) -> ColumnSpec {
    ColumnSpec { name, ty }
}

/// Typed schema of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    /// Record kind stored in the table.
    pub kind: RecordKind,
    /// Columns, in file order.
    pub columns: &'static [ColumnSpec],
    /// Column holding the primary key, for node tables.
    pub primary_key: Option<&'static str>,
    /// Endpoint tables `(from, to)`, for edge tables.
    pub endpoints: Option<(&'static str, &'static str)>,
}

impl TableSpec {
    /// Table name.
    pub fn name(&self) -> &'static str {
        self.kind.table()
    }
}

const USER_COLUMNS: &[ColumnSpec] = &[
    col("id", Text),
    col("name", Text),
    col("email", Text),
    col("created_at", Timestamp),
    col("metadata", Text),
];

const RESOURCE_COLUMNS: &[ColumnSpec] = &[
    col("id", Text),
    col("type", Text),
    col("name", Text),
    col("owner_id", Text),
    col("created_at", Timestamp),
    col("metadata", Text),
];

const GROUP_COLUMNS: &[ColumnSpec] = &[
    col("id", Text),
    col("name", Text),
    col("description", Text),
    col("created_at", Timestamp),
    col("metadata", Text),
];

const MEMBER_OF_COLUMNS: &[ColumnSpec] = &[
    col("from", Text),
    col("to", Text),
    col("joined_at", Timestamp),
    col("role", Text),
];

const PERMISSION_COLUMNS: &[ColumnSpec] = &[
    col("from", Text),
    col("to", Text),
    col("can_create", Boolean),
    col("can_read", Boolean),
    col("can_update", Boolean),
    col("can_delete", Boolean),
    col("granted_at", Timestamp),
    col("granted_by", Text),
];

const INHERITS_COLUMNS: &[ColumnSpec] = &[
    col("from", Text),
    col("to", Text),
    col("created_at", Timestamp),
];

/// Schema of `kind`.
pub fn table_spec(kind: RecordKind) -> TableSpec {
    let (columns, primary_key, endpoints) = match kind {
        RecordKind::Users => (USER_COLUMNS, Some("id"), None),
        RecordKind::Resources => (RESOURCE_COLUMNS, Some("id"), None),
        RecordKind::Groups => (GROUP_COLUMNS, Some("id"), None),
        RecordKind::MemberOf => (MEMBER_OF_COLUMNS, None, Some(("User", "UserGroup"))),
        RecordKind::UserPermissions => {
            (PERMISSION_COLUMNS, None, Some(("User", "Resource")))
        }
        RecordKind::GroupPermissions => {
            (PERMISSION_COLUMNS, None, Some(("UserGroup", "Resource")))
        }
        RecordKind::InheritsFrom => (INHERITS_COLUMNS, None, Some(("UserGroup", "UserGroup"))),
    };
    TableSpec {
        kind,
        columns,
        primary_key,
        endpoints,
    }
}

/// The full schema, node tables first.
pub fn schema() -> Vec<TableSpec> {
    RecordKind::ALL.iter().copied().map(table_spec).collect()
}

/// A value produced by a query row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// Integer.
    Integer(i64),
    /// Floating point.
    Real(f64),
    /// Text.
    Text(String),
    /// Raw bytes.
    Blob(Vec<u8>),
}

/// One row streamed out of [`GraphStore::query`].
pub type ResultRow = [Value];

/// Schema creation, bulk load and query execution over some database.
pub trait GraphStore {
    /// Creates every table in `tables`.
    fn create_schema(&mut self, tables: &[TableSpec]) -> Result<()>;

    /// Loads the dataset file at `path` into `table` and returns the number of
    /// rows inserted.
    ///
    /// The format is chosen from the file extension. A path that does not
    /// exist yields [`BenchError::MissingInput`](crate::error::BenchError::MissingInput).
    fn bulk_load(&mut self, table: &str, path: &Path) -> Result<u64>;

    /// Runs `query` and hands each row to `visit` as it is read.
    ///
    /// Returns the number of rows visited.
    fn query(
        &mut self,
        query: &str,
        params: &QueryParams,
        visit: &mut dyn FnMut(&ResultRow),
    ) -> Result<u64>;

    /// Number of rows in `table`.
    fn count(&mut self, table: &str) -> Result<u64>;
}
