//! SQLite-backed chunk sink.
//!
//! Every append runs in one transaction: the table is created (if absent)
//! and all rows are inserted, or nothing is. Sessions set a busy timeout so
//! several workers can append to the same database file; the write lock is
//! taken when the transaction begins.

use crate::core::constants::STORE_BUSY_TIMEOUT_MS;
use crate::core::error::{PipelineError, Result};
use crate::core::traits::{ChunkSink, SinkFactory};
use polars::prelude::{Column, DataFrame, DataType};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// SQL storage class a frame column is written as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Integer,
    Real,
    Text,
}

impl SqlType {
    /// Storage class of a polars dtype.
    pub fn of(dtype: &DataType) -> Self {
        match dtype {
            DataType::Boolean
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64 => SqlType::Integer,
            DataType::Float32 | DataType::Float64 => SqlType::Real,
            _ => SqlType::Text,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
            SqlType::Text => "TEXT",
        }
    }
}

/// One store session.
#[derive(Debug)]
pub struct SqliteSink {
    conn: Connection,
}

impl SqliteSink {
    /// Open (or create) the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_timeout(path, Duration::from_millis(STORE_BUSY_TIMEOUT_MS))
    }

    /// Open with an explicit busy timeout.
    pub fn open_with_timeout<P: AsRef<Path>>(path: P, busy_timeout: Duration) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| {
            PipelineError::storage(format!(
                "failed to open sqlite database at {}: {}",
                path.display(),
                e
            ))
        })?;
        conn.busy_timeout(busy_timeout)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        Ok(SqliteSink { conn })
    }

    /// A private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Ok(SqliteSink {
            conn: Connection::open_in_memory()?,
        })
    }

    /// The underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn table_exists(&self, table: &str) -> Result<bool> {
        table_exists(&self.conn, table)
    }

    /// `(name, declared type)` of every column of `table`, in order.
    pub fn table_columns(&self, table: &str) -> Result<Vec<(String, String)>> {
        table_columns(&self.conn, table)
    }
}

impl ChunkSink for SqliteSink {
    fn append(&mut self, table: &str, rows: &DataFrame) -> Result<usize> {
        let schema: Vec<(String, SqlType)> = rows
            .get_columns()
            .iter()
            .map(|c| (c.name().to_string(), SqlType::of(c.dtype())))
            .collect();
        if schema.is_empty() {
            return Err(PipelineError::storage(format!(
                "refusing to write a frame without columns to '{}'",
                table
            )));
        }

        let values = rows
            .get_columns()
            .iter()
            .zip(&schema)
            .map(|(column, (_, sql_type))| column_values(column, *sql_type))
            .collect::<Result<Vec<_>>>()?;

        // Take the write lock up front: a deferred transaction that reads
        // sqlite_master first cannot upgrade while another session writes,
        // and the busy handler is skipped for that upgrade.
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        if table_exists(&tx, table)? {
            check_schema(&tx, table, &schema)?;
        } else {
            let definition = schema
                .iter()
                .map(|(name, t)| format!("{} {}", quote(name), t.as_str()))
                .collect::<Vec<_>>()
                .join(", ");
            tx.execute_batch(&format!("CREATE TABLE {} ({});", quote(table), definition))?;
            log::info!("Created table '{}' with columns [{}]", table, definition);
        }

        {
            let names = schema
                .iter()
                .map(|(name, _)| quote(name))
                .collect::<Vec<_>>()
                .join(", ");
            let placeholders = (1..=schema.len())
                .map(|i| format!("?{}", i))
                .collect::<Vec<_>>()
                .join(", ");
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote(table),
                names,
                placeholders
            ))?;

            for row in 0..rows.height() {
                stmt.execute(params_from_iter(values.iter().map(|column| &column[row])))?;
            }
        }

        tx.commit()?;
        Ok(rows.height())
    }

    fn drop_table(&mut self, table: &str) -> Result<bool> {
        if !table_exists(&self.conn, table)? {
            return Ok(false);
        }
        self.conn
            .execute_batch(&format!("DROP TABLE {};", quote(table)))?;
        log::info!("Dropped table '{}'", table);
        Ok(true)
    }

    fn row_count(&mut self, table: &str) -> Result<Option<usize>> {
        if !table_exists(&self.conn, table)? {
            return Ok(None);
        }
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", quote(table)), [], |row| {
                row.get(0)
            })?;
        Ok(Some(count as usize))
    }
}

/// Opens one [`SqliteSink`] session per call against a database file.
#[derive(Debug, Clone)]
pub struct SqliteSinkFactory {
    path: PathBuf,
    busy_timeout: Duration,
}

impl SqliteSinkFactory {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        SqliteSinkFactory {
            path: path.into(),
            busy_timeout: Duration::from_millis(STORE_BUSY_TIMEOUT_MS),
        }
    }

    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SinkFactory for SqliteSinkFactory {
    type Sink = SqliteSink;

    fn open(&self) -> Result<SqliteSink> {
        SqliteSink::open_with_timeout(&self.path, self.busy_timeout)
    }
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<(String, String)>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote(table)))?;
    let mut rows = stmt.query([])?;

    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push((row.get::<_, String>(1)?, row.get::<_, String>(2)?));
    }
    Ok(columns)
}

fn check_schema(conn: &Connection, table: &str, schema: &[(String, SqlType)]) -> Result<()> {
    let existing = table_columns(conn, table)?;
    let matches = existing.len() == schema.len()
        && existing
            .iter()
            .zip(schema)
            .all(|((name, declared), (expected_name, t))| {
                name == expected_name && declared.eq_ignore_ascii_case(t.as_str())
            });

    if matches {
        return Ok(());
    }

    let describe = |cols: Vec<String>| format!("[{}]", cols.join(", "));
    Err(PipelineError::schema_mismatch(
        table,
        describe(existing.iter().map(|(n, t)| format!("{} {}", n, t)).collect()),
        describe(schema.iter().map(|(n, t)| format!("{} {}", n, t.as_str())).collect()),
    ))
}

/// SQL values of one column in row order.
fn column_values(column: &Column, sql_type: SqlType) -> Result<Vec<Value>> {
    let values = match sql_type {
        SqlType::Integer => column
            .as_materialized_series()
            .cast(&DataType::Int64)?
            .i64()?
            .into_iter()
            .map(|v| v.map_or(Value::Null, Value::Integer))
            .collect(),
        SqlType::Real => column
            .as_materialized_series()
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| match v {
                Some(x) if !x.is_nan() => Value::Real(x),
                _ => Value::Null,
            })
            .collect(),
        SqlType::Text => column
            .as_materialized_series()
            .cast(&DataType::String)?
            .str()?
            .into_iter()
            .map(|v| v.map_or(Value::Null, |s| Value::Text(s.to_string())))
            .collect(),
    };
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn scores(n: usize, offset: usize) -> DataFrame {
        let ids: Vec<String> = (offset..offset + n).map(|i| format!("L{}", i)).collect();
        let periods: Vec<i64> = (0..n).map(|_| 202001).collect();
        let labels: Vec<i32> = (0..n).map(|i| (i % 2) as i32).collect();
        let probs: Vec<f64> = (0..n).map(|i| i as f64 / n as f64).collect();
        df![
            "LOAN_SEQUENCE_NUMBER" => ids,
            "MONTHLY_REPORTING_PERIOD" => periods,
            "DELINQUENT" => labels,
            "DELINQ_PROB" => probs,
        ]
        .unwrap()
    }

    #[test]
    fn test_create_then_append() {
        let mut sink = SqliteSink::open_in_memory().unwrap();
        assert_eq!(sink.row_count("scores").unwrap(), None);

        assert_eq!(sink.append("scores", &scores(100, 0)).unwrap(), 100);
        assert_eq!(sink.append("scores", &scores(50, 100)).unwrap(), 50);
        assert_eq!(sink.row_count("scores").unwrap(), Some(150));

        let columns = sink.table_columns("scores").unwrap();
        assert_eq!(columns[0], ("LOAN_SEQUENCE_NUMBER".to_string(), "TEXT".to_string()));
        assert_eq!(columns[3].1, "REAL");
    }

    #[test]
    fn test_schema_mismatch() {
        let mut sink = SqliteSink::open_in_memory().unwrap();
        sink.append("scores", &scores(3, 0)).unwrap();

        let other = df!["LOAN_SEQUENCE_NUMBER" => ["X"], "EXTRA" => [1.5f64]].unwrap();
        assert!(matches!(
            sink.append("scores", &other),
            Err(PipelineError::SchemaMismatch { .. })
        ));
        assert_eq!(sink.row_count("scores").unwrap(), Some(3));
    }

    #[test]
    fn test_failed_append_writes_nothing() {
        let mut sink = SqliteSink::open_in_memory().unwrap();
        sink.connection()
            .execute_batch(
                "CREATE TABLE scores (
                    \"LOAN_SEQUENCE_NUMBER\" TEXT CHECK (\"LOAN_SEQUENCE_NUMBER\" <> 'L150'),
                    \"MONTHLY_REPORTING_PERIOD\" INTEGER,
                    \"DELINQUENT\" INTEGER,
                    \"DELINQ_PROB\" REAL
                );",
            )
            .unwrap();
        sink.append("scores", &scores(100, 0)).unwrap();

        let result = sink.append("scores", &scores(100, 100));
        assert!(matches!(result, Err(PipelineError::Storage { .. })));
        assert!(result.unwrap_err().is_retryable());
        assert_eq!(sink.row_count("scores").unwrap(), Some(100));
    }

    #[test]
    fn test_drop_table() {
        let mut sink = SqliteSink::open_in_memory().unwrap();
        assert!(!sink.drop_table("scores").unwrap());
        sink.append("scores", &scores(2, 0)).unwrap();
        assert!(sink.drop_table("scores").unwrap());
        assert!(!sink.table_exists("scores").unwrap());
    }

    #[test]
    fn test_factory_sessions_share_file() {
        let dir = tempfile::tempdir().unwrap();
        let factory = SqliteSinkFactory::new(dir.path().join("scores.db"));

        factory.open().unwrap().append("scores", &scores(10, 0)).unwrap();
        factory.open().unwrap().append("scores", &scores(5, 10)).unwrap();
        assert_eq!(factory.open().unwrap().row_count("scores").unwrap(), Some(15));
    }

    #[test]
    fn test_concurrent_sessions_append() {
        let dir = tempfile::tempdir().unwrap();
        let factory = SqliteSinkFactory::new(dir.path().join("scores.db"));

        // Every thread checks the table schema inside its transaction before
        // inserting, so each append reads and then writes.
        std::thread::scope(|scope| {
            for worker in 0..8 {
                let factory = &factory;
                scope.spawn(move || {
                    let mut sink = factory.open().unwrap();
                    for batch in 0..25 {
                        let offset = (worker * 25 + batch) * 3;
                        sink.append("scores", &scores(3, offset)).unwrap();
                    }
                });
            }
        });

        assert_eq!(factory.open().unwrap().row_count("scores").unwrap(), Some(600));
    }

    #[test]
    fn test_sql_types() {
        assert_eq!(SqlType::of(&DataType::Boolean), SqlType::Integer);
        assert_eq!(SqlType::of(&DataType::Float32), SqlType::Real);
        assert_eq!(SqlType::of(&DataType::String), SqlType::Text);
        assert_eq!(quote("a\"b"), "\"a\"\"b\"");
    }
}
