//! SQLite key-value source.
//!
//! Rows live in `table (key TEXT PRIMARY KEY, value)`. Keys are lower-cased
//! item names. Values that have no native storage class are kept as JSON
//! BLOBs.

use super::{Location, Scope, Source};
use crate::error::{ConfigError, Result};
use crate::value::Lookup;
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OpenFlags, params};
use serde_json::Value;
use std::path::{Path, PathBuf};

const KIND: &str = "SqliteSource";

/// Reads and writes rows of a table in an embedded SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteSource {
    file: PathBuf,
    location: Location,
    table: String,
    compulsory: bool,
}

impl SqliteSource {
    /// Declare a source over `table` in the database `file`.
    ///
    /// The table name is interpolated into SQL, so it must be a plain identifier.
    pub fn new(file: impl Into<PathBuf>, location: Location, table: &str) -> Result<Self> {
        let valid = !table.is_empty()
            && !table.starts_with(|c: char| c.is_ascii_digit())
            && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(ConfigError::source(
                KIND,
                format!("invalid table name '{}'", table),
            ));
        }
        Ok(Self {
            file: file.into(),
            location,
            table: table.to_string(),
            compulsory: false,
        })
    }

    /// Fail with `FileMissing` when the database file or the table is missing.
    pub fn compulsory(mut self, compulsory: bool) -> Self {
        self.compulsory = compulsory;
        self
    }

    pub fn path(&self, scope: &Scope) -> Result<PathBuf> {
        self.location.resolve(&self.file, scope)
    }

    fn missing(&self, path: PathBuf) -> ConfigError {
        ConfigError::FileMissing {
            kind: KIND.to_string(),
            path,
        }
    }

    fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
        let result = conn.query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![table],
            |_| Ok(true),
        );
        match result {
            Ok(found) => Ok(found),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn read_row(&self, path: &Path, key: &str) -> rusqlite::Result<Option<Option<SqlValue>>> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        if !Self::table_exists(&conn, &self.table)? {
            return Ok(None);
        }
        let sql = format!("SELECT value FROM \"{}\" WHERE key = ?1", self.table);
        let result = conn.query_row(&sql, params![key], |row| row.get::<_, SqlValue>(0));
        match result {
            Ok(value) => Ok(Some(Some(value))),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(Some(None)),
            Err(e) => Err(e),
        }
    }
}

/// Decode a stored cell.
///
/// Strings, integers and reals use their native storage class. Every other
/// value is stored as a JSON-encoded BLOB, so the storage class marks it.
fn from_sql(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(i) => Value::from(i),
        SqlValue::Real(f) => Value::from(f),
        SqlValue::Text(s) => Value::String(s),
        SqlValue::Blob(b) => serde_json::from_slice(&b)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&b).into_owned())),
    }
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Number(n) => match (n.as_i64(), n.is_f64()) {
            (Some(i), _) => SqlValue::Integer(i),
            (None, true) => SqlValue::Real(n.as_f64().unwrap_or_default()),
            (None, false) => SqlValue::Blob(n.to_string().into_bytes()),
        },
        other => SqlValue::Blob(other.to_string().into_bytes()),
    }
}

impl Source for SqliteSource {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn supports_write(&self) -> bool {
        true
    }

    fn key_for(&self, name: &str) -> String {
        name.to_lowercase()
    }

    fn read(&self, name: &str, scope: &Scope) -> Result<Lookup> {
        let path = self.path(scope)?;
        if !path.exists() {
            if self.compulsory {
                return Err(self.missing(path));
            }
            return Ok(Lookup::Absent);
        }
        let row = self
            .read_row(&path, &self.key_for(name))
            .map_err(|e| ConfigError::source(KIND, e))?;
        match row {
            None if self.compulsory => Err(self.missing(path)),
            None | Some(None) => Ok(Lookup::Absent),
            Some(Some(value)) => Ok(Lookup::Present(from_sql(value))),
        }
    }

    fn write(&self, name: &str, value: &Value, scope: &Scope) -> Result<()> {
        let path = self.path(scope)?;
        if !path.exists() && self.compulsory {
            return Err(self.missing(path));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let write = || -> rusqlite::Result<()> {
            let conn = Connection::open(&path)?;
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS \"{}\" (key TEXT PRIMARY KEY, value)",
                self.table
            ))?;
            conn.execute(
                &format!(
                    "INSERT OR REPLACE INTO \"{}\" (key, value) VALUES (?1, ?2)",
                    self.table
                ),
                params![self.key_for(name), to_sql(value)],
            )?;
            Ok(())
        };
        write().map_err(|e| ConfigError::source(KIND, e))
    }

    fn describe(&self) -> String {
        format!(
            "sqlite({}#{} @ {})",
            self.file.display(),
            self.table,
            self.location
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serde_json::json;
    use tempfile::TempDir;

    fn scope_in(dir: &Path) -> Scope {
        Scope {
            namespace: "test.configuration".into(),
            code_root: None,
            working_dir: Some(dir.to_path_buf()),
        }
    }

    #[test]
    fn test_rejects_unsafe_table_names() {
        for table in ["", "1abc", "a;drop", "a\"b"] {
            assert!(SqliteSource::new("c.db", Location::WorkingDir, table).is_err());
        }
        assert!(SqliteSource::new("c.db", Location::WorkingDir, "settings_v2").is_ok());
    }

    #[test]
    fn test_reads_existing_row() {
        let temp = TempDir::new().unwrap();
        let conn = Connection::open(temp.path().join("config.db")).unwrap();
        conn.execute_batch(
            "CREATE TABLE settings (key TEXT PRIMARY KEY, value TEXT);
             INSERT INTO settings VALUES ('token', 'abc');",
        )
        .unwrap();
        drop(conn);

        let source = SqliteSource::new("config.db", Location::WorkingDir, "settings").unwrap();
        let scope = scope_in(temp.path());
        assert_eq!(source.read("TOKEN", &scope).unwrap(), Lookup::present("abc"));
        assert!(source.read("OTHER", &scope).unwrap().is_absent());
    }

    #[test]
    fn test_missing_file_and_table() {
        let temp = TempDir::new().unwrap();
        let scope = scope_in(temp.path());
        let source = SqliteSource::new("config.db", Location::WorkingDir, "settings").unwrap();
        assert!(source.read("TOKEN", &scope).unwrap().is_absent());

        let compulsory = source.clone().compulsory(true);
        assert_eq!(
            compulsory.read("TOKEN", &scope).unwrap_err().code(),
            ErrorCode::FileMissing
        );

        Connection::open(temp.path().join("config.db"))
            .unwrap()
            .execute_batch("CREATE TABLE other (key TEXT)")
            .unwrap();
        assert!(source.read("TOKEN", &scope).unwrap().is_absent());
        assert_eq!(
            compulsory.read("TOKEN", &scope).unwrap_err().code(),
            ErrorCode::FileMissing
        );
    }

    #[test]
    fn test_values_keep_their_json_type() {
        let temp = TempDir::new().unwrap();
        let scope = scope_in(temp.path());
        let source = SqliteSource::new("config.db", Location::WorkingDir, "settings").unwrap();

        for value in [
            json!(true),
            json!(null),
            json!(1.5),
            json!(-3),
            json!(u64::MAX),
            json!("[1, 2]"),
            json!([1, "two"]),
            json!({"a": {"b": false}}),
        ] {
            source.write("V", &value, &scope).unwrap();
            assert_eq!(source.read("V", &scope).unwrap(), Lookup::Present(value));
        }
    }

    #[test]
    fn test_write_creates_table_and_replaces() {
        let temp = TempDir::new().unwrap();
        let scope = scope_in(temp.path());
        let source = SqliteSource::new("state/config.db", Location::WorkingDir, "settings").unwrap();

        source.write("PORT", &json!(8080), &scope).unwrap();
        assert_eq!(source.read("port", &scope).unwrap(), Lookup::present(8080));

        source.write("PORT", &json!("9090"), &scope).unwrap();
        assert_eq!(source.read("PORT", &scope).unwrap(), Lookup::present("9090"));
    }
}
