use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, ErrorCode};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::StoreError;
use crate::models::{Company, Job};

pub const JOBS_TABLE: &str = "jobs";
pub const COMPANIES_TABLE: &str = "companies";

/// A type that can be written as one row of a replaced table.
pub trait TableRow {
    /// `(name, declaration)` pairs, in insertion order.
    const COLUMNS: &'static [(&'static str, &'static str)];

    fn values(&self) -> Result<Vec<Value>, serde_json::Error>;
}

/// Exclusive handle on the local store file.
///
/// The lock is taken in [`Store::connect`] and held until the handle is
/// dropped, so a second loader against the same file fails fast.
pub struct Store {
    conn: Connection,
    path: PathBuf,
}

impl Store {
    pub fn connect(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let open_err = |source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        };

        let conn = Connection::open(path).map_err(open_err)?;
        conn.busy_timeout(Duration::ZERO).map_err(open_err)?;
        conn.pragma_update_and_check(None, "locking_mode", "EXCLUSIVE", |row| {
            row.get::<_, String>(0)
        })
        .map_err(open_err)?;

        // In exclusive locking mode the lock survives the commit.
        match conn.execute_batch("BEGIN EXCLUSIVE; COMMIT;") {
            Ok(()) => {}
            Err(e) if is_busy(&e) => {
                return Err(StoreError::Locked {
                    path: path.to_path_buf(),
                });
            }
            Err(e) => return Err(open_err(e)),
        }

        tracing::debug!("Opened store at {}", path.display());
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn default_path() -> PathBuf {
        // Use XDG data directory or fallback
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "muse-ingest") {
            proj_dirs.data_dir().join("muse_jobs.db")
        } else {
            PathBuf::from("muse_jobs.db")
        }
    }

    /// Swap the full contents of `name` for `rows` in one transaction.
    ///
    /// Rows are serialized before the transaction opens; on any failure the
    /// previous table is left as it was.
    pub fn replace_table<R: TableRow>(
        &mut self,
        name: &str,
        rows: &[R],
    ) -> Result<usize, StoreError> {
        validate_table_name(name)?;

        let values = rows
            .iter()
            .map(R::values)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| StoreError::Serialize {
                table: name.to_string(),
                source,
            })?;

        let columns = R::COLUMNS
            .iter()
            .map(|(column, decl)| format!("{} {}", column, decl))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=R::COLUMNS.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");

        let tx = self.conn.transaction()?;
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS \"{name}\";
             CREATE TABLE \"{name}\" ({columns});"
        ))?;
        {
            let mut stmt =
                tx.prepare(&format!("INSERT INTO \"{name}\" VALUES ({placeholders})"))?;
            for row in &values {
                stmt.execute(params_from_iter(row.iter()))?;
            }
        }
        tx.commit()?;

        tracing::info!("Replaced table '{}' with {} rows", name, values.len());
        Ok(values.len())
    }

    pub fn table_exists(&self, name: &str) -> Result<bool, StoreError> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
            [name],
            |row| row.get(0),
        )?;
        Ok(tables > 0)
    }

    /// Row count of `name`, or `None` if the table was never written.
    pub fn row_count(&self, name: &str) -> Result<Option<i64>, StoreError> {
        validate_table_name(name)?;
        if !self.table_exists(name)? {
            return Ok(None);
        }
        let count = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM \"{name}\""), [], |row| row.get(0))?;
        Ok(Some(count))
    }

    #[cfg(test)]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}

fn validate_table_name(name: &str) -> Result<(), StoreError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidTableName(name.to_string()))
    }
}

fn text(value: &Option<String>) -> Value {
    match value {
        Some(s) => Value::Text(s.clone()),
        None => Value::Null,
    }
}

// --- Row mappings ---

impl TableRow for Job {
    const COLUMNS: &'static [(&'static str, &'static str)] = &[
        ("job_id", "INTEGER NOT NULL"),
        ("description", "TEXT"),
        ("type", "TEXT"),
        ("publication_at", "TEXT"),
        ("name", "TEXT"),
        ("short_name", "TEXT"),
        ("model_type", "TEXT"),
        ("locations", "TEXT NOT NULL"), // JSON array
        ("is_remote_eligible", "INTEGER NOT NULL"),
        ("categories", "TEXT NOT NULL"), // JSON array
        ("landing_page", "TEXT NOT NULL"),
        ("company_id", "INTEGER NOT NULL"),
        ("level", "TEXT"),
        ("level_short_name", "TEXT"),
    ];

    fn values(&self) -> Result<Vec<Value>, serde_json::Error> {
        Ok(vec![
            Value::Integer(self.job_id),
            text(&self.description),
            text(&self.job_type),
            text(&self.publication_at),
            text(&self.name),
            text(&self.short_name),
            text(&self.model_type),
            Value::Text(serde_json::to_string(&self.locations)?),
            Value::Integer(i64::from(self.is_remote_eligible)),
            Value::Text(serde_json::to_string(&self.categories)?),
            Value::Text(self.landing_page.clone()),
            Value::Integer(self.company_id),
            text(&self.level),
            text(&self.level_short_name),
        ])
    }
}

impl TableRow for Company {
    const COLUMNS: &'static [(&'static str, &'static str)] = &[
        ("company_id", "INTEGER PRIMARY KEY"),
        ("short_name", "TEXT"),
        ("name", "TEXT"),
    ];

    fn values(&self) -> Result<Vec<Value>, serde_json::Error> {
        Ok(vec![
            Value::Integer(self.company_id),
            text(&self.short_name),
            text(&self.name),
        ])
    }
}
