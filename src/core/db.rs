use crate::core::error;
use crate::core::schemas;
use rusqlite::Connection;
use std::fs;
use std::path::Path;

pub fn db_connect(db_path: &str) -> Result<Connection, error::DatastoreError> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(std::time::Duration::from_secs(5))
        .map_err(error::DatastoreError::RusqliteError)?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))
        .map_err(error::DatastoreError::RusqliteError)?;
    conn.execute("PRAGMA foreign_keys=ON;", [])
        .map_err(error::DatastoreError::RusqliteError)?;
    Ok(conn)
}

/// In-memory datastore with the full schema applied. Used by tests and dry runs.
pub fn open_in_memory() -> Result<Connection, error::DatastoreError> {
    let conn = Connection::open_in_memory()?;
    conn.execute("PRAGMA foreign_keys=ON;", [])?;
    initialize_schema(&conn)?;
    Ok(conn)
}

/// Open (creating if needed) the database file and apply the schema.
pub fn open_datastore(db_path: &Path) -> Result<Connection, error::DatastoreError> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(error::DatastoreError::IoError)?;
        }
    }
    let conn = db_connect(&db_path.to_string_lossy())?;
    initialize_schema(&conn)?;
    Ok(conn)
}

pub fn initialize_schema(conn: &Connection) -> Result<(), error::DatastoreError> {
    for ddl in schemas::ALL_SCHEMAS {
        conn.execute(ddl, [])?;
    }
    Ok(())
}

/// Run `f` inside a named SAVEPOINT. On error everything `f` wrote is rolled back
/// and the error is returned; on success the savepoint is released.
///
/// Savepoints nest, so this composes with an enclosing transaction.
pub fn with_savepoint<F, R>(conn: &Connection, name: &str, f: F) -> Result<R, error::DatastoreError>
where
    F: FnOnce(&Connection) -> Result<R, error::DatastoreError>,
{
    conn.execute_batch(&format!("SAVEPOINT {name};"))?;
    match f(conn) {
        Ok(value) => {
            conn.execute_batch(&format!("RELEASE {name};"))?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) =
                conn.execute_batch(&format!("ROLLBACK TO {name}; RELEASE {name};"))
            {
                tracing::warn!(
                    savepoint = name,
                    error = %rollback_err,
                    "savepoint rollback failed"
                );
            }
            Err(err)
        }
    }
}
