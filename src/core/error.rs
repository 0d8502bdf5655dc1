use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatastoreError {
    #[error("SQLite error: {0}")]
    RusqliteError(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Config error: {0}")]
    ConfigError(String),
    #[error("Malformed manifest {}: {reason}", .path.display())]
    Manifest { path: PathBuf, reason: String },
    #[error("Malformed job data: {0}")]
    JobData(String),
    #[error("Identity lookup failed for {}: {reason}", .path.display())]
    Identity { path: PathBuf, reason: String },
    #[error("Password hashing failed: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),
    #[error("Bootstrap failed: {0}")]
    Bootstrap(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<figment::Error> for DatastoreError {
    fn from(err: figment::Error) -> Self {
        DatastoreError::ConfigError(err.to_string())
    }
}

impl DatastoreError {
    /// True when the underlying SQLite failure is a UNIQUE or PRIMARY KEY violation.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            DatastoreError::RusqliteError(rusqlite::Error::SqliteFailure(e, _)) => {
                e.code == rusqlite::ErrorCode::ConstraintViolation
                    && (e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                        || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
            }
            _ => false,
        }
    }
}
