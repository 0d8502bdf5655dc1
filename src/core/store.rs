//! Store handle: where one datastore keeps its database and its job tree.
//!
//! The conventional layout is a single root directory:
//!
//! ```text
//! <root>/seamm.db          SQLite database
//! <root>/projects/<name>/  one folder per project
//! <root>/projects/<name>/<job>/job_data.json
//! ```
//!
//! Both locations can be overridden independently through configuration.

use crate::core::{db, error, schemas};
use rusqlite::Connection;
use std::path::{Path, PathBuf};

pub const PROJECTS_DIR_NAME: &str = "projects";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Store {
    /// SQLite database file
    pub db_path: PathBuf,
    /// Directory whose immediate subdirectories are projects
    pub projects_dir: PathBuf,
}

impl Store {
    /// Store using the conventional layout under `root`.
    pub fn at_root(root: &Path) -> Self {
        Self {
            db_path: root.join(schemas::DATASTORE_DB_NAME),
            projects_dir: root.join(PROJECTS_DIR_NAME),
        }
    }

    /// Open the database, creating the file and schema on first use.
    pub fn open(&self) -> Result<Connection, error::DatastoreError> {
        db::open_datastore(&self.db_path)
    }

    /// Location a project named `name` conventionally lives at.
    pub fn project_path(&self, name: &str) -> PathBuf {
        self.projects_dir.join(name)
    }
}
