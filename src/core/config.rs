//! Layered configuration built on figment.
//!
//! Precedence, highest first: command-line flags, environment variables, the
//! TOML config file, built-in defaults. Relative paths in the config file are
//! resolved against the file's own directory.
//!
//! # Environment Variable Mapping
//!
//! `SEAMM_DATASTORE_ROOT` -> `root`, `SEAMM_DATASTORE_DB` -> `database`,
//! `SEAMM_DATASTORE_PROJECTS` -> `projects_dir`, `SEAMM_DEFAULT_PROJECT` ->
//! `default_project`. Other `SEAMM_DATASTORE_*` variables (the log filter) are
//! not configuration keys and are ignored here.

use crate::core::error::DatastoreError;
use crate::core::store::{PROJECTS_DIR_NAME, Store};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::value::magic::RelativePathBuf;
use figment::{Figment, Provider};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const ENV_PREFIX: &str = "SEAMM_DATASTORE_";
pub const ENV_ROOT: &str = "SEAMM_DATASTORE_ROOT";
pub const ENV_DB: &str = "SEAMM_DATASTORE_DB";
pub const ENV_PROJECTS: &str = "SEAMM_DATASTORE_PROJECTS";
pub const ENV_DEFAULT_PROJECT: &str = "SEAMM_DEFAULT_PROJECT";

pub const DEFAULT_ROOT_DIR_NAME: &str = "SEAMM_DATASTORE";
pub const DEFAULT_PROJECT_NAME: &str = "default";

/// Keys accepted from `datastore.toml`, the environment and the command line.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigLayers {
    root: Option<RelativePathBuf>,
    database: Option<RelativePathBuf>,
    projects_dir: Option<RelativePathBuf>,
    default_project: Option<String>,
}

/// Values supplied on the command line. Unset fields leave lower layers alone.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigOverrides {
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projects_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_project: Option<String>,
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct DatastoreConfig {
    pub store: Store,
    pub default_project: String,
}

/// `~/.seamm/datastore.toml`, when a home directory is known.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".seamm").join("datastore.toml"))
}

/// The process environment, mapped onto config keys.
pub fn env_provider() -> Figment {
    Figment::new()
        .merge(
            Env::prefixed(ENV_PREFIX)
                .only(&["root", "db", "projects"])
                .map(|key| match key.as_str().to_ascii_lowercase().as_str() {
                    "db" => "database".into(),
                    "projects" => "projects_dir".into(),
                    other => other.to_string().into(),
                }),
        )
        .merge(
            Env::raw()
                .only(&[ENV_DEFAULT_PROJECT])
                .map(|_| "default_project".into()),
        )
}

/// Resolve configuration from the process environment and the user's home directory.
pub fn load(overrides: &ConfigOverrides) -> Result<DatastoreConfig, DatastoreError> {
    resolve(overrides, env_provider(), dirs::home_dir(), default_config_path())
}

/// Testable core of [`load`]: the environment provider and home directory are injected.
pub fn resolve(
    overrides: &ConfigOverrides,
    env: impl Provider,
    home: Option<PathBuf>,
    implicit_config: Option<PathBuf>,
) -> Result<DatastoreConfig, DatastoreError> {
    let mut figment = Figment::from(Serialized::default("default_project", DEFAULT_PROJECT_NAME));
    if let Some(home) = home {
        figment = figment.merge(Serialized::default("root", home.join(DEFAULT_ROOT_DIR_NAME)));
    }

    // An explicit --config must exist; the implicit one is optional.
    match (&overrides.config_path, implicit_config) {
        (Some(path), _) => {
            if !path.is_file() {
                return Err(DatastoreError::ConfigError(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
            figment = figment.merge(Toml::file(std::path::absolute(path)?));
        }
        (None, Some(path)) if path.is_file() => {
            figment = figment.merge(Toml::file(path));
        }
        _ => {}
    }

    let layers: ConfigLayers = figment
        .merge(env)
        .merge(Serialized::defaults(overrides))
        .extract()?;

    let root = non_empty(layers.root);
    let database = non_empty(layers.database);
    let projects_dir = non_empty(layers.projects_dir);

    let store = match (database, projects_dir, root) {
        (Some(db_path), Some(projects_dir), _) => Store {
            db_path,
            projects_dir,
        },
        (database, projects_dir, Some(root)) => {
            let base = Store::at_root(&root);
            Store {
                db_path: database.unwrap_or(base.db_path),
                projects_dir: projects_dir.unwrap_or_else(|| root.join(PROJECTS_DIR_NAME)),
            }
        }
        _ => {
            return Err(DatastoreError::ConfigError(format!(
                "no datastore location: set --root, {} or a home directory",
                ENV_ROOT
            )));
        }
    };

    let default_project = layers
        .default_project
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_PROJECT_NAME.to_string());

    Ok(DatastoreConfig {
        store,
        default_project,
    })
}

// An empty variable counts as unset.
fn non_empty(path: Option<RelativePathBuf>) -> Option<PathBuf> {
    path.map(|p| p.relative()).filter(|p| !p.as_os_str().is_empty())
}
