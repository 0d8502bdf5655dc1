//! Reconciliation of the datastore against a `projects/` directory tree.
//!
//! Layout is two levels deep: every directory directly under the root is a
//! project, every directory directly under a project holding a
//! `job_data.json` is a job. Each run re-derives candidates from disk and lets
//! the datastore decide what is new, so re-running is always safe.
//!
//! Failures are scoped to the item that caused them. A bad manifest costs one
//! job, an unreadable project directory costs that project's jobs; both end up
//! in [`ImportReport::failures`] and the scan moves on. Only an unreadable root
//! or a failing final query aborts the call.

use crate::core::api::{self, AddOutcome};
use crate::core::error::DatastoreError;
use crate::core::identity::IdentityResolver;
use crate::core::job_data::parse_job_data;
use crate::core::manifest::{MANIFEST_FILE_NAME, read_manifest};
use crate::core::models::{Job, Project, ProjectData};
use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Project,
    Job,
}

/// One candidate that could not be imported.
#[derive(Debug, Clone, Serialize)]
pub struct ImportFailure {
    pub entity: EntityKind,
    pub path: PathBuf,
    /// Project name or job directory name, when it could be determined.
    pub name: Option<String>,
    pub message: String,
}

#[derive(Debug, Default, Serialize)]
pub struct ImportReport {
    /// Jobs created by this run.
    pub jobs: Vec<Job>,
    /// Every project seen on disk that exists in the store, new or not.
    pub projects: Vec<Project>,
    pub failures: Vec<ImportFailure>,
    pub new_projects: usize,
    pub duplicate_projects: usize,
    pub duplicate_jobs: usize,
    /// Job candidates without a manifest.
    pub ignored_dirs: usize,
}

impl ImportReport {
    pub fn into_parts(self) -> (Vec<Job>, Vec<Project>) {
        (self.jobs, self.projects)
    }

    fn record_failure(
        &mut self,
        entity: EntityKind,
        path: &Path,
        name: Option<&str>,
        err: &DatastoreError,
    ) {
        tracing::warn!(?entity, path = %path.display(), error = %err, "import failed");
        self.failures.push(ImportFailure {
            entity,
            path: path.to_path_buf(),
            name: name.map(str::to_string),
            message: err.to_string(),
        });
    }
}

/// Import every project and job under `root` not yet in the store.
pub fn import_datastore(
    conn: &Connection,
    root: &Path,
    resolver: &dyn IdentityResolver,
) -> Result<ImportReport, DatastoreError> {
    let root = std::path::absolute(root)?;
    let mut report = ImportReport::default();
    let mut seen = BTreeSet::new();

    tracing::info!(root = %root.display(), "scanning for projects");
    let listing = subdirectories(&root)?;
    for (path, err) in listing.unreadable {
        let err = DatastoreError::from(err);
        report.record_failure(EntityKind::Project, &path, dir_name(&path), &err);
    }
    for project_dir in listing.dirs {
        let Some(name) = dir_name(&project_dir) else {
            report.record_failure(
                EntityKind::Project,
                &project_dir,
                None,
                &DatastoreError::ValidationError("directory name is not valid UTF-8".into()),
            );
            continue;
        };
        if import_project(conn, &project_dir, name, resolver, &mut report) {
            seen.insert(name.to_string());
        }
    }

    report.projects = api::get_projects_by_names(conn, &seen)?;
    tracing::info!(
        jobs = report.jobs.len(),
        projects = report.projects.len(),
        failures = report.failures.len(),
        "import finished"
    );
    Ok(report)
}

/// Register one project and scan its jobs. Returns whether the project is in
/// the store afterwards.
fn import_project(
    conn: &Connection,
    dir: &Path,
    name: &str,
    resolver: &dyn IdentityResolver,
    report: &mut ImportReport,
) -> bool {
    let owner = match resolver.owner_of(dir) {
        Ok(identity) => identity,
        Err(e) => {
            report.record_failure(EntityKind::Project, dir, Some(name), &e);
            return false;
        }
    };
    let data = ProjectData {
        name: name.to_string(),
        owner: owner.username,
        group: owner.group,
        path: dir.to_path_buf(),
        description: None,
    };

    match api::add_project(conn, &data) {
        AddOutcome::Created(project) => {
            tracing::info!(project = %project.name, owner = %project.owner, "added project");
            report.new_projects += 1;
        }
        AddOutcome::Duplicate { .. } => {
            tracing::debug!(project = name, "project already registered");
            report.duplicate_projects += 1;
        }
        AddOutcome::Failed(e) => {
            report.record_failure(EntityKind::Project, dir, Some(name), &e);
            return false;
        }
    }

    match subdirectories(dir) {
        Ok(listing) => {
            for (path, err) in listing.unreadable {
                let err = DatastoreError::from(err);
                report.record_failure(EntityKind::Job, &path, dir_name(&path), &err);
            }
            for job_dir in listing.dirs {
                import_job(conn, &job_dir, name, report);
            }
        }
        Err(e) => {
            let err = DatastoreError::from(e);
            report.record_failure(EntityKind::Project, dir, Some(name), &err);
        }
    }
    true
}

fn import_job(conn: &Connection, dir: &Path, project: &str, report: &mut ImportReport) {
    let manifest = dir.join(MANIFEST_FILE_NAME);
    let job_name = dir_name(dir);
    match fs::metadata(&manifest) {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => {
            tracing::debug!(dir = %dir.display(), "manifest is not a regular file; not a job");
            report.ignored_dirs += 1;
            return;
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(dir = %dir.display(), "no manifest; not a job");
            report.ignored_dirs += 1;
            return;
        }
        Err(e) => {
            report.record_failure(EntityKind::Job, dir, job_name, &DatastoreError::from(e));
            return;
        }
    }

    let parsed = read_manifest(&manifest).and_then(|raw| {
        parse_job_data(&raw).map_err(|e| DatastoreError::Manifest {
            path: manifest.clone(),
            reason: e.to_string(),
        })
    });
    let mut data = match parsed {
        Ok(data) => data,
        Err(e) => {
            report.record_failure(EntityKind::Job, dir, job_name, &e);
            return;
        }
    };
    // Where the job sits on disk wins over what the manifest remembers.
    data.project = Some(project.to_string());
    data.path = Some(dir.to_string_lossy().into_owned());

    match api::add_job(conn, &data) {
        AddOutcome::Created(job) => {
            tracing::info!(job = %job.job_id, project, "added job");
            report.jobs.push(job);
        }
        AddOutcome::Duplicate { key } => {
            tracing::debug!(job = %key, project, "job already registered");
            report.duplicate_jobs += 1;
        }
        AddOutcome::Failed(e) => report.record_failure(EntityKind::Job, dir, job_name, &e),
    }
}

/// Immediate subdirectories of one directory, sorted by name.
#[derive(Debug, Default)]
struct Listing {
    dirs: Vec<PathBuf>,
    /// Entries whose metadata could not be read.
    unreadable: Vec<(PathBuf, io::Error)>,
}

/// List `dir`, following symlinks. Dangling symlinks are skipped.
fn subdirectories(dir: &Path) -> io::Result<Listing> {
    let mut listing = Listing::default();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        match fs::metadata(&path) {
            Ok(meta) if meta.is_dir() => listing.dirs.push(path),
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "dangling symlink skipped");
            }
            Err(e) => listing.unreadable.push((path, e)),
        }
    }
    listing.dirs.sort();
    listing.unreadable.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(listing)
}

fn dir_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}
