use seamm_datastore::core::api;
use seamm_datastore::core::db;
use seamm_datastore::core::error::DatastoreError;
use seamm_datastore::core::identity::{HostIdentity, IdentityResolver};
use seamm_datastore::core::models::ProjectData;
use seamm_datastore::plugins::bootstrap;
use seamm_datastore::plugins::import::{EntityKind, import_datastore};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

struct FixedOwner;

impl IdentityResolver for FixedOwner {
    fn owner_of(&self, _path: &Path) -> Result<HostIdentity, DatastoreError> {
        Ok(HostIdentity {
            username: "chemist".to_string(),
            group: "lab".to_string(),
        })
    }
}

/// Refuses to resolve any directory whose name is `locked`.
struct LockedOwner;

impl IdentityResolver for LockedOwner {
    fn owner_of(&self, path: &Path) -> Result<HostIdentity, DatastoreError> {
        if path.file_name().and_then(|n| n.to_str()) == Some("locked") {
            return Err(DatastoreError::Identity {
                path: path.to_path_buf(),
                reason: "permission denied".into(),
            });
        }
        FixedOwner.owner_of(path)
    }
}

fn write_job(root: &Path, project: &str, job: &str, manifest: &str) -> PathBuf {
    let dir = root.join(project).join(job);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("job_data.json"), manifest).unwrap();
    dir
}

fn project_names(projects: &[seamm_datastore::core::models::Project]) -> Vec<&str> {
    projects.iter().map(|p| p.name.as_str()).collect()
}

#[test]
fn test_single_job_then_reimport_is_idempotent() {
    let tmp = tempdir().unwrap();
    write_job(tmp.path(), "proj1", "job1", r#"{"id": "abc"}"#);
    let conn = db::open_in_memory().unwrap();

    let first = import_datastore(&conn, tmp.path(), &FixedOwner).unwrap();
    assert!(first.failures.is_empty(), "{:?}", first.failures);
    let (jobs, projects) = first.into_parts();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].job_id, "abc");
    assert_eq!(jobs[0].project, "proj1");
    assert_eq!(project_names(&projects), vec!["proj1"]);

    let second = import_datastore(&conn, tmp.path(), &FixedOwner).unwrap();
    assert!(second.jobs.is_empty());
    assert_eq!(second.duplicate_jobs, 1);
    assert_eq!(second.duplicate_projects, 1);
    assert_eq!(second.new_projects, 0);
    assert_eq!(second.projects, projects);
    assert_eq!(api::list_jobs(&conn, None).unwrap().len(), 1);
}

#[test]
fn test_project_and_job_paths_are_absolute_and_owned() {
    let tmp = tempdir().unwrap();
    let job_dir = write_job(tmp.path(), "proj1", "job1", r#"{"id": "abc"}"#);
    let conn = db::open_in_memory().unwrap();

    let report = import_datastore(&conn, tmp.path(), &FixedOwner).unwrap();
    let project = &report.projects[0];
    assert_eq!(project.owner, "chemist");
    assert_eq!(project.group, "lab");
    assert!(Path::new(&project.path).is_absolute());
    assert_eq!(PathBuf::from(&project.path), tmp.path().join("proj1"));
    assert_eq!(PathBuf::from(&report.jobs[0].path), job_dir);
}

#[test]
fn test_legacy_header_parses_like_plain_json() {
    let tmp = tempdir().unwrap();
    write_job(tmp.path(), "plain", "j", "{\"id\": \"p1\", \"title\": \"same\"}");
    write_job(tmp.path(), "legacy", "j", "v2.0\n{\"id\": \"l1\", \"title\": \"same\"}");
    let conn = db::open_in_memory().unwrap();

    let report = import_datastore(&conn, tmp.path(), &FixedOwner).unwrap();
    assert!(report.failures.is_empty(), "{:?}", report.failures);
    assert_eq!(report.jobs.len(), 2);
    let plain = api::get_job(&conn, "p1").unwrap().unwrap();
    let legacy = api::get_job(&conn, "l1").unwrap().unwrap();
    assert_eq!(plain.title, legacy.title);
    assert_eq!(plain.status, legacy.status);
    assert_eq!(plain.data, legacy.data);
}

#[test]
fn test_folder_without_manifest_is_ignored() {
    let tmp = tempdir().unwrap();
    fs::create_dir_all(tmp.path().join("proj1").join("scratch")).unwrap();
    fs::write(tmp.path().join("proj1").join("scratch").join("notes.txt"), "x").unwrap();
    let conn = db::open_in_memory().unwrap();

    let report = import_datastore(&conn, tmp.path(), &FixedOwner).unwrap();
    assert!(report.jobs.is_empty());
    assert!(report.failures.is_empty());
    assert_eq!(report.ignored_dirs, 1);
    assert_eq!(project_names(&report.projects), vec!["proj1"]);
}

#[test]
fn test_preexisting_project_still_reported_and_scanned() {
    let tmp = tempdir().unwrap();
    write_job(tmp.path(), "old", "job1", r#"{"id": "o1"}"#);
    write_job(tmp.path(), "new", "job1", r#"{"id": "n1"}"#);
    let conn = db::open_in_memory().unwrap();
    api::add_project(
        &conn,
        &ProjectData {
            name: "old".into(),
            owner: "someone".into(),
            group: "else".into(),
            path: tmp.path().join("old"),
            description: None,
        },
    )
    .created()
    .unwrap();

    let report = import_datastore(&conn, tmp.path(), &FixedOwner).unwrap();
    assert_eq!(report.jobs.len(), 2);
    assert_eq!(report.new_projects, 1);
    assert_eq!(report.duplicate_projects, 1);
    assert_eq!(project_names(&report.projects), vec!["new", "old"]);
    // The existing record is untouched.
    let old = api::get_project(&conn, "old").unwrap().unwrap();
    assert_eq!(old.owner, "someone");
}

#[test]
fn test_corrupt_manifest_does_not_block_siblings() {
    let tmp = tempdir().unwrap();
    write_job(tmp.path(), "proj1", "a_good", r#"{"id": "g1"}"#);
    let bad = write_job(tmp.path(), "proj1", "b_bad", r#"{"id": "#);
    write_job(tmp.path(), "proj1", "c_good", r#"{"id": "g2"}"#);
    write_job(tmp.path(), "proj2", "job", r#"{"id": "g3"}"#);
    let conn = db::open_in_memory().unwrap();

    let report = import_datastore(&conn, tmp.path(), &FixedOwner).unwrap();
    let ids: Vec<_> = report.jobs.iter().map(|j| j.job_id.as_str()).collect();
    assert_eq!(ids, vec!["g1", "g2", "g3"]);
    assert_eq!(report.failures.len(), 1);
    let failure = &report.failures[0];
    assert_eq!(failure.entity, EntityKind::Job);
    assert_eq!(failure.path, bad);
    assert_eq!(failure.name.as_deref(), Some("b_bad"));
    assert!(failure.message.contains("job_data.json"), "{}", failure.message);
}

#[test]
fn test_empty_and_headerless_blank_manifests_are_failures() {
    let tmp = tempdir().unwrap();
    write_job(tmp.path(), "proj1", "empty", "");
    write_job(tmp.path(), "proj1", "blank_first", "\n{\"id\": \"x\"}");
    write_job(tmp.path(), "proj1", "no_id", "{\"title\": \"t\"}");
    let conn = db::open_in_memory().unwrap();

    let report = import_datastore(&conn, tmp.path(), &FixedOwner).unwrap();
    assert!(report.jobs.is_empty());
    assert_eq!(report.failures.len(), 3);
    assert!(report.failures.iter().all(|f| f.message.starts_with("Malformed manifest")));
}

#[test]
fn test_duplicate_job_id_across_projects_is_skipped() {
    let tmp = tempdir().unwrap();
    write_job(tmp.path(), "a", "job", r#"{"id": 17}"#);
    write_job(tmp.path(), "b", "copy_of_job", r#"{"id": 17}"#);
    let conn = db::open_in_memory().unwrap();

    let report = import_datastore(&conn, tmp.path(), &FixedOwner).unwrap();
    assert_eq!(report.jobs.len(), 1);
    assert_eq!(report.jobs[0].project, "a");
    assert_eq!(report.duplicate_jobs, 1);
    assert!(report.failures.is_empty());
}

#[test]
fn test_empty_root_and_empty_project() {
    let tmp = tempdir().unwrap();
    let conn = db::open_in_memory().unwrap();
    let report = import_datastore(&conn, tmp.path(), &FixedOwner).unwrap();
    assert!(report.jobs.is_empty() && report.projects.is_empty());

    fs::create_dir(tmp.path().join("lonely")).unwrap();
    fs::write(tmp.path().join("README"), "not a project").unwrap();
    let report = import_datastore(&conn, tmp.path(), &FixedOwner).unwrap();
    assert!(report.jobs.is_empty());
    assert_eq!(project_names(&report.projects), vec!["lonely"]);
}

#[test]
fn test_missing_root_is_an_error() {
    let tmp = tempdir().unwrap();
    let conn = db::open_in_memory().unwrap();
    let err = import_datastore(&conn, &tmp.path().join("nope"), &FixedOwner).unwrap_err();
    assert!(matches!(err, DatastoreError::IoError(_)));
}

#[test]
fn test_unresolvable_owner_skips_only_that_project() {
    let tmp = tempdir().unwrap();
    write_job(tmp.path(), "locked", "job", r#"{"id": "l"}"#);
    write_job(tmp.path(), "open", "job", r#"{"id": "o"}"#);
    let conn = db::open_in_memory().unwrap();

    let report = import_datastore(&conn, tmp.path(), &LockedOwner).unwrap();
    assert_eq!(project_names(&report.projects), vec!["open"]);
    assert_eq!(report.jobs.len(), 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].entity, EntityKind::Project);
    assert_eq!(report.failures[0].name.as_deref(), Some("locked"));
}

#[cfg(unix)]
#[test]
fn test_broken_symlink_is_not_a_candidate() {
    let tmp = tempdir().unwrap();
    write_job(tmp.path(), "proj1", "job1", r#"{"id": "abc"}"#);
    std::os::unix::fs::symlink(tmp.path().join("gone"), tmp.path().join("dangling")).unwrap();
    let conn = db::open_in_memory().unwrap();

    let report = import_datastore(&conn, tmp.path(), &FixedOwner).unwrap();
    assert_eq!(project_names(&report.projects), vec!["proj1"]);
    assert!(report.failures.is_empty());
}

#[test]
fn test_import_after_bootstrap_reuses_default_project() {
    let tmp = tempdir().unwrap();
    let manifest = "!MolSSI job_data 1.0\n{\"id\": 1, \"projects\": [\"default\"]}";
    write_job(tmp.path(), "default", "Job_000001", manifest);
    let conn = db::open_in_memory().unwrap();
    let host = FixedOwner.owner_of(tmp.path()).unwrap();
    bootstrap::initialize_with_host(&conn, "default", &tmp.path().join("default"), &host).unwrap();

    let report = import_datastore(&conn, tmp.path(), &FixedOwner).unwrap();
    assert_eq!(report.new_projects, 0);
    assert_eq!(report.duplicate_projects, 1);
    assert_eq!(report.jobs.len(), 1);
    assert_eq!(report.jobs[0].job_id, "1");
    assert_eq!(project_names(&report.projects), vec!["default"]);
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
}

#[cfg(unix)]
#[test]
fn test_unlistable_project_is_kept_and_siblings_scanned() {
    let tmp = tempdir().unwrap();
    write_job(tmp.path(), "a_sealed", "job", r#"{"id": "s1"}"#);
    write_job(tmp.path(), "b_open", "job", r#"{"id": "o1"}"#);
    let sealed = tmp.path().join("a_sealed");
    set_mode(&sealed, 0o000);
    if fs::read_dir(&sealed).is_ok() {
        // Privileged user: permissions are not enforced.
        set_mode(&sealed, 0o755);
        return;
    }
    let conn = db::open_in_memory().unwrap();

    let report = import_datastore(&conn, tmp.path(), &FixedOwner).unwrap();
    set_mode(&sealed, 0o755);

    assert_eq!(report.failures.len(), 1, "{:?}", report.failures);
    let failure = &report.failures[0];
    assert_eq!(failure.entity, EntityKind::Project);
    assert_eq!(failure.path, sealed);
    assert_eq!(failure.name.as_deref(), Some("a_sealed"));
    assert_eq!(project_names(&report.projects), vec!["a_sealed", "b_open"]);
    let ids: Vec<_> = report.jobs.iter().map(|j| j.job_id.as_str()).collect();
    assert_eq!(ids, vec!["o1"]);
}

#[cfg(unix)]
#[test]
fn test_unreadable_manifest_is_a_job_failure() {
    let tmp = tempdir().unwrap();
    let locked = write_job(tmp.path(), "proj1", "a_locked", r#"{"id": "l1"}"#);
    write_job(tmp.path(), "proj1", "b_fine", r#"{"id": "f1"}"#);
    let manifest = locked.join("job_data.json");
    set_mode(&manifest, 0o000);
    if fs::read(&manifest).is_ok() {
        set_mode(&manifest, 0o644);
        return;
    }
    let conn = db::open_in_memory().unwrap();

    let report = import_datastore(&conn, tmp.path(), &FixedOwner).unwrap();
    set_mode(&manifest, 0o644);

    assert_eq!(report.failures.len(), 1, "{:?}", report.failures);
    let failure = &report.failures[0];
    assert_eq!(failure.entity, EntityKind::Job);
    assert_eq!(failure.path, locked);
    assert!(failure.message.starts_with("I/O error"), "{}", failure.message);
    assert_eq!(report.ignored_dirs, 0);
    assert_eq!(report.jobs.len(), 1);
    assert_eq!(report.jobs[0].job_id, "f1");
}

#[cfg(unix)]
#[test]
fn test_unsearchable_project_reports_each_job_candidate() {
    let tmp = tempdir().unwrap();
    let job = write_job(tmp.path(), "proj1", "job1", r#"{"id": "j1"}"#);
    let project = tmp.path().join("proj1");
    // Readable but not searchable: names list, stat fails.
    set_mode(&project, 0o644);
    if fs::metadata(&job).is_ok() {
        set_mode(&project, 0o755);
        return;
    }
    let conn = db::open_in_memory().unwrap();

    let report = import_datastore(&conn, tmp.path(), &FixedOwner).unwrap();
    set_mode(&project, 0o755);

    assert_eq!(report.failures.len(), 1, "{:?}", report.failures);
    let failure = &report.failures[0];
    assert_eq!(failure.entity, EntityKind::Job);
    assert_eq!(failure.path, job);
    assert_eq!(failure.name.as_deref(), Some("job1"));
    assert_eq!(report.ignored_dirs, 0);
    assert!(report.jobs.is_empty());
    assert_eq!(project_names(&report.projects), vec!["proj1"]);
}
