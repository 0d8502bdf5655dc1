use figment::Figment;
use seamm_datastore::core::api::{self, AddOutcome};
use seamm_datastore::core::config::{self, ConfigOverrides};
use seamm_datastore::core::db;
use seamm_datastore::core::error::DatastoreError;
use seamm_datastore::core::job_data::parse_job_data;
use seamm_datastore::core::manifest::{MANIFEST_FILE_NAME, read_manifest};
use seamm_datastore::core::models::ProjectData;
use seamm_datastore::core::store::Store;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn test_manifest_to_job_record() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join(MANIFEST_FILE_NAME);
    let manifest = r#"!MolSSI job_data 1.0
{
  "id": 12,
  "title": "Water",
  "status": "finished",
  "energy": -76.4
}
"#;
    fs::write(&path, manifest).unwrap();

    let raw = read_manifest(&path).unwrap();
    let mut data = parse_job_data(&raw).unwrap();
    data.project = Some("proj".into());
    data.path = Some(tmp.path().to_string_lossy().into_owned());

    let conn = db::open_in_memory().unwrap();
    api::add_project(
        &conn,
        &ProjectData {
            name: "proj".into(),
            owner: "chemist".into(),
            group: "lab".into(),
            path: PathBuf::from("/p/proj"),
            description: None,
        },
    )
    .created()
    .unwrap();

    let job = api::add_job(&conn, &data).created().unwrap();
    assert_eq!(job.job_id, "12");
    assert_eq!(job.status, "finished");
    assert_eq!(job.title.as_deref(), Some("Water"));
    assert_eq!(job.data["energy"], -76.4);
}

#[test]
fn test_failed_add_leaves_no_partial_rows() {
    let conn = db::open_in_memory().unwrap();
    let mut data = parse_job_data(&serde_json::json!({"id": "orphan"})).unwrap();
    data.project = Some("missing".into());
    data.path = Some("/p/missing/orphan".into());

    match api::add_job(&conn, &data) {
        AddOutcome::Failed(DatastoreError::NotFound(_)) => {}
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(api::get_job(&conn, "orphan").unwrap().is_none());
}

#[test]
fn test_config_file_drives_store_location() {
    let tmp = tempdir().unwrap();
    let cfg_path = tmp.path().join("datastore.toml");
    fs::write(
        &cfg_path,
        "database = \"db/seamm.db\"\nprojects_dir = \"/srv/projects\"\n",
    )
    .unwrap();
    let overrides = ConfigOverrides {
        config_path: Some(cfg_path),
        ..Default::default()
    };
    let cfg = config::resolve(&overrides, Figment::new(), None, None).unwrap();
    assert_eq!(cfg.store.db_path, tmp.path().join("db").join("seamm.db"));
    assert_eq!(cfg.store.projects_dir, PathBuf::from("/srv/projects"));

    let conn = cfg.store.open().unwrap();
    assert_eq!(api::count_roles(&conn).unwrap(), 0);
    assert!(cfg.store.db_path.exists());
}

#[test]
fn test_reopening_store_keeps_data() {
    let tmp = tempdir().unwrap();
    let store = Store::at_root(tmp.path());
    {
        let conn = store.open().unwrap();
        api::add_project(
            &conn,
            &ProjectData {
                name: "kept".into(),
                owner: "chemist".into(),
                group: "lab".into(),
                path: store.project_path("kept"),
                description: Some("survives reopen".into()),
            },
        )
        .created()
        .unwrap();
    }
    let conn = store.open().unwrap();
    let project = api::get_project(&conn, "kept").unwrap().unwrap();
    assert_eq!(project.description.as_deref(), Some("survives reopen"));
}
