//! Datastore API: the only code that writes rows.
//!
//! `add_project` and `add_job` never signal "already there" through an error.
//! They return an [`AddOutcome`], so callers branch on an explicit variant and
//! the insert attempt itself is the duplicate check (no query-then-insert race).

use crate::core::db;
use crate::core::error::DatastoreError;
use crate::core::job_data::JobData;
use crate::core::models::{Job, Project, ProjectData, Role};
use crate::core::time;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use std::collections::BTreeSet;

/// Result of a registration attempt.
#[derive(Debug)]
pub enum AddOutcome<T> {
    Created(T),
    /// A record with the same unique key already exists; nothing was written.
    Duplicate { key: String },
    /// Anything else. Whatever the attempt wrote has been rolled back.
    Failed(DatastoreError),
}

impl<T> AddOutcome<T> {
    fn from_result(result: Result<T, DatastoreError>, key: &str) -> Self {
        match result {
            Ok(value) => AddOutcome::Created(value),
            Err(e) if e.is_unique_violation() => AddOutcome::Duplicate {
                key: key.to_string(),
            },
            Err(e) => AddOutcome::Failed(e),
        }
    }

    pub fn created(self) -> Option<T> {
        match self {
            AddOutcome::Created(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, AddOutcome::Duplicate { .. })
    }
}

// --- Passwords ---

/// bcrypt work factor for stored passwords.
pub const BCRYPT_COST: u32 = bcrypt::DEFAULT_COST;

/// bcrypt hash in modular crypt format (`$2b$<cost>$<salt+digest>`).
pub fn hash_password(password: &str) -> Result<String, DatastoreError> {
    Ok(bcrypt::hash(password, BCRYPT_COST)?)
}

/// False for a wrong password and for anything that is not a bcrypt hash.
pub fn verify_password(stored: &str, password: &str) -> bool {
    bcrypt::verify(password, stored).unwrap_or(false)
}

// --- Roles, groups, users ---

pub fn add_role(conn: &Connection, role: Role) -> Result<i64, DatastoreError> {
    conn.execute("INSERT INTO roles(name) VALUES(?1)", params![role.as_str()])?;
    Ok(conn.last_insert_rowid())
}

pub fn role_id(conn: &Connection, role: Role) -> Result<i64, DatastoreError> {
    conn.query_row(
        "SELECT id FROM roles WHERE name = ?1",
        params![role.as_str()],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| DatastoreError::NotFound(format!("role '{}'", role)))
}

pub fn count_roles(conn: &Connection) -> Result<i64, DatastoreError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM roles", [], |row| row.get(0))?)
}

pub fn list_roles(conn: &Connection) -> Result<Vec<String>, DatastoreError> {
    let mut stmt = conn.prepare("SELECT name FROM roles ORDER BY id")?;
    let rows = stmt.query_map([], |row| row.get(0))?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn add_group(conn: &Connection, name: &str) -> Result<i64, DatastoreError> {
    conn.execute("INSERT INTO groups(name) VALUES(?1)", params![name])?;
    Ok(conn.last_insert_rowid())
}

/// Id of group `name`, creating it if absent.
pub fn ensure_group(conn: &Connection, name: &str) -> Result<i64, DatastoreError> {
    conn.execute("INSERT OR IGNORE INTO groups(name) VALUES(?1)", params![name])?;
    Ok(conn.query_row("SELECT id FROM groups WHERE name = ?1", params![name], |row| {
        row.get(0)
    })?)
}

/// Create a login-capable user holding `roles`.
pub fn add_user(
    conn: &Connection,
    username: &str,
    password: &str,
    roles: &[Role],
) -> Result<i64, DatastoreError> {
    conn.execute(
        "INSERT INTO users(username, password_hash, created_at) VALUES(?1, ?2, ?3)",
        params![username, hash_password(password)?, time::created_at_now()],
    )?;
    let user_id = conn.last_insert_rowid();
    for role in roles {
        conn.execute(
            "INSERT INTO user_roles(user_id, role_id) VALUES(?1, ?2)",
            params![user_id, role_id(conn, *role)?],
        )?;
    }
    Ok(user_id)
}

/// Id of user `username`, creating a password-less account if absent.
pub fn ensure_user(conn: &Connection, username: &str) -> Result<i64, DatastoreError> {
    conn.execute(
        "INSERT OR IGNORE INTO users(username, password_hash, created_at) VALUES(?1, NULL, ?2)",
        params![username, time::created_at_now()],
    )?;
    Ok(conn.query_row(
        "SELECT id FROM users WHERE username = ?1",
        params![username],
        |row| row.get(0),
    )?)
}

fn user_id(conn: &Connection, username: &str) -> Result<i64, DatastoreError> {
    conn.query_row(
        "SELECT id FROM users WHERE username = ?1",
        params![username],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| DatastoreError::NotFound(format!("user '{}'", username)))
}

fn group_id(conn: &Connection, name: &str) -> Result<i64, DatastoreError> {
    conn.query_row("SELECT id FROM groups WHERE name = ?1", params![name], |row| {
        row.get(0)
    })
    .optional()?
    .ok_or_else(|| DatastoreError::NotFound(format!("group '{}'", name)))
}

/// Idempotent: adding an existing membership is a no-op.
pub fn add_user_to_group(
    conn: &Connection,
    username: &str,
    group: &str,
) -> Result<(), DatastoreError> {
    conn.execute(
        "INSERT OR IGNORE INTO user_groups(user_id, group_id) VALUES(?1, ?2)",
        params![user_id(conn, username)?, group_id(conn, group)?],
    )?;
    Ok(())
}

pub fn user_groups(conn: &Connection, username: &str) -> Result<Vec<String>, DatastoreError> {
    let mut stmt = conn.prepare(
        "SELECT g.name FROM groups g
         JOIN user_groups ug ON ug.group_id = g.id
         JOIN users u ON u.id = ug.user_id
         WHERE u.username = ?1 ORDER BY g.name",
    )?;
    let rows = stmt.query_map(params![username], |row| row.get(0))?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn user_roles(conn: &Connection, username: &str) -> Result<Vec<Role>, DatastoreError> {
    let mut stmt = conn.prepare(
        "SELECT r.name FROM roles r
         JOIN user_roles ur ON ur.role_id = r.id
         JOIN users u ON u.id = ur.user_id
         WHERE u.username = ?1 ORDER BY r.id",
    )?;
    let rows = stmt.query_map(params![username], |row| row.get::<_, String>(0))?;
    let mut out = Vec::new();
    for r in rows {
        let name = r?;
        let role = Role::parse(&name)
            .ok_or_else(|| DatastoreError::ValidationError(format!("unknown role '{}'", name)))?;
        out.push(role);
    }
    Ok(out)
}

pub fn password_hash(conn: &Connection, username: &str) -> Result<Option<String>, DatastoreError> {
    Ok(conn
        .query_row(
            "SELECT password_hash FROM users WHERE username = ?1",
            params![username],
            |row| row.get::<_, Option<String>>(0),
        )
        .optional()?
        .flatten())
}

// --- Projects ---

const PROJECT_SELECT: &str = "
    SELECT p.id, p.name, u.username, g.name, p.path, p.description, p.created_at
    FROM projects p
    JOIN users u ON u.id = p.owner_id
    JOIN groups g ON g.id = p.group_id";

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        owner: row.get(2)?,
        group: row.get(3)?,
        path: row.get(4)?,
        description: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Insert a project, creating its owner and group on first sight.
/// The owner is made a member of the group. Errors are returned raw.
pub fn insert_project(conn: &Connection, data: &ProjectData) -> Result<Project, DatastoreError> {
    if data.name.trim().is_empty() {
        return Err(DatastoreError::ValidationError("project name is empty".into()));
    }
    let owner_id = ensure_user(conn, &data.owner)?;
    let group_id = ensure_group(conn, &data.group)?;
    conn.execute(
        "INSERT OR IGNORE INTO user_groups(user_id, group_id) VALUES(?1, ?2)",
        params![owner_id, group_id],
    )?;
    conn.execute(
        "INSERT INTO projects(name, owner_id, group_id, path, description, created_at)
         VALUES(?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            data.name,
            owner_id,
            group_id,
            data.path.to_string_lossy().into_owned(),
            data.description,
            time::created_at_now()
        ],
    )?;
    let id = conn.last_insert_rowid();
    Ok(conn.query_row(
        &format!("{PROJECT_SELECT} WHERE p.id = ?1"),
        params![id],
        project_from_row,
    )?)
}

pub fn add_project(conn: &Connection, data: &ProjectData) -> AddOutcome<Project> {
    let result = db::with_savepoint(conn, "add_project", |c| insert_project(c, data));
    AddOutcome::from_result(result, &data.name)
}

pub fn get_project(conn: &Connection, name: &str) -> Result<Option<Project>, DatastoreError> {
    Ok(conn
        .query_row(
            &format!("{PROJECT_SELECT} WHERE p.name = ?1"),
            params![name],
            project_from_row,
        )
        .optional()?)
}

/// All projects whose name is in `names`, ordered by name.
pub fn get_projects_by_names(
    conn: &Connection,
    names: &BTreeSet<String>,
) -> Result<Vec<Project>, DatastoreError> {
    if names.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = vec!["?"; names.len()].join(", ");
    let sql = format!("{PROJECT_SELECT} WHERE p.name IN ({placeholders}) ORDER BY p.name");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(names.iter()), project_from_row)?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn list_projects(conn: &Connection) -> Result<Vec<Project>, DatastoreError> {
    let mut stmt = conn.prepare(&format!("{PROJECT_SELECT} ORDER BY p.name"))?;
    let rows = stmt.query_map([], project_from_row)?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

// --- Jobs ---

const JOB_SELECT: &str = "
    SELECT j.id, j.job_id, p.name, j.path, j.title, j.description, j.status,
           j.flowchart_id, j.command_line, j.submitted, j.started, j.finished,
           j.data, j.created_at
    FROM jobs j
    JOIN projects p ON p.id = j.project_id";

fn job_from_row(row: &Row<'_>) -> rusqlite::Result<Job> {
    Ok(Job {
        id: row.get(0)?,
        job_id: row.get(1)?,
        project: row.get(2)?,
        path: row.get(3)?,
        title: row.get(4)?,
        description: row.get(5)?,
        status: row.get(6)?,
        flowchart_id: row.get(7)?,
        command_line: row.get(8)?,
        submitted: row.get(9)?,
        started: row.get(10)?,
        finished: row.get(11)?,
        data: row.get(12)?,
        created_at: row.get(13)?,
    })
}

fn insert_job(conn: &Connection, data: &JobData) -> Result<Job, DatastoreError> {
    let project = data.project.as_deref().ok_or_else(|| {
        DatastoreError::ValidationError(format!("job '{}' has no owning project", data.id))
    })?;
    let path = data.path.as_deref().ok_or_else(|| {
        DatastoreError::ValidationError(format!("job '{}' has no path", data.id))
    })?;
    let project_id: i64 = conn
        .query_row(
            "SELECT id FROM projects WHERE name = ?1",
            params![project],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| {
            DatastoreError::NotFound(format!("project '{}' for job '{}'", project, data.id))
        })?;

    conn.execute(
        "INSERT INTO jobs(job_id, project_id, path, title, description, status, flowchart_id,
                          command_line, submitted, started, finished, data, created_at)
         VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            data.id,
            project_id,
            path,
            data.title,
            data.description,
            data.status,
            data.flowchart_id,
            data.command_line,
            data.submitted,
            data.started,
            data.finished,
            serde_json::Value::Object(data.extra.clone()),
            time::created_at_now()
        ],
    )?;
    let id = conn.last_insert_rowid();
    Ok(conn.query_row(&format!("{JOB_SELECT} WHERE j.id = ?1"), params![id], job_from_row)?)
}

pub fn add_job(conn: &Connection, data: &JobData) -> AddOutcome<Job> {
    let result = db::with_savepoint(conn, "add_job", |c| insert_job(c, data));
    AddOutcome::from_result(result, &data.id)
}

pub fn get_job(conn: &Connection, job_id: &str) -> Result<Option<Job>, DatastoreError> {
    Ok(conn
        .query_row(
            &format!("{JOB_SELECT} WHERE j.job_id = ?1"),
            params![job_id],
            job_from_row,
        )
        .optional()?)
}

pub fn list_jobs(conn: &Connection, project: Option<&str>) -> Result<Vec<Job>, DatastoreError> {
    let mut out = Vec::new();
    match project {
        Some(name) => {
            let mut stmt =
                conn.prepare(&format!("{JOB_SELECT} WHERE p.name = ?1 ORDER BY j.job_id"))?;
            let rows = stmt.query_map(params![name], job_from_row)?;
            for r in rows {
                out.push(r?);
            }
        }
        None => {
            let mut stmt = conn.prepare(&format!("{JOB_SELECT} ORDER BY p.name, j.job_id"))?;
            let rows = stmt.query_map([], job_from_row)?;
            for r in rows {
                out.push(r?);
            }
        }
    }
    Ok(out)
}
