//! Centralized schema definitions for the SEAMM datastore.
//!
//! One SQLite database holds the seed graph (roles, groups, users) and the
//! imported artifacts (projects, jobs). Statements are idempotent so that
//! `db::initialize_schema` can run on every open.

pub const DATASTORE_DB_NAME: &str = "seamm.db";

pub const ROLES_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS roles (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL UNIQUE
    )
";

pub const GROUPS_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS groups (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL UNIQUE
    )
";

pub const USERS_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT, -- NULL: implicit owner account, cannot log in
        created_at TEXT NOT NULL
    )
";

pub const USER_ROLES_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS user_roles (
        user_id INTEGER NOT NULL,
        role_id INTEGER NOT NULL,
        PRIMARY KEY(user_id, role_id),
        FOREIGN KEY(user_id) REFERENCES users(id),
        FOREIGN KEY(role_id) REFERENCES roles(id)
    )
";

pub const USER_GROUPS_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS user_groups (
        user_id INTEGER NOT NULL,
        group_id INTEGER NOT NULL,
        PRIMARY KEY(user_id, group_id),
        FOREIGN KEY(user_id) REFERENCES users(id),
        FOREIGN KEY(group_id) REFERENCES groups(id)
    )
";

pub const PROJECTS_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS projects (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        owner_id INTEGER NOT NULL,
        group_id INTEGER NOT NULL,
        path TEXT NOT NULL,
        description TEXT,
        created_at TEXT NOT NULL,
        FOREIGN KEY(owner_id) REFERENCES users(id),
        FOREIGN KEY(group_id) REFERENCES groups(id)
    )
";

pub const JOBS_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS jobs (
        id INTEGER PRIMARY KEY,
        job_id TEXT NOT NULL UNIQUE,
        project_id INTEGER NOT NULL,
        path TEXT NOT NULL,
        title TEXT,
        description TEXT,
        status TEXT NOT NULL,
        flowchart_id TEXT,
        command_line TEXT,
        submitted TEXT,
        started TEXT,
        finished TEXT,
        data TEXT NOT NULL, -- JSON object of manifest fields not mapped to columns
        created_at TEXT NOT NULL,
        FOREIGN KEY(project_id) REFERENCES projects(id)
    )
";

pub const JOBS_PROJECT_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_jobs_project ON jobs(project_id)";

/// Creation order matters: referenced tables first.
pub const ALL_SCHEMAS: &[&str] = &[
    ROLES_SCHEMA,
    GROUPS_SCHEMA,
    USERS_SCHEMA,
    USER_ROLES_SCHEMA,
    USER_GROUPS_SCHEMA,
    PROJECTS_SCHEMA,
    JOBS_SCHEMA,
    JOBS_PROJECT_INDEX,
];
