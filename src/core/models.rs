//! Records stored in and returned from the datastore.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// The closed set of roles a user can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    User,
    GroupManager,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::User, Role::GroupManager, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::GroupManager => "group manager",
            Role::Admin => "admin",
        }
    }

    pub fn parse(name: &str) -> Option<Role> {
        Role::ALL.into_iter().find(|r| r.as_str() == name)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input to `api::add_project`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectData {
    pub name: String,
    pub owner: String,
    pub group: String,
    pub path: PathBuf,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub owner: String,
    pub group: String,
    pub path: String,
    pub description: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,
    pub job_id: String,
    pub project: String,
    pub path: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: String,
    pub flowchart_id: Option<String>,
    pub command_line: Option<String>,
    pub submitted: Option<String>,
    pub started: Option<String>,
    pub finished: Option<String>,
    pub data: serde_json::Value,
    pub created_at: String,
}
