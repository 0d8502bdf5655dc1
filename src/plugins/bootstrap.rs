//! Seeding of an empty datastore.
//!
//! Writes the minimal graph every other operation assumes: the three roles,
//! the `admin` group and user, a user and group mirroring the account that ran
//! the bootstrap, and a default project owned by that account. Everything
//! happens in one transaction, in dependency order; a failure leaves the store
//! exactly as it was.

use crate::core::api;
use crate::core::error::DatastoreError;
use crate::core::identity::{HostIdentity, IdentityResolver};
use crate::core::models::{ProjectData, Role};
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_GROUP: &str = "admin";
/// Well-known credential. Operators are expected to change it after bootstrap.
pub const ADMIN_PASSWORD: &str = "admin";
pub const HOST_USER_PASSWORD: &str = "default";

#[derive(Debug, Clone, Serialize)]
pub struct BootstrapSummary {
    pub roles: Vec<String>,
    pub admin_user: String,
    pub host: HostIdentity,
    pub default_project: String,
}

/// Seed an empty datastore, taking the host account from `resolver`.
pub fn initialize(
    conn: &Connection,
    default_project: &str,
    project_path: &Path,
    resolver: &dyn IdentityResolver,
) -> Result<BootstrapSummary, DatastoreError> {
    let host = resolver.current_user()?;
    initialize_with_host(conn, default_project, project_path, &host)
}

/// Seed an empty datastore for an already-resolved host identity.
pub fn initialize_with_host(
    conn: &Connection,
    default_project: &str,
    project_path: &Path,
    host: &HostIdentity,
) -> Result<BootstrapSummary, DatastoreError> {
    let existing = api::count_roles(conn)?;
    if existing > 0 {
        return Err(DatastoreError::Bootstrap(format!(
            "datastore already initialized ({} roles present)",
            existing
        )));
    }

    let tx = conn.unchecked_transaction()?;

    // Roles first: users reference them.
    for role in Role::ALL {
        api::add_role(&tx, role)?;
    }

    api::add_group(&tx, ADMIN_GROUP)?;
    api::add_user(&tx, ADMIN_USERNAME, ADMIN_PASSWORD, &[Role::Admin])?;
    api::add_user_to_group(&tx, ADMIN_USERNAME, ADMIN_GROUP)?;

    if host.group != ADMIN_GROUP {
        api::add_group(&tx, &host.group)?;
    }
    // Every bootstrap account gets the admin role.
    if host.username != ADMIN_USERNAME {
        api::add_user(&tx, &host.username, HOST_USER_PASSWORD, &[Role::Admin])?;
    } else {
        tracing::warn!("host account is named 'admin'; reusing the bootstrap admin user");
    }
    api::add_user_to_group(&tx, &host.username, &host.group)?;
    // The admin account sees everything the host account owns.
    api::add_user_to_group(&tx, ADMIN_USERNAME, &host.group)?;

    let project = api::insert_project(
        &tx,
        &ProjectData {
            name: default_project.to_string(),
            owner: host.username.clone(),
            group: host.group.clone(),
            path: project_path.to_path_buf(),
            description: Some("Default project".to_string()),
        },
    )?;

    tx.commit()?;

    tracing::info!(
        host_user = %host.username,
        host_group = %host.group,
        project = %project.name,
        "datastore initialized"
    );
    tracing::warn!(
        user = ADMIN_USERNAME,
        "bootstrap admin account uses the well-known default password; change it"
    );

    Ok(BootstrapSummary {
        roles: Role::ALL.iter().map(|r| r.as_str().to_string()).collect(),
        admin_user: ADMIN_USERNAME.to_string(),
        host: host.clone(),
        default_project: project.name,
    })
}
