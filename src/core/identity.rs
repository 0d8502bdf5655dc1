//! Resolution of user/group identity from filesystem ownership.
//!
//! Project ownership and the bootstrap host account are both derived from who
//! owns a path on disk. Platforms without a POSIX ownership model use the
//! environment instead; [`default_resolver`] picks the implementation at compile
//! time from platform capability.

use crate::core::error::DatastoreError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Group assigned when the platform has no notion of a file's group.
pub const FALLBACK_GROUP: &str = "staff";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostIdentity {
    pub username: String,
    pub group: String,
}

pub trait IdentityResolver {
    /// Owner and group of `path`.
    fn owner_of(&self, path: &Path) -> Result<HostIdentity, DatastoreError>;

    /// Identity of the invoking account, taken from the owner of the home directory.
    fn current_user(&self) -> Result<HostIdentity, DatastoreError> {
        let home = dirs::home_dir().ok_or_else(|| DatastoreError::Identity {
            path: PathBuf::from("~"),
            reason: "home directory could not be determined".into(),
        })?;
        self.owner_of(&home)
    }
}

/// Resolver for the current platform.
pub fn default_resolver() -> Box<dyn IdentityResolver> {
    #[cfg(unix)]
    let resolver: Box<dyn IdentityResolver> = Box::new(PosixOwnership);
    #[cfg(not(unix))]
    let resolver: Box<dyn IdentityResolver> = Box::new(EnvIdentity);
    resolver
}

/// Ignores the path: every file is "owned" by the user named in the environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvIdentity;

impl IdentityResolver for EnvIdentity {
    fn owner_of(&self, path: &Path) -> Result<HostIdentity, DatastoreError> {
        let username = ["USERNAME", "USER"]
            .iter()
            .find_map(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
            .ok_or_else(|| DatastoreError::Identity {
                path: path.to_path_buf(),
                reason: "neither USERNAME nor USER is set".into(),
            })?;
        Ok(HostIdentity {
            username,
            group: FALLBACK_GROUP.to_string(),
        })
    }

    fn current_user(&self) -> Result<HostIdentity, DatastoreError> {
        self.owner_of(Path::new("~"))
    }
}

/// uid/gid from file metadata, names from the system user and group
/// databases (NSS, so LDAP and sssd accounts resolve too).
#[cfg(unix)]
#[derive(Debug, Clone, Copy, Default)]
pub struct PosixOwnership;

#[cfg(unix)]
impl IdentityResolver for PosixOwnership {
    fn owner_of(&self, path: &Path) -> Result<HostIdentity, DatastoreError> {
        use std::os::unix::fs::MetadataExt;

        let meta = std::fs::metadata(path).map_err(|e| DatastoreError::Identity {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(HostIdentity {
            username: user_name(meta.uid()),
            group: group_name(meta.gid()),
        })
    }
}

/// Account name for `uid`, or the number itself when no database knows it.
#[cfg(unix)]
pub fn user_name(uid: u32) -> String {
    match uzers::get_user_by_uid(uid) {
        Some(user) => user.name().to_string_lossy().into_owned(),
        None => {
            tracing::debug!(uid, "uid has no account entry");
            uid.to_string()
        }
    }
}

/// Group name for `gid`, or the number itself when no database knows it.
#[cfg(unix)]
pub fn group_name(gid: u32) -> String {
    match uzers::get_group_by_gid(gid) {
        Some(group) => group.name().to_string_lossy().into_owned(),
        None => {
            tracing::debug!(gid, "gid has no group entry");
            gid.to_string()
        }
    }
}
