//! Caller authorization.
//!
//! Every service call presents an API key and the permission it needs. The
//! authorizer resolves the key to a [`Principal`], checks the permission and
//! counts the call against that principal.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Permission {
    /// Register new clients
    Setup,
    /// Run the pipeline and persist the result
    FetchStore,
    /// Read back stored readings
    ReadHistory,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Permission::Setup => "setup",
            Permission::FetchStore => "fetch-store",
            Permission::ReadHistory => "read-history",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Principal {principal} lacks permission {permission}")]
    PermissionDenied {
        principal: String,
        permission: Permission,
    },

    #[error("Principal {0} already registered")]
    DuplicatePrincipal(String),
}

pub type AccessResult<T> = Result<T, AccessError>;

/// An API caller.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub name: String,
    pub api_key: String,
    pub permissions: BTreeSet<Permission>,
    /// Successful authorizations so far
    pub usage: u64,
}

impl Principal {
    /// New principal with a freshly generated API key.
    pub fn new(name: impl Into<String>, permissions: impl IntoIterator<Item = Permission>) -> Self {
        Self::with_api_key(name, Uuid::new_v4().simple().to_string(), permissions)
    }

    pub fn with_api_key(
        name: impl Into<String>,
        api_key: impl Into<String>,
        permissions: impl IntoIterator<Item = Permission>,
    ) -> Self {
        Self {
            name: name.into(),
            api_key: api_key.into(),
            permissions: permissions.into_iter().collect(),
            usage: 0,
        }
    }

    pub fn has(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Principal")
            .field("name", &self.name)
            .field("permissions", &self.permissions)
            .field("usage", &self.usage)
            .finish_non_exhaustive()
    }
}

/// Resolves API keys to principals and checks permissions.
pub trait Authorizer: Send + Sync {
    /// Check `permission` for the holder of `api_key` and record the call.
    /// Returns a snapshot of the principal after counting the call.
    fn authorize(&self, api_key: &str, permission: Permission) -> AccessResult<Principal>;

    fn register(&self, principal: Principal) -> AccessResult<()>;
}

/// Authorizer keeping principals in process memory, keyed by API key.
#[derive(Default)]
pub struct InMemoryAuthorizer {
    principals: Mutex<HashMap<String, Principal>>,
}

impl InMemoryAuthorizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Authorizer seeded with one administrator holding every permission.
    pub fn with_admin(name: impl Into<String>, api_key: impl Into<String>) -> Self {
        let authorizer = Self::new();
        let admin = Principal::with_api_key(
            name,
            api_key,
            [Permission::Setup, Permission::FetchStore, Permission::ReadHistory],
        );
        authorizer.principals.lock().insert(admin.api_key.clone(), admin);
        authorizer
    }

    /// Usage counter of the principal named `name`.
    pub fn usage(&self, name: &str) -> Option<u64> {
        self.principals
            .lock()
            .values()
            .find(|p| p.name == name)
            .map(|p| p.usage)
    }
}

impl Authorizer for InMemoryAuthorizer {
    fn authorize(&self, api_key: &str, permission: Permission) -> AccessResult<Principal> {
        let mut principals = self.principals.lock();
        let principal = principals.get_mut(api_key).ok_or_else(|| {
            warn!(%permission, "Rejected unknown API key");
            AccessError::InvalidApiKey
        })?;

        if !principal.has(permission) {
            warn!(principal = %principal.name, %permission, "Permission denied");
            return Err(AccessError::PermissionDenied {
                principal: principal.name.clone(),
                permission,
            });
        }

        principal.usage += 1;
        debug!(principal = %principal.name, %permission, usage = principal.usage, "Authorized");
        Ok(principal.clone())
    }

    fn register(&self, principal: Principal) -> AccessResult<()> {
        let mut principals = self.principals.lock();
        if principals.contains_key(&principal.api_key)
            || principals.values().any(|p| p.name == principal.name)
        {
            return Err(AccessError::DuplicatePrincipal(principal.name));
        }

        info!(principal = %principal.name, permissions = ?principal.permissions, "Principal registered");
        principals.insert(principal.api_key.clone(), principal);
        Ok(())
    }
}
