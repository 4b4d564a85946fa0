//! Authorization policy, evaluated at the boundary before any mutation.
//!
//! There is no authentication here: callers name a stored user and the
//! policy decides from that user's role alone.

use crate::models::{Role, User};
use std::fmt;
use thiserror::Error;

/// Operations that the policy distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    ManageCities,
    ManagePopulation,
    CreateAdmin,
    ListAdmins,
    DeleteAdmin,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Read => "read data",
            Action::ManageCities => "manage cities",
            Action::ManagePopulation => "manage population data",
            Action::CreateAdmin => "create admins",
            Action::ListAdmins => "list admins",
            Action::DeleteAdmin => "delete admins",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("acting user required to {0} (pass --as <USERNAME>)")]
    Unauthenticated(Action),
    #[error("permission denied: {role} '{username}' may not {action}")]
    Forbidden {
        username: String,
        role: Role,
        action: Action,
    },
    #[error("unknown user '{0}'")]
    UnknownUser(String),
}

const STAFF: &[Role] = &[Role::SuperAdmin, Role::Admin];
const SUPERADMIN_ONLY: &[Role] = &[Role::SuperAdmin];

/// Roles allowed to perform `action`; `None` means the action is open.
pub fn required_roles(action: Action) -> Option<&'static [Role]> {
    match action {
        Action::Read | Action::CreateAdmin => None,
        Action::ManageCities | Action::ManagePopulation | Action::ListAdmins => Some(STAFF),
        Action::DeleteAdmin => Some(SUPERADMIN_ONLY),
    }
}

/// Decide whether `actor` may perform `action`.
pub fn authorize(actor: Option<&User>, action: Action) -> Result<(), AuthError> {
    let Some(allowed) = required_roles(action) else {
        return Ok(());
    };
    let user = actor.ok_or(AuthError::Unauthenticated(action))?;
    if allowed.contains(&user.role) {
        Ok(())
    } else {
        log::warn!("denied {} for '{}' ({})", action, user.username, user.role);
        Err(AuthError::Forbidden {
            username: user.username.clone(),
            role: user.role,
            action,
        })
    }
}
