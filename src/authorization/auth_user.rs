use super::Permission;
use crate::entities::user_entity as users;
use crate::error::{AppError, AppResult};
use std::collections::BTreeSet;

/// The authenticated caller: the user row plus the permissions flattened from all its roles.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: users::Model,
    pub role_slugs: Vec<String>,
    pub permissions: BTreeSet<Permission>,
}

impl AuthUser {
    pub fn new(
        user: users::Model,
        role_slugs: Vec<String>,
        permissions: impl IntoIterator<Item = Permission>,
    ) -> Self {
        Self {
            user,
            role_slugs,
            permissions: permissions.into_iter().collect(),
        }
    }

    pub fn id(&self) -> i32 {
        self.user.id
    }
}

/// Whether the user's roles collectively grant `permission`. Anonymous callers hold nothing.
pub fn can(user: Option<&AuthUser>, permission: Permission) -> bool {
    user.is_some_and(|u| u.permissions.contains(&permission))
}

/// Like [`can`], but as a gate: 401 for anonymous callers, 403 when the permission is missing.
pub fn require(user: Option<&AuthUser>, permission: Permission) -> AppResult<&AuthUser> {
    let user = user.ok_or_else(|| AppError::AuthError("Missing access token".to_string()))?;

    if !user.permissions.contains(&permission) {
        log::warn!("User {} lacks permission {}", user.id(), permission);
        return Err(AppError::PermissionDenied);
    }

    Ok(user)
}
