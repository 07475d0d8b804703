//! Row-level permission checks.
//!
//! Ownership differs from row to row, so every check takes the row (or its
//! owner) alongside the screen's permission map.

use serde::Serialize;
use thiserror::Error;

use backoffice_core::{Entity, Owned, UserId};

use crate::{Grant, PagePermissions, Permission};

/// The user looking at a screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: UserId,
    pub is_admin: bool,
}

impl Viewer {
    pub fn user(user_id: UserId) -> Self {
        Self {
            user_id,
            is_admin: false,
        }
    }

    pub fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            is_admin: true,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Row-level permission gate.
///
/// - admins always pass
/// - otherwise the page must grant `permission`, either for all records or
///   for own records with `viewer == owner`
///
/// No IO, no panics. Evaluate per row: ownership differs between rows.
pub fn can(
    permissions: &PagePermissions,
    permission: &Permission,
    viewer: UserId,
    owner: Option<UserId>,
    is_admin: bool,
) -> bool {
    if is_admin {
        return true;
    }

    match permissions.grant(permission) {
        Some(Grant::All) => true,
        Some(Grant::Own) => owner == Some(viewer),
        None => false,
    }
}

/// [`can`] as a `Result`, for guarding mutations before they hit the API.
pub fn authorize<R: Owned>(
    permissions: &PagePermissions,
    permission: &Permission,
    viewer: &Viewer,
    row: &R,
) -> Result<(), AuthzError> {
    if can(
        permissions,
        permission,
        viewer.user_id,
        row.owner_id(),
        viewer.is_admin,
    ) {
        Ok(())
    } else {
        tracing::debug!(permission = %permission, user = %viewer.user_id, "row action denied");
        Err(AuthzError::Forbidden(permission.as_str().to_string()))
    }
}

/// Which per-row actions a renderer should expose.
///
/// Table and card views both use this, so the two stay consistent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RowActions {
    pub edit: bool,
    pub delete: bool,
    pub duplicate: bool,
}

impl RowActions {
    pub fn for_row<R: Owned>(permissions: &PagePermissions, viewer: &Viewer, row: &R) -> Self {
        let owner = row.owner_id();
        let check = |p: &Permission| can(permissions, p, viewer.user_id, owner, viewer.is_admin);
        Self {
            edit: check(&Permission::EDIT),
            delete: check(&Permission::DELETE),
            duplicate: check(&Permission::DUPLICATE),
        }
    }

    /// [`for_row`](Self::for_row) over a page, keyed by row id.
    pub fn for_rows<'a, R, I>(permissions: &PagePermissions, viewer: &Viewer, rows: I) -> Vec<(R::Id, Self)>
    where
        R: Entity + Owned + 'a,
        I: IntoIterator<Item = &'a R>,
    {
        rows.into_iter()
            .map(|row| (row.id().clone(), Self::for_row(permissions, viewer, row)))
            .collect()
    }

    pub fn any(&self) -> bool {
        self.edit || self.delete || self.duplicate
    }
}
