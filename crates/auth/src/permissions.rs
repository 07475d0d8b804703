use std::borrow::Cow;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are opaque strings scoped to a screen (e.g. "edit", "delete",
/// "duplicate"). A special wildcard permission `"*"` grants every action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const EDIT: Permission = Permission(Cow::Borrowed("edit"));
    pub const DELETE: Permission = Permission(Cow::Borrowed("delete"));
    pub const DUPLICATE: Permission = Permission(Cow::Borrowed("duplicate"));
    pub const CREATE: Permission = Permission(Cow::Borrowed("create"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// How far a permission reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grant {
    /// Every record on the screen.
    All,
    /// Only records created by the viewer.
    Own,
}

/// Permission map for one screen ("page"), as delivered by the API.
///
/// Wire shape: `{"edit": "all", "delete": "own"}`. Missing keys grant nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PagePermissions(HashMap<Permission, Grant>);

impl PagePermissions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, permission: Permission, grant: Grant) -> Self {
        self.0.insert(permission, grant);
        self
    }

    /// The grant for `permission`, honouring a wildcard entry.
    ///
    /// An explicit entry wins over the wildcard.
    pub fn grant(&self, permission: &Permission) -> Option<Grant> {
        self.0
            .get(permission)
            .or_else(|| self.0.get(&Permission::new("*")))
            .copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(Permission, Grant)> for PagePermissions {
    fn from_iter<I: IntoIterator<Item = (Permission, Grant)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
