//! `backoffice-auth` — row-level permission gate.
//!
//! Pure policy checks deciding which actions a viewer may take on a record.
//! No IO; the permission map is fetched by the client crate and passed in.

pub mod authorize;
pub mod permissions;

pub use authorize::{AuthzError, RowActions, Viewer, authorize, can};
pub use permissions::{Grant, PagePermissions, Permission};
