//! `backoffice-core` — shared building blocks for the back-office client.
//!
//! This crate contains **pure** primitives (no IO, no async): record
//! identifiers, the record traits used by permission checks, and the
//! domain error model.

pub mod entity;
pub mod error;
pub mod id;

pub use entity::{Entity, Owned};
pub use error::{DomainError, DomainResult};
pub use id::{RowId, UserId};
