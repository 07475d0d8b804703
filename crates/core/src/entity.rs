//! Record traits: identity and ownership.

use crate::id::UserId;

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

/// A record that was created by (and is therefore owned by) a user.
///
/// Ownership drives "own records only" permission grants.
pub trait Owned {
    fn owner_id(&self) -> Option<UserId>;
}
