//! Group identity.

use serde::{Deserialize, Serialize};

/// Identifier of a group of actors that may share slots with each other but
/// never with another group.
///
/// Groups are dense indices `0..group_count`; the turn visits them in index order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct GroupId(usize);

impl GroupId {
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0
    }

    /// Round-robin successor among `group_count` groups.
    pub fn next(self, group_count: usize) -> Self {
        debug_assert!(group_count > 0, "group_count must be positive");
        Self((self.0 + 1) % group_count)
    }
}

impl From<usize> for GroupId {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "group-{}", self.0)
    }
}
