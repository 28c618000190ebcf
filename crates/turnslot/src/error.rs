//! Configuration errors and fatal contract violations.
//!
//! A [`ConfigError`] is returned before any shared state exists. A
//! [`ContractViolation`] means a caller broke the acquire/release protocol;
//! it is never returned. The arbiter logs it and panics.

use thiserror::Error;

use crate::group::GroupId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("slot_count must be at least 1")]
    NoSlots,

    #[error("group_count must be at least 2, got {group_count}")]
    TooFewGroups { group_count: usize },

    #[error("initial group {group} is out of range for {group_count} groups")]
    InitialGroupOutOfRange { group: GroupId, group_count: usize },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractViolation {
    #[error("slot {slot} is out of range (slot_count = {slot_count})")]
    SlotOutOfRange { slot: usize, slot_count: usize },

    #[error("unknown {group} (group_count = {group_count})")]
    UnknownGroup { group: GroupId, group_count: usize },

    #[error("{group} released slot {slot} which is held by {}", describe(.occupant))]
    NotHolder {
        group: GroupId,
        slot: usize,
        occupant: Option<GroupId>,
    },

    #[error("shutdown with {held} slot(s) still held")]
    ShutDownWithOccupants { held: usize },

    #[error("shutdown with {waiting} actor(s) still blocked")]
    ShutDownWithWaiters { waiting: usize },

    #[error("arbiter is already initialized")]
    AlreadyInitialized,

    #[error("arbiter is not initialized")]
    NotInitialized,

    #[error("arbiter has been shut down")]
    ShutDown,

    #[error("state lock poisoned: cannot guarantee slot exclusion")]
    LockPoisoned,

    #[error("invariant broken: {0}")]
    Invariant(String),
}

fn describe(occupant: &Option<GroupId>) -> String {
    match occupant {
        Some(group) => group.to_string(),
        None => "nobody".to_string(),
    }
}

/// Report a contract violation and abort the calling actor.
///
/// Callers must drop any state guard first so the lock is not poisoned.
#[track_caller]
pub(crate) fn fatal(violation: ContractViolation) -> ! {
    tracing::error!(error = %violation, "Arbiter contract violation");
    panic!("arbiter contract violation: {violation}");
}
