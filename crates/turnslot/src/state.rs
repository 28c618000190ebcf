//! Arbitration state: which group has the turn, who occupies each slot, and
//! how much of the turn's batch quota has been used.
//!
//! Pure data. All methods assume the caller holds the arbiter lock.

use std::collections::VecDeque;

use serde::Serialize;

use crate::config::{ArbiterConfig, HandoffPolicy, QuotaPolicy};
use crate::error::ContractViolation;
use crate::group::GroupId;

/// One finished turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TurnRecord {
    pub group: GroupId,
    /// Releases performed by `group` during the turn.
    pub completions: usize,
}

/// Consistent copy of the arbitration state, taken under the lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArbiterSnapshot {
    pub active_group: GroupId,
    pub completed_this_turn: usize,
    /// Per slot: `None` when free, otherwise the occupying group.
    pub occupants: Vec<Option<GroupId>>,
    /// Blocked actors per group.
    pub waiting: Vec<usize>,
    pub turns_finished: u64,
    /// Lifetime releases per group.
    pub completions: Vec<u64>,
    /// Most recent finished turns, oldest first.
    pub history: Vec<TurnRecord>,
}

impl ArbiterSnapshot {
    pub fn held(&self) -> usize {
        self.occupants.iter().filter(|o| o.is_some()).count()
    }

    pub fn total_waiting(&self) -> usize {
        self.waiting.iter().sum()
    }
}

#[derive(Debug)]
pub(crate) struct ArbitrationState {
    slot_count: usize,
    group_count: usize,
    quota: QuotaPolicy,
    active_group: GroupId,
    occupants: Vec<Option<GroupId>>,
    completed_this_turn: usize,
    waiting: Vec<usize>,
    turns_finished: u64,
    completions: Vec<u64>,
    history: VecDeque<TurnRecord>,
    history_len: usize,
    shut_down: bool,
}

impl ArbitrationState {
    /// Fresh state for a validated config: all slots free, nothing completed.
    pub fn new(config: &ArbiterConfig) -> Self {
        Self {
            slot_count: config.slot_count,
            group_count: config.group_count,
            quota: config.quota,
            active_group: config.initial_group,
            occupants: vec![None; config.slot_count],
            completed_this_turn: 0,
            waiting: vec![0; config.group_count],
            turns_finished: 0,
            completions: vec![0; config.group_count],
            history: VecDeque::with_capacity(config.history_len.min(64)),
            history_len: config.history_len,
            shut_down: false,
        }
    }

    pub fn active_group(&self) -> GroupId {
        self.active_group
    }

    pub fn completed_this_turn(&self) -> usize {
        self.completed_this_turn
    }

    pub fn turns_finished(&self) -> u64 {
        self.turns_finished
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Reject calls that name an unknown group or slot, or arrive after shutdown.
    pub fn check_access(&self, group: GroupId, slot: usize) -> Result<(), ContractViolation> {
        if self.shut_down {
            return Err(ContractViolation::ShutDown);
        }
        if group.index() >= self.group_count {
            return Err(ContractViolation::UnknownGroup {
                group,
                group_count: self.group_count,
            });
        }
        if slot >= self.slot_count {
            return Err(ContractViolation::SlotOutOfRange {
                slot,
                slot_count: self.slot_count,
            });
        }
        Ok(())
    }

    pub fn held(&self) -> usize {
        self.occupants.iter().filter(|o| o.is_some()).count()
    }

    pub fn total_waiting(&self) -> usize {
        self.waiting.iter().sum()
    }

    /// Whether the active group may start another use this turn.
    pub fn has_quota(&self) -> bool {
        match self.quota {
            QuotaPolicy::Strict => self.completed_this_turn + self.held() < self.slot_count,
            QuotaPolicy::Released => self.completed_this_turn < self.slot_count,
        }
    }

    /// True when `group` may occupy `slot` right now.
    pub fn admits(&self, group: GroupId, slot: usize) -> bool {
        group == self.active_group && self.occupants[slot].is_none() && self.has_quota()
    }

    pub fn quota_exhausted(&self) -> bool {
        self.completed_this_turn >= self.slot_count
    }

    pub fn ready_to_flip(&self) -> bool {
        self.quota_exhausted() && self.held() == 0
    }

    /// The active group holds nothing and nobody of it is blocked.
    pub fn is_idle(&self) -> bool {
        self.held() == 0 && self.waiting[self.active_group.index()] == 0
    }

    pub fn add_waiter(&mut self, group: GroupId) {
        self.waiting[group.index()] += 1;
    }

    pub fn remove_waiter(&mut self, group: GroupId) {
        debug_assert!(self.waiting[group.index()] > 0);
        self.waiting[group.index()] -= 1;
    }

    pub fn occupy(&mut self, group: GroupId, slot: usize) -> Result<(), ContractViolation> {
        if let Some(occupant) = self.occupants[slot] {
            return Err(ContractViolation::Invariant(format!(
                "slot {slot} granted to {group} while held by {occupant}"
            )));
        }
        self.occupants[slot] = Some(group);
        Ok(())
    }

    /// Free `slot` and count the completed use. Leaves state untouched on error.
    pub fn vacate(&mut self, group: GroupId, slot: usize) -> Result<(), ContractViolation> {
        let occupant = self.occupants[slot];
        if occupant != Some(group) {
            return Err(ContractViolation::NotHolder {
                group,
                slot,
                occupant,
            });
        }
        self.occupants[slot] = None;
        self.completed_this_turn += 1;
        self.completions[group.index()] += 1;
        Ok(())
    }

    /// First group with blocked actors, in round-robin order after the active
    /// group. The active group itself is considered last.
    pub fn next_group_with_waiters(&self) -> Option<GroupId> {
        let mut candidate = self.active_group;
        for _ in 0..self.group_count {
            candidate = candidate.next(self.group_count);
            if self.waiting[candidate.index()] > 0 {
                return Some(candidate);
            }
        }
        None
    }

    pub fn handoff_target(&self, handoff: HandoffPolicy) -> GroupId {
        let next = self.active_group.next(self.group_count);
        match handoff {
            HandoffPolicy::RoundRobin => next,
            HandoffPolicy::WorkConserving => self.next_group_with_waiters().unwrap_or(next),
        }
    }

    /// End the current turn and give it to `next`. Returns the finished turn.
    pub fn flip_to(&mut self, next: GroupId) -> TurnRecord {
        debug_assert_eq!(self.held(), 0, "turn flipped with slots held");
        let finished = TurnRecord {
            group: self.active_group,
            completions: self.completed_this_turn,
        };
        if self.history_len > 0 {
            if self.history.len() == self.history_len {
                self.history.pop_front();
            }
            self.history.push_back(finished);
        }
        self.turns_finished += 1;
        self.active_group = next;
        self.completed_this_turn = 0;
        finished
    }

    pub fn shut_down(&mut self) -> Result<(), ContractViolation> {
        if self.shut_down {
            return Err(ContractViolation::ShutDown);
        }
        let held = self.held();
        if held > 0 {
            return Err(ContractViolation::ShutDownWithOccupants { held });
        }
        let waiting = self.total_waiting();
        if waiting > 0 {
            return Err(ContractViolation::ShutDownWithWaiters { waiting });
        }
        self.shut_down = true;
        Ok(())
    }

    pub fn check_invariants(&self) -> Result<(), ContractViolation> {
        if self.active_group.index() >= self.group_count {
            return Err(ContractViolation::Invariant(format!(
                "active {} out of range",
                self.active_group
            )));
        }
        if let Some((slot, Some(occupant))) = self
            .occupants
            .iter()
            .enumerate()
            .find(|(_, o)| o.is_some_and(|g| g != self.active_group))
        {
            return Err(ContractViolation::Invariant(format!(
                "slot {slot} held by {occupant} while {} has the turn",
                self.active_group
            )));
        }
        if self.quota == QuotaPolicy::Strict
            && self.completed_this_turn + self.held() > self.slot_count
        {
            return Err(ContractViolation::Invariant(format!(
                "batch of {} completed plus {} held exceeds quota {}",
                self.completed_this_turn,
                self.held(),
                self.slot_count
            )));
        }
        Ok(())
    }

    pub fn snapshot(&self) -> ArbiterSnapshot {
        ArbiterSnapshot {
            active_group: self.active_group,
            completed_this_turn: self.completed_this_turn,
            occupants: self.occupants.clone(),
            waiting: self.waiting.clone(),
            turns_finished: self.turns_finished,
            completions: self.completions.clone(),
            history: self.history.iter().copied().collect(),
        }
    }
}
