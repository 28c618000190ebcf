//! The arbiter: fair, turn-based access to a fixed pool of exclusive slots.
//!
//! Every call takes the single state lock. A blocked actor waits on the
//! condition of its own group and slot, so a release can wake exactly one
//! actor that is able to use the freed slot. A turn flip wakes every waiter
//! of the group that receives the turn.
//!
//! Contract violations are fatal: the state guard is dropped first, so the
//! lock is never poisoned by a misbehaving caller.

use std::sync::{Condvar, Mutex, MutexGuard};

use crate::config::{ArbiterConfig, HandoffPolicy};
use crate::error::{ContractViolation, Result, fatal};
use crate::group::GroupId;
use crate::guard::SlotGuard;
use crate::state::{ArbiterSnapshot, ArbitrationState};

/// Wait conditions of one group, one per slot.
struct WaitSet {
    slots: Box<[Condvar]>,
}

impl WaitSet {
    fn new(slot_count: usize) -> Self {
        Self {
            slots: (0..slot_count).map(|_| Condvar::new()).collect(),
        }
    }

    fn notify_slot(&self, slot: usize) {
        self.slots[slot].notify_one();
    }

    fn notify_all(&self) {
        for cond in self.slots.iter() {
            cond.notify_all();
        }
    }
}

pub struct Arbiter {
    config: ArbiterConfig,
    state: Mutex<ArbitrationState>,
    wait_sets: Box<[WaitSet]>,
}

impl Arbiter {
    /// Create an arbiter with all slots free and the turn on `config.initial_group`.
    pub fn initialize(config: ArbiterConfig) -> Result<Self> {
        config.validate()?;

        let wait_sets = (0..config.group_count)
            .map(|_| WaitSet::new(config.slot_count))
            .collect();

        tracing::info!(
            slot_count = config.slot_count,
            group_count = config.group_count,
            initial_group = %config.initial_group,
            quota = ?config.quota,
            handoff = ?config.handoff,
            "Arbiter initialized"
        );

        Ok(Self {
            state: Mutex::new(ArbitrationState::new(&config)),
            wait_sets,
            config,
        })
    }

    pub fn config(&self) -> &ArbiterConfig {
        &self.config
    }

    pub fn slot_count(&self) -> usize {
        self.config.slot_count
    }

    pub fn group_count(&self) -> usize {
        self.config.group_count
    }

    /// Block until `group` may occupy `slot`, then occupy it.
    pub fn acquire(&self, group: GroupId, slot: usize) {
        let mut state = self.lock();
        if let Err(violation) = state.check_access(group, slot) {
            drop(state);
            fatal(violation);
        }

        if !state.admits(group, slot) {
            state.add_waiter(group);
            tracing::debug!(
                %group,
                slot,
                active = %state.active_group(),
                completed = state.completed_this_turn(),
                "Waiting for slot"
            );
            self.hand_off_if_idle(&mut state);

            while !state.admits(group, slot) {
                state = self.wait(group, slot, state);
            }
            state.remove_waiter(group);
        }

        if let Err(violation) = state.occupy(group, slot) {
            drop(state);
            fatal(violation);
        }
        tracing::debug!(%group, slot, "Slot acquired");
        self.verify(state);
    }

    /// Occupy `slot` only if `group` may do so without blocking.
    pub fn try_acquire(&self, group: GroupId, slot: usize) -> bool {
        let mut state = self.lock();
        if let Err(violation) = state.check_access(group, slot) {
            drop(state);
            fatal(violation);
        }
        if !state.admits(group, slot) {
            return false;
        }
        if let Err(violation) = state.occupy(group, slot) {
            drop(state);
            fatal(violation);
        }
        tracing::debug!(%group, slot, "Slot acquired without waiting");
        self.verify(state);
        true
    }

    /// Acquire `slot` and return a guard that releases it on drop.
    pub fn enter(&self, group: GroupId, slot: usize) -> SlotGuard<'_> {
        self.acquire(group, slot);
        SlotGuard::new(self, group, slot)
    }

    /// Free `slot`, count the completed use, and flip the turn if the batch
    /// quota is spent and nobody else still holds a slot.
    pub fn release(&self, group: GroupId, slot: usize) {
        let mut state = self.lock();
        if let Err(violation) = self.release_locked(&mut state, group, slot) {
            drop(state);
            fatal(violation);
        }
    }

    /// Release from a guard dropped during a panic: never panics again.
    pub(crate) fn release_on_unwind(&self, group: GroupId, slot: usize) {
        let Ok(mut state) = self.state.lock() else {
            tracing::error!(%group, slot, "State lock poisoned during unwind; slot stays held");
            return;
        };
        if let Err(violation) = self.release_locked(&mut state, group, slot) {
            tracing::error!(%group, slot, error = %violation, "Release during unwind failed");
        }
    }

    fn release_locked(
        &self,
        state: &mut ArbitrationState,
        group: GroupId,
        slot: usize,
    ) -> std::result::Result<(), ContractViolation> {
        state.check_access(group, slot)?;
        state.vacate(group, slot)?;
        tracing::debug!(
            %group,
            slot,
            completed = state.completed_this_turn(),
            "Slot released"
        );

        if state.ready_to_flip() {
            let next = state.handoff_target(self.config.handoff);
            self.flip(state, next);
        } else if state.quota_exhausted() {
            tracing::trace!(%group, held = state.held(), "Quota spent, last holder flips the turn");
        } else {
            if state.has_quota() {
                self.wait_sets[group.index()].notify_slot(slot);
            }
            self.hand_off_if_idle(state);
        }

        state.check_invariants()
    }

    /// Mark the arbiter as shut down. Every later call is fatal.
    ///
    /// Fatal if any slot is held or any actor is blocked.
    pub fn shutdown(&self) {
        if let Err(violation) = self.shutdown_checked() {
            fatal(violation);
        }
    }

    pub(crate) fn shutdown_checked(&self) -> std::result::Result<(), ContractViolation> {
        let mut state = self.lock();
        state.shut_down()?;
        tracing::info!(turns_finished = state.turns_finished(), "Arbiter shut down");
        Ok(())
    }

    pub fn is_shut_down(&self) -> bool {
        self.lock().is_shut_down()
    }

    pub fn snapshot(&self) -> ArbiterSnapshot {
        self.lock().snapshot()
    }

    fn flip(&self, state: &mut ArbitrationState, next: GroupId) {
        let finished = state.flip_to(next);
        tracing::info!(
            from = %finished.group,
            to = %next,
            completions = finished.completions,
            "Turn flipped"
        );
        self.wait_sets[next.index()].notify_all();
    }

    /// Hand an idle turn to a waiting group (work-conserving handoff only).
    fn hand_off_if_idle(&self, state: &mut ArbitrationState) {
        if self.config.handoff != HandoffPolicy::WorkConserving || !state.is_idle() {
            return;
        }
        if let Some(next) = state.next_group_with_waiters() {
            tracing::debug!(
                idle = %state.active_group(),
                completed = state.completed_this_turn(),
                "Handing off idle turn"
            );
            self.flip(state, next);
        }
    }

    fn lock(&self) -> MutexGuard<'_, ArbitrationState> {
        match self.state.lock() {
            Ok(state) => state,
            Err(_) => fatal(ContractViolation::LockPoisoned),
        }
    }

    fn wait<'a>(
        &self,
        group: GroupId,
        slot: usize,
        state: MutexGuard<'a, ArbitrationState>,
    ) -> MutexGuard<'a, ArbitrationState> {
        match self.wait_sets[group.index()].slots[slot].wait(state) {
            Ok(state) => state,
            Err(_) => fatal(ContractViolation::LockPoisoned),
        }
    }

    fn verify(&self, state: MutexGuard<'_, ArbitrationState>) {
        if let Err(violation) = state.check_invariants() {
            drop(state);
            fatal(violation);
        }
    }
}

impl std::fmt::Debug for Arbiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arbiter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
