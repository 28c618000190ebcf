//! Contention simulation: groups of actor threads sharing a few slots.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Instant;

use serde::Serialize;
use turnslot::{Arbiter, ArbiterSnapshot, GroupId};

use crate::config::SimConfig;
use crate::error::Result;

#[derive(Debug, Clone, Serialize)]
pub struct GroupReport {
    pub name: String,
    pub meals: u64,
    /// Finished turns of this group still present in the arbiter history.
    pub turns: usize,
    /// Most actors of this group seen holding slots at once.
    pub max_concurrent: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimReport {
    pub groups: Vec<GroupReport>,
    pub slots: usize,
    pub turns_finished: u64,
    /// Exclusion breaches observed by the actors. Always zero unless the arbiter is broken.
    pub violations: usize,
    pub elapsed_ms: u64,
    pub final_state: ArbiterSnapshot,
}

/// Occupancy as the actors see it, independent of the arbiter's own books.
struct Tracker {
    per_slot: Vec<AtomicUsize>,
    per_group: Vec<AtomicUsize>,
    max_concurrent: Vec<AtomicUsize>,
    violations: AtomicUsize,
}

impl Tracker {
    fn new(slots: usize, groups: usize) -> Self {
        Self {
            per_slot: (0..slots).map(|_| AtomicUsize::new(0)).collect(),
            per_group: (0..groups).map(|_| AtomicUsize::new(0)).collect(),
            max_concurrent: (0..groups).map(|_| AtomicUsize::new(0)).collect(),
            violations: AtomicUsize::new(0),
        }
    }

    fn enter(&self, group: GroupId, slot: usize) {
        if self.per_slot[slot].fetch_add(1, Ordering::SeqCst) != 0 {
            tracing::error!(%group, slot, "Slot shared by two holders");
            self.violations.fetch_add(1, Ordering::SeqCst);
        }

        let g = group.index();
        let now = self.per_group[g].fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent[g].fetch_max(now, Ordering::SeqCst);

        for (other, count) in self.per_group.iter().enumerate() {
            if other != g && count.load(Ordering::SeqCst) != 0 {
                tracing::error!(%group, other = %GroupId::new(other), "Two groups hold slots at once");
                self.violations.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn leave(&self, group: GroupId, slot: usize) {
        self.per_group[group.index()].fetch_sub(1, Ordering::SeqCst);
        self.per_slot[slot].fetch_sub(1, Ordering::SeqCst);
    }
}

pub fn run(config: &SimConfig) -> Result<SimReport> {
    config.validate()?;
    let arbiter = Arbiter::initialize(config.arbiter_config()?)?;
    let tracker = Tracker::new(config.slots, config.groups.len());

    tracing::info!(
        groups = ?config.groups,
        actors_per_group = config.actors_per_group,
        slots = config.slots,
        iterations = config.iterations,
        "Starting simulation"
    );
    let started = Instant::now();

    thread::scope(|scope| {
        for (g, name) in config.groups.iter().enumerate() {
            for actor in 0..config.actors_per_group {
                let arbiter = &arbiter;
                let tracker = &tracker;
                scope.spawn(move || {
                    run_actor(arbiter, tracker, config, GroupId::new(g), name, actor);
                });
            }
        }
    });

    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let final_state = arbiter.snapshot();
    arbiter.shutdown();

    let groups = config
        .groups
        .iter()
        .enumerate()
        .map(|(g, name)| GroupReport {
            name: name.clone(),
            meals: final_state.completions[g],
            turns: final_state
                .history
                .iter()
                .filter(|t| t.group.index() == g)
                .count(),
            max_concurrent: tracker.max_concurrent[g].load(Ordering::SeqCst),
        })
        .collect();

    let violations = tracker.violations.load(Ordering::SeqCst);
    if violations > 0 {
        tracing::error!(violations, "Simulation observed exclusion violations");
    }
    tracing::info!(
        turns_finished = final_state.turns_finished,
        elapsed_ms,
        "Simulation finished"
    );

    Ok(SimReport {
        groups,
        slots: config.slots,
        turns_finished: final_state.turns_finished,
        violations,
        elapsed_ms,
        final_state,
    })
}

fn run_actor(
    arbiter: &Arbiter,
    tracker: &Tracker,
    config: &SimConfig,
    group: GroupId,
    name: &str,
    actor: usize,
) {
    for k in 0..config.iterations {
        let slot = (actor + k) % config.slots;
        tracing::trace!(group = name, actor, slot, "Trying slot");

        let held = arbiter.enter(group, slot);
        tracker.enter(group, slot);
        thread::sleep(config.hold());
        tracker.leave(group, slot);
        held.release();

        thread::sleep(config.rest());
    }
    tracing::debug!(group = name, actor, "Actor done");
}
