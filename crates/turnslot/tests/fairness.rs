//! Multi-threaded properties of the arbiter.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

use turnslot::{Arbiter, ArbiterConfig, GroupId, HandoffPolicy, QuotaPolicy, TurnRecord};

/// Occupancy as seen by the actors themselves, checked while holding a slot.
struct Observer {
    per_slot: Vec<AtomicUsize>,
    per_group: Vec<AtomicUsize>,
    violations: AtomicUsize,
}

impl Observer {
    fn new(slots: usize, groups: usize) -> Self {
        Self {
            per_slot: (0..slots).map(|_| AtomicUsize::new(0)).collect(),
            per_group: (0..groups).map(|_| AtomicUsize::new(0)).collect(),
            violations: AtomicUsize::new(0),
        }
    }

    fn enter(&self, group: GroupId, slot: usize) {
        if self.per_slot[slot].fetch_add(1, Ordering::SeqCst) != 0 {
            self.violations.fetch_add(1, Ordering::SeqCst);
        }
        self.per_group[group.index()].fetch_add(1, Ordering::SeqCst);
        let others = self
            .per_group
            .iter()
            .enumerate()
            .filter(|(g, _)| *g != group.index())
            .any(|(_, n)| n.load(Ordering::SeqCst) != 0);
        if others {
            self.violations.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn leave(&self, group: GroupId, slot: usize) {
        self.per_group[group.index()].fetch_sub(1, Ordering::SeqCst);
        self.per_slot[slot].fetch_sub(1, Ordering::SeqCst);
    }
}

/// Run `actors` threads per group, each doing `meals` acquire/release cycles.
/// Panics if the workload does not finish in time.
fn run_workload(arbiter: Arc<Arbiter>, actors: usize, meals: usize) -> Arc<Observer> {
    let slots = arbiter.slot_count();
    let groups = arbiter.group_count();
    let observer = Arc::new(Observer::new(slots, groups));

    let (done_tx, done_rx) = mpsc::channel();
    {
        let observer = Arc::clone(&observer);
        thread::spawn(move || {
            thread::scope(|scope| {
                for g in 0..groups {
                    for i in 0..actors {
                        let arbiter = &arbiter;
                        let observer = &observer;
                        scope.spawn(move || {
                            let group = GroupId::new(g);
                            for k in 0..meals {
                                let slot = (i + k) % slots;
                                arbiter.acquire(group, slot);
                                observer.enter(group, slot);
                                thread::yield_now();
                                observer.leave(group, slot);
                                arbiter.release(group, slot);
                            }
                        });
                    }
                }
            });
            let _ = done_tx.send(());
        });
    }

    done_rx
        .recv_timeout(Duration::from_secs(60))
        .expect("workload did not finish: an actor was left blocked");
    observer
}

#[test]
fn no_overlap_and_exact_batches_under_contention() {
    let arbiter = Arc::new(
        Arbiter::initialize(
            ArbiterConfig::new(2)
                .with_group_count(3)
                .with_quota(QuotaPolicy::Strict)
                .with_history_len(1024),
        )
        .unwrap(),
    );

    // 4 actors * 5 meals = 20 per group = 10 full turns each
    let observer = run_workload(Arc::clone(&arbiter), 4, 5);
    assert_eq!(observer.violations.load(Ordering::SeqCst), 0);

    let snap = arbiter.snapshot();
    assert_eq!(snap.completions, vec![20, 20, 20]);
    assert_eq!(snap.held(), 0);
    assert_eq!(snap.total_waiting(), 0);
    assert_eq!(snap.turns_finished, 30);

    for (n, turn) in snap.history.iter().enumerate() {
        assert_eq!(turn.completions, 2, "turn {n} overran its batch");
        assert_eq!(turn.group, GroupId::new(n % 3), "turn {n} out of order");
    }

    arbiter.shutdown();
}

#[test]
fn single_slot_alternates_between_groups() {
    let arbiter = Arbiter::initialize(ArbiterConfig::new(1).with_history_len(16)).unwrap();
    let order = Mutex::new(Vec::new());

    thread::scope(|scope| {
        for g in 0..2 {
            let arbiter = &arbiter;
            let order = &order;
            scope.spawn(move || {
                let group = GroupId::new(g);
                for _ in 0..5 {
                    let bowl = arbiter.enter(group, 0);
                    order.lock().unwrap().push(group.index());
                    bowl.release();
                }
            });
        }
    });

    assert_eq!(order.into_inner().unwrap(), vec![0, 1, 0, 1, 0, 1, 0, 1, 0, 1]);
    arbiter.shutdown();
}

#[test]
fn released_quota_still_flips_and_excludes() {
    let arbiter = Arc::new(
        Arbiter::initialize(
            ArbiterConfig::new(3)
                .with_quota(QuotaPolicy::Released)
                .with_handoff(HandoffPolicy::WorkConserving)
                .with_history_len(1024),
        )
        .unwrap(),
    );

    let observer = run_workload(Arc::clone(&arbiter), 5, 7);
    assert_eq!(observer.violations.load(Ordering::SeqCst), 0);

    let snap = arbiter.snapshot();
    assert_eq!(snap.completions, vec![35, 35]);
    // a full turn may overrun by at most slot_count - 1
    assert!(snap.history.iter().all(|t| t.completions <= 5));
    arbiter.shutdown();
}

#[test]
fn work_conserving_finishes_uneven_demand() {
    let arbiter = Arbiter::initialize(
        ArbiterConfig::new(3)
            .with_group_count(3)
            .with_handoff(HandoffPolicy::WorkConserving)
            .with_history_len(1024),
    )
    .unwrap();
    let demand = [7, 2, 11];

    let (done_tx, done_rx) = mpsc::channel();
    let arbiter = Arc::new(arbiter);
    {
        let arbiter = Arc::clone(&arbiter);
        thread::spawn(move || {
            thread::scope(|scope| {
                for (g, meals) in demand.into_iter().enumerate() {
                    let arbiter = &arbiter;
                    scope.spawn(move || {
                        for k in 0..meals {
                            let _bowl = arbiter.enter(GroupId::new(g), k % 3);
                        }
                    });
                }
            });
            let _ = done_tx.send(());
        });
    }
    done_rx
        .recv_timeout(Duration::from_secs(60))
        .expect("uneven demand left an actor blocked");

    let snap = arbiter.snapshot();
    assert_eq!(snap.completions, vec![7, 2, 11]);
    assert!(snap.history.iter().all(|t| t.completions <= 3));
    arbiter.shutdown();
}

#[test]
fn scenario_three_slots_two_groups() {
    let a = GroupId::new(0);
    let b = GroupId::new(1);
    let arbiter = Arc::new(Arbiter::initialize(ArbiterConfig::new(3)).unwrap());

    for slot in 0..3 {
        assert!(arbiter.try_acquire(a, slot));
    }

    let (tx, rx) = mpsc::channel();
    let mouse = {
        let arbiter = Arc::clone(&arbiter);
        thread::spawn(move || {
            arbiter.acquire(b, 0);
            tx.send(arbiter.snapshot()).unwrap();
            arbiter.release(b, 0);
        })
    };

    while arbiter.snapshot().waiting[1] == 0 {
        thread::sleep(Duration::from_millis(1));
    }

    arbiter.release(a, 0);
    assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    arbiter.release(a, 1);
    arbiter.release(a, 2);

    let seen = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("blocked group should run after the flip");
    mouse.join().unwrap();

    assert_eq!(seen.active_group, b);
    assert_eq!(seen.occupants, vec![Some(b), None, None]);
    assert_eq!(seen.completed_this_turn, 0);
    assert_eq!(seen.history, vec![TurnRecord { group: a, completions: 3 }]);
}
