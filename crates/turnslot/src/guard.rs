//! RAII slot holder.

use crate::engine::Arbiter;
use crate::group::GroupId;

/// A slot held by one actor. Releases the slot exactly once: explicitly via
/// [`SlotGuard::release`] or on drop.
#[must_use = "dropping the guard releases the slot immediately"]
pub struct SlotGuard<'a> {
    arbiter: &'a Arbiter,
    group: GroupId,
    slot: usize,
    released: bool,
}

impl<'a> SlotGuard<'a> {
    pub(crate) fn new(arbiter: &'a Arbiter, group: GroupId, slot: usize) -> Self {
        Self {
            arbiter,
            group,
            slot,
            released: false,
        }
    }

    pub fn group(&self) -> GroupId {
        self.group
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn release(mut self) {
        self.released = true;
        self.arbiter.release(self.group, self.slot);
    }
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if std::thread::panicking() {
            tracing::warn!(group = %self.group, slot = self.slot, "Slot released by unwinding holder");
            self.arbiter.release_on_unwind(self.group, self.slot);
        } else {
            self.arbiter.release(self.group, self.slot);
        }
    }
}

impl std::fmt::Debug for SlotGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotGuard")
            .field("group", &self.group)
            .field("slot", &self.slot)
            .finish()
    }
}
