//! Simulation parameters.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use turnslot::{ArbiterConfig, HandoffPolicy, QuotaPolicy};

use crate::error::{Result, SimError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Group names; group `n` is the `n`th entry.
    pub groups: Vec<String>,
    pub actors_per_group: usize,
    pub slots: usize,
    /// Uses per actor.
    pub iterations: usize,
    /// How long an actor keeps its slot.
    pub hold_ms: u64,
    /// Pause between two uses of the same actor.
    pub rest_ms: u64,
    pub quota: QuotaPolicy,
    pub handoff: HandoffPolicy,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            groups: vec!["cat".to_string(), "mouse".to_string()],
            actors_per_group: 4,
            slots: 2,
            iterations: 8,
            hold_ms: 1,
            rest_ms: 1,
            quota: QuotaPolicy::Released,
            // finite runs must not strand a group whose peers have all finished
            handoff: HandoffPolicy::WorkConserving,
        }
    }
}

impl SimConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| SimError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Turns kept in the arbiter history: enough for every turn of the run, as a
    /// work-conserving run has at most one empty turn per non-empty one.
    fn history_len(&self) -> Option<usize> {
        self.groups
            .len()
            .checked_mul(self.actors_per_group)?
            .checked_mul(self.iterations)?
            .checked_mul(2)?
            .checked_add(1)
    }

    pub fn arbiter_config(&self) -> Result<ArbiterConfig> {
        let history_len = self.history_len().ok_or_else(|| {
            SimError::InvalidArgs(
                "groups * actors_per_group * iterations is too large".to_string(),
            )
        })?;
        Ok(ArbiterConfig::new(self.slots)
            .with_group_count(self.groups.len())
            .with_quota(self.quota)
            .with_handoff(self.handoff)
            .with_history_len(history_len))
    }

    pub fn hold(&self) -> Duration {
        Duration::from_millis(self.hold_ms)
    }

    pub fn rest(&self) -> Duration {
        Duration::from_millis(self.rest_ms)
    }

    /// Round-robin only drains a finite run when every turn is exactly full
    /// and every group needs the same number of turns.
    fn round_robin_terminates(&self) -> bool {
        self.quota == QuotaPolicy::Strict
            && self.slots > 0
            && self
                .actors_per_group
                .checked_mul(self.iterations)
                .is_some_and(|uses| uses % self.slots == 0)
    }

    pub fn validate(&self) -> Result<()> {
        if self.actors_per_group == 0 {
            return Err(SimError::InvalidArgs(
                "actors_per_group must be at least 1".to_string(),
            ));
        }
        if let Some(name) = self.groups.iter().find(|n| n.trim().is_empty()) {
            return Err(SimError::InvalidArgs(format!("empty group name '{name}'")));
        }
        self.arbiter_config()?.validate()?;
        if self.handoff == HandoffPolicy::RoundRobin && !self.round_robin_terminates() {
            return Err(SimError::InvalidArgs(format!(
                "round-robin handoff would strand a group: it needs the strict quota and \
                 actors_per_group * iterations divisible by slots ({})",
                self.slots
            )));
        }
        Ok(())
    }
}
