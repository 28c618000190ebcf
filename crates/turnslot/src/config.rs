//! Arbiter configuration.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::group::GroupId;

/// How acquisitions are charged against a turn's batch quota.
///
/// Completions are counted when a slot is released under both policies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaPolicy {
    /// Admit while `completed < slot_count`, and let a release wake the next
    /// waiter for its slot. Holders admitted just before the quota fills still
    /// complete, so a turn may run up to `2 * slot_count - 1`.
    #[default]
    Released,
    /// Holders reserve quota: admit only while `completed + held < slot_count`.
    /// Every finished turn has exactly `slot_count` completions.
    Strict,
}

/// Which group receives the turn when it changes hands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoffPolicy {
    /// Always the next group in index order, whether or not it is waiting.
    #[default]
    RoundRobin,
    /// The next group in index order that has blocked actors. An idle turn
    /// (no holders, no waiters) is also handed to such a group.
    WorkConserving,
}

impl FromStr for QuotaPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "strict" => Ok(Self::Strict),
            "released" => Ok(Self::Released),
            other => Err(format!(
                "invalid quota policy '{other}', expected 'strict' or 'released'"
            )),
        }
    }
}

impl FromStr for HandoffPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "round-robin" | "round_robin" => Ok(Self::RoundRobin),
            "work-conserving" | "work_conserving" => Ok(Self::WorkConserving),
            other => Err(format!(
                "invalid handoff policy '{other}', expected 'round-robin' or 'work-conserving'"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbiterConfig {
    /// Number of slots, which is also the batch quota of a turn.
    pub slot_count: usize,
    pub group_count: usize,
    /// Group holding the turn right after initialization.
    pub initial_group: GroupId,
    pub quota: QuotaPolicy,
    pub handoff: HandoffPolicy,
    /// Finished turns kept for snapshots. Zero disables the history.
    pub history_len: usize,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            slot_count: 2,
            group_count: 2,
            initial_group: GroupId::new(0),
            quota: QuotaPolicy::default(),
            handoff: HandoffPolicy::default(),
            history_len: 64,
        }
    }
}

impl ArbiterConfig {
    pub fn new(slot_count: usize) -> Self {
        Self::default().with_slot_count(slot_count)
    }

    pub fn with_slot_count(mut self, slot_count: usize) -> Self {
        self.slot_count = slot_count;
        self
    }

    pub fn with_group_count(mut self, group_count: usize) -> Self {
        self.group_count = group_count;
        self
    }

    pub fn with_initial_group(mut self, group: GroupId) -> Self {
        self.initial_group = group;
        self
    }

    pub fn with_quota(mut self, quota: QuotaPolicy) -> Self {
        self.quota = quota;
        self
    }

    pub fn with_handoff(mut self, handoff: HandoffPolicy) -> Self {
        self.handoff = handoff;
        self
    }

    pub fn with_history_len(mut self, history_len: usize) -> Self {
        self.history_len = history_len;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.slot_count == 0 {
            return Err(ConfigError::NoSlots);
        }
        if self.group_count < 2 {
            return Err(ConfigError::TooFewGroups {
                group_count: self.group_count,
            });
        }
        if self.initial_group.index() >= self.group_count {
            return Err(ConfigError::InitialGroupOutOfRange {
                group: self.initial_group,
                group_count: self.group_count,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_two_groups_two_slots() {
        let config = ArbiterConfig::default();
        assert_eq!(config.slot_count, 2);
        assert_eq!(config.group_count, 2);
        assert_eq!(config.quota, QuotaPolicy::Released);
        assert_eq!(config.handoff, HandoffPolicy::RoundRobin);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_pattern() {
        let config = ArbiterConfig::new(3)
            .with_group_count(4)
            .with_initial_group(GroupId::new(2))
            .with_quota(QuotaPolicy::Strict)
            .with_handoff(HandoffPolicy::WorkConserving)
            .with_history_len(8);

        assert_eq!(config.slot_count, 3);
        assert_eq!(config.group_count, 4);
        assert_eq!(config.initial_group, GroupId::new(2));
        assert_eq!(config.quota, QuotaPolicy::Strict);
        assert_eq!(config.handoff, HandoffPolicy::WorkConserving);
        assert_eq!(config.history_len, 8);
    }

    #[test]
    fn rejects_zero_slots() {
        assert_eq!(ArbiterConfig::new(0).validate(), Err(ConfigError::NoSlots));
    }

    #[test]
    fn rejects_single_group() {
        assert_eq!(
            ArbiterConfig::new(1).with_group_count(1).validate(),
            Err(ConfigError::TooFewGroups { group_count: 1 })
        );
    }

    #[test]
    fn rejects_initial_group_out_of_range() {
        assert_eq!(
            ArbiterConfig::new(1)
                .with_initial_group(GroupId::new(2))
                .validate(),
            Err(ConfigError::InitialGroupOutOfRange {
                group: GroupId::new(2),
                group_count: 2,
            })
        );
    }

    #[test]
    fn deserializes_partial_json_with_defaults() {
        let config: ArbiterConfig =
            serde_json::from_str(r#"{"slot_count": 5, "handoff": "work_conserving"}"#).unwrap();
        assert_eq!(config.slot_count, 5);
        assert_eq!(config.group_count, 2);
        assert_eq!(config.handoff, HandoffPolicy::WorkConserving);
        assert_eq!(config.quota, QuotaPolicy::Released);
    }

    #[test]
    fn serializes_snake_case() {
        insta::assert_json_snapshot!(ArbiterConfig::new(3), @r#"
        {
          "slot_count": 3,
          "group_count": 2,
          "initial_group": 0,
          "quota": "released",
          "handoff": "round_robin",
          "history_len": 64
        }
        "#);
    }

    #[test]
    fn policies_parse_from_cli_spelling() {
        assert_eq!("strict".parse::<QuotaPolicy>(), Ok(QuotaPolicy::Strict));
        assert_eq!("released".parse::<QuotaPolicy>(), Ok(QuotaPolicy::Released));
        assert_eq!(
            "round-robin".parse::<HandoffPolicy>(),
            Ok(HandoffPolicy::RoundRobin)
        );
        assert_eq!(
            "work_conserving".parse::<HandoffPolicy>(),
            Ok(HandoffPolicy::WorkConserving)
        );
        assert!("fifo".parse::<HandoffPolicy>().is_err());
    }
}
