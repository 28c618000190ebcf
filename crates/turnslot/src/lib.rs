//! turnslot: fair, turn-based arbitration of a small pool of exclusive slots.
//!
//! Two or more groups of actors compete for `slot_count` slots. Only the group
//! holding the turn may occupy slots. Once `slot_count` uses have completed
//! it admits nobody new, and the last holder passes the turn to the next
//! group, so no group can starve another.
//!
//! ```
//! use std::sync::Arc;
//! use std::thread;
//!
//! use turnslot::{Arbiter, ArbiterConfig, GroupId};
//!
//! let arbiter = Arc::new(Arbiter::initialize(ArbiterConfig::new(2)).unwrap());
//! let cats = GroupId::new(0);
//! let mice = GroupId::new(1);
//!
//! let handles: Vec<_> = [cats, mice]
//!     .into_iter()
//!     .map(|group| {
//!         let arbiter = Arc::clone(&arbiter);
//!         thread::spawn(move || {
//!             for _ in 0..2 {
//!                 let _bowl = arbiter.enter(group, 0);
//!             }
//!         })
//!     })
//!     .collect();
//! for handle in handles {
//!     handle.join().unwrap();
//! }
//! arbiter.shutdown();
//! ```

mod config;
mod engine;
mod error;
mod group;
mod guard;
mod lifecycle;
mod state;

pub use config::{ArbiterConfig, HandoffPolicy, QuotaPolicy};
pub use engine::Arbiter;
pub use error::{ConfigError, ContractViolation, Result};
pub use group::GroupId;
pub use guard::SlotGuard;
pub use lifecycle::ArbiterCell;
pub use state::{ArbiterSnapshot, TurnRecord};
