//! turnslot-sim: contention simulator for the turnslot arbiter.
//!
//! Named groups of actor threads repeatedly take a slot, hold it, give it
//! back and rest. The report shows how the turn moved between groups and
//! whether any actor ever saw a slot shared across groups.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod sim;

pub use config::SimConfig;
pub use error::{Result, SimError};
pub use sim::{GroupReport, SimReport, run};
