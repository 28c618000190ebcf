//! Initialize/shutdown pairing for an arbiter shared by a whole program.
//!
//! `ArbiterCell::new` is `const`, so a cell can live in a `static`:
//!
//! ```
//! use turnslot::{ArbiterCell, ArbiterConfig, GroupId};
//!
//! static BOWLS: ArbiterCell = ArbiterCell::new();
//!
//! let arbiter = BOWLS.initialize(ArbiterConfig::new(2)).unwrap();
//! arbiter.acquire(GroupId::new(0), 1);
//! arbiter.release(GroupId::new(0), 1);
//! BOWLS.shutdown();
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::ArbiterConfig;
use crate::engine::Arbiter;
use crate::error::{ContractViolation, Result, fatal};

pub struct ArbiterCell {
    inner: Mutex<Option<Arc<Arbiter>>>,
}

impl ArbiterCell {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }

    /// Create the arbiter. Fatal if one is already live in this cell.
    pub fn initialize(&self, config: ArbiterConfig) -> Result<Arc<Arbiter>> {
        let mut inner = self.lock();
        if inner.is_some() {
            drop(inner);
            fatal(ContractViolation::AlreadyInitialized);
        }
        let arbiter = Arc::new(Arbiter::initialize(config)?);
        *inner = Some(Arc::clone(&arbiter));
        Ok(arbiter)
    }

    pub fn get(&self) -> Option<Arc<Arbiter>> {
        self.lock().clone()
    }

    /// The live arbiter. Fatal before `initialize` or after `shutdown`.
    pub fn arbiter(&self) -> Arc<Arbiter> {
        match self.get() {
            Some(arbiter) => arbiter,
            None => fatal(ContractViolation::NotInitialized),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.lock().is_some()
    }

    /// Shut the arbiter down and empty the cell so it can be initialized again.
    ///
    /// Fatal if nothing is live, or if any slot is held or actor blocked.
    pub fn shutdown(&self) {
        let mut inner = self.lock();
        let result = match inner.as_ref() {
            Some(arbiter) => arbiter.shutdown_checked(),
            None => Err(ContractViolation::NotInitialized),
        };
        if let Err(violation) = result {
            drop(inner);
            fatal(violation);
        }
        *inner = None;
    }

    fn lock(&self) -> MutexGuard<'_, Option<Arc<Arbiter>>> {
        match self.inner.lock() {
            Ok(inner) => inner,
            Err(_) => fatal(ContractViolation::LockPoisoned),
        }
    }
}

impl Default for ArbiterCell {
    fn default() -> Self {
        Self::new()
    }
}
