//! Exclusive host port assignment.

use crate::deployment::domain::{PortRange, ServicePort};
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors returned by the port allocator.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum PortAllocatorError {
    /// Every port in the range is assigned.
    #[error("all {capacity} ports are assigned")]
    Exhausted {
        /// Size of the port range.
        capacity: u16,
    },
}

#[derive(Debug)]
struct PortPool {
    free: VecDeque<ServicePort>,
    held: HashSet<ServicePort>,
}

/// Hands out ports from a fixed range so no two live instances share one.
///
/// Free and held ports are tracked explicitly under a single mutex that is
/// never held across an await point. Released ports go to the back of the
/// free queue, so a port is not reused until every other free port has been.
#[derive(Debug)]
pub struct PortAllocator {
    range: PortRange,
    pool: Mutex<PortPool>,
}

impl PortAllocator {
    /// Creates an allocator with every port in `range` free.
    #[must_use]
    pub fn new(range: PortRange) -> Self {
        Self {
            range,
            pool: Mutex::new(PortPool {
                free: range.ports().collect(),
                held: HashSet::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PortPool> {
        self.pool.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the managed range.
    #[must_use]
    pub const fn range(&self) -> PortRange {
        self.range
    }

    /// Assigns a free port.
    ///
    /// # Errors
    ///
    /// Returns [`PortAllocatorError::Exhausted`] when every port is held.
    pub fn allocate(&self) -> Result<ServicePort, PortAllocatorError> {
        let mut pool = self.lock();
        let Some(port) = pool.free.pop_front() else {
            return Err(PortAllocatorError::Exhausted {
                capacity: self.range.capacity(),
            });
        };
        pool.held.insert(port);
        debug!(port = port.get(), "port allocated");
        Ok(port)
    }

    /// Returns `port` to the free pool.
    ///
    /// Releasing a port that is not held is a no-op.
    pub fn release(&self, port: ServicePort) {
        let mut pool = self.lock();
        if !pool.held.remove(&port) {
            warn!(port = port.get(), "released a port that was not assigned");
            return;
        }
        pool.free.push_back(port);
        debug!(port = port.get(), "port released");
    }

    /// Returns whether `port` is currently assigned.
    #[must_use]
    pub fn is_held(&self, port: ServicePort) -> bool {
        self.lock().held.contains(&port)
    }

    /// Returns how many ports are assigned.
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.lock().held.len()
    }

    /// Returns how many ports are free.
    #[must_use]
    pub fn available(&self) -> usize {
        self.lock().free.len()
    }
}
