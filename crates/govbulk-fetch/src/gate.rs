use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::{FetchError, Result};

/// Counting semaphore capping simultaneous network operations.
///
/// Clones share the same slots.
#[derive(Clone, Debug)]
pub struct Gate {
    semaphore: Arc<Semaphore>,
    capacity:  usize,
}

/// A held slot; the slot is returned when the permit is dropped.
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
}

impl GatePermit {
    pub fn release(self) {}
}

impl Gate {
    /// Creates a gate with `capacity` slots. A capacity of zero is raised to
    /// one so that work can always make progress.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Waits until a slot is free and takes it.
    pub async fn acquire(&self) -> Result<GatePermit> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| FetchError::GateClosed)?;
        Ok(GatePermit { _permit: permit })
    }

    pub fn capacity(&self) -> usize { self.capacity }

    /// Slots not currently held.
    pub fn available(&self) -> usize { self.semaphore.available_permits() }
}
