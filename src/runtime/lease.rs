//! # Client Lease
//!
//! Single-slot lease guarding the span from "start building a transport
//! client" to "that client is closed".
//!
//! Concurrent connection setup in the transport can mix up unrelated
//! credential contexts, so at most one provider instance holds a live client
//! per process. The lease is injected into the factory: tests that do not care
//! about the transport defect use [`ClientLease::unrestricted`].

use crate::errors::{ProviderError, Result};
use crate::observability::metrics;
use std::sync::{Arc, LazyLock};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::debug;

static PROCESS_WIDE: LazyLock<ClientLease> = LazyLock::new(ClientLease::single_slot);

/// Lease manager handing out at most one [`LeaseHandle`] at a time
#[derive(Debug, Clone)]
pub struct ClientLease {
    slot: Option<Arc<Semaphore>>,
}

impl ClientLease {
    /// The lease shared by every provider in this process
    pub fn process_wide() -> Self {
        PROCESS_WIDE.clone()
    }

    /// A fresh, independent single-slot lease
    pub fn single_slot() -> Self {
        Self {
            slot: Some(Arc::new(Semaphore::new(1))),
        }
    }

    /// A lease that never blocks
    pub fn unrestricted() -> Self {
        Self { slot: None }
    }

    /// Wait for the slot. Cancellation while waiting yields `Cancelled`.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<LeaseHandle> {
        let Some(slot) = &self.slot else {
            return Ok(LeaseHandle::new(None));
        };
        let permit = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ProviderError::Cancelled),
            permit = Arc::clone(slot).acquire_owned() => permit
                .map_err(|e| ProviderError::transport(format!("client lease unavailable: {e}")))?,
        };
        debug!("Acquired client lease");
        Ok(LeaseHandle::new(Some(permit)))
    }

    /// Take the slot only if it is free right now
    pub fn try_acquire(&self) -> Option<LeaseHandle> {
        match &self.slot {
            None => Some(LeaseHandle::new(None)),
            Some(slot) => Arc::clone(slot)
                .try_acquire_owned()
                .ok()
                .map(|permit| LeaseHandle::new(Some(permit))),
        }
    }

    /// Whether a handle is currently outstanding (always false when unrestricted)
    pub fn is_held(&self) -> bool {
        self.slot
            .as_ref()
            .is_some_and(|slot| slot.available_permits() == 0)
    }
}

/// Proof of holding the lease; the slot frees when the handle is dropped
#[derive(Debug)]
pub struct LeaseHandle {
    permit: Option<OwnedSemaphorePermit>,
}

impl LeaseHandle {
    fn new(permit: Option<OwnedSemaphorePermit>) -> Self {
        metrics::inc_active_clients();
        Self { permit }
    }

    /// Give the slot back
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for LeaseHandle {
    fn drop(&mut self) {
        metrics::dec_active_clients();
        if self.permit.take().is_some() {
            debug!("Released client lease");
        }
    }
}
