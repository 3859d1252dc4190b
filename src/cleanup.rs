//! Deferred cleanup - ordered (pointer, callback) registrations
//!
//! A registry holds type-erased destructors: each registration pairs an
//! opaque pointer with a plain function that knows how to tear it down. The
//! registry never owns the pointee. `run_all` invokes every pending callback
//! exactly once, most recent first, and keeps going when one fails.
//!
//! Callbacks must not register new cleanups. A pool runs its batch with
//! exclusive access, so its callbacks cannot reach the pool.

use core::ptr::NonNull;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::error::{CleanupFailure, CleanupStatus, PoolError};
use crate::logging;

/// Cleanup callback: receives the registered pointer, reports a status
pub type CleanupFn = unsafe fn(NonNull<u8>) -> CleanupStatus;

/// What a registration was made for. Typed pool operations cancel by kind
/// and pointer, since a generic function may have several addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupKind {
    /// Registered directly with a caller-supplied callback
    Callback,
    /// Destructor of an object constructed inside the arena
    Drop,
    /// Heap object whose lifetime was handed to the pool
    Adopted,
}

#[derive(Debug, Clone, Copy)]
pub struct Registration {
    handle: NonNull<u8>,
    callback: CleanupFn,
    kind: CleanupKind,
}

impl Registration {
    pub fn handle(&self) -> NonNull<u8> {
        self.handle
    }

    pub fn kind(&self) -> CleanupKind {
        self.kind
    }

    fn matches(&self, handle: NonNull<u8>, callback: CleanupFn) -> bool {
        self.handle == handle && self.callback as usize == callback as usize
    }
}

/// Outcome of one `run_all` batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Callbacks invoked, failed ones included
    pub ran: usize,
    pub failures: Vec<CleanupFailure>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct CleanupRegistry {
    pending: Vec<Registration>,
}

impl CleanupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a registration (no deduplication)
    ///
    /// # Safety
    ///
    /// `callback(handle)` must be sound to call until the registration is run
    /// or cancelled.
    pub unsafe fn register(&mut self, handle: NonNull<u8>, callback: CleanupFn) {
        self.register_kind(handle, callback, CleanupKind::Callback);
    }

    /// # Safety
    ///
    /// Same contract as [`CleanupRegistry::register`].
    pub(crate) unsafe fn register_kind(
        &mut self,
        handle: NonNull<u8>,
        callback: CleanupFn,
        kind: CleanupKind,
    ) {
        self.pending.push(Registration {
            handle,
            callback,
            kind,
        });
    }

    /// Remove the most recent registration of exactly this pair
    pub fn cancel(&mut self, handle: NonNull<u8>, callback: CleanupFn) -> Result<(), PoolError> {
        self.remove_last(|reg| reg.matches(handle, callback)).map(|_| ())
    }

    /// Remove the most recent registration of `kind` for `handle`
    pub(crate) fn cancel_kind(
        &mut self,
        handle: NonNull<u8>,
        kind: CleanupKind,
    ) -> Result<Registration, PoolError> {
        self.remove_last(|reg| reg.handle == handle && reg.kind == kind)
    }

    fn remove_last(
        &mut self,
        pred: impl Fn(&Registration) -> bool,
    ) -> Result<Registration, PoolError> {
        let index = self
            .pending
            .iter()
            .rposition(pred)
            .ok_or(PoolError::RegistrationNotFound)?;
        Ok(self.pending.remove(index))
    }

    pub fn contains(&self, handle: NonNull<u8>, callback: CleanupFn) -> bool {
        self.pending.iter().any(|reg| reg.matches(handle, callback))
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Run every pending callback once, newest first, then leave the registry empty
    ///
    /// A callback that fails or panics is recorded; the batch always completes.
    pub fn run_all(&mut self) -> CleanupReport {
        let batch = std::mem::take(&mut self.pending);
        let mut report = CleanupReport::default();

        for reg in batch.into_iter().rev() {
            // SAFETY: register's contract keeps the pair callable until now
            let outcome =
                panic::catch_unwind(AssertUnwindSafe(|| unsafe { (reg.callback)(reg.handle) }));
            report.ran += 1;

            let failure = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(failure)) => failure,
                Err(payload) => CleanupFailure::new(panic_message(payload.as_ref())),
            };
            logging::log_cleanup_failure(&failure.message);
            report.failures.push(failure);
        }

        report
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("callback panicked: {}", msg)
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("callback panicked: {}", msg)
    } else {
        "callback panicked".to_string()
    }
}
