//! Handles to pool-constructed objects
//!
//! A handle never owns its object. It carries the pool id and the pool
//! generation it was issued in, so the pool can reject it after a `clear`
//! without touching recycled memory.

use core::cell::Cell;
use core::fmt;
use core::marker::PhantomData;
use core::mem::ManuallyDrop;
use core::ptr::NonNull;

use crate::error::CleanupStatus;

/// In-arena storage for one constructed object
#[repr(C)]
pub(crate) struct Slot<T> {
    live: Cell<bool>,
    value: ManuallyDrop<T>,
}

impl<T> Slot<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            live: Cell::new(true),
            value: ManuallyDrop::new(value),
        }
    }

    pub(crate) fn is_live(&self) -> bool {
        self.live.get()
    }

    pub(crate) fn value(&self) -> &T {
        &self.value
    }

    pub(crate) fn value_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

/// Cleanup callback for a `Slot<T>`: marks it dead, then drops the value
///
/// # Safety
///
/// `ptr` must point to a live, initialized `Slot<T>`.
pub(crate) unsafe fn drop_slot<T>(ptr: NonNull<u8>) -> CleanupStatus {
    let slot = ptr.cast::<Slot<T>>().as_ptr();
    (*slot).live.set(false);
    ManuallyDrop::drop(&mut (*slot).value);
    Ok(())
}

/// Non-owning reference to an object constructed by a [`Pool`](super::Pool)
pub struct Handle<T> {
    slot: NonNull<Slot<T>>,
    pool_id: u64,
    generation: u64,
    _marker: PhantomData<*const T>,
}

impl<T> Handle<T> {
    pub(crate) fn new(slot: NonNull<Slot<T>>, pool_id: u64, generation: u64) -> Self {
        Self {
            slot,
            pool_id,
            generation,
            _marker: PhantomData,
        }
    }

    pub(crate) fn slot(&self) -> NonNull<Slot<T>> {
        self.slot
    }

    /// Id of the pool that issued this handle
    pub fn pool_id(&self) -> u64 {
        self.pool_id
    }

    /// Pool generation this handle belongs to
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.slot == other.slot
            && self.pool_id == other.pool_id
            && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("slot", &self.slot)
            .field("pool_id", &self.pool_id)
            .field("generation", &self.generation)
            .finish()
    }
}

/// Owning token for a heap object adopted by a pool
///
/// Not `Copy`: reclaiming consumes it, so a box cannot be reclaimed twice.
pub struct Adopted<T> {
    ptr: NonNull<T>,
    pool_id: u64,
    generation: u64,
}

impl<T> Adopted<T> {
    pub(crate) fn new(ptr: NonNull<T>, pool_id: u64, generation: u64) -> Self {
        Self {
            ptr,
            pool_id,
            generation,
        }
    }

    pub(crate) fn ptr(&self) -> NonNull<T> {
        self.ptr
    }

    pub(crate) fn issued_by(&self, pool_id: u64, generation: u64) -> bool {
        self.pool_id == pool_id && self.generation == generation
    }
}

impl<T> fmt::Debug for Adopted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adopted")
            .field("ptr", &self.ptr)
            .field("pool_id", &self.pool_id)
            .field("generation", &self.generation)
            .finish()
    }
}

/// Cleanup callback for an adopted `Box<T>`
///
/// # Safety
///
/// `ptr` must come from `Box::<T>::into_raw` and not have been reclaimed.
pub(crate) unsafe fn drop_adopted<T>(ptr: NonNull<u8>) -> CleanupStatus {
    drop(Box::from_raw(ptr.cast::<T>().as_ptr()));
    Ok(())
}
