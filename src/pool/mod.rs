//! Pool - an arena plus a cleanup registry, the unit of bulk lifetime
//!
//! Objects constructed through a pool have their destructors registered in
//! the pool's registry and run, newest first, on `clear` or teardown. Raw
//! allocations and duplicated strings carry no destructor. Memory comes back
//! only in bulk: `destroy` runs a destructor early but leaves its bytes in the
//! arena until the next `clear`, so construct/destroy loops grow the arena.
//!
//! A pool either owns its arena or is a view over an arena owned elsewhere;
//! a view runs its own cleanups on teardown but leaves the arena's memory to
//! the real owner.

mod handle;


pub use handle::{Adopted, Handle};

use core::marker::PhantomData;
use core::ptr::NonNull;
use std::alloc::Layout;
use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};

use handle::{drop_adopted, drop_slot, Slot};

use crate::adapter::PoolAllocator;
use crate::arena::{Arena, ArenaStats};
use crate::cleanup::{CleanupFn, CleanupKind, CleanupRegistry, CleanupReport};
use crate::config::PoolConfig;
use crate::error::{ConstructError, PoolError};
use crate::logging::{self, perf};
use crate::subsystem;

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

/// Whether the pool releases its arena on teardown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    Owned,
    /// Non-owning view over an externally owned arena
    View,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    Live,
    TornDown,
}

enum ArenaSlot<'a> {
    Owned(Arena),
    View(&'a mut Arena),
}

impl ArenaSlot<'_> {
    fn get(&self) -> &Arena {
        match self {
            Self::Owned(arena) => arena,
            Self::View(arena) => arena,
        }
    }

    fn get_mut(&mut self) -> &mut Arena {
        match self {
            Self::Owned(arena) => arena,
            Self::View(arena) => arena,
        }
    }

    fn ownership(&self) -> Ownership {
        match self {
            Self::Owned(_) => Ownership::Owned,
            Self::View(_) => Ownership::View,
        }
    }
}

/// Snapshot of a pool for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub id: u64,
    pub generation: u64,
    pub ownership: Ownership,
    pub state: PoolState,
    pub pending_cleanups: usize,
    pub arena: ArenaStats,
}

/// A memory pool. Not thread-safe; callers serialize access.
///
/// Values handed to the pool must outlive it: `T: 'static` for an owned
/// pool, `T: 'a` for a view over `&'a mut Arena`. A value borrowing a
/// shorter-lived local is rejected:
///
/// ```compile_fail
/// regionpool::init().unwrap();
/// let pool = regionpool::Pool::new().unwrap();
/// let local = vec![1u64, 2, 3];
/// pool.construct(&local).unwrap();
/// ```
///
/// So is a value borrowing the pool itself, whose destructor would run
/// while `clear` holds the pool exclusively:
///
/// ```compile_fail
/// regionpool::init().unwrap();
/// let mut pool = regionpool::Pool::new().unwrap();
/// let values = allocator_api2::vec::Vec::<u8, _>::new_in(pool.allocator::<u8>());
/// pool.construct(values).unwrap();
/// pool.clear().unwrap();
/// ```
pub struct Pool<'a> {
    id: u64,
    arena: ArenaSlot<'a>,
    cleanups: RefCell<CleanupRegistry>,
    generation: u64,
    state: PoolState,
    // Invariant in 'a, so a `Pool<'static>` cannot be viewed as `Pool<'short>`
    _lifetime: PhantomData<fn(&'a ()) -> &'a ()>,
}

impl Pool<'static> {
    /// Owning pool using the process-default configuration
    pub fn new() -> Result<Self, PoolError> {
        let config = subsystem::default_config()?;
        Self::with_config(&config)
    }

    /// Owning pool with explicit configuration
    pub fn with_config(config: &PoolConfig) -> Result<Self, PoolError> {
        subsystem::ensure_initialized()?;
        let arena = Arena::with_config(&config.arena)?;
        Ok(Self::build(ArenaSlot::Owned(arena)))
    }
}

impl<'a> Pool<'a> {
    /// Non-owning view over `arena`; teardown leaves the arena's memory alone
    pub fn view(arena: &'a mut Arena) -> Result<Self, PoolError> {
        subsystem::ensure_initialized()?;
        Ok(Self::build(ArenaSlot::View(arena)))
    }

    fn build(arena: ArenaSlot<'a>) -> Self {
        let id = NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed);
        logging::log_pool_created(id, arena.ownership() == Ownership::View);

        Self {
            id,
            arena,
            cleanups: RefCell::new(CleanupRegistry::new()),
            generation: 0,
            state: PoolState::Live,
            _lifetime: PhantomData,
        }
    }

    #[inline]
    fn ensure_live(&self) -> Result<(), PoolError> {
        match self.state {
            PoolState::Live => Ok(()),
            PoolState::TornDown => Err(PoolError::UseAfterTeardown),
        }
    }

    // ===== Raw allocation =====

    /// `size` zeroed bytes; no cleanup registered
    pub fn allocate_raw(&self, size: usize) -> Result<NonNull<u8>, PoolError> {
        self.ensure_live()?;
        self.arena.get().allocate(size)
    }

    /// Zeroed memory for `layout`; no cleanup registered
    pub fn allocate_layout(&self, layout: Layout) -> Result<NonNull<u8>, PoolError> {
        self.ensure_live()?;
        self.arena.get().allocate_layout(layout)
    }

    /// Copy `bytes` into the arena
    pub fn duplicate_bytes(&self, bytes: &[u8]) -> Result<&[u8], PoolError> {
        self.ensure_live()?;
        let layout = Layout::array::<u8>(bytes.len())
            .map_err(|_| PoolError::AllocationFailure {
                requested: bytes.len(),
            })?;
        let ptr = self.arena.get().allocate_layout(layout)?;

        // SAFETY: fresh allocation of bytes.len() bytes, valid until clear/teardown,
        // both of which need &mut self
        unsafe {
            core::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.as_ptr(), bytes.len());
            Ok(core::slice::from_raw_parts(ptr.as_ptr(), bytes.len()))
        }
    }

    /// Copy `text` into the arena; the view lives until the pool is cleared
    pub fn duplicate_string(&self, text: &str) -> Result<&str, PoolError> {
        let bytes = self.duplicate_bytes(text.as_bytes())?;
        // SAFETY: byte-for-byte copy of valid UTF-8
        Ok(unsafe { core::str::from_utf8_unchecked(bytes) })
    }

    // ===== Typed construction =====

    /// Move `value` into the arena and register its destructor
    pub fn construct<T: 'a>(&self, value: T) -> Result<Handle<T>, PoolError> {
        self.construct_with(|| value)
    }

    /// Zero-argument form
    pub fn construct_default<T: Default + 'a>(&self) -> Result<Handle<T>, PoolError> {
        self.construct_with(T::default)
    }

    /// Copy form
    pub fn construct_clone<T: Clone + 'a>(&self, source: &T) -> Result<Handle<T>, PoolError> {
        self.construct_with(|| source.clone())
    }

    /// Arbitrary-argument form: `init` builds the value in place
    ///
    /// The destructor is registered only after `init` returns, so a panicking
    /// initializer leaves nothing to clean up. `init` may itself construct
    /// through this pool; those objects are torn down after this one.
    pub fn construct_with<T, F>(&self, init: F) -> Result<Handle<T>, PoolError>
    where
        T: 'a,
        F: FnOnce() -> T,
    {
        self.try_construct_with(|| Ok::<T, std::convert::Infallible>(init()))
            .map_err(|err| match err {
                ConstructError::Pool(err) => err,
                ConstructError::Init(never) => match never {},
            })
    }

    /// Fallible in-place construction; on `Err` nothing is registered
    pub fn try_construct_with<T, E, F>(&self, init: F) -> Result<Handle<T>, ConstructError<E>>
    where
        T: 'a,
        F: FnOnce() -> Result<T, E>,
    {
        self.ensure_live()?;
        let slot = self
            .arena
            .get()
            .allocate_layout(Layout::new::<Slot<T>>())?
            .cast::<Slot<T>>();

        let value = init().map_err(ConstructError::Init)?;

        // SAFETY: slot is a fresh, aligned allocation for Slot<T>; the arena
        // keeps it valid until clear/teardown, which run the registry first
        unsafe {
            slot.as_ptr().write(Slot::new(value));
            self.cleanups
                .borrow_mut()
                .register_kind(slot.cast(), drop_slot::<T>, CleanupKind::Drop);
        }

        Ok(Handle::new(slot, self.id, self.generation))
    }

    fn check_handle<T>(&self, handle: &Handle<T>) -> Result<(), PoolError> {
        self.ensure_live()?;
        if handle.pool_id() != self.id || handle.generation() != self.generation {
            return Err(PoolError::StaleHandle);
        }
        Ok(())
    }

    /// Borrow a constructed object
    pub fn get<T>(&self, handle: &Handle<T>) -> Result<&T, PoolError> {
        self.check_handle(handle)?;
        // SAFETY: same pool and generation, so the slot memory is still ours
        let slot = unsafe { handle.slot().as_ref() };
        if !slot.is_live() {
            return Err(PoolError::StaleHandle);
        }
        Ok(slot.value())
    }

    pub fn get_mut<T>(&mut self, handle: &Handle<T>) -> Result<&mut T, PoolError> {
        self.check_handle(handle)?;
        // SAFETY: as in `get`; &mut self excludes other borrows of pool objects
        let slot = unsafe { &mut *handle.slot().as_ptr() };
        if !slot.is_live() {
            return Err(PoolError::StaleHandle);
        }
        Ok(slot.value_mut())
    }

    /// Run the object's destructor now and cancel its registration
    ///
    /// The object's bytes are NOT reclaimed; they return on the next `clear`.
    pub fn destroy<T>(&mut self, handle: Handle<T>) -> Result<(), PoolError> {
        self.ensure_live()?;
        if handle.pool_id() != self.id || handle.generation() != self.generation {
            return Err(PoolError::RegistrationNotFound);
        }

        let slot = handle.slot().cast::<u8>();
        self.cleanups.get_mut().cancel_kind(slot, CleanupKind::Drop)?;

        // SAFETY: the registration was pending, so the slot is live and ours
        unsafe {
            let _ = drop_slot::<T>(slot);
        }
        Ok(())
    }

    // ===== Adopted heap objects =====

    /// Hand a heap object to the pool; it is dropped at clear/teardown
    pub fn adopt<T: 'a>(&self, value: Box<T>) -> Result<Adopted<T>, PoolError> {
        self.ensure_live()?;
        // SAFETY: Box::into_raw is non-null
        let ptr = unsafe { NonNull::new_unchecked(Box::into_raw(value)) };

        // SAFETY: the box stays alive until reclaimed or dropped by the registry
        unsafe {
            self.cleanups
                .borrow_mut()
                .register_kind(ptr.cast(), drop_adopted::<T>, CleanupKind::Adopted);
        }
        Ok(Adopted::new(ptr, self.id, self.generation))
    }

    pub fn get_adopted<T>(&self, adopted: &Adopted<T>) -> Result<&T, PoolError> {
        self.ensure_live()?;
        if !adopted.issued_by(self.id, self.generation) {
            return Err(PoolError::StaleHandle);
        }
        // SAFETY: same generation, so the registry has not dropped the box
        Ok(unsafe { adopted.ptr().as_ref() })
    }

    /// Take manual ownership back, cancelling the pending drop
    ///
    /// On failure the token is handed back with the error, so a token sent to
    /// the wrong pool can still be reclaimed from the pool that issued it.
    pub fn reclaim<T>(&mut self, adopted: Adopted<T>) -> Result<Box<T>, (PoolError, Adopted<T>)> {
        if let Err(err) = self.ensure_live() {
            return Err((err, adopted));
        }
        if !adopted.issued_by(self.id, self.generation) {
            return Err((PoolError::RegistrationNotFound, adopted));
        }

        let ptr = adopted.ptr();
        if let Err(err) = self.cleanups.get_mut().cancel_kind(ptr.cast(), CleanupKind::Adopted) {
            return Err((err, adopted));
        }

        // SAFETY: registration was pending, so the box was never freed
        Ok(unsafe { Box::from_raw(ptr.as_ptr()) })
    }

    // ===== Raw registrations =====

    /// Register a cleanup for an arbitrary pointer
    ///
    /// # Safety
    ///
    /// `callback(handle)` must be sound to call until this pool clears, tears
    /// down, or the registration is cancelled.
    pub unsafe fn register_cleanup(
        &self,
        handle: NonNull<u8>,
        callback: CleanupFn,
    ) -> Result<(), PoolError> {
        self.ensure_live()?;
        self.cleanups.borrow_mut().register(handle, callback);
        Ok(())
    }

    pub fn cancel_cleanup(
        &self,
        handle: NonNull<u8>,
        callback: CleanupFn,
    ) -> Result<(), PoolError> {
        self.ensure_live()?;
        self.cleanups.borrow_mut().cancel(handle, callback)
    }

    // ===== Bulk reclamation =====

    /// Run all pending cleanups, then reset the arena
    ///
    /// Every handle and raw pointer obtained before this call becomes invalid.
    pub fn clear(&mut self) -> Result<CleanupReport, PoolError> {
        self.ensure_live()?;
        let _perf = perf::track("pool.clear");

        let report = self.cleanups.get_mut().run_all();
        self.arena.get_mut().reset();
        self.generation += 1;

        logging::log_cleanup_batch(self.id, report.ran, report.failures.len());
        Ok(report)
    }

    /// Live -> TornDown: run all cleanups, release an owned arena
    ///
    /// A view leaves its arena untouched for the owner to release.
    pub fn teardown(&mut self) -> Result<CleanupReport, PoolError> {
        self.ensure_live()?;
        let _perf = perf::track("pool.teardown");

        let report = self.cleanups.get_mut().run_all();
        if let ArenaSlot::Owned(arena) = &mut self.arena {
            arena.release();
        }
        self.generation += 1;
        self.state = PoolState::TornDown;

        logging::log_cleanup_batch(self.id, report.ran, report.failures.len());
        logging::log_pool_teardown(self.id, report.ran);
        Ok(report)
    }

    // ===== Introspection =====

    /// Typed allocator bound to this pool, for containers
    pub fn allocator<T>(&self) -> PoolAllocator<'_, T> {
        PoolAllocator::new(self)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn ownership(&self) -> Ownership {
        self.arena.ownership()
    }

    pub fn state(&self) -> PoolState {
        self.state
    }

    pub fn pending_cleanups(&self) -> usize {
        self.cleanups.borrow().len()
    }

    pub fn arena(&self) -> &Arena {
        self.arena.get()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            id: self.id,
            generation: self.generation,
            ownership: self.ownership(),
            state: self.state,
            pending_cleanups: self.pending_cleanups(),
            arena: self.arena.get().stats(),
        }
    }
}

impl Drop for Pool<'_> {
    fn drop(&mut self) {
        if self.state == PoolState::Live {
            let _ = self.teardown();
        }
    }
}

impl std::fmt::Debug for Pool<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool").field("stats", &self.stats()).finish()
    }
}
