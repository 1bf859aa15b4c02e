//! Profiler handle shared between the emulation thread and readers.
//!
//! The emulation thread is the only writer: it forwards stack events through
//! its [`SharedProfiler`] handle. Reporting threads hold clones of the same
//! handle and call [`SharedProfiler::snapshot`]. Each operation holds the
//! lock for one event or one table copy, never longer.
//!
//! # Example
//!
//! ```rust
//! use std::thread;
//! use cycle_profiler::{AddressInfo, MemoryType, SharedClock, SharedProfiler, StackFrameFlags};
//!
//! let clock = SharedClock::new();
//! let profiler = SharedProfiler::new(clock.clone());
//!
//! let emulation = {
//!     let profiler = profiler.clone();
//!     thread::spawn(move || {
//!         for _ in 0..100 {
//!             profiler.stack_function(AddressInfo::new(0x8000, MemoryType::PrgRom), StackFrameFlags::None);
//!             clock.advance(12);
//!             profiler.unstack_function();
//!         }
//!     })
//! };
//!
//! let _partial = profiler.snapshot(64);
//! emulation.join().unwrap();
//!
//! let snapshot = profiler.snapshot(64);
//! let total: u64 = snapshot.functions.iter().map(|f| f.exclusive_cycles).sum();
//! assert_eq!(total, 1200);
//! ```

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::address::{AddressInfo, FunctionKey};
use crate::clock::MasterClock;
use crate::config::ProfilerConfig;
use crate::error::Result;
use crate::frame::StackFrameFlags;
use crate::profiler::{ProfiledFunction, Profiler, Snapshot, SnapshotCount};

/// Cloneable, thread-safe handle to a [`Profiler`].
pub struct SharedProfiler<C: MasterClock> {
    inner: Arc<Mutex<Profiler<C>>>,
}

impl<C: MasterClock> Clone for SharedProfiler<C> {
    fn clone(&self) -> Self {
        SharedProfiler { inner: Arc::clone(&self.inner) }
    }
}

impl<C: MasterClock> SharedProfiler<C> {
    pub fn new(clock: C) -> SharedProfiler<C> {
        SharedProfiler::from(Profiler::new(clock))
    }

    pub fn with_config(clock: C, config: ProfilerConfig) -> Result<SharedProfiler<C>> {
        Profiler::with_config(clock, config).map(SharedProfiler::from)
    }

    pub fn stack_function(&self, address: AddressInfo, flags: StackFrameFlags) {
        self.inner.lock().stack_function(address, flags);
    }

    pub fn unstack_function(&self) {
        self.inner.lock().unstack_function();
    }

    pub fn reset(&self) {
        self.inner.lock().reset();
    }

    /// See [`Profiler::snapshot`].
    pub fn snapshot(&self, max_entries: usize) -> Snapshot {
        self.inner.lock().snapshot(max_entries)
    }

    /// See [`Profiler::snapshot_into`].
    pub fn snapshot_into(&self, buffer: &mut [ProfiledFunction]) -> SnapshotCount {
        self.inner.lock().snapshot_into(buffer)
    }

    pub fn function(&self, key: FunctionKey) -> Option<ProfiledFunction> {
        self.inner.lock().function(key).copied()
    }

    pub fn depth(&self) -> usize {
        self.inner.lock().depth()
    }

    /// Locks the profiler for a batch of operations.
    ///
    /// Readers block until the guard is dropped, so keep it short.
    pub fn lock(&self) -> MutexGuard<'_, Profiler<C>> {
        self.inner.lock()
    }
}

impl<C: MasterClock> From<Profiler<C>> for SharedProfiler<C> {
    fn from(profiler: Profiler<C>) -> SharedProfiler<C> {
        SharedProfiler { inner: Arc::new(Mutex::new(profiler)) }
    }
}
