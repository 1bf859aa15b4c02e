//! Master clock access for the profiler.
//!
//! This module provides the [`MasterClock`] trait through which the profiler
//! reads the emulator's cycle counter, along with [`SharedClock`] which is a
//! ready-to-use counter that the execution loop advances and any number of
//! profilers (on any thread) observe.
//!
//! # Clock Semantics
//!
//! The master clock counts emulated cycles since power-on. It is owned by the
//! execution engine and only ever moves forward; the profiler never writes it.
//! Every stack transition reads the clock once and attributes the cycles
//! elapsed since the previous read.

use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Trait for reading the emulator's master clock.
///
/// Implement this trait to let the profiler read the cycle counter of your
/// emulation core directly.
///
/// # Example
///
/// ```rust
/// use cycle_profiler::clock::MasterClock;
///
/// struct Console {
///     master_clock: u64,
/// }
///
/// impl MasterClock for Console {
///     fn master_clock(&self) -> u64 {
///         self.master_clock
///     }
/// }
/// ```
pub trait MasterClock
{
    /// Returns the number of master clock cycles elapsed so far.
    ///
    /// Successive calls must never return a smaller value.
    fn master_clock(&self) -> u64;
}

impl<T: MasterClock + ?Sized> MasterClock for &T {
    fn master_clock(&self) -> u64 {
        (**self).master_clock()
    }
}

impl<T: MasterClock + ?Sized> MasterClock for Arc<T> {
    fn master_clock(&self) -> u64 {
        (**self).master_clock()
    }
}

impl MasterClock for Cell<u64> {
    fn master_clock(&self) -> u64 {
        self.get()
    }
}

/// Shared, thread-safe master clock counter.
///
/// Cloning a `SharedClock` yields another handle to the same counter, so the
/// execution loop can keep one handle to advance while the profiler owns
/// another.
///
/// # Example
///
/// ```rust
/// use cycle_profiler::clock::{MasterClock, SharedClock};
///
/// let clock = SharedClock::new();
/// let observer = clock.clone();
///
/// clock.advance(6);
/// clock.advance(8);
/// assert_eq!(observer.master_clock(), 14);
/// ```
#[derive(Clone, Debug, Default)]
pub struct SharedClock {
    cycles: Arc<AtomicU64>,
}

impl SharedClock {
    /// Creates a clock starting at cycle zero.
    pub fn new() -> SharedClock {
        SharedClock::starting_at(0)
    }

    /// Creates a clock starting at the given cycle.
    pub fn starting_at(cycles: u64) -> SharedClock {
        SharedClock { cycles: Arc::new(AtomicU64::new(cycles)) }
    }

    /// Advances the clock by `cycles` and returns the new value.
    pub fn advance(&self, cycles: u64) -> u64
    {
        self.cycles.fetch_add(cycles, Ordering::Relaxed) + cycles
    }
}

impl MasterClock for SharedClock {
    fn master_clock(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }
}
