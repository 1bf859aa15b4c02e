//! # cycle-profiler - Call-Stack Cycle Profiler for Emulators
//!
//! A live profiler for cycle-stepped emulators. It mirrors the emulated
//! program's call stack and attributes every master clock cycle to the
//! function that executed it, producing per-function statistics as the
//! program runs.
//!
//! ## Features
//!
//! - Exclusive (self) and inclusive (self + callees) cycle counts per function
//! - Call counts and shortest/longest invocation per function
//! - Functions keyed by address *and* memory type, see [`FunctionKey`]
//! - Interrupt-aware: IRQ/NMI handler time is never billed to the code it preempted
//! - Tolerates irregular control flow: recursion, unmatched returns, resets mid-call
//! - Thread-safe snapshots for UI/reporting threads via [`SharedProfiler`]
//!
//! ## Quick Start
//!
//! ```rust
//! use cycle_profiler::{AddressInfo, FunctionKey, MemoryType, Profiler, SharedClock, StackFrameFlags};
//!
//! // The emulator advances the clock, the profiler reads it
//! let clock = SharedClock::new();
//! let mut profiler = Profiler::new(clock.clone());
//!
//! let init = AddressInfo::new(0x8000, MemoryType::PrgRom);
//! let clear_vram = AddressInfo::new(0x8200, MemoryType::PrgRom);
//!
//! // JSR init
//! profiler.stack_function(init, StackFrameFlags::None);
//! clock.advance(20);
//!
//! // JSR clear_vram, runs for 300 cycles, RTS
//! profiler.stack_function(clear_vram, StackFrameFlags::None);
//! clock.advance(300);
//! profiler.unstack_function();
//!
//! // RTS from init
//! clock.advance(5);
//! profiler.unstack_function();
//!
//! let snapshot = profiler.snapshot(100);
//! let init = snapshot.get(FunctionKey::try_from(init).unwrap()).unwrap();
//! assert_eq!(init.exclusive_cycles, 25);
//! assert_eq!(init.inclusive_cycles, 325);
//! assert_eq!(init.call_count, 1);
//! ```
//!
//! ## Custom Clock Source
//!
//! Implement [`MasterClock`] to let the profiler read your emulator's
//! cycle counter directly:
//!
//! ```rust
//! use std::cell::Cell;
//! use cycle_profiler::{MasterClock, Profiler};
//!
//! struct Console {
//!     master_clock: Cell<u64>,
//! }
//!
//! impl MasterClock for Console {
//!     fn master_clock(&self) -> u64 {
//!         self.master_clock.get()
//!     }
//! }
//!
//! let console = Console { master_clock: Cell::new(0) };
//! let mut profiler = Profiler::new(&console);
//! console.master_clock.set(1000);
//! assert_eq!(profiler.snapshot(1).functions[0].exclusive_cycles, 1000);
//! ```
//!
//! ## Interrupts
//!
//! Push interrupt dispatches with [`StackFrameFlags::Irq`] or
//! [`StackFrameFlags::Nmi`]. The interrupted function's inclusive time still
//! grows while the handler runs, but nothing further down the stack does.
//!
//! ## Architecture
//!
//! - [`profiler`] - Cycle accounting with [`Profiler`] and the [`ProfiledFunction`] record
//! - [`shared`] - [`SharedProfiler`] handle for cross-thread snapshots
//! - [`address`] - Function identities: [`AddressInfo`], [`MemoryType`], [`FunctionKey`]
//! - [`frame`] - Shadow call stack frames and [`StackFrameFlags`]
//! - [`clock`] - Master clock access with the [`MasterClock`] trait
//! - [`config`] - [`ProfilerConfig`] and snapshot limits
//! - [`error`] - [`ProfilerError`]

pub mod address;
pub mod clock;
pub mod config;
pub mod error;
pub mod frame;
pub mod profiler;
pub mod shared;

// Re-export commonly used types at crate root for convenience
pub use address::{AddressInfo, FunctionKey, MemoryType};
pub use clock::{MasterClock, SharedClock};
pub use config::{ProfilerConfig, MAX_SNAPSHOT_ENTRIES};
pub use error::{ProfilerError, Result};
pub use frame::{StackFrame, StackFrameFlags};
pub use profiler::{ProfiledFunction, Profiler, Snapshot, SnapshotCount};
pub use shared::SharedProfiler;
