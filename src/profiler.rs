//! Call-stack cycle accounting.
//!
//! [`Profiler`] mirrors the emulated program's call stack and charges every
//! master clock cycle to the function that was executing it (exclusive time)
//! and to each caller still waiting on it (inclusive time). Interrupt frames
//! stop the inclusive walk, so an interrupted routine is not billed for the
//! handler that preempted it.
//!
//! The debugger drives the profiler with two events:
//!
//! - [`Profiler::stack_function`] on a call or interrupt dispatch
//! - [`Profiler::unstack_function`] on the matching return
//!
//! # Example
//!
//! ```rust
//! use cycle_profiler::{AddressInfo, FunctionKey, MemoryType, Profiler, SharedClock, StackFrameFlags};
//!
//! let clock = SharedClock::new();
//! let mut profiler = Profiler::new(clock.clone());
//!
//! let main = AddressInfo::new(0x8000, MemoryType::PrgRom);
//! let vblank = AddressInfo::new(0x8100, MemoryType::PrgRom);
//!
//! profiler.stack_function(main, StackFrameFlags::None);
//! clock.advance(100);
//! profiler.stack_function(vblank, StackFrameFlags::Nmi);
//! clock.advance(40);
//! profiler.unstack_function();
//! clock.advance(10);
//!
//! let snapshot = profiler.snapshot(16);
//! let main = snapshot.get(FunctionKey::try_from(main).unwrap()).unwrap();
//! assert_eq!(main.exclusive_cycles, 110);
//! // The NMI frame stops the handler's cycles at `main`, the interrupted function.
//! assert_eq!(main.inclusive_cycles, 150);
//! let root = snapshot.get(FunctionKey::Root).unwrap();
//! assert_eq!(root.inclusive_cycles, 110);
//! ```

use std::collections::HashMap;

use log::{debug, trace};

use crate::address::{AddressInfo, FunctionKey};
use crate::clock::MasterClock;
use crate::config::ProfilerConfig;
use crate::error::Result;
use crate::frame::{StackFrame, StackFrameFlags};

/// Accumulated statistics for one function.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProfiledFunction {
    pub key: FunctionKey,
    /// Cycles spent executing the function's own code.
    pub exclusive_cycles: u64,
    /// Exclusive cycles plus time spent in callees, up to the nearest interrupt frame.
    pub inclusive_cycles: u64,
    pub call_count: u64,
    /// Shortest completed invocation; `u64::MAX` until one returns.
    pub min_cycles: u64,
    /// Longest completed invocation.
    pub max_cycles: u64,
}

impl ProfiledFunction {
    pub fn new(key: FunctionKey) -> ProfiledFunction {
        ProfiledFunction {
            key,
            exclusive_cycles: 0,
            inclusive_cycles: 0,
            call_count: 0,
            min_cycles: u64::MAX,
            max_cycles: 0,
        }
    }

    /// Shortest completed invocation, if any invocation has returned yet.
    pub fn min_duration(&self) -> Option<u64> {
        (self.min_cycles != u64::MAX).then_some(self.min_cycles)
    }

    /// Inclusive cycles per call.
    pub fn average_cycles(&self) -> Option<u64> {
        self.inclusive_cycles.checked_div(self.call_count)
    }

    fn record_invocation(&mut self, cycles: u64) {
        self.min_cycles = self.min_cycles.min(cycles);
        self.max_cycles = self.max_cycles.max(cycles);
    }
}

/// Records copied out of a profiler by [`Profiler::snapshot`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Snapshot {
    /// Copied records, in no particular order.
    pub functions: Vec<ProfiledFunction>,
    /// Records the profiler held when the snapshot was taken.
    pub total: usize,
}

impl Snapshot {
    /// Returns true when some records did not fit in the snapshot.
    pub fn is_truncated(&self) -> bool {
        self.functions.len() < self.total
    }

    /// Finds the record for `key` by scanning the copied records.
    ///
    /// This is O(n) per call; collect into a map when looking up many keys.
    pub fn get(&self, key: FunctionKey) -> Option<&ProfiledFunction> {
        self.functions.iter().find(|func| func.key == key)
    }
}

/// Outcome of [`Profiler::snapshot_into`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SnapshotCount {
    /// Leading buffer slots that were overwritten.
    pub written: usize,
    pub total: usize,
}

impl SnapshotCount {
    pub fn is_truncated(&self) -> bool {
        self.written < self.total
    }
}

/// Shadow call stack and per-function cycle table.
pub struct Profiler<C: MasterClock> {
    clock: C,
    config: ProfilerConfig,
    functions: HashMap<FunctionKey, ProfiledFunction>,
    stack: Vec<StackFrame>,
    current_function: FunctionKey,
    // Cycles of the active invocation, callees included.
    current_cycle_count: u64,
    prev_master_clock: u64,
}

impl<C: MasterClock> Profiler<C> {
    /// Creates a profiler with the default configuration, anchored at the
    /// clock's current value.
    pub fn new(clock: C) -> Profiler<C> {
        Profiler::build(clock, ProfilerConfig::default())
    }

    pub fn with_config(clock: C, config: ProfilerConfig) -> Result<Profiler<C>> {
        config.validate()?;
        Ok(Profiler::build(clock, config))
    }

    fn build(clock: C, config: ProfilerConfig) -> Profiler<C> {
        let mut profiler = Profiler {
            prev_master_clock: clock.master_clock(),
            clock,
            config,
            functions: HashMap::new(),
            stack: Vec::with_capacity(config.stack_capacity),
            current_function: FunctionKey::Root,
            current_cycle_count: 0,
        };
        profiler.reset();
        profiler
    }

    /// Enters the function at `address`, called from the current function.
    ///
    /// `flags` tells whether this is a regular call or an interrupt dispatch.
    /// Untracked addresses (negative) are ignored.
    pub fn stack_function(&mut self, address: AddressInfo, flags: StackFrameFlags) {
        match FunctionKey::try_from(address) {
            Ok(key) => self.push_frame(key, flags),
            Err(err) => trace!("ignoring transfer: {err}"),
        }
    }

    fn push_frame(&mut self, key: FunctionKey, flags: StackFrameFlags) {
        self.update_cycles();

        self.stack.push(StackFrame {
            caller: self.current_function,
            flags,
            cycles_at_push: self.current_cycle_count,
        });

        self.functions
            .entry(key)
            .or_insert_with(|| ProfiledFunction::new(key))
            .call_count += 1;

        self.current_function = key;
        self.current_cycle_count = 0;
    }

    /// Returns from the current function to its caller.
    ///
    /// A return with nothing on the shadow stack is ignored; it can come from
    /// the emulated program unwinding past the point where profiling started.
    pub fn unstack_function(&mut self) {
        if self.stack.is_empty() {
            trace!("ignoring return from {:?} with an empty stack", self.current_function);
            return;
        }

        self.update_cycles();

        let duration = self.current_cycle_count;
        if let Some(func) = self.functions.get_mut(&self.current_function) {
            func.record_invocation(duration);
        }

        if let Some(frame) = self.stack.pop() {
            self.current_function = frame.caller;
            // The caller's invocation keeps running and includes the callee.
            self.current_cycle_count = frame.cycles_at_push + duration;
        }
    }

    /// Drops every record and frame and restarts accounting from the
    /// clock's current value.
    pub fn reset(&mut self) {
        self.prev_master_clock = self.clock.master_clock();
        self.current_cycle_count = 0;
        self.current_function = FunctionKey::Root;
        self.stack.clear();

        self.functions.clear();
        self.functions.insert(FunctionKey::Root, ProfiledFunction::new(FunctionKey::Root));
        debug!("profiler reset at master clock {}", self.prev_master_clock);
    }

    /// Charges the cycles elapsed since the last update.
    fn update_cycles(&mut self) {
        let master_clock = self.clock.master_clock();
        let gap = master_clock.saturating_sub(self.prev_master_clock);

        let current = self.current_function;
        let func = self.functions
            .entry(current)
            .or_insert_with(|| ProfiledFunction::new(current));
        func.exclusive_cycles += gap;
        func.inclusive_cycles += gap;

        for frame in self.stack.iter().rev() {
            if let Some(caller) = self.functions.get_mut(&frame.caller) {
                caller.inclusive_cycles += gap;
            }
            if frame.flags.is_interrupt() {
                // Code below an IRQ/NMI frame was preempted, not waiting on a callee.
                break;
            }
        }

        self.current_cycle_count += gap;
        self.prev_master_clock = master_clock;
    }

    /// Copies up to `max_entries` records, after charging pending cycles.
    ///
    /// `max_entries` is clamped to the configured snapshot limit.
    pub fn snapshot(&mut self, max_entries: usize) -> Snapshot {
        self.update_cycles();

        let limit = max_entries.min(self.config.snapshot_limit);
        let snapshot = Snapshot {
            functions: self.functions.values().take(limit).copied().collect(),
            total: self.functions.len(),
        };
        if snapshot.is_truncated() {
            debug!(
                "snapshot truncated to {} of {} functions",
                snapshot.functions.len(),
                snapshot.total
            );
        }
        snapshot
    }

    /// Fills the front of `buffer` with records, after charging pending cycles.
    ///
    /// Writes at most `buffer.len()` records, clamped to the configured
    /// snapshot limit, and leaves the remaining slots untouched.
    pub fn snapshot_into(&mut self, buffer: &mut [ProfiledFunction]) -> SnapshotCount {
        self.update_cycles();

        let limit = buffer.len().min(self.config.snapshot_limit);
        let mut written = 0;
        for (slot, func) in buffer[..limit].iter_mut().zip(self.functions.values()) {
            *slot = *func;
            written += 1;
        }

        let count = SnapshotCount { written, total: self.functions.len() };
        if count.is_truncated() {
            debug!("snapshot truncated to {} of {} functions", count.written, count.total);
        }
        count
    }

    /// Record for `key`, as of the last stack event or snapshot.
    pub fn function(&self, key: FunctionKey) -> Option<&ProfiledFunction> {
        self.functions.get(&key)
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    /// Number of unreturned calls since the last reset.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn current_function(&self) -> FunctionKey {
        self.current_function
    }

    /// Cycles of the active invocation as of the last stack event or snapshot.
    pub fn current_cycle_count(&self) -> u64 {
        self.current_cycle_count
    }

    pub fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}


#[cfg(test)]
mod tests {
    use super::{ProfiledFunction, Profiler};
    use crate::address::{AddressInfo, FunctionKey, MemoryType};
    use crate::clock::{MasterClock, SharedClock};
    use crate::config::ProfilerConfig;
    use crate::frame::StackFrameFlags;

    fn rom(address: i32) -> AddressInfo {
        AddressInfo::new(address, MemoryType::PrgRom)
    }

    fn key(address: i32) -> FunctionKey {
        FunctionKey::try_from(rom(address)).unwrap()
    }

    fn profiler() -> (SharedClock, Profiler<SharedClock>) {
        let clock = SharedClock::new();
        (clock.clone(), Profiler::new(clock))
    }

    fn stats(profiler: &Profiler<SharedClock>, key: FunctionKey) -> ProfiledFunction {
        *profiler.function(key).unwrap()
    }

    #[test]
    fn splits_exclusive_and_inclusive_time() {
        let (clock, mut profiler) = profiler();
        clock.advance(10);
        profiler.stack_function(rom(0xa), StackFrameFlags::None);
        clock.advance(5);
        profiler.stack_function(rom(0xb), StackFrameFlags::None);
        clock.advance(7);
        profiler.unstack_function();
        clock.advance(3);
        profiler.unstack_function();
        clock.advance(2);
        profiler.snapshot(16);

        let root = stats(&profiler, FunctionKey::Root);
        assert_eq!(12, root.exclusive_cycles);
        assert_eq!(27, root.inclusive_cycles);

        let a = stats(&profiler, key(0xa));
        assert_eq!(8, a.exclusive_cycles);
        assert_eq!(15, a.inclusive_cycles);
        assert_eq!(15, a.max_cycles);
        assert_eq!(Some(15), a.min_duration());

        let b = stats(&profiler, key(0xb));
        assert_eq!(7, b.exclusive_cycles);
        assert_eq!(7, b.inclusive_cycles);
    }

    #[test]
    fn interrupt_frame_stops_inclusive_propagation() {
        let (clock, mut profiler) = profiler();
        profiler.stack_function(rom(0xa), StackFrameFlags::None);
        clock.advance(2);
        profiler.stack_function(rom(0xb), StackFrameFlags::None);
        clock.advance(3);
        profiler.stack_function(rom(0x1), StackFrameFlags::Irq);
        clock.advance(4);
        profiler.stack_function(rom(0xc), StackFrameFlags::None);
        clock.advance(6);
        profiler.unstack_function();
        clock.advance(1);
        profiler.unstack_function();
        clock.advance(2);
        profiler.unstack_function();
        clock.advance(1);
        profiler.unstack_function();

        let a = stats(&profiler, key(0xa));
        assert_eq!(3, a.exclusive_cycles);
        assert_eq!(8, a.inclusive_cycles);

        let b = stats(&profiler, key(0xb));
        assert_eq!(5, b.exclusive_cycles);
        assert_eq!(16, b.inclusive_cycles);
        assert_eq!(16, b.max_cycles);

        let irq = stats(&profiler, key(0x1));
        assert_eq!(5, irq.exclusive_cycles);
        assert_eq!(11, irq.inclusive_cycles);

        let c = stats(&profiler, key(0xc));
        assert_eq!(6, c.exclusive_cycles);
        assert_eq!(6, c.inclusive_cycles);

        assert_eq!(8, stats(&profiler, FunctionKey::Root).inclusive_cycles);
        assert_eq!(0, profiler.depth());
    }

    #[test]
    fn nmi_frame_is_a_boundary_too() {
        let (clock, mut profiler) = profiler();
        profiler.stack_function(rom(0xa), StackFrameFlags::None);
        profiler.stack_function(rom(0x2), StackFrameFlags::Nmi);
        clock.advance(9);
        profiler.unstack_function();

        assert_eq!(9, stats(&profiler, key(0xa)).inclusive_cycles);
        assert_eq!(0, stats(&profiler, FunctionKey::Root).inclusive_cycles);
    }

    #[test]
    fn counts_recursive_calls() {
        let (clock, mut profiler) = profiler();
        for _ in 0..3 {
            profiler.stack_function(rom(0xa), StackFrameFlags::None);
            clock.advance(1);
        }
        profiler.stack_function(rom(0xb), StackFrameFlags::None);
        for _ in 0..4 {
            profiler.unstack_function();
        }

        assert_eq!(3, stats(&profiler, key(0xa)).call_count);
        assert_eq!(1, stats(&profiler, key(0xb)).call_count);
        let a = stats(&profiler, key(0xa));
        assert_eq!(Some(1), a.min_duration());
        assert_eq!(3, a.max_cycles);
    }

    #[test]
    fn tracks_min_and_max_invocation() {
        let (clock, mut profiler) = profiler();
        for cycles in [12, 4, 30, 9] {
            profiler.stack_function(rom(0xa), StackFrameFlags::None);
            clock.advance(cycles);
            profiler.unstack_function();
        }

        let a = stats(&profiler, key(0xa));
        assert_eq!(4, a.min_cycles);
        assert_eq!(30, a.max_cycles);
        assert_eq!(4, a.call_count);
        assert_eq!(Some(13), a.average_cycles());
    }

    #[test]
    fn ignores_untracked_calls() {
        let (clock, mut profiler) = profiler();
        clock.advance(5);
        profiler.stack_function(AddressInfo::new(-1, MemoryType::CpuMemory), StackFrameFlags::None);

        assert_eq!(0, profiler.depth());
        assert_eq!(1, profiler.function_count());
        assert_eq!(FunctionKey::Root, profiler.current_function());
        // Nothing was flushed either.
        assert_eq!(0, stats(&profiler, FunctionKey::Root).exclusive_cycles);
    }

    #[test]
    fn ignores_return_on_empty_stack() {
        let (clock, mut profiler) = profiler();
        clock.advance(5);
        profiler.unstack_function();

        assert_eq!(FunctionKey::Root, profiler.current_function());
        let root = stats(&profiler, FunctionKey::Root);
        assert_eq!(ProfiledFunction::new(FunctionKey::Root), root);
        assert_eq!(None, root.min_duration());
    }

    #[test]
    fn reset_clears_everything() {
        let (clock, mut profiler) = profiler();
        profiler.stack_function(rom(0xa), StackFrameFlags::None);
        clock.advance(50);
        profiler.stack_function(rom(0xb), StackFrameFlags::Irq);
        clock.advance(50);

        profiler.reset();
        assert_eq!(0, profiler.depth());
        assert_eq!(1, profiler.function_count());
        assert_eq!(FunctionKey::Root, profiler.current_function());
        assert_eq!(0, profiler.current_cycle_count());

        profiler.reset();
        clock.advance(8);
        let snapshot = profiler.snapshot(16);
        assert_eq!(1, snapshot.total);
        assert_eq!(8, snapshot.get(FunctionKey::Root).unwrap().exclusive_cycles);
    }

    #[test]
    fn snapshot_does_not_double_count() {
        let (clock, mut profiler) = profiler();
        profiler.stack_function(rom(0xa), StackFrameFlags::None);
        clock.advance(20);

        let first = profiler.snapshot(16);
        let second = profiler.snapshot(16);
        assert_eq!(20, first.get(key(0xa)).unwrap().exclusive_cycles);
        assert_eq!(first.get(key(0xa)), second.get(key(0xa)));
        assert_eq!(1, profiler.depth());
        assert_eq!(1, stats(&profiler, key(0xa)).call_count);
    }

    #[test]
    fn snapshot_reports_truncation() {
        let clock = SharedClock::new();
        let config = ProfilerConfig::default().with_snapshot_limit(2);
        let mut profiler = Profiler::with_config(clock, config).unwrap();
        for address in 0..4 {
            profiler.stack_function(rom(address), StackFrameFlags::None);
        }

        let snapshot = profiler.snapshot(100);
        assert_eq!(2, snapshot.functions.len());
        assert_eq!(5, snapshot.total);
        assert!(snapshot.is_truncated());
        assert_eq!(1, profiler.snapshot(1).functions.len());
        assert_eq!(2, profiler.config().snapshot_limit);
    }

    #[test]
    fn snapshot_into_respects_configured_limit() {
        let config = ProfilerConfig::default().with_snapshot_limit(2);
        let mut profiler = Profiler::with_config(SharedClock::new(), config).unwrap();
        for address in 0..4 {
            profiler.stack_function(rom(address), StackFrameFlags::None);
        }

        let filler = ProfiledFunction::new(key(0xfff));
        let mut buffer = [filler; 8];
        let count = profiler.snapshot_into(&mut buffer);
        assert_eq!(2, count.written);
        assert_eq!(5, count.total);
        assert!(count.is_truncated());
        assert!(buffer[..2].iter().all(|func| func.key != key(0xfff)));
        assert_eq!(filler, buffer[2]);
    }

    #[test]
    fn snapshot_into_fills_buffer_front() {
        let (_clock, mut profiler) = profiler();
        profiler.stack_function(rom(0xa), StackFrameFlags::None);

        let filler = ProfiledFunction::new(key(0xfff));
        let mut buffer = [filler; 4];
        let count = profiler.snapshot_into(&mut buffer);
        assert_eq!(2, count.written);
        assert_eq!(2, count.total);
        assert!(!count.is_truncated());
        assert_eq!(filler, buffer[2]);

        let mut small = [filler; 1];
        assert!(profiler.snapshot_into(&mut small).is_truncated());
    }

    #[test]
    fn rejects_invalid_config() {
        let config = ProfilerConfig::default().with_snapshot_limit(0);
        assert!(Profiler::with_config(SharedClock::new(), config).is_err());
    }

    #[test]
    fn anchors_to_clock_at_creation() {
        let clock = SharedClock::starting_at(1_000);
        let mut profiler = Profiler::new(clock.clone());
        clock.advance(4);
        let snapshot = profiler.snapshot(1);
        assert_eq!(4, snapshot.get(FunctionKey::Root).unwrap().exclusive_cycles);
        assert_eq!(1_004, profiler.clock().master_clock());
    }
}
