//! Shadow call stack frames.
//!
//! Every [`stack_function`](crate::Profiler::stack_function) pushes one
//! [`StackFrame`] recording the function that was running, why it was left
//! and how many cycles its invocation had accumulated so far. The matching
//! [`unstack_function`](crate::Profiler::unstack_function) pops it again.
//!
//! # Interrupt Boundaries
//!
//! Frames pushed with [`StackFrameFlags::Nmi`] or [`StackFrameFlags::Irq`]
//! mark the point where a handler interrupted the running code. Inclusive
//! time flows up the stack until it reaches such a frame: the interrupted
//! function still receives the cycles, its callers do not.

use crate::address::FunctionKey;

/// Why a frame was pushed.
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StackFrameFlags {
    /// Regular subroutine call.
    #[default]
    None,
    Nmi,
    Irq,
}

impl StackFrameFlags {
    /// Returns true for frames where an interrupt handler took over.
    pub fn is_interrupt(self) -> bool {
        self != StackFrameFlags::None
    }
}

/// One live entry of the shadow call stack.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StackFrame {
    /// Function that was running when the frame was pushed.
    pub caller: FunctionKey,
    pub flags: StackFrameFlags,
    /// Cycles the caller's invocation had accumulated at push time.
    pub cycles_at_push: u64,
}
