//! Errors for the few fallible surfaces of the profiler.
//!
//! Stack events themselves never fail: an untracked call target or a return
//! with nothing on the shadow stack is absorbed. Errors only surface when
//! converting raw debugger addresses into [`FunctionKey`](crate::FunctionKey)s
//! and when validating a [`ProfilerConfig`](crate::ProfilerConfig).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProfilerError>;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ProfilerError {
    /// The debugger marked this transfer as untracked (negative address).
    #[error("address {0} does not identify a tracked function")]
    UntrackedAddress(i32),
    #[error("snapshot limit must be at least 1")]
    ZeroSnapshotLimit,
    #[error("snapshot limit {requested} exceeds the maximum of {max} entries")]
    SnapshotLimitTooLarge { requested: usize, max: usize },
}
