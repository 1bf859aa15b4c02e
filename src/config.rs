//! Profiler configuration.

use crate::error::{ProfilerError, Result};

/// Hard cap on the number of records a single snapshot copies out.
///
/// Bounds the time a snapshot holds the profiler and the buffer size a
/// consumer has to provide.
pub const MAX_SNAPSHOT_ENTRIES: usize = 100_000;

const DEFAULT_STACK_CAPACITY: usize = 64;

/// Tunables for a [`Profiler`](crate::Profiler).
///
/// # Example
///
/// ```rust
/// use cycle_profiler::ProfilerConfig;
///
/// let config = ProfilerConfig::default()
///     .with_snapshot_limit(4096)
///     .with_stack_capacity(256);
/// assert!(config.validate().is_ok());
///
/// assert!(ProfilerConfig::default().with_snapshot_limit(0).validate().is_err());
/// ```
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ProfilerConfig {
    /// Most records a snapshot may return, at most [`MAX_SNAPSHOT_ENTRIES`].
    pub snapshot_limit: usize,
    /// Shadow stack slots reserved up front; deeper stacks still grow.
    pub stack_capacity: usize,
}

impl ProfilerConfig {
    pub fn with_snapshot_limit(mut self, snapshot_limit: usize) -> ProfilerConfig {
        self.snapshot_limit = snapshot_limit;
        self
    }

    pub fn with_stack_capacity(mut self, stack_capacity: usize) -> ProfilerConfig {
        self.stack_capacity = stack_capacity;
        self
    }

    pub fn validate(&self) -> Result<()> {
        match self.snapshot_limit {
            0 => Err(ProfilerError::ZeroSnapshotLimit),
            requested if requested > MAX_SNAPSHOT_ENTRIES =>
                Err(ProfilerError::SnapshotLimitTooLarge { requested, max: MAX_SNAPSHOT_ENTRIES }),
            _ => Ok(()),
        }
    }
}

impl Default for ProfilerConfig {
    fn default() -> ProfilerConfig {
        ProfilerConfig {
            snapshot_limit: MAX_SNAPSHOT_ENTRIES,
            stack_capacity: DEFAULT_STACK_CAPACITY,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::{ProfilerConfig, MAX_SNAPSHOT_ENTRIES};
    use crate::error::ProfilerError;

    #[test]
    fn default_is_valid() {
        assert_eq!(Ok(()), ProfilerConfig::default().validate());
    }
    #[test]
    fn rejects_limit_above_cap() {
        let config = ProfilerConfig::default().with_snapshot_limit(MAX_SNAPSHOT_ENTRIES + 1);
        let expected = ProfilerError::SnapshotLimitTooLarge {
            requested: MAX_SNAPSHOT_ENTRIES + 1,
            max: MAX_SNAPSHOT_ENTRIES,
        };
        assert_eq!(Err(expected), config.validate());
    }
    #[test]
    fn rejects_zero_limit() {
        let config = ProfilerConfig::default().with_snapshot_limit(0);
        assert_eq!(Err(ProfilerError::ZeroSnapshotLimit), config.validate());
    }
}
