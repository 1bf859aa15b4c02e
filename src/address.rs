//! Function identities for the profiler.
//!
//! The debugger reports call targets as an [`AddressInfo`]: a raw address plus
//! the [`MemoryType`] it was resolved in. The profiler keys its statistics by
//! [`FunctionKey`], so the same numeric address in two memory types counts as
//! two distinct functions.
//!
//! # Untracked Transfers
//!
//! A negative address means the debugger could not (or chose not to) resolve
//! the target. Such an [`AddressInfo`] has no [`FunctionKey`]:
//!
//! ```rust
//! use cycle_profiler::{AddressInfo, FunctionKey, MemoryType, ProfilerError};
//!
//! let rom = AddressInfo::new(0x8000, MemoryType::PrgRom);
//! assert!(FunctionKey::try_from(rom).is_ok());
//!
//! let untracked = AddressInfo::new(-1, MemoryType::CpuMemory);
//! assert_eq!(FunctionKey::try_from(untracked), Err(ProfilerError::UntrackedAddress(-1)));
//! ```

use std::fmt;

use crate::error::ProfilerError;

/// Address space a call target was resolved in.
///
/// Bus variants (`*Memory`) are addresses as seen by a processor; the others
/// are offsets into a specific physical memory.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum MemoryType {
    CpuMemory,
    SpcMemory,
    Sa1Memory,
    GsuMemory,
    Cx4Memory,
    PrgRom,
    WorkRam,
    SaveRam,
    VideoRam,
    SpriteRam,
    CGRam,
    SpcRam,
    SpcRom,
    DspProgramRom,
    DspDataRom,
    DspDataRam,
    Sa1InternalRam,
    GsuWorkRam,
    Cx4DataRam,
    BsxPsRam,
    BsxMemoryPack,
    Register,
}

/// A call target as resolved by the debugger.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AddressInfo {
    /// Address within `memory_type`, or negative when untracked.
    pub address: i32,
    pub memory_type: MemoryType,
}

impl AddressInfo {
    pub fn new(address: i32, memory_type: MemoryType) -> AddressInfo {
        AddressInfo { address, memory_type }
    }

    pub fn is_tracked(self) -> bool {
        self.address >= 0
    }
}

/// Identity of a profiled function.
///
/// [`FunctionKey::Root`] stands for the code running outside any tracked call,
/// i.e. everything executed since the last reset before the first
/// [`stack_function`](crate::Profiler::stack_function). The profiler always
/// keeps a record for it.
#[derive(Copy, Clone, Hash, Eq, PartialEq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FunctionKey {
    Root,
    Function { address: u32, memory_type: MemoryType },
}

impl FunctionKey {
    pub fn new(address: u32, memory_type: MemoryType) -> FunctionKey {
        FunctionKey::Function { address, memory_type }
    }

    /// Returns the debugger address for this key.
    ///
    /// `None` for the root and for addresses above `i32::MAX`, which the
    /// debugger cannot report as tracked.
    pub fn address_info(self) -> Option<AddressInfo> {
        match self {
            FunctionKey::Root => None,
            FunctionKey::Function { address, memory_type } => i32::try_from(address)
                .ok()
                .map(|address| AddressInfo::new(address, memory_type)),
        }
    }

    pub fn is_root(self) -> bool {
        self == FunctionKey::Root
    }
}

impl TryFrom<AddressInfo> for FunctionKey {
    type Error = ProfilerError;

    fn try_from(info: AddressInfo) -> Result<FunctionKey, ProfilerError> {
        u32::try_from(info.address)
            .map(|address| FunctionKey::new(address, info.memory_type))
            .map_err(|_| ProfilerError::UntrackedAddress(info.address))
    }
}

impl fmt::Debug for FunctionKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            FunctionKey::Root => write!(f, "[Root]"),
            FunctionKey::Function { address, memory_type } =>
                write!(f, "[{memory_type:?}:${address:06X}]"),
        }
    }
}
