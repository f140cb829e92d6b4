//! Domain types providing compile-time safety and self-documentation
//!
//! These newtype wrappers prevent common bugs like passing a fingerprint
//! where an address is expected, and make function signatures more
//! expressive.

use std::fmt;

/// Raw code address captured from a stack walk
///
/// An opaque machine word identifying a point in executable code. It is
/// only meaningful inside the process that produced it: ASLR randomizes
/// the mapping per run, so persisting or transmitting raw addresses
/// yields garbage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct RawAddress(pub u64);

impl RawAddress {
    /// The null address, used to zero-fill capture buffers
    pub const NULL: RawAddress = RawAddress(0);

    /// Returns true for the null address
    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for RawAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

impl From<u64> for RawAddress {
    fn from(addr: u64) -> Self {
        RawAddress(addr)
    }
}

impl From<RawAddress> for u64 {
    fn from(addr: RawAddress) -> Self {
        addr.0
    }
}

/// Process ID
///
/// Represents a process ID in the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pid(pub u32);

impl Pid {
    /// The ID of the calling process
    pub fn current() -> Self {
        Pid(std::process::id())
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PID:{}", self.0)
    }
}

impl From<u32> for Pid {
    fn from(pid: u32) -> Self {
        Pid(pid)
    }
}

/// Cheap stack-identity fingerprint computed at capture time
///
/// Folds the walker's per-walk hash assist into a fixed seed, so producing
/// it costs O(1) on top of the walk itself. Identical stacks always get
/// identical fingerprints; the converse does not hold, so any exact
/// deduplication must fall back to comparing the frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Fingerprint(pub u64);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
