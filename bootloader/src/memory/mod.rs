//! Segment destination memory
//!
//! The ELF loader never writes through raw pointers itself. Every destination range is
//! first reserved through a [`MemorySink`], then filled with file bytes and zeros. At
//! boot the sink is backed by firmware page allocation; tests use [`RecordingSink`].

use core::fmt;

use crate::kernel_if::elf64::SegmentFlags;

pub mod recording;

pub use recording::{RecordingSink, SinkOp};

/// Page granularity used when reserving segment memory
pub const PAGE_SIZE: u64 = 0x1000;

/// Number of pages needed to cover `[address, address + len)`.
pub fn pages_spanned(address: u64, len: u64) -> Option<u64> {
    if len == 0 {
        return Some(0);
    }
    let first = address / PAGE_SIZE;
    let last = address.checked_add(len - 1)? / PAGE_SIZE;
    Some(last - first + 1)
}

/// Destination for loadable segment contents
pub trait MemorySink {
    /// Claim `[address, address + len)` for a segment with the given permissions.
    ///
    /// Must fail if any part of the range is already owned by someone else.
    fn reserve(&mut self, address: u64, len: u64, flags: SegmentFlags) -> Result<(), MemorySinkError>;

    /// Copy `bytes` to `address`. The range must have been reserved.
    fn write(&mut self, address: u64, bytes: &[u8]) -> Result<(), MemorySinkError>;

    /// Fill `[address, address + len)` with zeros. The range must have been reserved.
    fn zero(&mut self, address: u64, len: u64) -> Result<(), MemorySinkError>;
}

/// Memory sink errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemorySinkError {
    /// The range is owned by the firmware or an earlier reservation
    Refused { address: u64, len: u64 },
    /// A write or zero fill touched memory that was never reserved
    Unreserved { address: u64, len: u64 },
    /// `address + len` wraps around the address space
    AddressOverflow,
}

impl MemorySinkError {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemorySinkError::Refused { .. } => "Destination memory refused",
            MemorySinkError::Unreserved { .. } => "Destination memory not reserved",
            MemorySinkError::AddressOverflow => "Destination address overflow",
        }
    }
}

impl fmt::Display for MemorySinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemorySinkError::Refused { address, len } | MemorySinkError::Unreserved { address, len } => {
                write!(f, "{} at {:#x} ({} bytes)", self.as_str(), address, len)
            }
            MemorySinkError::AddressOverflow => f.write_str(self.as_str()),
        }
    }
}
