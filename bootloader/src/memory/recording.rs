//! In-memory sink that records every operation
//!
//! Reserved ranges are backed by heap buffers keyed by their start address. Fresh
//! reservations are filled with [`POISON`] so a missing zero fill shows up in reads.

use alloc::collections::BTreeMap;
use alloc::vec;
use alloc::vec::Vec;

use super::{MemorySink, MemorySinkError};
use crate::kernel_if::elf64::SegmentFlags;

/// Fill byte for reserved but not yet written memory
pub const POISON: u8 = 0xAA;

/// One call made against a [`RecordingSink`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkOp {
    Reserve { address: u64, len: u64, flags: SegmentFlags },
    Write { address: u64, len: u64 },
    Zero { address: u64, len: u64 },
}

/// Sparse memory sink for tests and dry runs
#[derive(Debug, Default)]
pub struct RecordingSink {
    regions: BTreeMap<u64, Vec<u8>>,
    refused: Vec<(u64, u64)>,
    ops: Vec<SinkOp>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse any reservation touching `[address, address + len)`, as firmware does for
    /// memory it already owns.
    pub fn refuse(mut self, address: u64, len: u64) -> Self {
        self.refused.push((address, address.saturating_add(len)));
        self
    }

    /// Operations in call order
    pub fn ops(&self) -> &[SinkOp] {
        &self.ops
    }

    /// Number of write and zero operations performed
    pub fn store_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| !matches!(op, SinkOp::Reserve { .. }))
            .count()
    }

    /// Read back `len` bytes at `address`, if they lie inside one reservation.
    pub fn read(&self, address: u64, len: u64) -> Option<&[u8]> {
        let (start, offset) = self.locate(address, len)?;
        let region = self.regions.get(&start)?;
        region.get(offset..offset + len as usize)
    }

    /// Start addresses and lengths of all reservations
    pub fn reserved(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.regions.iter().map(|(start, bytes)| (*start, bytes.len() as u64))
    }

    /// Find the reservation fully containing the range; returns its start and the offset
    /// of `address` inside it.
    fn locate(&self, address: u64, len: u64) -> Option<(u64, usize)> {
        let end = address.checked_add(len)?;
        let (start, bytes) = self.regions.range(..=address).next_back()?;
        let region_end = start + bytes.len() as u64;
        if end <= region_end {
            Some((*start, (address - start) as usize))
        } else {
            None
        }
    }

    fn region_mut(&mut self, address: u64, len: u64) -> Result<&mut [u8], MemorySinkError> {
        address.checked_add(len).ok_or(MemorySinkError::AddressOverflow)?;
        let (start, offset) = self
            .locate(address, len)
            .ok_or(MemorySinkError::Unreserved { address, len })?;
        let region = self
            .regions
            .get_mut(&start)
            .ok_or(MemorySinkError::Unreserved { address, len })?;
        Ok(&mut region[offset..offset + len as usize])
    }
}

fn ranges_overlap(a: (u64, u64), b: (u64, u64)) -> bool {
    a.0 < b.1 && b.0 < a.1
}

impl MemorySink for RecordingSink {
    fn reserve(&mut self, address: u64, len: u64, flags: SegmentFlags) -> Result<(), MemorySinkError> {
        let end = address.checked_add(len).ok_or(MemorySinkError::AddressOverflow)?;
        let wanted = (address, end);

        let taken = self
            .regions
            .iter()
            .any(|(start, bytes)| ranges_overlap(wanted, (*start, start + bytes.len() as u64)));
        if taken || self.refused.iter().any(|range| ranges_overlap(wanted, *range)) {
            return Err(MemorySinkError::Refused { address, len });
        }

        self.regions.insert(address, vec![POISON; len as usize]);
        self.ops.push(SinkOp::Reserve { address, len, flags });
        Ok(())
    }

    fn write(&mut self, address: u64, bytes: &[u8]) -> Result<(), MemorySinkError> {
        let len = bytes.len() as u64;
        self.region_mut(address, len)?.copy_from_slice(bytes);
        self.ops.push(SinkOp::Write { address, len });
        Ok(())
    }

    fn zero(&mut self, address: u64, len: u64) -> Result<(), MemorySinkError> {
        self.region_mut(address, len)?.fill(0);
        self.ops.push(SinkOp::Zero { address, len });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_write_zero() {
        let mut sink = RecordingSink::new();
        sink.reserve(0x1000, 8, SegmentFlags::READ).unwrap();
        assert_eq!(sink.read(0x1000, 8), Some(&[POISON; 8][..]));

        sink.write(0x1000, &[1, 2, 3]).unwrap();
        sink.zero(0x1003, 5).unwrap();
        assert_eq!(sink.read(0x1000, 8), Some(&[1, 2, 3, 0, 0, 0, 0, 0][..]));
        assert_eq!(sink.store_count(), 2);
    }

    #[test]
    fn test_write_outside_reservation() {
        let mut sink = RecordingSink::new();
        sink.reserve(0x1000, 4, SegmentFlags::READ).unwrap();

        assert_eq!(
            sink.write(0x1002, &[0; 4]),
            Err(MemorySinkError::Unreserved { address: 0x1002, len: 4 })
        );
        assert_eq!(
            sink.zero(0x0FFF, 1),
            Err(MemorySinkError::Unreserved { address: 0x0FFF, len: 1 })
        );
        assert_eq!(sink.store_count(), 0);
    }

    #[test]
    fn test_double_reservation_refused() {
        let mut sink = RecordingSink::new();
        sink.reserve(0x2000, 0x1000, SegmentFlags::READ).unwrap();

        assert!(sink.reserve(0x2800, 0x1000, SegmentFlags::READ).is_err());
        assert!(sink.reserve(0x3000, 0x10, SegmentFlags::READ).is_ok());
    }

    #[test]
    fn test_refused_range() {
        let mut sink = RecordingSink::new().refuse(0x10_0000, 0x1000);
        assert_eq!(
            sink.reserve(0x10_0800, 0x10, SegmentFlags::READ),
            Err(MemorySinkError::Refused { address: 0x10_0800, len: 0x10 })
        );
        assert!(sink.ops().is_empty());
    }

    #[test]
    fn test_reserve_overflow() {
        let mut sink = RecordingSink::new();
        assert_eq!(
            sink.reserve(u64::MAX - 1, 4, SegmentFlags::READ),
            Err(MemorySinkError::AddressOverflow)
        );
    }
}
