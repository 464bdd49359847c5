//! Firmware-backed segment memory
//!
//! Segment pages are allocated from the firmware at their exact link address, so
//! an image can never land on memory the firmware or the loader already owns.

use alloc::collections::BTreeSet;
use core::ptr::{self, NonNull};

use uefi::boot::{self, AllocateType, MemoryType};

use crate::kernel_if::elf64::SegmentFlags;
use crate::memory::{MemorySink, MemorySinkError, PAGE_SIZE, pages_spanned};

/// Memory sink backed by `AllocatePages(AllocateAddress)`
#[derive(Debug, Default)]
pub struct FirmwareMemorySink {
    pages: BTreeSet<u64>,
}

impl FirmwareMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn page_numbers(address: u64, len: u64) -> Result<core::ops::Range<u64>, MemorySinkError> {
        let count = pages_spanned(address, len).ok_or(MemorySinkError::AddressOverflow)?;
        let first = address / PAGE_SIZE;
        Ok(first..first + count)
    }

    fn check_reserved(&self, address: u64, len: u64) -> Result<(), MemorySinkError> {
        let mut pages = Self::page_numbers(address, len)?;
        if pages.all(|page| self.pages.contains(&page)) {
            Ok(())
        } else {
            Err(MemorySinkError::Unreserved { address, len })
        }
    }

    fn allocate_run(&mut self, first: u64, count: u64, memory_type: MemoryType) -> uefi::Result<NonNull<u8>> {
        let base = boot::allocate_pages(AllocateType::Address(first * PAGE_SIZE), memory_type, count as usize)?;
        self.pages.extend(first..first + count);
        Ok(base)
    }
}

impl MemorySink for FirmwareMemorySink {
    fn reserve(&mut self, address: u64, len: u64, flags: SegmentFlags) -> Result<(), MemorySinkError> {
        let memory_type = if flags.contains(SegmentFlags::EXECUTE) {
            MemoryType::LOADER_CODE
        } else {
            MemoryType::LOADER_DATA
        };

        // Pages shared with an earlier segment are already ours
        let mut run: Option<(u64, u64)> = None;
        for page in Self::page_numbers(address, len)?.chain(core::iter::once(u64::MAX)) {
            let missing = page != u64::MAX && !self.pages.contains(&page);
            match (run, missing) {
                (Some((first, count)), true) if first + count == page => run = Some((first, count + 1)),
                (Some((first, count)), _) => {
                    self.allocate_run(first, count, memory_type).map_err(|err| {
                        log::error!(
                            "firmware refused {} page(s) at {:#x}: {:?}",
                            count,
                            first * PAGE_SIZE,
                            err.status()
                        );
                        MemorySinkError::Refused { address, len }
                    })?;
                    run = missing.then_some((page, 1));
                }
                (None, true) => run = Some((page, 1)),
                (None, false) => {}
            }
        }

        Ok(())
    }

    fn write(&mut self, address: u64, bytes: &[u8]) -> Result<(), MemorySinkError> {
        self.check_reserved(address, bytes.len() as u64)?;
        // SAFETY: every page of the destination was allocated to us above.
        unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), address as usize as *mut u8, bytes.len()) };
        Ok(())
    }

    fn zero(&mut self, address: u64, len: u64) -> Result<(), MemorySinkError> {
        self.check_reserved(address, len)?;
        // SAFETY: as for `write`.
        unsafe { ptr::write_bytes(address as usize as *mut u8, 0, len as usize) };
        Ok(())
    }
}
