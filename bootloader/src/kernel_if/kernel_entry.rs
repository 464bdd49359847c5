//! Kernel entry
//!
//! The one place in the loader that turns an integer address into code.

use elfboot_api::BootParams;

use super::elf_loader::{ENTRY_SENTINEL, LoadedImage};
use crate::error::{BootError, Result};

/// Validated entry address of a loaded image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelEntry {
    entry_point: u64,
}

impl KernelEntry {
    pub fn new(entry_point: u64) -> Result<Self> {
        if entry_point == ENTRY_SENTINEL {
            return Err(BootError::InvalidEntryPoint);
        }
        Ok(Self { entry_point })
    }

    pub fn from_image(image: &LoadedImage) -> Result<Self> {
        Self::new(image.entry_point)
    }

    pub fn entry_point(&self) -> u64 {
        self.entry_point
    }

    /// Call the image with the System V AMD64 convention, `params` in `rdi`.
    ///
    /// # Safety
    /// The entry address must point to code of the expected signature that is mapped
    /// executable, i.e. the image was fully materialized.
    #[cfg(target_arch = "x86_64")]
    pub unsafe fn invoke(self, params: &mut BootParams) -> i32 {
        // SAFETY: `entry_point` is nonzero and the caller vouches for the code behind it.
        let entry: elfboot_api::KernelEntryFn = unsafe { core::mem::transmute(self.entry_point as usize) };
        entry(params)
    }
}

/// Enter the image and never come back to the firmware.
///
/// The image's return value is logged, then the processor is halted.
///
/// # Safety
/// Same contract as [`KernelEntry::invoke`].
#[cfg(target_arch = "x86_64")]
pub unsafe fn transfer_control(entry: KernelEntry, params: &'static mut BootParams) -> ! {
    log::info!("ELF entry point {:#x}", entry.entry_point());
    let status = unsafe { entry.invoke(params) };
    log::info!("ELF returned {}", status);
    crate::arch::halt()
}
