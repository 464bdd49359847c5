//! Core bootloader traits for dependency injection
//!
//! The boot sequence talks to the firmware only through these interfaces, so it can
//! run against fakes on the host.

use alloc::vec::Vec;

use crate::boot_stage::display::{DisplayMode, ModeInfo};
use crate::error::Result;

/// Whole-file reader for the boot device
pub trait ImageSource {
    /// Read the file at `path` completely.
    fn read_image(&mut self, path: &str) -> Result<Vec<u8>>;
}

/// Graphics output interface
pub trait DisplayProvider {
    /// Enumerate the available modes
    fn modes(&mut self) -> Result<Vec<ModeInfo>>;

    /// Switch to the mode with the given firmware mode number
    fn set_mode(&mut self, index: u32) -> Result<()>;

    /// Describe the active mode
    fn current_mode(&mut self) -> Result<DisplayMode>;
}
