//! Display mode negotiation
//!
//! The loader insists on one resolution. The first firmware mode that matches it
//! exactly is selected; anything else aborts the boot before an image is read.

use crate::config::Resolution;
use crate::error::{BootError, Result};
use crate::utils::boot_traits::DisplayProvider;

/// One mode as enumerated by the firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeInfo {
    /// Firmware mode number
    pub index: u32,
    pub width: u32,
    pub height: u32,
}

impl ModeInfo {
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }
}

/// Active display mode after negotiation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayMode {
    /// Linear framebuffer base address
    pub framebuffer_base: u64,
    pub width: u32,
    pub height: u32,
    pub pixels_per_scanline: u32,
}

/// Pick the first mode with exactly the target resolution, returning its mode number.
pub fn select_mode(modes: &[ModeInfo], target: Resolution) -> Option<u32> {
    modes
        .iter()
        .find(|mode| mode.resolution() == target)
        .map(|mode| mode.index)
}

/// Switch the display to `target` and report the resulting mode.
pub fn negotiate_display<D: DisplayProvider + ?Sized>(display: &mut D, target: Resolution) -> Result<DisplayMode> {
    let modes = display.modes()?;
    log::debug!("display offers {} mode(s)", modes.len());

    let index = select_mode(&modes, target).ok_or_else(|| {
        log::error!("unable to set video mode {}x{}", target.width, target.height);
        BootError::DisplayModeUnavailable {
            width: target.width,
            height: target.height,
        }
    })?;

    display.set_mode(index)?;
    let mode = display.current_mode()?;
    log::info!(
        "display mode {}x{} framebuffer {:#x}",
        mode.width,
        mode.height,
        mode.framebuffer_base
    );
    Ok(mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    struct FakeDisplay {
        modes: Vec<ModeInfo>,
        selected: Option<u32>,
    }

    impl DisplayProvider for FakeDisplay {
        fn modes(&mut self) -> Result<Vec<ModeInfo>> {
            Ok(self.modes.clone())
        }

        fn set_mode(&mut self, index: u32) -> Result<()> {
            self.selected = Some(index);
            Ok(())
        }

        fn current_mode(&mut self) -> Result<DisplayMode> {
            let index = self.selected.ok_or(BootError::DisplayUnavailable)?;
            let info = self
                .modes
                .iter()
                .find(|mode| mode.index == index)
                .ok_or(BootError::DisplayUnavailable)?;
            Ok(DisplayMode {
                framebuffer_base: 0x8000_0000,
                width: info.width,
                height: info.height,
                pixels_per_scanline: info.width + 8,
            })
        }
    }

    fn mode(index: u32, width: u32, height: u32) -> ModeInfo {
        ModeInfo { index, width, height }
    }

    #[test]
    fn test_select_first_exact_match() {
        let modes = [mode(0, 800, 600), mode(3, 640, 480), mode(7, 640, 480)];
        assert_eq!(select_mode(&modes, Resolution::new(640, 480)), Some(3));
        assert_eq!(select_mode(&modes, Resolution::new(1024, 768)), None);
        assert_eq!(select_mode(&[], Resolution::new(640, 480)), None);
    }

    #[test]
    fn test_no_partial_match() {
        let modes = [mode(0, 640, 400), mode(1, 480, 640)];
        assert_eq!(select_mode(&modes, Resolution::new(640, 480)), None);
    }

    #[test]
    fn test_negotiate_sets_and_reports_mode() {
        let mut display = FakeDisplay {
            modes: vec![mode(0, 1024, 768), mode(1, 640, 480)],
            selected: None,
        };

        let active = negotiate_display(&mut display, Resolution::new(640, 480)).unwrap();
        assert_eq!(display.selected, Some(1));
        assert_eq!(active.width, 640);
        assert_eq!(active.pixels_per_scanline, 648);
    }

    #[test]
    fn test_negotiate_without_match() {
        let mut display = FakeDisplay {
            modes: vec![mode(0, 1024, 768)],
            selected: None,
        };

        assert_eq!(
            negotiate_display(&mut display, Resolution::new(640, 480)),
            Err(BootError::DisplayModeUnavailable { width: 640, height: 480 })
        );
        assert_eq!(display.selected, None);
    }
}
