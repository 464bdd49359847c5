//! Graphics Output Protocol display
//!
//! Mode numbers handed to the boot sequence are GOP mode numbers, i.e. positions in
//! the firmware's mode list.

use alloc::vec::Vec;

use uefi::boot::{self, ScopedProtocol};
use uefi::proto::console::gop::GraphicsOutput;

use crate::boot_stage::display::{DisplayMode, ModeInfo};
use crate::error::{BootError, Result};
use crate::utils::boot_traits::DisplayProvider;

pub struct GopDisplay {
    gop: ScopedProtocol<GraphicsOutput>,
}

impl GopDisplay {
    /// Open the first Graphics Output Protocol instance.
    pub fn open() -> Result<Self> {
        let handle = boot::get_handle_for_protocol::<GraphicsOutput>().map_err(|err| {
            log::error!("unable to get graphics output protocol: {:?}", err.status());
            BootError::DisplayUnavailable
        })?;
        let gop = boot::open_protocol_exclusive::<GraphicsOutput>(handle)?;
        Ok(Self { gop })
    }
}

impl DisplayProvider for GopDisplay {
    fn modes(&mut self) -> Result<Vec<ModeInfo>> {
        Ok(self
            .gop
            .modes()
            .enumerate()
            .map(|(index, mode)| {
                let (width, height) = mode.info().resolution();
                ModeInfo {
                    index: index as u32,
                    width: width as u32,
                    height: height as u32,
                }
            })
            .collect())
    }

    fn set_mode(&mut self, index: u32) -> Result<()> {
        let mode = self
            .gop
            .modes()
            .nth(index as usize)
            .ok_or(BootError::DisplayUnavailable)?;
        self.gop.set_mode(&mode)?;

        // The text console keeps its old geometry until it is reset
        uefi::system::with_stdout(|out| out.reset(false))?;
        uefi::system::with_stderr(|err| err.reset(false))?;
        Ok(())
    }

    fn current_mode(&mut self) -> Result<DisplayMode> {
        let info = self.gop.current_mode_info();
        let (width, height) = info.resolution();
        let framebuffer_base = self.gop.frame_buffer().as_mut_ptr() as u64;

        Ok(DisplayMode {
            framebuffer_base,
            width: width as u32,
            height: height as u32,
            pixels_per_scanline: info.stride() as u32,
        })
    }
}
