//! Boot sequence
//!
//! Drives one boot from display negotiation to the prepared hand-off:
//! display -> parameter block (framebuffer) -> image read -> segment load ->
//! parameter block (arguments). Every step is fatal on failure; there is no fallback
//! image and no retry.

use elfboot_api::BootParams;

use super::display::{DisplayMode, negotiate_display};
use crate::config::BootConfig;
use crate::error::{BootError, Result};
use crate::kernel_if::boot_params_builder::BootParamsBuilder;
use crate::kernel_if::elf_loader::{ElfLoader, LoadedImage};
use crate::kernel_if::kernel_entry::KernelEntry;
use crate::memory::MemorySink;
use crate::utils::boot_traits::{DisplayProvider, ImageSource};

/// Everything needed to enter the loaded image
#[derive(Debug)]
pub struct PreparedHandoff {
    pub entry: KernelEntry,
    pub params: &'static mut BootParams,
    pub image: LoadedImage,
    pub display: DisplayMode,
}

impl PreparedHandoff {
    pub fn entry_point(&self) -> u64 {
        self.entry.entry_point()
    }

    /// Transfer control to the image. Never returns.
    ///
    /// # Safety
    /// The segments of `image` must be resident and executable at their link addresses.
    #[cfg(target_arch = "x86_64")]
    pub unsafe fn enter(self) -> ! {
        unsafe { crate::kernel_if::kernel_entry::transfer_control(self.entry, self.params) }
    }
}

/// Owns the state of a single boot
pub struct BootSequence {
    config: BootConfig,
}

impl BootSequence {
    pub fn new(config: BootConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BootConfig {
        &self.config
    }

    /// Run every step up to, but not including, control transfer.
    pub fn prepare<D, S, M, I>(
        &self,
        display: &mut D,
        source: &mut S,
        sink: &mut M,
        args: I,
    ) -> Result<PreparedHandoff>
    where
        D: DisplayProvider + ?Sized,
        S: ImageSource + ?Sized,
        M: MemorySink + ?Sized,
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mode = negotiate_display(display, self.config.target_resolution)?;
        let builder = BootParamsBuilder::new().framebuffer(&mode);

        let image = self.load_image(source, sink)?;
        let entry = KernelEntry::from_image(&image)?;

        let params = builder.arguments(args)?.build()?;
        log::debug!("forwarding {} argument(s)", params.argc);

        Ok(PreparedHandoff {
            entry,
            params,
            image,
            display: mode,
        })
    }

    /// Read the configured image and materialize its segments into `sink`.
    ///
    /// The file buffer is released before this returns.
    pub fn load_image<S, M>(&self, source: &mut S, sink: &mut M) -> Result<LoadedImage>
    where
        S: ImageSource + ?Sized,
        M: MemorySink + ?Sized,
    {
        let buffer = source.read_image(self.config.image_path).inspect_err(|err| {
            log::error!("unable to read {}: {}", self.config.image_path, err);
        })?;
        log::debug!("read {} ({} bytes)", self.config.image_path, buffer.len());

        ElfLoader::new(&self.config).load(&buffer, sink).map_err(|err| {
            log::error!("{}", err);
            BootError::from(err)
        })
    }
}

impl Default for BootSequence {
    fn default() -> Self {
        Self::new(BootConfig::DEFAULT)
    }
}
