//! Loader command line from the LoadedImage protocol

use alloc::string::String;
use alloc::vec::Vec;

use uefi::boot;
use uefi::proto::loaded_image::LoadedImage;

use crate::boot_stage::cmdline::CmdLine;
use crate::error::Result;

/// Arguments to forward to the loaded image, program name removed.
pub fn forwarded_arguments() -> Result<Vec<String>> {
    let loaded = boot::open_protocol_exclusive::<LoadedImage>(boot::image_handle())?;
    let cmdline = match loaded.load_options_as_bytes() {
        Some(options) => CmdLine::from_load_options(options),
        None => CmdLine::parse(""),
    };

    if let Some(name) = cmdline.program_name() {
        log::debug!("started as {}", name);
    }
    Ok(cmdline.forwarded().to_vec())
}
