//! elfboot - UEFI application entry point
//!
//! Built for `x86_64-unknown-uefi` this produces `BOOTX64.EFI`. On any other target
//! the binary only explains how to build it.

#![cfg_attr(target_os = "uefi", no_std)]
#![cfg_attr(target_os = "uefi", no_main)]

#[cfg(all(target_os = "uefi", not(feature = "uefi_support")))]
compile_error!("the UEFI binary requires the `uefi_support` feature");

#[cfg(all(feature = "uefi_support", target_os = "uefi"))]
use elfboot::{
    BootConfig, BootSequence, Result, VERSION,
    firmware::{EspImageSource, FirmwareMemorySink, GopDisplay, load_options},
};
#[cfg(all(feature = "uefi_support", target_os = "uefi"))]
use uefi::{Status, entry};

/// UEFI application entry point
#[cfg(all(feature = "uefi_support", target_os = "uefi"))]
#[entry]
fn efi_main() -> Status {
    if let Err(err) = uefi::helpers::init() {
        return err.status();
    }
    log::set_max_level(elfboot::config::max_log_level());
    log::info!("elfboot {}", VERSION);

    match run() {
        Ok(()) => Status::SUCCESS,
        Err(err) => {
            log::error!("{}", err);
            err.as_status()
        }
    }
}

/// Prepare the boot and enter the image. Only returns on failure.
#[cfg(all(feature = "uefi_support", target_os = "uefi"))]
fn run() -> Result<()> {
    let sequence = BootSequence::new(BootConfig::DEFAULT);

    let mut display = GopDisplay::open()?;
    let mut source = EspImageSource::new(sequence.config().image_headroom);
    let mut sink = FirmwareMemorySink::new();
    let args = load_options::forwarded_arguments()?;

    let handoff = sequence.prepare(&mut display, &mut source, &mut sink, &args)?;
    drop(display);

    // SAFETY: every segment was validated and copied to its link address.
    unsafe { handoff.enter() }
}

#[cfg(target_os = "uefi")]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    log::error!("!! BOOTLOADER PANIC !!");

    if let Some(location) = info.location() {
        log::error!("Location: {}:{}:{}", location.file(), location.line(), location.column());
    }
    log::error!("Message: {}", info.message());

    elfboot::arch::halt()
}

#[cfg(not(target_os = "uefi"))]
fn main() {
    eprintln!(
        "elfboot {} is a UEFI application; build it with `cargo run -p xtask -- build`",
        elfboot::VERSION
    );
    std::process::exit(1);
}
