//! Firmware interface - UEFI implementations of the boot traits

pub mod fs;
pub mod gop;
pub mod load_options;
pub mod memory;

pub use fs::EspImageSource;
pub use gop::GopDisplay;
pub use memory::FirmwareMemorySink;
