//! elfboot - minimal UEFI stage-2 loader
//!
//! Reads a statically linked x86-64 ELF executable from the boot volume, validates
//! it, copies its loadable segments to their link addresses and calls its entry point
//! with an [`elfboot_api::BootParams`] block.
//!
//! The core (validation, loading, parameter block, boot sequence) is plain `no_std`
//! code behind small traits and runs on the host in tests. The `firmware` module
//! implements those traits on top of UEFI boot services.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

/// Architecture support - halt loop
pub mod arch;

/// Boot orchestration - display policy, command line, boot sequence
pub mod boot_stage;

/// Compile-time configuration
pub mod config;

/// Error types
pub mod error;

/// Firmware interface - GOP, boot volume, page allocation, load options
#[cfg(all(feature = "uefi_support", target_os = "uefi"))]
pub mod firmware;

/// Kernel interface - ELF loading, parameter block, entry
pub mod kernel_if;

/// Segment destination memory
pub mod memory;

/// Firmware abstraction traits
pub mod utils;

pub use boot_stage::{BootSequence, PreparedHandoff};
pub use config::BootConfig;
pub use error::{BootError, Result};
pub use kernel_if::{ElfLoadError, ElfLoader, LoadedImage};
pub use memory::{MemorySink, MemorySinkError};
pub use utils::{DisplayProvider, ImageSource};

/// Loader version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
