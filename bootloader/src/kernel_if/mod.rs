//! Kernel Interface - ELF loading, parameter block, entry

pub mod boot_params_builder;
pub mod elf64;
pub mod elf_loader;
pub mod kernel_entry;

pub use boot_params_builder::BootParamsBuilder;
pub use elf_loader::{ENTRY_SENTINEL, ElfLoadError, ElfLoader, LoadedImage, entry_or_sentinel};
pub use kernel_entry::KernelEntry;
