//! Bootloader error handling
//!
//! This module defines the error types used throughout the bootloader
//! for consistent error reporting and handling.

use core::fmt;

use crate::kernel_if::elf_loader::ElfLoadError;

/// Bootloader error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootError {
    /// Memory management errors
    OutOfMemory,

    /// Raw UEFI status code returned by a firmware call
    UefiError(usize),

    /// Display errors
    DisplayUnavailable,
    DisplayModeUnavailable { width: u32, height: u32 },

    /// Filesystem errors
    FileNotFound,
    FileSystemError,

    /// Kernel loading errors
    InvalidKernelFormat(ElfLoadError),
    InvalidEntryPoint,

    /// Boot argument errors
    InvalidArgument,
    TooManyArguments,
}

impl BootError {
    /// Convert to an error code suitable for passing to firmware/OS
    pub fn as_error_code(&self) -> u32 {
        match self {
            BootError::OutOfMemory => 0x2002,
            BootError::UefiError(status) => *status as u32,
            BootError::DisplayUnavailable => 0x6000,
            BootError::DisplayModeUnavailable { .. } => 0x6001,
            BootError::FileNotFound => 0x7000,
            BootError::FileSystemError => 0x7001,
            BootError::InvalidKernelFormat(_) => 0x9002,
            BootError::InvalidEntryPoint => 0x9003,
            BootError::InvalidArgument => 0xA000,
            BootError::TooManyArguments => 0xA001,
        }
    }

    /// Get a human-readable description of the error
    pub fn description(&self) -> &'static str {
        match self {
            BootError::OutOfMemory => "Out of memory",
            BootError::UefiError(_) => "UEFI error",
            BootError::DisplayUnavailable => "No graphics output available",
            BootError::DisplayModeUnavailable { .. } => "Unable to set requested video mode",
            BootError::FileNotFound => "Unable to open file",
            BootError::FileSystemError => "File system error",
            BootError::InvalidKernelFormat(err) => err.as_str(),
            BootError::InvalidEntryPoint => "Invalid entry point",
            BootError::InvalidArgument => "Invalid boot argument",
            BootError::TooManyArguments => "Too many boot arguments",
        }
    }
}

impl fmt::Display for BootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootError::InvalidKernelFormat(err) => {
                write!(f, "BootError: {} (code: {:#x})", err, self.as_error_code())
            }
            BootError::DisplayModeUnavailable { width, height } => write!(
                f,
                "BootError: {} {}x{} (code: {:#x})",
                self.description(),
                width,
                height,
                self.as_error_code()
            ),
            _ => write!(f, "BootError: {} (code: {:#x})", self.description(), self.as_error_code()),
        }
    }
}

/// Result type used throughout the bootloader
pub type Result<T = ()> = core::result::Result<T, BootError>;

impl From<ElfLoadError> for BootError {
    fn from(err: ElfLoadError) -> Self {
        BootError::InvalidKernelFormat(err)
    }
}

/// Convert UEFI status to bootloader error
#[cfg(all(feature = "uefi_support", target_os = "uefi"))]
impl From<uefi::Status> for BootError {
    fn from(status: uefi::Status) -> Self {
        match status {
            uefi::Status::NOT_FOUND => BootError::FileNotFound,
            uefi::Status::OUT_OF_RESOURCES => BootError::OutOfMemory,
            _ => BootError::UefiError(status.0),
        }
    }
}

#[cfg(all(feature = "uefi_support", target_os = "uefi"))]
impl BootError {
    /// Status returned to the firmware when the boot fails
    pub fn as_status(&self) -> uefi::Status {
        match self {
            BootError::OutOfMemory => uefi::Status::OUT_OF_RESOURCES,
            BootError::UefiError(status) => uefi::Status(*status),
            BootError::DisplayUnavailable | BootError::DisplayModeUnavailable { .. } => uefi::Status::UNSUPPORTED,
            BootError::FileNotFound => uefi::Status::NOT_FOUND,
            BootError::InvalidArgument | BootError::TooManyArguments => uefi::Status::INVALID_PARAMETER,
            BootError::FileSystemError | BootError::InvalidKernelFormat(_) | BootError::InvalidEntryPoint => {
                uefi::Status::LOAD_ERROR
            }
        }
    }
}

#[cfg(all(feature = "uefi_support", target_os = "uefi"))]
impl From<uefi::Error> for BootError {
    fn from(err: uefi::Error) -> Self {
        err.status().into()
    }
}
