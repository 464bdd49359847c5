//! elfboot API - the hand-off contract between the elfboot loader and the image it starts
//!
//! The loader places exactly one structure in memory for the loaded image: a
//! [`BootParams`] block, passed by address as the sole argument of the image's entry
//! point. This crate holds that structure and nothing else, so a kernel can depend on it
//! without pulling in any firmware code.
//!
//! # Usage
//!
//! ```rust,no_run
//! use elfboot_api::BootParams;
//!
//! // Exported as `_start` in the kernel's own link script.
//! pub extern "sysv64" fn kernel_main(params: *mut BootParams) -> i32 {
//!     let Some(params) = (unsafe { BootParams::from_ptr(params) }) else {
//!         return 1;
//!     };
//!     for arg in unsafe { params.args() } {
//!         let _ = arg.to_bytes();
//!     }
//!     0
//! }
//! ```

#![no_std]

pub mod boot;

pub use boot::{Args, BootParams, BYTES_PER_PIXEL};

#[cfg(target_arch = "x86_64")]
pub use boot::KernelEntryFn;
