//! Utility Library - Firmware abstraction traits

pub mod boot_traits;

pub use boot_traits::{DisplayProvider, ImageSource};
