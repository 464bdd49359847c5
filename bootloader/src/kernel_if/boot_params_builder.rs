//! Boot parameter block builder
//!
//! Assembles the [`BootParams`] block handed to the loaded image: the framebuffer half
//! comes from the negotiated display mode, the argument half from the loader's own
//! command line. The finished block and every string it points to are leaked, since the
//! image may keep using them for as long as it runs.

use alloc::boxed::Box;
use alloc::ffi::CString;
use alloc::vec::Vec;
use core::ffi::c_char;
use core::ptr;

use elfboot_api::{BYTES_PER_PIXEL, BootParams};

use crate::boot_stage::display::DisplayMode;
use crate::error::{BootError, Result};

/// Boot parameter block builder
#[derive(Debug)]
pub struct BootParamsBuilder {
    framebuffer: *mut u32,
    width: u32,
    height: u32,
    pitch: u32,
    arguments: Vec<CString>,
}

impl BootParamsBuilder {
    pub fn new() -> Self {
        Self {
            framebuffer: ptr::null_mut(),
            width: 0,
            height: 0,
            pitch: 0,
            arguments: Vec::new(),
        }
    }

    /// Describe the framebuffer of `mode`. The pitch is always four bytes per pixel.
    pub fn framebuffer(mut self, mode: &DisplayMode) -> Self {
        self.framebuffer = mode.framebuffer_base as usize as *mut u32;
        self.width = mode.width;
        self.height = mode.height;
        self.pitch = mode.pixels_per_scanline.saturating_mul(BYTES_PER_PIXEL);
        self
    }

    /// Copy the forwarded arguments, program name already removed.
    pub fn arguments<I, S>(mut self, args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for arg in args {
            let arg = arg.as_ref().as_bytes();
            if arg.contains(&0) {
                log::warn!("boot argument contains a NUL byte");
                return Err(BootError::InvalidArgument);
            }

            let mut bytes = Vec::new();
            bytes
                .try_reserve_exact(arg.len() + 1)
                .map_err(|_| BootError::OutOfMemory)?;
            bytes.extend_from_slice(arg);
            bytes.push(0);
            let string = CString::from_vec_with_nul(bytes).map_err(|_| BootError::InvalidArgument)?;

            self.arguments.try_reserve(1).map_err(|_| BootError::OutOfMemory)?;
            self.arguments.push(string);
        }

        i32::try_from(self.arguments.len()).map_err(|_| BootError::TooManyArguments)?;
        Ok(self)
    }

    pub fn argument_count(&self) -> usize {
        self.arguments.len()
    }

    /// Leak the block and its argument list.
    ///
    /// With no arguments the list is absent: `argc` is zero and `argv` is null.
    pub fn build(self) -> Result<&'static mut BootParams> {
        let argc = i32::try_from(self.arguments.len()).map_err(|_| BootError::TooManyArguments)?;

        let argv = if self.arguments.is_empty() {
            ptr::null_mut()
        } else {
            let mut list: Vec<*mut c_char> = Vec::new();
            list.try_reserve_exact(self.arguments.len() + 1)
                .map_err(|_| BootError::OutOfMemory)?;
            list.extend(self.arguments.into_iter().map(CString::into_raw));
            list.push(ptr::null_mut());
            list.leak().as_mut_ptr()
        };

        log::debug!("boot parameters: {}x{} pitch {} argc {}", self.width, self.height, self.pitch, argc);

        Ok(Box::leak(Box::new(BootParams {
            framebuffer: self.framebuffer,
            width: self.width,
            height: self.height,
            pitch: self.pitch,
            argc,
            argv,
        })))
    }
}

impl Default for BootParamsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::ffi::CStr;

    fn mode() -> DisplayMode {
        DisplayMode {
            framebuffer_base: 0x8000_0000,
            width: 640,
            height: 480,
            pixels_per_scanline: 648,
        }
    }

    #[test]
    fn test_framebuffer_fields() {
        let params = BootParamsBuilder::new().framebuffer(&mode()).build().unwrap();

        assert_eq!(params.framebuffer as usize, 0x8000_0000);
        assert_eq!(params.width, 640);
        assert_eq!(params.height, 480);
        assert_eq!(params.pitch, 648 * 4);
    }

    #[test]
    fn test_argument_round_trip() {
        let params = BootParamsBuilder::new()
            .arguments(["a", "bb", "ccc"])
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(params.argc, 3);
        let args: Vec<&CStr> = unsafe { params.args() }.collect();
        assert_eq!(args, [c"a", c"bb", c"ccc"]);
        assert!(unsafe { *params.argv.add(3) }.is_null());
    }

    #[test]
    fn test_no_arguments_leaves_list_absent() {
        let params = BootParamsBuilder::new()
            .arguments(core::iter::empty::<&str>())
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(params.argc, 0);
        assert!(params.argv.is_null());
        assert!(params.framebuffer.is_null());
    }

    #[test]
    fn test_interior_nul_rejected() {
        let result = BootParamsBuilder::new().arguments(["ok", "bad\0arg"]);
        assert_eq!(result.err(), Some(BootError::InvalidArgument));
    }

    #[test]
    fn test_empty_string_argument_kept() {
        let builder = BootParamsBuilder::new().arguments(["", "x"]).unwrap();
        assert_eq!(builder.argument_count(), 2);

        let params = builder.build().unwrap();
        let args: Vec<&CStr> = unsafe { params.args() }.collect();
        assert_eq!(args, [c"", c"x"]);
    }
}
