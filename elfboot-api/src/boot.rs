//! Boot parameter block
//!
//! This module defines the parameter block handed from the loader to the loaded image.
//! The layout is part of the loader's ABI: images built against an older version of
//! this crate must keep working, so fields are never reordered or resized.

use core::ffi::{CStr, c_char};
use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::ptr;

/// Bytes per framebuffer pixel. The row pitch handed to the image is always
/// `pixels_per_scanline * BYTES_PER_PIXEL`.
pub const BYTES_PER_PIXEL: u32 = 4;

/// Entry point signature of a loadable image.
///
/// The image is entered through the System V AMD64 calling convention regardless of
/// the convention the firmware itself uses, so the first argument travels in `rdi`.
#[cfg(target_arch = "x86_64")]
pub type KernelEntryFn = extern "sysv64" fn(*mut BootParams) -> i32;

/// Parameter block passed by address to the loaded image.
///
/// Ownership stays with the loader for the whole hand-off: the image may read and write
/// the fields but must not free or resize the block or the argument list.
#[derive(Debug)]
#[repr(C)]
pub struct BootParams {
    /// Linear framebuffer base, one `u32` per pixel. Null when no framebuffer is known.
    pub framebuffer: *mut u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Row pitch in bytes
    pub pitch: u32,
    /// Number of entries in `argv`, excluding the trailing null
    pub argc: i32,
    /// Null-terminated list of NUL-terminated argument strings.
    /// Null when the loader was started without arguments.
    pub argv: *mut *mut c_char,
}

#[cfg(target_pointer_width = "64")]
mod layout {
    use super::BootParams;
    use core::mem::{align_of, offset_of, size_of};
    use static_assertions::const_assert_eq;

    const_assert_eq!(size_of::<BootParams>(), 32);
    const_assert_eq!(align_of::<BootParams>(), 8);
    const_assert_eq!(offset_of!(BootParams, framebuffer), 0);
    const_assert_eq!(offset_of!(BootParams, width), 8);
    const_assert_eq!(offset_of!(BootParams, height), 12);
    const_assert_eq!(offset_of!(BootParams, pitch), 16);
    const_assert_eq!(offset_of!(BootParams, argc), 20);
    const_assert_eq!(offset_of!(BootParams, argv), 24);
}

impl BootParams {
    /// Create an empty parameter block: no framebuffer, no arguments.
    pub const fn new() -> Self {
        Self {
            framebuffer: ptr::null_mut(),
            width: 0,
            height: 0,
            pitch: 0,
            argc: 0,
            argv: ptr::null_mut(),
        }
    }

    /// Reinterpret a raw entry-point argument as a parameter block.
    ///
    /// # Safety
    /// `params` must be null or point to a live, properly aligned `BootParams`.
    pub unsafe fn from_ptr<'a>(params: *mut BootParams) -> Option<&'a mut BootParams> {
        unsafe { params.as_mut() }
    }

    /// Check if a framebuffer is available
    pub fn has_framebuffer(&self) -> bool {
        !self.framebuffer.is_null() && self.width != 0 && self.height != 0
    }

    /// Size of the visible framebuffer in bytes (`pitch * height`).
    pub fn framebuffer_len(&self) -> usize {
        self.pitch as usize * self.height as usize
    }

    /// Pixels per row, derived from the byte pitch.
    pub fn pixels_per_scanline(&self) -> u32 {
        self.pitch / BYTES_PER_PIXEL
    }

    /// Check if an argument list is present
    pub fn has_arguments(&self) -> bool {
        !self.argv.is_null()
    }

    /// Iterate the argument list up to its null terminator.
    ///
    /// Yields nothing when `argv` is null.
    ///
    /// # Safety
    /// `argv` must be null or point to a null-terminated array of pointers to
    /// NUL-terminated strings, all of which outlive the returned iterator.
    pub unsafe fn args(&self) -> Args<'_> {
        Args {
            cursor: self.argv,
            _params: PhantomData,
        }
    }
}

impl Default for BootParams {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over the argument strings of a [`BootParams`] block.
pub struct Args<'a> {
    cursor: *mut *mut c_char,
    _params: PhantomData<&'a BootParams>,
}

impl<'a> Iterator for Args<'a> {
    type Item = &'a CStr;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor.is_null() {
            return None;
        }
        // SAFETY: upheld by the contract of `BootParams::args`.
        let entry = unsafe { *self.cursor };
        if entry.is_null() {
            self.cursor = ptr::null_mut();
            return None;
        }
        self.cursor = unsafe { self.cursor.add(1) };
        Some(unsafe { CStr::from_ptr(entry) })
    }
}

impl FusedIterator for Args<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_block() {
        let params = BootParams::new();
        assert!(!params.has_framebuffer());
        assert!(!params.has_arguments());
        assert_eq!(params.framebuffer_len(), 0);
        assert_eq!(unsafe { params.args() }.count(), 0);
    }

    #[test]
    fn test_framebuffer_geometry() {
        let mut pixels = [0u32; 16];
        let params = BootParams {
            framebuffer: pixels.as_mut_ptr(),
            width: 3,
            height: 2,
            pitch: 4 * BYTES_PER_PIXEL,
            ..BootParams::new()
        };
        assert!(params.has_framebuffer());
        assert_eq!(params.pixels_per_scanline(), 4);
        assert_eq!(params.framebuffer_len(), 32);
    }

    #[test]
    fn test_args_stop_at_terminator() {
        let mut first = *b"root=/dev/sda\0";
        let mut second = *b"quiet\0";
        let mut list = [
            first.as_mut_ptr() as *mut c_char,
            second.as_mut_ptr() as *mut c_char,
            ptr::null_mut(),
        ];
        let params = BootParams {
            argc: 2,
            argv: list.as_mut_ptr(),
            ..BootParams::new()
        };

        let mut args = unsafe { params.args() };
        assert_eq!(args.next().map(CStr::to_bytes), Some(&b"root=/dev/sda"[..]));
        assert_eq!(args.next().map(CStr::to_bytes), Some(&b"quiet"[..]));
        assert_eq!(args.next(), None);
        assert_eq!(args.next(), None);
    }

    #[test]
    fn test_from_null_pointer() {
        assert!(unsafe { BootParams::from_ptr(ptr::null_mut()) }.is_none());
    }
}
