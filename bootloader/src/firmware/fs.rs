//! Boot volume image reader

use alloc::vec::Vec;

use uefi::boot;
use uefi::proto::media::file::{File, FileAttribute, FileInfo, FileMode};
use uefi::{CString16, Status};

use crate::error::{BootError, Result};
use crate::utils::boot_traits::ImageSource;

/// Reads files from the volume the loader itself was started from
pub struct EspImageSource {
    headroom: usize,
}

impl EspImageSource {
    pub fn new(headroom: usize) -> Self {
        Self { headroom }
    }
}

impl ImageSource for EspImageSource {
    fn read_image(&mut self, path: &str) -> Result<Vec<u8>> {
        let name = CString16::try_from(path).map_err(|_| BootError::FileNotFound)?;

        let mut volume = boot::get_image_file_system(boot::image_handle())?;
        let mut root = volume.open_volume()?;
        let handle = root
            .open(&name, FileMode::Read, FileAttribute::empty())
            .map_err(|err| {
                if err.status() != Status::NOT_FOUND {
                    log::warn!("open {} failed: {:?}", path, err.status());
                }
                BootError::FileNotFound
            })?;
        let mut file = handle.into_regular_file().ok_or(BootError::FileNotFound)?;

        let info = file
            .get_boxed_info::<FileInfo>()
            .map_err(|_| BootError::FileSystemError)?;
        let size = usize::try_from(info.file_size()).map_err(|_| BootError::OutOfMemory)?;

        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(size + self.headroom)
            .map_err(|_| BootError::OutOfMemory)?;
        buffer.resize(size, 0);

        let mut filled = 0;
        while filled < size {
            let read = file.read(&mut buffer[filled..]).map_err(|err| {
                log::error!("read {} failed: {:?}", path, err.status());
                BootError::FileSystemError
            })?;
            if read == 0 {
                log::error!("read {} stopped at {} of {} bytes", path, filled, size);
                return Err(BootError::FileSystemError);
            }
            filled += read;
        }

        Ok(buffer)
    }
}
