//! Shared fakes for the integration tests

#![allow(dead_code)]

use elfboot::boot_stage::display::{DisplayMode, ModeInfo};
use elfboot::kernel_if::elf64::{ELF_HEADER_SIZE, ElfHeader, PROGRAM_HEADER_SIZE, ProgramHeader};
use elfboot::{BootError, DisplayProvider, ImageSource, Result};

pub const FRAMEBUFFER_BASE: u64 = 0x8000_0000;

/// Display offering a fixed list of modes
pub struct FakeDisplay {
    pub modes: Vec<ModeInfo>,
    pub selected: Option<u32>,
}

impl FakeDisplay {
    /// Typical firmware offering: 640x480 is not the first mode
    pub fn vga_capable() -> Self {
        Self::with_modes(&[(1024, 768), (640, 480), (800, 600)])
    }

    pub fn with_modes(resolutions: &[(u32, u32)]) -> Self {
        let modes = resolutions
            .iter()
            .enumerate()
            .map(|(index, &(width, height))| ModeInfo {
                index: index as u32,
                width,
                height,
            })
            .collect();
        Self { modes, selected: None }
    }
}

impl DisplayProvider for FakeDisplay {
    fn modes(&mut self) -> Result<Vec<ModeInfo>> {
        Ok(self.modes.clone())
    }

    fn set_mode(&mut self, index: u32) -> Result<()> {
        self.selected = Some(index);
        Ok(())
    }

    fn current_mode(&mut self) -> Result<DisplayMode> {
        let index = self.selected.ok_or(BootError::DisplayUnavailable)?;
        let mode = self.modes[index as usize];
        Ok(DisplayMode {
            framebuffer_base: FRAMEBUFFER_BASE,
            width: mode.width,
            height: mode.height,
            pixels_per_scanline: mode.width,
        })
    }
}

/// Image source serving one in-memory file
pub struct FakeSource {
    pub path: String,
    pub bytes: Vec<u8>,
    pub reads: usize,
}

impl FakeSource {
    pub fn new(path: &str, bytes: Vec<u8>) -> Self {
        Self {
            path: path.to_string(),
            bytes,
            reads: 0,
        }
    }
}

impl ImageSource for FakeSource {
    fn read_image(&mut self, path: &str) -> Result<Vec<u8>> {
        self.reads += 1;
        if path == self.path {
            Ok(self.bytes.clone())
        } else {
            Err(BootError::FileNotFound)
        }
    }
}

/// Builds executable images: header, program header table, then segment payloads.
pub struct ImageBuilder {
    header: ElfHeader,
    segments: Vec<(ProgramHeader, Vec<u8>)>,
}

impl ImageBuilder {
    pub fn new(entry_point: u64) -> Self {
        Self {
            header: ElfHeader::x86_64_executable(entry_point),
            segments: Vec::new(),
        }
    }

    pub fn machine(mut self, machine: u16) -> Self {
        self.header.machine = machine;
        self
    }

    /// Add a program header whose file bytes are `payload`. Offset and file size are
    /// filled in by `build`.
    pub fn segment(mut self, phdr: ProgramHeader, payload: Vec<u8>) -> Self {
        self.segments.push((phdr, payload));
        self
    }

    pub fn build(mut self) -> Vec<u8> {
        self.header.program_header_count = self.segments.len() as u16;
        let mut offset = ELF_HEADER_SIZE + self.segments.len() * PROGRAM_HEADER_SIZE;

        let mut image = self.header.encode().to_vec();
        for (phdr, payload) in &mut self.segments {
            phdr.file_offset = offset as u64;
            phdr.file_size = payload.len() as u64;
            offset += payload.len();
            image.extend_from_slice(&phdr.encode());
        }
        for (_, payload) in &self.segments {
            image.extend_from_slice(payload);
        }
        image
    }
}

/// Deterministic non-zero filler
pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed) | 1).collect()
}
