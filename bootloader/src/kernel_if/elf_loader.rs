//! Hardened ELF64 loader
//!
//! Validates a whole executable image before a single byte is placed in memory, then
//! materializes its `PT_LOAD` segments through a [`MemorySink`]. Every destination is
//! reserved before the first store, so a rejected image never produces a partial load.

use alloc::vec::Vec;
use core::fmt;

use super::elf64::constants::*;
use super::elf64::{ELF_HEADER_SIZE, ElfHeader, PROGRAM_HEADER_SIZE, ProgramHeader, SegmentFlags};
use crate::config::{BootConfig, LoadWindow};
use crate::memory::{MemorySink, MemorySinkError};

/// Entry address reported for any failed load
pub const ENTRY_SENTINEL: u64 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfLoadError {
    HeaderTooSmall,
    InvalidMagic,
    InvalidClass,
    InvalidEncoding,
    NotExecutable { found: u16 },
    UnsupportedMachine { found: u16 },
    NoProgramHeaders,
    NullEntryPoint,
    InvalidPhdrSize,
    PhdrTableOutOfBounds,
    InvalidSegmentSize,
    SegmentOutOfBounds,
    InvalidSegmentAlignment,
    AddressOutsideWindow { address: u64 },
    OverlapDetected { address: u64 },
    Sink(MemorySinkError),
}

impl ElfLoadError {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElfLoadError::HeaderTooSmall => "ELF header too small",
            ElfLoadError::InvalidMagic => "Invalid ELF magic number",
            ElfLoadError::InvalidClass => "Not an ELF64 file",
            ElfLoadError::InvalidEncoding => "Not little-endian",
            ElfLoadError::NotExecutable { .. } => "Not an executable",
            ElfLoadError::UnsupportedMachine { .. } => "Unsupported architecture",
            ElfLoadError::NoProgramHeaders => "No program headers",
            ElfLoadError::NullEntryPoint => "Null entry point",
            ElfLoadError::InvalidPhdrSize => "Invalid program header size",
            ElfLoadError::PhdrTableOutOfBounds => "Program header table exceeds file bounds",
            ElfLoadError::InvalidSegmentSize => "Invalid segment size",
            ElfLoadError::SegmentOutOfBounds => "Segment exceeds file bounds",
            ElfLoadError::InvalidSegmentAlignment => "Invalid segment alignment",
            ElfLoadError::AddressOutsideWindow { .. } => "Segment outside load window",
            ElfLoadError::OverlapDetected { .. } => "Segments overlap in memory",
            ElfLoadError::Sink(err) => err.as_str(),
        }
    }

    /// Name of the validation rule that rejected the image
    pub fn check(&self) -> &'static str {
        match self {
            ElfLoadError::HeaderTooSmall => "size",
            ElfLoadError::InvalidMagic => "magic",
            ElfLoadError::InvalidClass => "class",
            ElfLoadError::InvalidEncoding => "encoding",
            ElfLoadError::NotExecutable { .. } => "type",
            ElfLoadError::UnsupportedMachine { .. } => "architecture",
            ElfLoadError::NoProgramHeaders => "program header count",
            ElfLoadError::NullEntryPoint => "entry point",
            ElfLoadError::InvalidPhdrSize | ElfLoadError::PhdrTableOutOfBounds => "program header table",
            ElfLoadError::InvalidSegmentSize
            | ElfLoadError::SegmentOutOfBounds
            | ElfLoadError::InvalidSegmentAlignment => "segment",
            ElfLoadError::AddressOutsideWindow { .. } | ElfLoadError::OverlapDetected { .. } => "segment address",
            ElfLoadError::Sink(_) => "memory reservation",
        }
    }
}

impl fmt::Display for ElfLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ELF {} check failed: ", self.check())?;
        match self {
            ElfLoadError::NotExecutable { found } => {
                write!(f, "e_type {}, expected {}", found, ET_EXEC)
            }
            ElfLoadError::UnsupportedMachine { found } => {
                write!(f, "e_machine {}, expected {}", found, EM_X86_64)
            }
            ElfLoadError::AddressOutsideWindow { address } | ElfLoadError::OverlapDetected { address } => {
                write!(f, "{} at {:#x}", self.as_str(), address)
            }
            ElfLoadError::Sink(err) => write!(f, "{}", err),
            _ => f.write_str(self.as_str()),
        }
    }
}

impl From<MemorySinkError> for ElfLoadError {
    fn from(err: MemorySinkError) -> Self {
        ElfLoadError::Sink(err)
    }
}

pub type Result<T> = core::result::Result<T, ElfLoadError>;

/// A validated `PT_LOAD` segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSegment {
    pub virtual_address: u64,
    pub file_offset: u64,
    pub file_size: u64,
    pub mem_size: u64,
    pub flags: SegmentFlags,
}

impl LoadSegment {
    pub fn end(&self) -> u64 {
        self.virtual_address + self.mem_size
    }

    pub fn bss_size(&self) -> u64 {
        self.mem_size - self.file_size
    }
}

/// Result of a successful load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedImage {
    pub entry_point: u64,
    pub segments: Vec<LoadSegment>,
}

impl LoadedImage {
    /// Total bytes occupied in memory by all segments
    pub fn memory_size(&self) -> u64 {
        self.segments.iter().map(|seg| seg.mem_size).sum()
    }
}

/// Safe ELF Loader
#[derive(Debug, Clone, Copy)]
pub struct ElfLoader {
    window: LoadWindow,
}

impl ElfLoader {
    pub fn new(config: &BootConfig) -> Self {
        Self::with_window(config.load_window)
    }

    pub fn with_window(window: LoadWindow) -> Self {
        Self { window }
    }

    /// Validate `image` and copy its loadable segments into `sink`.
    pub fn load<S: MemorySink + ?Sized>(&self, image: &[u8], sink: &mut S) -> Result<LoadedImage> {
        let header = validate_header(image)?;
        let segments = self.validate_segments(image, &header)?;

        for segment in &segments {
            reserve(segment, sink)?;
        }
        for segment in &segments {
            fill(image, segment, sink)?;
        }

        log::debug!(
            "ELF image mapped: {} segment(s), {} bytes",
            segments.len(),
            segments.iter().map(|seg| seg.mem_size).sum::<u64>()
        );

        Ok(LoadedImage {
            entry_point: header.entry_point,
            segments,
        })
    }

    /// Check every program header and collect the `PT_LOAD` entries in table order.
    fn validate_segments(&self, image: &[u8], header: &ElfHeader) -> Result<Vec<LoadSegment>> {
        let mut segments: Vec<LoadSegment> = Vec::new();

        for index in 0..header.program_header_count as u64 {
            let offset = header.program_header_offset + index * header.program_header_size as u64;
            let phdr = ProgramHeader::parse(&image[offset as usize..]).ok_or(ElfLoadError::PhdrTableOutOfBounds)?;

            if !phdr.is_load() {
                log::trace!("skipping program header {} (type {:#x})", index, phdr.segment_type);
                continue;
            }

            let segment = self.validate_segment(image, &phdr)?;
            if let Some(other) = segments.iter().find(|seg| segments_overlap(seg, &segment)) {
                log::warn!(
                    "segment {:#x}..{:#x} overlaps {:#x}..{:#x}",
                    segment.virtual_address,
                    segment.end(),
                    other.virtual_address,
                    other.end()
                );
                return Err(ElfLoadError::OverlapDetected {
                    address: segment.virtual_address,
                });
            }
            segments.push(segment);
        }

        Ok(segments)
    }

    fn validate_segment(&self, image: &[u8], phdr: &ProgramHeader) -> Result<LoadSegment> {
        if phdr.mem_size < phdr.file_size {
            return Err(ElfLoadError::InvalidSegmentSize);
        }

        let file_end = phdr
            .file_offset
            .checked_add(phdr.file_size)
            .ok_or(ElfLoadError::SegmentOutOfBounds)?;
        if file_end > image.len() as u64 {
            return Err(ElfLoadError::SegmentOutOfBounds);
        }

        if phdr.alignment > 0 && !phdr.alignment.is_power_of_two() {
            return Err(ElfLoadError::InvalidSegmentAlignment);
        }

        let address = phdr.virtual_address;
        let end = address
            .checked_add(phdr.mem_size)
            .ok_or(ElfLoadError::AddressOutsideWindow { address })?;
        if !self.window.contains(address, end) {
            return Err(ElfLoadError::AddressOutsideWindow { address });
        }

        Ok(LoadSegment {
            virtual_address: address,
            file_offset: phdr.file_offset,
            file_size: phdr.file_size,
            mem_size: phdr.mem_size,
            flags: phdr.flags,
        })
    }
}

/// Validate the file header and the bounds of the program header table.
pub fn validate_header(image: &[u8]) -> Result<ElfHeader> {
    if image.len() < ELF_HEADER_SIZE {
        return Err(ElfLoadError::HeaderTooSmall);
    }
    let header = ElfHeader::parse(image).ok_or(ElfLoadError::HeaderTooSmall)?;

    if header.magic() != ELF_MAGIC {
        return Err(ElfLoadError::InvalidMagic);
    }
    if header.class() != ELFCLASS64 {
        return Err(ElfLoadError::InvalidClass);
    }
    if header.data_encoding() != ELFDATA2LSB {
        return Err(ElfLoadError::InvalidEncoding);
    }
    if header.file_type != ET_EXEC {
        return Err(ElfLoadError::NotExecutable {
            found: header.file_type,
        });
    }
    if header.machine != EM_X86_64 {
        return Err(ElfLoadError::UnsupportedMachine { found: header.machine });
    }
    if header.program_header_count == 0 {
        return Err(ElfLoadError::NoProgramHeaders);
    }
    if header.entry_point == ENTRY_SENTINEL {
        return Err(ElfLoadError::NullEntryPoint);
    }
    if (header.program_header_size as usize) < PROGRAM_HEADER_SIZE {
        return Err(ElfLoadError::InvalidPhdrSize);
    }

    let table_end = (header.program_header_count as u64)
        .checked_mul(header.program_header_size as u64)
        .and_then(|len| header.program_header_offset.checked_add(len))
        .ok_or(ElfLoadError::PhdrTableOutOfBounds)?;
    if table_end > image.len() as u64 {
        return Err(ElfLoadError::PhdrTableOutOfBounds);
    }

    Ok(header)
}

/// Entry address of a load result, or [`ENTRY_SENTINEL`] if it failed
pub fn entry_or_sentinel(result: &Result<LoadedImage>) -> u64 {
    match result {
        Ok(image) => image.entry_point,
        Err(_) => ENTRY_SENTINEL,
    }
}

fn reserve<S: MemorySink + ?Sized>(segment: &LoadSegment, sink: &mut S) -> Result<()> {
    if segment.mem_size == 0 {
        return Ok(());
    }
    sink.reserve(segment.virtual_address, segment.mem_size, segment.flags)?;
    Ok(())
}

fn fill<S: MemorySink + ?Sized>(image: &[u8], segment: &LoadSegment, sink: &mut S) -> Result<()> {
    let perms = segment.flags.as_perms();
    log::info!(
        "ELF segment {:#x} {} {} bytes (bss {} bytes)",
        segment.virtual_address,
        core::str::from_utf8(&perms).unwrap_or("---"),
        segment.file_size,
        segment.bss_size()
    );

    if segment.file_size > 0 {
        let start = segment.file_offset as usize;
        let bytes = &image[start..start + segment.file_size as usize];
        sink.write(segment.virtual_address, bytes)?;
    }
    if segment.bss_size() > 0 {
        sink.zero(segment.virtual_address + segment.file_size, segment.bss_size())?;
    }

    Ok(())
}

/// Check if two segments overlap in memory. An empty segment occupies nothing.
fn segments_overlap(seg1: &LoadSegment, seg2: &LoadSegment) -> bool {
    if seg1.mem_size == 0 || seg2.mem_size == 0 {
        return false;
    }
    seg1.virtual_address < seg2.end() && seg2.virtual_address < seg1.end()
}
