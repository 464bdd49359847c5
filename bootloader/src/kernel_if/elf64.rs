//! ELF64 format support
//!
//! This module provides structures and functions for working with ELF64 files,
//! which is the standard executable format for 64-bit Unix-like systems.
//!
//! Records are decoded field by field from little-endian bytes, so a header can be
//! read from any offset of an unaligned file buffer.

use bitflags::bitflags;

/// Size of the ELF64 file header in bytes
pub const ELF_HEADER_SIZE: usize = 64;

/// Size of one ELF64 program header in bytes
pub const PROGRAM_HEADER_SIZE: usize = 56;

/// ELF constants
pub mod constants {
    /// ELF magic number
    pub const ELF_MAGIC: [u8; 4] = [0x7F, b'E', b'L', b'F'];

    /// `e_ident` indices
    pub const EI_CLASS: usize = 4;
    pub const EI_DATA: usize = 5;
    pub const EI_VERSION: usize = 6;
    pub const EI_OSABI: usize = 7;

    /// ELF classes
    pub const ELFCLASS32: u8 = 1;
    pub const ELFCLASS64: u8 = 2;

    /// ELF data encodings
    pub const ELFDATA2LSB: u8 = 1; // Little endian
    pub const ELFDATA2MSB: u8 = 2; // Big endian

    /// ELF versions
    pub const EV_CURRENT: u8 = 1;

    /// ELF file types
    pub const ET_NONE: u16 = 0; // No file type
    pub const ET_REL: u16 = 1; // Relocatable file
    pub const ET_EXEC: u16 = 2; // Executable file
    pub const ET_DYN: u16 = 3; // Shared object file
    pub const ET_CORE: u16 = 4; // Core file

    /// ELF machine types
    pub const EM_386: u16 = 3; // Intel 80386
    pub const EM_X86_64: u16 = 62; // AMD x86-64 architecture
    pub const EM_AARCH64: u16 = 183; // ARM AARCH64
    pub const EM_RISCV: u16 = 243; // RISC-V

    /// Program header types
    pub const PT_NULL: u32 = 0; // Unused entry
    pub const PT_LOAD: u32 = 1; // Loadable segment
    pub const PT_DYNAMIC: u32 = 2; // Dynamic linking information
    pub const PT_INTERP: u32 = 3; // Program interpreter
    pub const PT_NOTE: u32 = 4; // Auxiliary information
    pub const PT_PHDR: u32 = 6; // Program header table
    pub const PT_TLS: u32 = 7; // Thread-local storage
    pub const PT_GNU_STACK: u32 = 0x6474e551; // Indicates stack executability

    /// Program header flags
    pub const PF_X: u32 = 0x1; // Executable
    pub const PF_W: u32 = 0x2; // Writable
    pub const PF_R: u32 = 0x4; // Readable
}

use constants::*;

bitflags! {
    /// Segment permission flags (`p_flags`)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SegmentFlags: u32 {
        const EXECUTE = PF_X;
        const WRITE = PF_W;
        const READ = PF_R;
    }
}

impl SegmentFlags {
    /// `rwx`-style rendering for log lines
    pub fn as_perms(&self) -> [u8; 3] {
        [
            if self.contains(Self::READ) { b'r' } else { b'-' },
            if self.contains(Self::WRITE) { b'w' } else { b'-' },
            if self.contains(Self::EXECUTE) { b'x' } else { b'-' },
        ]
    }
}

/// ELF64 header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElfHeader {
    /// Identification bytes: magic, class, encoding, version, OS ABI, padding
    pub ident: [u8; 16],
    /// File type
    pub file_type: u16,
    /// Machine architecture
    pub machine: u16,
    /// ELF version
    pub elf_version: u32,
    /// Entry point virtual address
    pub entry_point: u64,
    /// Program header table file offset
    pub program_header_offset: u64,
    /// Section header table file offset
    pub section_header_offset: u64,
    /// Processor-specific flags
    pub flags: u32,
    /// ELF header size
    pub header_size: u16,
    /// Program header entry size
    pub program_header_size: u16,
    /// Program header entry count
    pub program_header_count: u16,
    /// Section header entry size
    pub section_header_size: u16,
    /// Section header entry count
    pub section_header_count: u16,
    /// Section header string table index
    pub section_header_string_index: u16,
}

impl ElfHeader {
    /// Decode the header at the start of `bytes`.
    ///
    /// Returns `None` when fewer than [`ELF_HEADER_SIZE`] bytes are available. No field
    /// is validated here.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let raw = bytes.get(..ELF_HEADER_SIZE)?;
        let mut ident = [0u8; 16];
        ident.copy_from_slice(&raw[..16]);

        Some(Self {
            ident,
            file_type: le_u16(raw, 16)?,
            machine: le_u16(raw, 18)?,
            elf_version: le_u32(raw, 20)?,
            entry_point: le_u64(raw, 24)?,
            program_header_offset: le_u64(raw, 32)?,
            section_header_offset: le_u64(raw, 40)?,
            flags: le_u32(raw, 48)?,
            header_size: le_u16(raw, 52)?,
            program_header_size: le_u16(raw, 54)?,
            program_header_count: le_u16(raw, 56)?,
            section_header_size: le_u16(raw, 58)?,
            section_header_count: le_u16(raw, 60)?,
            section_header_string_index: le_u16(raw, 62)?,
        })
    }

    /// Encode the header as its 64-byte on-disk form.
    pub fn encode(&self) -> [u8; ELF_HEADER_SIZE] {
        let mut out = [0u8; ELF_HEADER_SIZE];
        out[..16].copy_from_slice(&self.ident);
        out[16..18].copy_from_slice(&self.file_type.to_le_bytes());
        out[18..20].copy_from_slice(&self.machine.to_le_bytes());
        out[20..24].copy_from_slice(&self.elf_version.to_le_bytes());
        out[24..32].copy_from_slice(&self.entry_point.to_le_bytes());
        out[32..40].copy_from_slice(&self.program_header_offset.to_le_bytes());
        out[40..48].copy_from_slice(&self.section_header_offset.to_le_bytes());
        out[48..52].copy_from_slice(&self.flags.to_le_bytes());
        out[52..54].copy_from_slice(&self.header_size.to_le_bytes());
        out[54..56].copy_from_slice(&self.program_header_size.to_le_bytes());
        out[56..58].copy_from_slice(&self.program_header_count.to_le_bytes());
        out[58..60].copy_from_slice(&self.section_header_size.to_le_bytes());
        out[60..62].copy_from_slice(&self.section_header_count.to_le_bytes());
        out[62..64].copy_from_slice(&self.section_header_string_index.to_le_bytes());
        out
    }

    /// Header of an x86-64 executable with no program headers yet.
    pub fn x86_64_executable(entry_point: u64) -> Self {
        let mut ident = [0u8; 16];
        ident[..4].copy_from_slice(&ELF_MAGIC);
        ident[EI_CLASS] = ELFCLASS64;
        ident[EI_DATA] = ELFDATA2LSB;
        ident[EI_VERSION] = EV_CURRENT;

        Self {
            ident,
            file_type: ET_EXEC,
            machine: EM_X86_64,
            elf_version: EV_CURRENT as u32,
            entry_point,
            program_header_offset: ELF_HEADER_SIZE as u64,
            section_header_offset: 0,
            flags: 0,
            header_size: ELF_HEADER_SIZE as u16,
            program_header_size: PROGRAM_HEADER_SIZE as u16,
            program_header_count: 0,
            section_header_size: 0,
            section_header_count: 0,
            section_header_string_index: 0,
        }
    }

    pub fn magic(&self) -> [u8; 4] {
        [self.ident[0], self.ident[1], self.ident[2], self.ident[3]]
    }

    pub fn class(&self) -> u8 {
        self.ident[EI_CLASS]
    }

    pub fn data_encoding(&self) -> u8 {
        self.ident[EI_DATA]
    }
}

/// ELF64 program header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramHeader {
    /// Segment type
    pub segment_type: u32,
    /// Segment flags
    pub flags: SegmentFlags,
    /// File offset
    pub file_offset: u64,
    /// Virtual address
    pub virtual_address: u64,
    /// Physical address
    pub physical_address: u64,
    /// Segment size in file
    pub file_size: u64,
    /// Segment size in memory
    pub mem_size: u64,
    /// Segment alignment
    pub alignment: u64,
}

impl ProgramHeader {
    /// Decode one program header from the start of `bytes`.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let raw = bytes.get(..PROGRAM_HEADER_SIZE)?;
        Some(Self {
            segment_type: le_u32(raw, 0)?,
            flags: SegmentFlags::from_bits_retain(le_u32(raw, 4)?),
            file_offset: le_u64(raw, 8)?,
            virtual_address: le_u64(raw, 16)?,
            physical_address: le_u64(raw, 24)?,
            file_size: le_u64(raw, 32)?,
            mem_size: le_u64(raw, 40)?,
            alignment: le_u64(raw, 48)?,
        })
    }

    /// Encode the program header as its 56-byte on-disk form.
    pub fn encode(&self) -> [u8; PROGRAM_HEADER_SIZE] {
        let mut out = [0u8; PROGRAM_HEADER_SIZE];
        out[0..4].copy_from_slice(&self.segment_type.to_le_bytes());
        out[4..8].copy_from_slice(&self.flags.bits().to_le_bytes());
        out[8..16].copy_from_slice(&self.file_offset.to_le_bytes());
        out[16..24].copy_from_slice(&self.virtual_address.to_le_bytes());
        out[24..32].copy_from_slice(&self.physical_address.to_le_bytes());
        out[32..40].copy_from_slice(&self.file_size.to_le_bytes());
        out[40..48].copy_from_slice(&self.mem_size.to_le_bytes());
        out[48..56].copy_from_slice(&self.alignment.to_le_bytes());
        out
    }

    /// A `PT_LOAD` segment placed at identical virtual and physical addresses.
    pub fn load(file_offset: u64, address: u64, file_size: u64, mem_size: u64, flags: SegmentFlags) -> Self {
        Self {
            segment_type: PT_LOAD,
            flags,
            file_offset,
            virtual_address: address,
            physical_address: address,
            file_size,
            mem_size,
            alignment: 0x1000,
        }
    }

    pub fn is_load(&self) -> bool {
        self.segment_type == PT_LOAD
    }

    /// Bytes zero-filled after the file image (`.bss`)
    pub fn bss_size(&self) -> u64 {
        self.mem_size.saturating_sub(self.file_size)
    }
}

fn le_u16(bytes: &[u8], offset: usize) -> Option<u16> {
    Some(u16::from_le_bytes(bytes.get(offset..offset + 2)?.try_into().ok()?))
}

fn le_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    Some(u32::from_le_bytes(bytes.get(offset..offset + 4)?.try_into().ok()?))
}

fn le_u64(bytes: &[u8], offset: usize) -> Option<u64> {
    Some(u64::from_le_bytes(bytes.get(offset..offset + 8)?.try_into().ok()?))
}
