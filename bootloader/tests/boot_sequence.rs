//! End-to-end boot preparation against fake firmware

mod common;

use common::{FRAMEBUFFER_BASE, FakeDisplay, FakeSource, ImageBuilder, pattern};
use elfboot::kernel_if::elf64::constants::{EM_AARCH64, PT_NOTE};
use elfboot::kernel_if::elf64::{ProgramHeader, SegmentFlags};
use elfboot::kernel_if::{ENTRY_SENTINEL, entry_or_sentinel};
use elfboot::memory::RecordingSink;
use elfboot::{BootConfig, BootError, BootSequence, ElfLoadError, ElfLoader};
use std::ffi::CStr;

const KERNEL_PATH: &str = r"\EFI\BOOT\kernel.elf";

fn two_segment_image(machine: u16) -> (Vec<u8>, Vec<u8>) {
    let text = pattern(0x1000, 7);
    let note = ProgramHeader {
        segment_type: PT_NOTE,
        ..ProgramHeader::load(0, 0, 0, 0, SegmentFlags::READ)
    };
    let image = ImageBuilder::new(0x20_0000)
        .machine(machine)
        .segment(
            ProgramHeader::load(0, 0x10_0000, 0, 0x2000, SegmentFlags::READ | SegmentFlags::EXECUTE),
            text.clone(),
        )
        .segment(note, b"\x04\0\0\0elfboot\0".to_vec())
        .build();
    (image, text)
}

#[test]
fn test_prepare_loads_image_and_builds_params() {
    let (image, text) = two_segment_image(62);
    let mut display = FakeDisplay::vga_capable();
    let mut source = FakeSource::new(KERNEL_PATH, image);
    let mut sink = RecordingSink::new();

    let handoff = BootSequence::default()
        .prepare(&mut display, &mut source, &mut sink, ["quiet", "root=/dev/sda1"])
        .unwrap();

    assert_eq!(handoff.entry_point(), 0x20_0000);
    assert_eq!(sink.read(0x10_0000, 0x1000), Some(&text[..]));
    assert_eq!(sink.read(0x10_1000, 0x1000), Some(&[0u8; 0x1000][..]));
    assert_eq!(sink.reserved().count(), 1);

    assert_eq!(display.selected, Some(1));
    let params = &*handoff.params;
    assert_eq!(params.framebuffer as u64, FRAMEBUFFER_BASE);
    assert_eq!((params.width, params.height, params.pitch), (640, 480, 640 * 4));

    let args: Vec<&CStr> = unsafe { params.args() }.collect();
    assert_eq!(params.argc, 2);
    assert_eq!(args, [c"quiet", c"root=/dev/sda1"]);
}

#[test]
fn test_prepare_without_arguments() {
    let (image, _) = two_segment_image(62);
    let mut display = FakeDisplay::vga_capable();
    let mut source = FakeSource::new(KERNEL_PATH, image);
    let mut sink = RecordingSink::new();

    let handoff = BootSequence::default()
        .prepare(&mut display, &mut source, &mut sink, Vec::<String>::new())
        .unwrap();

    assert_eq!(handoff.params.argc, 0);
    assert!(handoff.params.argv.is_null());
}

#[test]
fn test_wrong_machine_yields_sentinel() {
    let (image, _) = two_segment_image(EM_AARCH64);
    let mut sink = RecordingSink::new();

    let result = ElfLoader::new(&BootConfig::DEFAULT).load(&image, &mut sink);
    assert_eq!(entry_or_sentinel(&result), ENTRY_SENTINEL);
    assert!(result.unwrap_err().to_string().contains("architecture check failed"));
    assert!(sink.ops().is_empty());
}

#[test]
fn test_wrong_machine_aborts_boot() {
    let (image, _) = two_segment_image(EM_AARCH64);
    let mut display = FakeDisplay::vga_capable();
    let mut source = FakeSource::new(KERNEL_PATH, image);
    let mut sink = RecordingSink::new();

    let err = BootSequence::default()
        .prepare(&mut display, &mut source, &mut sink, ["ignored"])
        .unwrap_err();

    assert_eq!(
        err,
        BootError::InvalidKernelFormat(ElfLoadError::UnsupportedMachine { found: EM_AARCH64 })
    );
    assert!(err.to_string().contains("architecture"));
    assert_eq!(sink.store_count(), 0);
}

#[test]
fn test_missing_display_mode_aborts_before_read() {
    let (image, _) = two_segment_image(62);
    let mut display = FakeDisplay::with_modes(&[(1024, 768), (800, 600)]);
    let mut source = FakeSource::new(KERNEL_PATH, image);
    let mut sink = RecordingSink::new();

    let err = BootSequence::default()
        .prepare(&mut display, &mut source, &mut sink, ["a"])
        .unwrap_err();

    assert_eq!(err, BootError::DisplayModeUnavailable { width: 640, height: 480 });
    assert_eq!(source.reads, 0);
    assert!(sink.ops().is_empty());
}

#[test]
fn test_missing_image_file() {
    let mut display = FakeDisplay::vga_capable();
    let mut source = FakeSource::new(r"\EFI\BOOT\other.elf", Vec::new());
    let mut sink = RecordingSink::new();

    let err = BootSequence::default()
        .prepare(&mut display, &mut source, &mut sink, ["a"])
        .unwrap_err();
    assert_eq!(err, BootError::FileNotFound);
}

#[test]
fn test_refused_destination_aborts_boot() {
    let (image, _) = two_segment_image(62);
    let mut display = FakeDisplay::vga_capable();
    let mut source = FakeSource::new(KERNEL_PATH, image);
    let mut sink = RecordingSink::new().refuse(0x10_1000, 0x1000);

    let err = BootSequence::default()
        .prepare(&mut display, &mut source, &mut sink, ["a"])
        .unwrap_err();

    assert!(matches!(err, BootError::InvalidKernelFormat(ElfLoadError::Sink(_))));
    assert_eq!(sink.store_count(), 0);
}

#[test]
fn test_second_segment_refused_writes_nothing() {
    let image = ImageBuilder::new(0x10_0000)
        .segment(
            ProgramHeader::load(0, 0x10_0000, 0, 0x100, SegmentFlags::READ | SegmentFlags::EXECUTE),
            pattern(0x40, 3),
        )
        .segment(ProgramHeader::load(0, 0x30_0000, 0, 0x100, SegmentFlags::READ), pattern(0x10, 9))
        .build();
    let mut display = FakeDisplay::vga_capable();
    let mut source = FakeSource::new(KERNEL_PATH, image);
    let mut sink = RecordingSink::new().refuse(0x30_0000, 0x1000);

    let err = BootSequence::default()
        .prepare(&mut display, &mut source, &mut sink, ["a"])
        .unwrap_err();

    assert!(matches!(err, BootError::InvalidKernelFormat(ElfLoadError::Sink(_))));
    assert_eq!(sink.store_count(), 0);
}

#[test]
fn test_custom_image_path_and_resolution() {
    let (image, _) = two_segment_image(62);
    let config = BootConfig::DEFAULT
        .with_image_path(r"\kernel.elf")
        .with_resolution(800, 600);
    let mut display = FakeDisplay::vga_capable();
    let mut source = FakeSource::new(r"\kernel.elf", image);
    let mut sink = RecordingSink::new();

    let handoff = BootSequence::new(config)
        .prepare(&mut display, &mut source, &mut sink, ["a"])
        .unwrap();

    assert_eq!(display.selected, Some(2));
    assert_eq!(handoff.display.width, 800);
    assert_eq!(handoff.image.segments.len(), 1);
}
