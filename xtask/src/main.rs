use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};

const UEFI_TARGET: &str = "x86_64-unknown-uefi";
const ESP_DIR: &str = "target/esp";

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let task = args.next().unwrap_or_else(|| "help".to_string());
    let rest: Vec<String> = args.collect();
    match task.as_str() {
        "build" => build_loader(&rest).map(|_| ()),
        "esp" => make_esp(&rest),
        "qemu" => run_qemu(&rest),
        _ => {
            print_help();
            Ok(())
        }
    }
}

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn is_release(args: &[String]) -> bool {
    args.iter().any(|a| a == "--release")
}

/// Build `BOOTX64.EFI` and return the path of the produced binary.
fn build_loader(args: &[String]) -> Result<PathBuf> {
    let release = is_release(args);
    let mut cmd = Command::new("cargo");
    cmd.current_dir(workspace_root())
        .arg("build")
        .arg("-p").arg("elfboot")
        .arg("--bin").arg("elfboot")
        .arg("--target").arg(UEFI_TARGET);
    if release {
        cmd.arg("--release");
    }
    if args.iter().any(|a| a == "--verbose-logging") {
        cmd.arg("--features").arg("verbose_logging");
    }
    run(&mut cmd, "loader build")?;

    let profile = if release { "release" } else { "debug" };
    Ok(workspace_root()
        .join("target")
        .join(UEFI_TARGET)
        .join(profile)
        .join("elfboot.efi"))
}

/// Lay out an ESP tree: `EFI/BOOT/BOOTX64.EFI` plus the image to boot.
fn make_esp(args: &[String]) -> Result<()> {
    let Some(kernel) = args.iter().find(|a| !a.starts_with("--")) else {
        bail!("esp: missing path to kernel.elf");
    };
    let loader = build_loader(args)?;

    let boot_dir = workspace_root().join(ESP_DIR).join("EFI").join("BOOT");
    fs::create_dir_all(&boot_dir).with_context(|| format!("creating {}", boot_dir.display()))?;
    fs::copy(&loader, boot_dir.join("BOOTX64.EFI"))
        .with_context(|| format!("copying {}", loader.display()))?;
    fs::copy(kernel, boot_dir.join("kernel.elf")).with_context(|| format!("copying {}", kernel))?;

    println!("[xtask] ESP ready at {}", workspace_root().join(ESP_DIR).display());
    Ok(())
}

/// Boot the ESP tree under QEMU with the given OVMF firmware image.
fn run_qemu(args: &[String]) -> Result<()> {
    let Some(ovmf) = args.iter().find(|a| !a.starts_with("--")) else {
        bail!("qemu: missing path to OVMF firmware");
    };
    let esp = workspace_root().join(ESP_DIR);
    if !esp.join("EFI").join("BOOT").join("BOOTX64.EFI").exists() {
        bail!("qemu: no ESP at {}, run `esp` first", esp.display());
    }

    let mut cmd = Command::new("qemu-system-x86_64");
    cmd.arg("-machine").arg("q35")
        .arg("-m").arg("256M")
        .arg("-bios").arg(ovmf)
        .arg("-drive").arg(format!("format=raw,file=fat:rw:{}", esp.display()))
        .arg("-serial").arg("stdio")
        .arg("-no-reboot");
    run(&mut cmd, "qemu")
}

fn run(cmd: &mut Command, name: &str) -> Result<()> {
    println!("[xtask] {}: {:?}", name, cmd);
    let status = cmd.status().with_context(|| format!("failed to run {}", name))?;
    if !status.success() {
        bail!("{} failed with status {:?}", name, status);
    }
    Ok(())
}

fn print_help() {
    println!(
        "xtask usage:\n  cargo run -p xtask -- build [--release] [--verbose-logging]\n  cargo run -p xtask -- esp <kernel.elf> [--release]\n  cargo run -p xtask -- qemu <OVMF.fd>"
    );
}
