//! Architecture support
//!
//! The loader only runs on x86-64 firmware; other targets get a spinning fallback so
//! the core crate still builds and tests on any host.

#[cfg(target_arch = "x86_64")]
pub mod x86_64;

/// Disable interrupts
pub fn interrupt_disable() {
    #[cfg(target_arch = "x86_64")]
    x86_64::interrupt_disable();
}

/// Wait for interrupt (low-power idle)
pub fn wait_for_interrupt() {
    #[cfg(target_arch = "x86_64")]
    x86_64::wait_for_interrupt();

    #[cfg(not(target_arch = "x86_64"))]
    core::hint::spin_loop();
}

/// Halt the system
pub fn halt() -> ! {
    interrupt_disable();
    log::info!("System halted.");

    loop {
        wait_for_interrupt();
    }
}
