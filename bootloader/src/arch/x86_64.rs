//! x86_64 architecture-specific implementation

use ::x86_64::instructions;

pub fn interrupt_disable() {
    instructions::interrupts::disable();
}

pub fn wait_for_interrupt() {
    instructions::hlt();
}
