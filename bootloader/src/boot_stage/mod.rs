//! Boot Stage - display policy, command line, boot orchestration

pub mod boot_sequence;
pub mod cmdline;
pub mod display;

// Re-export commonly used types
pub use boot_sequence::{BootSequence, PreparedHandoff};
pub use cmdline::CmdLine;
pub use display::{DisplayMode, ModeInfo, negotiate_display, select_mode};
