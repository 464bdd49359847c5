//! Compile-time boot configuration
//!
//! There is no runtime configuration surface: the loader always boots the same image
//! path at the same resolution. Tests build their own [`BootConfig`] to exercise other
//! values.

/// Display resolution in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Virtual address range segments may be loaded into, `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadWindow {
    pub start: u64,
    pub end: u64,
}

impl LoadWindow {
    pub const fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Check that `[start, end)` lies inside the window
    pub fn contains(&self, start: u64, end: u64) -> bool {
        start >= self.start && end <= self.end && start <= end
    }
}

/// Boot configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootConfig {
    /// Image path on the boot device
    pub image_path: &'static str,
    /// Display mode the loader insists on
    pub target_resolution: Resolution,
    /// Addresses segments may occupy. Page zero and the non-canonical upper half
    /// are excluded.
    pub load_window: LoadWindow,
    /// Extra bytes allocated past the end of the image buffer
    pub image_headroom: usize,
}

impl BootConfig {
    pub const DEFAULT: Self = Self {
        image_path: r"\EFI\BOOT\kernel.elf",
        target_resolution: Resolution::new(640, 480),
        load_window: LoadWindow::new(0x1000, 0x0000_8000_0000_0000),
        image_headroom: 1,
    };

    pub const fn new() -> Self {
        Self::DEFAULT
    }

    pub const fn with_image_path(mut self, path: &'static str) -> Self {
        self.image_path = path;
        self
    }

    pub const fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.target_resolution = Resolution::new(width, height);
        self
    }

    pub const fn with_load_window(mut self, start: u64, end: u64) -> Self {
        self.load_window = LoadWindow::new(start, end);
        self
    }
}

impl Default for BootConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Maximum log level for this build
pub const fn max_log_level() -> log::LevelFilter {
    if cfg!(feature = "verbose_logging") {
        log::LevelFilter::Trace
    } else {
        log::LevelFilter::Info
    }
}
