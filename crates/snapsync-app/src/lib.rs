pub mod logging;
pub mod settings;

pub use logging::init_logging;
pub use settings::{ClientSettings, ServerSettings, Settings};

/// Process exit codes for the client binary (spec §6).
pub mod exit_code {
    pub const CLEAN: i32 = 0;
    pub const BAD_ARGS: i32 = 1;
    pub const CONNECTION_FAILED: i32 = 2;
    pub const AUDIO_DEVICE_FAILED: i32 = 3;
}
