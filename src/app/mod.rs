//! Application module
//!
//! The preview orchestrator, its display mapping, configuration and the
//! one-shot CLI runner.

mod config;
mod config_file;
mod preview;
mod render;
mod run;

pub use config::Config;
pub use config_file::ConfigFile;
pub use preview::{Preview, PreviewTask, Snapshot};
pub use render::{render, MessageAction, Rendered};
pub use run::{build_env, run};

/// Process exit codes of `cpv`
pub mod exit_code {
    /// Preview rendered
    pub const SUCCESS: i32 = 0;
    /// Preview resolved to an error message
    pub const PREVIEW_ERROR: i32 = 1;
    /// Runtime error occurred
    pub const ERROR: i32 = 2;
    /// Invalid arguments or options (e.g., unknown flag, invalid mode)
    pub const INVALID: i32 = 3;
}
