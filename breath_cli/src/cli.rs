//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

/// Default config location; a missing file at this path means "use defaults".
pub const DEFAULT_CONFIG: &str = "etc/breath_config.toml";

#[derive(Parser, Debug)]
#[command(name = "breath", version, about = "Breath monitor CLI")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Monitor breathing and raise the alert on apnea
    Run {
        /// Stop after this many milliseconds (default: run until Ctrl-C)
        #[arg(long, value_name = "MS")]
        duration_ms: Option<u64>,
        /// Simulator only: stop producing breaths after this many milliseconds
        #[arg(long, value_name = "MS")]
        apnea_after_ms: Option<u64>,
        /// Print sampling and dispatch counters on exit
        #[arg(long, action = ArgAction::SetTrue)]
        stats: bool,
        /// Do not read override edges from stdin (simulator) or GPIO (hardware)
        #[arg(long, action = ArgAction::SetTrue)]
        no_override_input: bool,
    },
    /// Probe the sensor identity register and exit
    SelfCheck,
}
