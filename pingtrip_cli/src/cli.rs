//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "pingtrip", version, about = "PingTrip adaptive ranging counter")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/pingtrip.toml")]
    pub config: PathBuf,

    /// Optional analog calibration CSV (strict `raw,cm` header); overrides [sensor.analog]
    #[arg(long = "analog-calibration", value_name = "FILE")]
    pub analog_calibration: Option<PathBuf>,

    /// Log and print results as JSON instead of text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); RUST_LOG takes precedence
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Calibrate the baseline, then count objects until Ctrl-C
    Run {
        /// Stop after this many detection ticks
        #[arg(long, value_name = "N")]
        ticks: Option<u64>,
        /// Do not publish telemetry even if enabled in the config
        #[arg(long = "no-upload", action = ArgAction::SetTrue)]
        no_upload: bool,
    },
    /// Run baseline calibration only and print the result
    Calibrate,
    /// Print the telemetry record for the given values
    Encode {
        #[arg(long)]
        count: u64,
        #[arg(long, allow_hyphen_values = true)]
        average: i32,
        #[arg(long, allow_hyphen_values = true)]
        baseline: i32,
        /// Override telemetry.device_id
        #[arg(long = "device-id", value_name = "ID")]
        device_id: Option<String>,
    },
    /// Quick health check: one sensor read
    SelfCheck,
}
