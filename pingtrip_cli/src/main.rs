mod backend;
mod cli;
mod commands;
mod error_fmt;
mod logging;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    let _ = color_eyre::install();

    if let Err(err) = real_main(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        tracing::error!(error = %err, "command failed");
        std::process::exit(exit_code_for_error(&err));
    }
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let loaded = commands::load(&cli.config, cli.analog_calibration.as_deref())?;
    logging::init(&cli.log_level, cli.json, &loaded.cfg.logging)?;
    tracing::debug!(config = %cli.config.display(), "configuration loaded");

    match cli.cmd {
        Commands::Run { ticks, no_upload } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = shutdown.clone();
            ctrlc::set_handler(move || {
                flag.store(true, Ordering::Relaxed);
            })
            .map_err(|e| eyre::eyre!("failed to install Ctrl-C handler: {e}"))?;
            commands::run(&loaded, ticks, no_upload, cli.json, shutdown)
        }
        Commands::Calibrate => commands::calibrate(&loaded, cli.json),
        Commands::Encode {
            count,
            average,
            baseline,
            device_id,
        } => commands::encode(
            &loaded,
            count,
            average,
            baseline,
            device_id.as_deref(),
            cli.json,
        ),
        Commands::SelfCheck => commands::self_check(&loaded, cli.json),
    }
}
