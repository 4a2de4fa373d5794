mod cli;
mod error_fmt;
mod run;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

use crate::cli::{Cli, Commands, DEFAULT_CONFIG, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::run::RunOpts;

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = real_main(cli) {
        let json = JSON_MODE.get().copied().unwrap_or(false);
        if json {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
            tracing::debug!(error = ?e, "exiting with error");
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(&cli.config)?;
    init_tracing(cli.json, &cli.log_level, &cfg.logging)?;
    if !cli.json {
        let _ = color_eyre::install();
    }
    tracing::debug!(config = %cli.config.display(), "config loaded");

    match cli.cmd {
        Commands::Run {
            duration_ms,
            apnea_after_ms,
            stats,
            no_override_input,
        } => {
            let stop = Arc::new(AtomicBool::new(false));
            {
                let stop = stop.clone();
                if let Err(e) = ctrlc::set_handler(move || stop.store(true, Ordering::Relaxed)) {
                    tracing::warn!(error = %e, "failed to install Ctrl-C handler");
                }
            }
            let opts = RunOpts {
                duration_ms,
                apnea_after_ms,
                stats,
                no_override_input,
                json: cli.json,
            };
            let summary = run::run_monitor(&cfg, opts, stop)?;
            if cli.json {
                println!("{}", run::summary_json(&summary));
            } else {
                println!(
                    "monitor stopped ({}) after {} ms; state: {}, confirmations: {}",
                    summary.reason.as_str(),
                    summary.elapsed.as_millis(),
                    summary.snapshot.state,
                    summary.snapshot.confirmations
                );
            }
        }
        Commands::SelfCheck => {
            run::self_check(&cfg)?;
            if cli.json {
                println!("{}", serde_json::json!({ "self_check": "ok" }));
            } else {
                println!("self-check ok");
            }
        }
    }
    Ok(())
}

/// Missing default config means reference defaults; an explicit path must exist.
fn load_config(path: &Path) -> eyre::Result<breath_config::Config> {
    if path == Path::new(DEFAULT_CONFIG) && !path.exists() {
        return Ok(breath_config::Config::default());
    }
    breath_config::load_file(path)
}

fn init_tracing(json: bool, level: &str, logging: &breath_config::Logging) -> eyre::Result<()> {
    // Console: RUST_LOG wins over --log-level.
    let console_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .wrap_err_with(|| format!("invalid log level '{level}'"))?;

    let console: Box<dyn Layer<Registry> + Send + Sync> = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(console_filter)
            .boxed()
    };
    let mut layers = vec![console];

    if let Some(file) = &logging.file {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .ok_or_else(|| eyre::eyre!("logging.file has no file name: {file}"))?;
        let appender = match logging.rotation.as_deref().unwrap_or("never") {
            "daily" => tracing_appender::rolling::daily(dir, name),
            "hourly" => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        let file_filter = EnvFilter::try_new(logging.level.as_deref().unwrap_or("info"))
            .wrap_err("invalid logging.level")?;
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(file_filter)
                .boxed(),
        );
    }

    let _ = tracing_subscriber::registry().with(layers).try_init();
    Ok(())
}
