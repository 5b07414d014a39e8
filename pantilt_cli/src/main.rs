mod cli;
mod error_fmt;
mod logging;
mod track;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;
use pantilt_core::error::{Report, TrackerError};

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::track::{TrackArgs, run_track, summary_json, summary_text};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(err) = real_main(cli) {
        tracing::error!(error = %err, "exiting with error");
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

/// Read, parse and validate the config file.
fn load_config(path: &Path) -> eyre::Result<pantilt_config::Config> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        Report::new(TrackerError::Config(format!(
            "cannot read {}: {e}",
            path.display()
        )))
    })?;
    let cfg = pantilt_config::load_toml(&text)
        .wrap_err_with(|| format!("parse config {}", path.display()))?;
    cfg.validate()
        .map_err(|e| Report::new(TrackerError::Config(e.to_string())))?;
    Ok(cfg)
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    color_eyre::install()?;
    let cfg = load_config(&cli.config)?;
    let _log_guard = logging::init_tracing(cli.json, &cli.log_level, &cfg.logging)?;

    match cli.cmd {
        Commands::Track {
            sim,
            port,
            frames,
            cooperative,
        } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = shutdown.clone();
            ctrlc::set_handler(move || {
                flag.store(true, Ordering::Relaxed);
            })
            .wrap_err("install Ctrl-C handler")?;

            let args = TrackArgs {
                sim,
                port,
                frames,
                cooperative,
            };
            let summary = run_track(&cfg, &args, shutdown)?;
            if cli.json {
                println!("{}", summary_json(&summary));
            } else {
                println!("{}", summary_text(&summary));
            }
        }
        Commands::SelfCheck => self_check(&cfg, cli.json),
    }
    Ok(())
}

fn self_check(cfg: &pantilt_config::Config, json: bool) {
    let hardware = cfg!(feature = "hardware");
    if json {
        println!(
            "{}",
            serde_json::json!({
                "status": "ok",
                "port": cfg.serial.port,
                "baud": cfg.serial.baud,
                "frame": { "width": cfg.frame.width, "height": cfg.frame.height },
                "axes": format!("{:?}", cfg.control.axes).to_lowercase(),
                "mode": format!("{:?}", cfg.runner.mode).to_lowercase(),
                "decoder": format!("{:?}", cfg.runner.decoder).to_lowercase(),
                "send_interval_ms": cfg.command.send_interval_ms,
                "hardware": hardware,
            })
        );
        return;
    }
    println!("config ok");
    println!("  port:      {} @ {} baud", cfg.serial.port, cfg.serial.baud);
    println!("  frame:     {}x{}", cfg.frame.width, cfg.frame.height);
    println!(
        "  control:   {:?}, gain {}/{}, max step {} deg, deadband {} px",
        cfg.control.axes,
        cfg.control.gain_pan,
        cfg.control.gain_tilt,
        cfg.control.max_step_deg,
        cfg.control.deadband_px
    );
    println!(
        "  runner:    {:?} / {:?}, commands every {} ms",
        cfg.runner.mode, cfg.runner.decoder, cfg.command.send_interval_ms
    );
    println!(
        "  serial support: {}",
        if hardware { "compiled in" } else { "sim only" }
    );
}
