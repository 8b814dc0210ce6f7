//! # psaux - Main Entry Point
//!
//! Loads a capture, resolves configuration, runs the selected plugin and
//! streams its rows to stdout.

use anyhow::{Context as _, Result};
use clap::Parser;
use log::info;
use std::io::{self, BufWriter};

use psaux::cli::Args;
use psaux::config::Config;
use psaux::context::Context;
use psaux::plugins::PluginRegistry;
use psaux::process::Capture;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;
const EXIT_NOPERM: i32 = 77;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    let msg = format!("{err:#}").to_lowercase();
    if msg.contains("permission denied") {
        EXIT_NOPERM
    } else if msg.contains("missing required argument") || msg.contains("unknown plugin") {
        EXIT_USAGE
    } else {
        EXIT_ERROR
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    let registry = PluginRegistry::with_builtin();

    if args.list {
        for name in registry.names() {
            let plugin = registry.get(name)?;
            println!("{name:<12} {}", plugin.description());
        }
        return Ok(());
    }

    // Fail on a bad plugin name before touching the capture
    registry.get(&args.plugin)?;

    let config = Config::resolve(args.config.as_deref(), args.overlay())
        .context("Failed to load configuration")?;
    info!("Configuration: {config:?}");

    let capture_path = args.capture.as_deref().context("Missing required argument: --capture")?;
    let capture = Capture::load(capture_path)
        .with_context(|| format!("Failed to load capture {}", capture_path.display()))?;

    if !args.quiet {
        eprintln!("psaux v{}", env!("CARGO_PKG_VERSION"));
        eprintln!("capture: {} ({} tasks)", capture_path.display(), capture.task_count());
        eprintln!("plugin: {}", args.plugin);
    }

    let ctx = Context::from_capture(capture);
    let grid = registry.run(&args.plugin, &ctx, &config)?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let rows = config
        .output
        .renderer
        .renderer()
        .render(grid, &mut out)
        .context("Failed to write results")?;

    if !args.quiet {
        eprintln!("rows: {rows}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let missing = anyhow::anyhow!("Missing required argument: --capture");
        assert_eq!(exit_code_for(&missing), EXIT_USAGE);

        let unknown = anyhow::Error::new(psaux::domain::PluginError::UnknownPlugin("x".into()));
        assert_eq!(exit_code_for(&unknown), EXIT_USAGE);

        let denied = anyhow::Error::new(std::io::Error::from(std::io::ErrorKind::PermissionDenied))
            .context("Failed to load capture");
        assert_eq!(exit_code_for(&denied), EXIT_NOPERM);

        assert_eq!(exit_code_for(&anyhow::anyhow!("Failed to load capture")), EXIT_ERROR);
    }
}
