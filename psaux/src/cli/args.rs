//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

use crate::config::{ConfigOverlay, ContextOverlay, FilterOverlay, OutputOverlay};
use crate::domain::Pid;
use crate::render::RendererKind;

#[derive(Parser, Debug)]
#[command(
    name = "psaux",
    about = "Recover process command lines from a memory capture",
    after_help = "\
EXAMPLES:
    psaux --capture capture.json                 Command lines of every process
    psaux --capture capture.json --pid 412       A single process
    psaux mac.pslist --capture capture.json      Task metadata only
    psaux --list                                 Show available plugins"
)]
pub struct Args {
    /// Plugin to run
    #[arg(value_name = "PLUGIN", default_value = "mac.psaux")]
    pub plugin: String,

    /// Capture manifest describing the memory image
    #[arg(short, long, value_name = "FILE", required_unless_present = "list")]
    pub capture: Option<PathBuf>,

    /// Only report this process ID
    #[arg(short, long)]
    pub pid: Option<u32>,

    /// JSON config file (command-line flags take precedence)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum)]
    pub renderer: Option<RendererKind>,

    /// Name of the kernel layer to bind the plugin to
    #[arg(long, value_name = "NAME")]
    pub layer: Option<String>,

    /// Name of the kernel symbol table to bind the plugin to
    #[arg(long, value_name = "NAME")]
    pub symbols: Option<String>,

    /// List available plugins and exit
    #[arg(long)]
    pub list: bool,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Settings given on the command line, as a config overlay
    #[must_use]
    pub fn overlay(&self) -> ConfigOverlay {
        ConfigOverlay {
            context: ContextOverlay {
                primary_layer: self.layer.clone(),
                symbol_table: self.symbols.clone(),
            },
            filter: FilterOverlay { pid: self.pid.map(Pid) },
            output: OutputOverlay { renderer: self.renderer },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["psaux", "--capture", "c.json"]).unwrap();
        assert_eq!(args.plugin, "mac.psaux");
        assert_eq!(args.capture, Some(PathBuf::from("c.json")));
        assert!(args.overlay().filter.pid.is_none());
    }

    #[test]
    fn test_overlay_from_flags() {
        let args = Args::try_parse_from([
            "psaux", "mac.pslist", "-c", "c.json", "--pid", "42", "-r", "json", "--symbols", "darwin19",
        ])
        .unwrap();
        let overlay = args.overlay();
        assert_eq!(args.plugin, "mac.pslist");
        assert_eq!(overlay.filter.pid, Some(Pid(42)));
        assert_eq!(overlay.output.renderer, Some(RendererKind::Json));
        assert_eq!(overlay.context.symbol_table.as_deref(), Some("darwin19"));
        assert_eq!(overlay.context.primary_layer, None);
    }

    #[test]
    fn test_capture_required() {
        assert!(Args::try_parse_from(["psaux"]).is_err());
        assert!(Args::try_parse_from(["psaux", "--list"]).is_ok());
    }
}
