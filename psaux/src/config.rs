//! Tool configuration
//!
//! Configuration is split per component. Each component has a concrete
//! struct with defaults and an overlay of optional fields; overlays are
//! applied in order (built-in defaults, then the config file, then the
//! command line) and every `Some` field replaces the value beneath it.
//!
//! Config files are JSON with the same sections as [`ConfigOverlay`]:
//!
//! ```json
//! {
//!   "context": { "primary_layer": "primary", "symbol_table": "darwin" },
//!   "filter": { "pid": 412 },
//!   "output": { "renderer": "json" }
//! }
//! ```

use serde::Deserialize;
use std::path::Path;

use crate::domain::{ConfigError, Pid};
use crate::render::RendererKind;

/// Names of the context entries plugins bind their requirements to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextConfig {
    /// Kernel translation layer
    pub primary_layer: String,
    /// Kernel symbol table
    pub symbol_table: String,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self { primary_layer: "primary".to_string(), symbol_table: "darwin".to_string() }
    }
}

impl ContextConfig {
    fn merge(&mut self, overlay: ContextOverlay) {
        if let Some(layer) = overlay.primary_layer {
            self.primary_layer = layer;
        }
        if let Some(table) = overlay.symbol_table {
            self.symbol_table = table;
        }
    }
}

/// Task selection shared by the process-listing plugins
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterConfig {
    pub pid: Option<Pid>,
}

impl FilterConfig {
    fn merge(&mut self, overlay: FilterOverlay) {
        if overlay.pid.is_some() {
            self.pid = overlay.pid;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputConfig {
    pub renderer: RendererKind,
}

impl OutputConfig {
    fn merge(&mut self, overlay: OutputOverlay) {
        if let Some(renderer) = overlay.renderer {
            self.renderer = renderer;
        }
    }
}

/// Fully resolved configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub context: ContextConfig,
    pub filter: FilterConfig,
    pub output: OutputConfig,
}

impl Config {
    /// Apply an overlay on top of this configuration
    #[must_use]
    pub fn merge(mut self, overlay: ConfigOverlay) -> Self {
        self.context.merge(overlay.context);
        self.filter.merge(overlay.filter);
        self.output.merge(overlay.output);
        self
    }

    /// Defaults, then the optional config file, then command-line overrides
    ///
    /// # Errors
    /// Returns an error if the config file cannot be read or parsed.
    pub fn resolve(file: Option<&Path>, cli: ConfigOverlay) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(path) = file {
            config = config.merge(ConfigOverlay::from_file(path)?);
        }
        Ok(config.merge(cli))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContextOverlay {
    pub primary_layer: Option<String>,
    pub symbol_table: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterOverlay {
    pub pid: Option<Pid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputOverlay {
    pub renderer: Option<RendererKind>,
}

/// Partial configuration, as read from a file or built from CLI flags
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigOverlay {
    pub context: ContextOverlay,
    pub filter: FilterOverlay,
    pub output: OutputOverlay,
}

impl ConfigOverlay {
    /// Read an overlay from a JSON file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Ok(serde_json::from_str(&content)?)
    }
}
