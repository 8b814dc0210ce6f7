//! # Plugins
//!
//! A plugin declares the context entries it needs as [`Requirement`]s and,
//! once those are satisfied, turns a [`Context`] into a [`TreeGrid`].
//! Plugins are looked up by name through a [`PluginRegistry`]:
//!
//! | Name         | Output                                         |
//! |--------------|------------------------------------------------|
//! | `mac.psaux`  | command line recovered from each task's memory |
//! | `mac.pslist` | per-task metadata as found in the capture      |
//!
//! Requirement names are bound to concrete context entries through
//! [`ContextConfig`]: the translation layer requirement resolves to
//! `primary_layer`, the symbol requirement to `symbol_table`.

pub mod psaux;
pub mod pslist;

pub use psaux::{extract, extract_arguments, ArgumentExtractor, ExtractionResult, Psaux};
pub use pslist::PsList;

use log::info;
use std::collections::BTreeMap;

use crate::config::{Config, ContextConfig};
use crate::context::Context;
use crate::domain::{Architecture, PluginError};
use crate::render::TreeGrid;

/// Something a plugin needs from the context before it can run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// A kernel address space with one of the listed architectures
    TranslationLayer {
        name: &'static str,
        description: &'static str,
        architectures: &'static [Architecture],
    },
    /// A kernel symbol table
    Symbols { name: &'static str, description: &'static str },
}

impl Requirement {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Requirement::TranslationLayer { name, .. } | Requirement::Symbols { name, .. } => *name,
        }
    }

    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Requirement::TranslationLayer { description, .. }
            | Requirement::Symbols { description, .. } => *description,
        }
    }

    /// Describe why this requirement is not met, if it isn't
    fn check(&self, ctx: &Context, config: &ContextConfig) -> Option<String> {
        match self {
            Requirement::TranslationLayer { name, architectures, .. } => {
                let layer = &config.primary_layer;
                match ctx.layer_architecture(layer) {
                    None => Some(format!("{name} (no layer named '{layer}')")),
                    Some(arch) if !architectures.contains(&arch) => {
                        Some(format!("{name} (architecture {arch} not supported)"))
                    }
                    Some(_) => None,
                }
            }
            Requirement::Symbols { name, .. } => {
                let table = &config.symbol_table;
                (!ctx.has_symbol_table(table))
                    .then(|| format!("{name} (no symbol table named '{table}')"))
            }
        }
    }
}

/// Analysis step selectable by name
pub trait Plugin {
    fn name(&self) -> &'static str;

    /// One-line summary shown by `--list`
    fn description(&self) -> &'static str;

    fn requirements(&self) -> Vec<Requirement>;

    /// Produce the plugin's rows; evaluated lazily by the renderer
    fn run<'a>(&self, ctx: &'a Context, config: &'a Config) -> TreeGrid<'a>;
}

/// Check every requirement of `plugin` against the context
///
/// # Errors
/// Returns [`PluginError::Unsatisfied`] listing each unmet requirement.
pub fn validate_requirements(
    plugin: &dyn Plugin,
    ctx: &Context,
    config: &ContextConfig,
) -> Result<(), PluginError> {
    let unsatisfied: Vec<String> =
        plugin.requirements().iter().filter_map(|req| req.check(ctx, config)).collect();
    if unsatisfied.is_empty() {
        Ok(())
    } else {
        Err(PluginError::Unsatisfied(unsatisfied))
    }
}

type PluginFactory = fn() -> Box<dyn Plugin>;

/// Name-keyed plugin table
pub struct PluginRegistry {
    plugins: BTreeMap<&'static str, PluginFactory>,
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl PluginRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self { plugins: BTreeMap::new() }
    }

    /// Registry holding every plugin shipped with this crate
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register("mac.psaux", || -> Box<dyn Plugin> { Box::new(Psaux) });
        registry.register("mac.pslist", || -> Box<dyn Plugin> { Box::new(PsList) });
        registry
    }

    pub fn register(&mut self, name: &'static str, factory: PluginFactory) {
        self.plugins.insert(name, factory);
    }

    /// Instantiate a plugin by name
    ///
    /// # Errors
    /// Returns [`PluginError::UnknownPlugin`] if no plugin has that name.
    pub fn get(&self, name: &str) -> Result<Box<dyn Plugin>, PluginError> {
        self.plugins
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| PluginError::UnknownPlugin(name.to_string()))
    }

    /// Registered names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.plugins.keys().copied()
    }

    /// Look up a plugin, validate its requirements and run it
    ///
    /// # Errors
    /// Returns an error if the plugin is unknown or its requirements are
    /// not met by `ctx`.
    pub fn run<'a>(
        &self,
        name: &str,
        ctx: &'a Context,
        config: &'a Config,
    ) -> Result<TreeGrid<'a>, PluginError> {
        let plugin = self.get(name)?;
        validate_requirements(plugin.as_ref(), ctx, &config.context)?;
        info!("Running plugin {name}");
        Ok(plugin.run(ctx, config))
    }
}
