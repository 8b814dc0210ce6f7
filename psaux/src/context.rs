//! Analysis context shared by plugins
//!
//! Holds the named kernel layers and symbol tables a capture provides,
//! together with the process source that enumerates its tasks. Plugins
//! declare what they need from a context through
//! [`Requirement`](crate::plugins::Requirement)s.

use std::collections::{HashMap, HashSet};

use crate::domain::Architecture;
use crate::process::{Capture, PidFilter, ProcessSource, TaskRecord};

pub struct Context {
    layers: HashMap<String, Architecture>,
    symbol_tables: HashSet<String>,
    source: Box<dyn ProcessSource>,
}

impl Context {
    /// Create a context with no layers or symbol tables registered
    pub fn new(source: impl ProcessSource + 'static) -> Self {
        Self { layers: HashMap::new(), symbol_tables: HashSet::new(), source: Box::new(source) }
    }

    /// Build a context from a loaded capture
    #[must_use]
    pub fn from_capture(capture: Capture) -> Self {
        let layer_name = capture.layer_name.clone();
        let architecture = capture.architecture;
        let symbol_tables = capture.symbol_tables.clone();

        let mut ctx = Self::new(capture).with_layer(layer_name, architecture);
        for table in symbol_tables {
            ctx = ctx.with_symbol_table(table);
        }
        ctx
    }

    #[must_use]
    pub fn with_layer(mut self, name: impl Into<String>, architecture: Architecture) -> Self {
        self.layers.insert(name.into(), architecture);
        self
    }

    #[must_use]
    pub fn with_symbol_table(mut self, name: impl Into<String>) -> Self {
        self.symbol_tables.insert(name.into());
        self
    }

    /// Architecture of a registered layer
    #[must_use]
    pub fn layer_architecture(&self, name: &str) -> Option<Architecture> {
        self.layers.get(name).copied()
    }

    #[must_use]
    pub fn has_symbol_table(&self, name: &str) -> bool {
        self.symbol_tables.contains(name)
    }

    /// Enumerate tasks through the named kernel layer and symbol table
    ///
    /// Yields nothing if either name is unknown to this context.
    pub fn tasks<'a>(
        &'a self,
        layer_name: &str,
        symbol_table: &str,
        filter: PidFilter,
    ) -> Box<dyn Iterator<Item = TaskRecord> + 'a> {
        if !self.layers.contains_key(layer_name) || !self.has_symbol_table(symbol_table) {
            log::warn!("Cannot enumerate tasks: layer '{layer_name}' or symbols '{symbol_table}' missing");
            return Box::new(std::iter::empty());
        }
        self.source.tasks(layer_name, filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Pid;

    fn context() -> Context {
        let tasks = vec![TaskRecord::new(1, "launchd", 0, 0, 0), TaskRecord::new(2, "bash", 0, 0, 0)];
        Context::new(tasks).with_layer("primary", Architecture::Intel64).with_symbol_table("darwin")
    }

    #[test]
    fn test_lookup() {
        let ctx = context();
        assert_eq!(ctx.layer_architecture("primary"), Some(Architecture::Intel64));
        assert_eq!(ctx.layer_architecture("other"), None);
        assert!(ctx.has_symbol_table("darwin"));
        assert!(!ctx.has_symbol_table("linux"));
    }

    #[test]
    fn test_tasks_with_filter() {
        let ctx = context();
        assert_eq!(ctx.tasks("primary", "darwin", PidFilter::all()).count(), 2);
        let only: Vec<Pid> =
            ctx.tasks("primary", "darwin", PidFilter::only(Pid(1))).map(|t| t.pid).collect();
        assert_eq!(only, vec![Pid(1)]);
    }

    #[test]
    fn test_tasks_unknown_layer_is_empty() {
        let ctx = context();
        assert_eq!(ctx.tasks("secondary", "darwin", PidFilter::all()).count(), 0);
        assert_eq!(ctx.tasks("primary", "linux", PidFilter::all()).count(), 0);
    }
}
