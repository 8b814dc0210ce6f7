//! Command-line interface for psaux
//!
//! This module contains CLI argument parsing and its mapping onto
//! [`ConfigOverlay`](crate::config::ConfigOverlay)

pub mod args;

pub use args::Args;
