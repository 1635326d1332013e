//! # Core Application Logic
//!
//! Settings and resolution shared by every subcommand. Knows nothing about
//! clap parsing or output formatting.
//!
//! ## Modules
//!
//! - [`config`]: the `~/.quill/config.toml` layer and the
//!   defaults → file → env → flags resolution chain

pub mod config;
