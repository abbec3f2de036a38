//! Configuration module for Sumi-Atlas
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files. Every option has its default stated in [`types`]; invalid input is
//! rejected before any browser session opens.
//!
//! # Example
//!
//! ```no_run
//! use sumi_atlas::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("atlas.toml")).unwrap();
//! println!("Exploring {} to depth {}", config.target.url, config.exploration.depth_levels);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    ArchiveConfig, BrowserConfig, Config, ExplorationPolicy, LoginConfig, OutputConfig,
    OverwritePolicy, TargetConfig,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
