//! CLI module for Jigsaw
//!
//! Stands in for the app screens that consult the entitlement tracker:
//! the category picker, the puzzle start gate and the premium page.
//!
//! ## Usage
//!
//! ```bash
//! # Can I start another puzzle?
//! jigsaw can-play
//!
//! # A puzzle was finished
//! jigsaw record
//!
//! # Which categories are open?
//! jigsaw categories --json | jq '.[] | select(.unlocked) | .id'
//!
//! # Simulated purchase
//! jigsaw activate --duration year
//!
//! # Configuration management
//! jigsaw config --list
//! jigsaw config --set storage.backend=memory
//! ```
//!
//! ## Module Structure
//!
//! - `commands`: CLI command definitions using clap
//! - `dispatch`: Command handlers writing through a formatter
//! - `output`: Output formatters for different formats
//! - `config`: Configuration file handling
//! - `logging`: Subscriber setup with a reloadable filter

pub mod commands;
pub mod config;
pub mod dispatch;
pub mod logging;
pub mod output;

pub use commands::{Cli, Commands, ConfigArgs, TrackerCommand};
pub use config::{ConfigError, JigsawConfig, LoggingConfig, OutputConfig, StorageConfig};
pub use dispatch::{open_tracker, output_format, run_config_command, run_tracker_command, EXIT_DENIED};
pub use output::{create_formatter, OutputFormat, OutputFormatter};
