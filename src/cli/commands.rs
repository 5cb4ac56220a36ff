//! CLI command definitions for Jigsaw
//!
//! - `status` - Plan, today's usage and remaining puzzles
//! - `can-play` - Check whether another puzzle may be started
//! - `record` - Count a finished puzzle against today's quota
//! - `category` / `categories` - Category gating
//! - `activate` - Simulate a premium purchase
//! - `config` - Show or modify configuration

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::entitlements::PremiumDuration;

/// Jigsaw Master - puzzle quota and premium status
#[derive(Parser, Debug)]
#[command(name = "jigsaw")]
#[command(about = "Daily puzzle quota and premium status", long_about = None)]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all normal output; errors and exit codes still report failures
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output as JSON (overrides output.default_format)
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(flatten)]
    Tracker(TrackerCommand),

    /// Show or modify configuration
    Config(ConfigArgs),
}

/// Commands that read or update the entitlement record
#[derive(Subcommand, Debug)]
pub enum TrackerCommand {
    /// Show plan, today's usage and remaining puzzles
    Status,

    /// Check whether another puzzle may be started (exit code 2 if not)
    CanPlay,

    /// Record a played puzzle
    Record,

    /// Show how many free puzzles are left today
    Remaining,

    /// Check whether a category is unlocked
    Category {
        /// Category id (animals, nature, food, objects, vehicles, buildings)
        id: String,
    },

    /// List all categories with their unlocked state
    Categories,

    /// Show which premium features are active
    Features,

    /// Activate premium (simulated purchase)
    Activate {
        /// Subscription length: month or year
        #[arg(short, long, default_value = "month")]
        duration: PremiumDuration,
    },

    /// Reset today's puzzle count
    ResetDaily,
}

#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// Get a configuration value
    #[arg(long)]
    pub get: Option<String>,

    /// Set a configuration value (key=value)
    #[arg(long)]
    pub set: Option<String>,

    /// List all configuration values
    #[arg(long)]
    pub list: bool,

    /// Reset configuration to defaults
    #[arg(long)]
    pub reset: bool,

    /// Show configuration file path
    #[arg(long)]
    pub path: bool,
}
