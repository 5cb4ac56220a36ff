//! Command handlers behind the `jigsaw` binary
//!
//! Handlers write to the writer they are given. With `--quiet` that writer
//! is swapped for a sink, so every command is silenced the same way and only
//! errors (reported by the caller) and exit codes remain.

use std::io::{self, Write};
use std::path::Path;

use crate::tracker::EntitlementTracker;
use crate::{catalog, storage};

use super::commands::{ConfigArgs, TrackerCommand};
use super::config::{JigsawConfig, OutputConfig, StorageConfig};
use super::output::{OutputFormat, OutputFormatter};

/// Exit code for `can-play` when the quota is exhausted
pub const EXIT_DENIED: i32 = 2;

/// `--json` wins over `output.default_format`
pub fn output_format(json: bool, output: &OutputConfig) -> OutputFormat {
    if json {
        OutputFormat::Json
    } else {
        output.default_format.parse().unwrap_or_default()
    }
}

/// Tracker over the configured store and key
pub fn open_tracker(config: &StorageConfig) -> EntitlementTracker {
    let store = storage::open_store(config.backend(), &config.resolved_data_dir());
    let tracker = EntitlementTracker::new(store).with_key(config.key.clone());
    tracing::debug!(
        backend = tracker.backend_name(),
        key = tracker.key(),
        "Entitlement tracker ready"
    );
    tracker
}

// =============================================================================
// Tracker Commands
// =============================================================================

/// Run one tracker command, returning the process exit code
pub async fn run_tracker_command(
    command: &TrackerCommand,
    tracker: &EntitlementTracker,
    formatter: &dyn OutputFormatter,
    quiet: bool,
    out: &mut dyn Write,
) -> anyhow::Result<i32> {
    let mut sink = io::sink();
    let out: &mut dyn Write = if quiet { &mut sink } else { out };

    let code = match command {
        TrackerCommand::Status => {
            let status = tracker.status().await;
            formatter.format_status(&status, out)?;
            0
        }

        TrackerCommand::CanPlay => {
            let decision = tracker.can_play().await;
            formatter.format_decision(&decision, out)?;
            if decision.allowed {
                0
            } else {
                EXIT_DENIED
            }
        }

        TrackerCommand::Record => {
            tracker.record_play().await;
            let remaining = tracker.remaining_puzzles().await;
            formatter.format_remaining(remaining, out)?;
            0
        }

        TrackerCommand::Remaining => {
            let remaining = tracker.remaining_puzzles().await;
            formatter.format_remaining(remaining, out)?;
            0
        }

        TrackerCommand::Category { id } => {
            if catalog::category_by_id(id).is_none() {
                tracing::warn!("Unknown category '{}'", id);
            }
            let unlocked = tracker.is_category_unlocked(id).await;
            formatter.format_category(id, unlocked, out)?;
            0
        }

        TrackerCommand::Categories => {
            let categories = tracker.categories().await;
            formatter.format_categories(&categories, out)?;
            0
        }

        TrackerCommand::Features => {
            let features = tracker.premium_features().await;
            formatter.format_features(&features, out)?;
            0
        }

        TrackerCommand::Activate { duration } => {
            let expires_at = tracker.activate_premium(*duration).await;
            formatter.format_activation(expires_at, out)?;
            0
        }

        TrackerCommand::ResetDaily => {
            tracker.reset_daily_limits().await;
            formatter.format_message("Daily puzzle count reset.", out)?;
            0
        }
    };

    out.flush()?;
    Ok(code)
}

// =============================================================================
// Config Command
// =============================================================================

pub fn run_config_command(
    args: &ConfigArgs,
    config_path: &Path,
    mut config: JigsawConfig,
    quiet: bool,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let mut sink = io::sink();
    let out: &mut dyn Write = if quiet { &mut sink } else { out };

    if args.path {
        writeln!(out, "{}", config_path.display())?;
        return Ok(());
    }

    if args.reset {
        JigsawConfig::default().save_to(config_path.to_path_buf())?;
        writeln!(out, "Configuration reset to defaults.")?;
        writeln!(out, "Saved to: {}", config_path.display())?;
        return Ok(());
    }

    if let Some(key) = &args.get {
        match config.get(key) {
            Some(value) => writeln!(out, "{}", value)?,
            None => anyhow::bail!("Unknown configuration key: {}", key),
        }
        return Ok(());
    }

    if let Some(assignment) = &args.set {
        let Some((key, value)) = assignment.split_once('=') else {
            anyhow::bail!("Invalid format. Use: --set key=value");
        };
        let (key, value) = (key.trim(), value.trim());
        config.set(key, value)?;
        config.save_to(config_path.to_path_buf())?;
        writeln!(out, "Set {} = {}", key, value)?;
        return Ok(());
    }

    if args.list {
        writeln!(out, "Current configuration:")?;
        writeln!(out)?;
        for (key, value) in config.list() {
            writeln!(out, "  {} = {}", key, value)?;
        }
        writeln!(out)?;
        writeln!(out, "Config file: {}", config_path.display())?;
        return Ok(());
    }

    // Default: show usage
    writeln!(out, "Configuration commands:")?;
    writeln!(out, "  jigsaw config --list            Show all settings")?;
    writeln!(out, "  jigsaw config --get <key>       Get a setting")?;
    writeln!(out, "  jigsaw config --set <key>=<val> Set a setting")?;
    writeln!(out, "  jigsaw config --reset           Reset to defaults")?;
    writeln!(out, "  jigsaw config --path            Show config file path")?;
    Ok(())
}
