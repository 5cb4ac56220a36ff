//! Jigsaw CLI - puzzle quota and premium status
//!
//! A command-line front end over the entitlement tracker with:
//! - Quota checks and play recording
//! - Category gating and premium feature listing
//! - Simulated premium purchase
//! - Configuration file support

use std::io::{stderr, stdout};

use clap::Parser;
use tracing_subscriber::util::SubscriberInitExt;

use jigsaw_entitlements::cli::{
    create_formatter, logging, open_tracker, output_format, run_config_command,
    run_tracker_command, Cli, Commands, JigsawConfig,
};

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging first so problems in the config file are reported
    let (subscriber, filter) = logging::subscriber(cli.verbose, std::io::stderr);
    subscriber.init();

    let config_path = cli.config.clone().unwrap_or_else(JigsawConfig::default_path);
    let config = JigsawConfig::load_from(config_path.clone());
    logging::apply_config(&filter, cli.verbose, &config.logging)?;

    let formatter = create_formatter(
        output_format(cli.json, &config.output),
        config.output.color,
    );

    let result = match &cli.command {
        Commands::Config(args) => {
            run_config_command(args, &config_path, config, cli.quiet, &mut stdout().lock())
                .map(|()| 0)
        }
        Commands::Tracker(command) => {
            let tracker = open_tracker(&config.storage);
            run_tracker_command(
                command,
                &tracker,
                formatter.as_ref(),
                cli.quiet,
                &mut stdout().lock(),
            )
            .await
        }
    };

    match result {
        Ok(0) => Ok(()),
        Ok(code) => std::process::exit(code),
        Err(e) => {
            formatter.format_error(&format!("{:#}", e), &mut stderr())?;
            std::process::exit(1);
        }
    }
}
