//! Gazelens CLI: replay recorded gaze sessions and manage focus configs.
//!
//! Usage:
//!   gazelens replay <SAMPLES> --page <LAYOUT>   Replay a session on a simulated page
//!   gazelens validate <PATH>                    Validate an extension config
//!   gazelens init                               Write the built-in extension config

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "gazelens",
    about = "Gaze-driven dwell focus for web content",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded gaze session against a simulated page
    Replay {
        /// Recorded samples (JSONL, one sample per line)
        samples: PathBuf,

        /// Page layout (JSON)
        #[arg(short, long)]
        page: PathBuf,

        /// Extension config; the built-in config is used when omitted
        #[arg(short, long, conflicts_with = "no_config")]
        config: Option<PathBuf>,

        /// Run without any extension config
        #[arg(long)]
        no_config: bool,

        /// Enable debug markers
        #[arg(long)]
        debug: bool,

        /// Pace samples by their timestamps instead of replaying instantly
        #[arg(long)]
        realtime: bool,

        /// Write one JSON line per stabilized sample to this file
        #[arg(long)]
        trace: Option<PathBuf>,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate an extension config
    Validate {
        /// Path to the config file
        path: PathBuf,
    },

    /// Write the built-in extension config
    Init {
        /// Output file
        #[arg(short, long, default_value = "gazelens-config.json")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,

        /// Also write default engine tuning to the user config location
        #[arg(long)]
        tuning: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut app_config = gazelens_common::config::AppConfig::load();
    if cli.verbose {
        app_config.logging.level = "debug".to_string();
    }
    gazelens_common::logging::init_logging(&app_config.logging);

    match cli.command {
        Commands::Replay {
            samples,
            page,
            config,
            no_config,
            debug,
            realtime,
            trace,
            json,
        } => {
            let options = commands::replay::ReplayOptions {
                samples,
                page,
                config,
                no_config,
                debug,
                realtime,
                trace,
                json,
            };
            commands::replay::run(options, &app_config.engine).await
        }
        Commands::Validate { path } => commands::validate::run(path),
        Commands::Init {
            output,
            force,
            tuning,
        } => commands::init::run(output, force, tuning),
    }
}
