// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memebot - looks up memes, their templates, and what they mean.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;
mod shutdown;
mod status;
mod tasks;

use clap::{Parser, Subcommand};

/// Memebot - looks up memes, their templates, and what they mean.
#[derive(Parser, Debug)]
#[command(name = "memebot", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the bot, the workers, and the operator gateway.
    Serve,
    /// Show the health of a running instance.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
        /// Disable colors.
        #[arg(long)]
        plain: bool,
    },
    /// Load and validate the configuration, then exit.
    CheckConfig,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match memebot_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            memebot_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Status { json, plain }) => status::run_status(&config, json, plain).await,
        Some(Commands::CheckConfig) => {
            println!(
                "memebot: configuration is valid (bot.name={}, database={})",
                config.bot.name, config.storage.database_path
            );
            Ok(())
        }
        None => {
            println!("memebot: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
