//! Tazdingo - A Matrix bot tracking shields, reinforcements and prey tiers.
//!
//! Players tell the bot when they raise a shield, reinforce a friend, or start
//! waiting for someone else's shield to drop. The bot warns them in the alerts
//! room when a shield is about to expire, when it has expired, and when a
//! tracked prey passes the 4, 8, 12 and 24 hour marks.
//!
//! # Configuration
//!
//! ```yaml
//! matrix:
//!   user_id: "@tazdingo:matrix.org"
//!   password: "your-password"
//!   commands_room: "!abc:matrix.org"
//!   alerts_room: "!def:matrix.org"
//!
//! bot:
//!   owners: ["@admin:matrix.org"]
//!   tick_interval: 60
//!   prey_tracking: true
//! ```
//!
//! Any value can be overridden with a `TAZDINGO_` environment variable:
//!
//! ```bash
//! export TAZDINGO_MATRIX__PASSWORD="your-password"
//! ```
//!
//! # Usage
//!
//! ```bash
//! tazdingo --config config.yaml --data ./tazdingo-data
//! ```
//!
//! # Bot Commands
//!
//! - `!taz help` - Display help information
//! - `!taz status` - Bot time and uptime
//! - `!taz hive` - Current shields and reinforcements
//! - `!taz shield <duration>` - Raise a shield, e.g. `!taz shield 1d 2h`
//! - `!taz unshield` - Drop your shield
//! - `!taz rein` / `!taz recall` - Start or stop reinforcing
//! - `!taz notify` - Mention everyone whose shield has expired
//! - `!taz prune` - Remove expired shields (owners only)
//! - `!taz track <name> [x,y] [tiers...]` - Wait for someone's shield to drop
//! - `!taz lose <name>` - Stop tracking
//! - `!taz tracks` - Upcoming tracked deadlines
//!
//! # Architecture
//!
//! - [`time`] - Duration parsing and human formatting
//! - [`registry`] - Records, in-memory registry and the JSON store
//! - [`expiry`] - Pure expiry transition planning
//! - [`tracker`] - Registry operations with persistence and the tick pass
//! - [`notifier`] - Notification batching and delivery
//! - [`commands`] - Command parsing and execution
//! - [`config`] - YAML configuration with environment overrides
//! - [`matrix`] - Matrix client integration and session management
//! - [`bot`] - Wiring of the tick task and the message handler
//!
//! # Environment Variables
//!
//! - `RUST_LOG` - Controls logging level (default: `info`)

use std::path::PathBuf;

use clap::Parser;
use env_logger::Env;
use log::{error, info};

use crate::{bot::Bot, config::Config};

mod bot;
mod commands;
mod config;
mod expiry;
mod matrix;
mod notifier;
mod registry;
mod time;
mod tracker;

/// Command-line arguments for the Tazdingo bot.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the YAML configuration file.
    #[arg(short, long)]
    config: String,

    /// Path to the directory for storing persistent data.
    ///
    /// This directory will contain:
    /// - `session/` - Matrix session data (authentication tokens, sqlite store)
    /// - `records.json` - Shields, reinforcements and tracked preys
    ///
    /// It holds the bot access token: restrict its permissions.
    #[arg(short, long)]
    data: PathBuf,
}

#[tokio::main]
async fn main() {
    // Put logger at info level by default
    let env = Env::default().filter_or("RUST_LOG", "info");
    env_logger::init_from_env(env);

    info!("Starting tazdingo {}...", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    let config = match Config::load(&args.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load config file: {:#}", e);
            return;
        }
    };

    let bot = match Bot::new(config, &args.data).await {
        Ok(b) => b,
        Err(e) => {
            error!("Failed to initialize bot: {:#}", e);
            return;
        }
    };

    if let Err(e) = bot.start().await {
        error!("Bot stopped: {:#}", e);
    }
}
