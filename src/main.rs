/*
 * CoolerControl - monitor and control your cooling and other devices
 * Copyright (c) 2021-2024  Guy Boldon, Eren Simsek and contributors
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

mod api;
mod clock;
mod config;
mod error;
mod events;
mod input_table;
mod logger;
mod model;
mod muxer;
mod selector;
mod trigger;

use anyhow::Result;
use clap::Parser;
use log::info;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

use crate::api::actor::MuxerHandle;
use crate::clock::SystemClock;
use crate::config::Config;
use crate::events::EventBus;
use crate::muxer::MuxerCore;
use crate::trigger::RateLimitedTrigger;

const VERSION: Option<&str> = option_env!("CARGO_PKG_VERSION");

/// A priority multiplexer for ambient lighting input sources
#[derive(Parser, Debug)]
#[clap(author, about, long_about = None)]
pub struct Args {
    /// Enable debug output
    #[clap(long)]
    debug: bool,

    /// Print version info and exit
    #[clap(long, short)]
    version: bool,

    /// Check config file validity and exit
    #[clap(long)]
    config: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cmd_args = Args::parse();
    if cmd_args.version {
        println!("ambientd {}", VERSION.unwrap_or("unknown"));
        return Ok(());
    }
    logger::setup_logging(&cmd_args)?;
    info!("Initializing...");

    let config = Config::load_config_file().await?;
    let settings = config.settings()?;
    if cmd_args.config {
        info!("Configuration file is valid: {}", config.path().display());
        return Ok(());
    }

    let run_token = CancellationToken::new();
    let core = MuxerCore::new(settings.led_count, SystemClock::new(), EventBus::new())
        .with_trigger(RateLimitedTrigger::with_durations(
            settings.trigger_block,
            settings.trigger_defer,
        ));

    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            moro_local::async_scope!(|scope| -> Result<()> {
                let _muxer = MuxerHandle::new(
                    core,
                    settings.tick_interval,
                    run_token.clone(),
                    scope,
                );
                wait_for_shutdown_signal().await?;
                info!("Shutdown signal received, shutting down...");
                run_token.cancel();
                Ok(())
            })
            .await
        })
        .await
}

/// Waits for `SIGINT`, `SIGTERM` or `SIGQUIT`, whichever comes first.
async fn wait_for_shutdown_signal() -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;
    tokio::select! {
        _ = sigint.recv() => info!("SIGINT received"),
        _ = sigterm.recv() => info!("SIGTERM received"),
        _ = sigquit.recv() => info!("SIGQUIT received"),
    }
    Ok(())
}
