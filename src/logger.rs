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

//! Logging setup: journal-aware when running under systemd, plain
//! `env_logger` formatting to stderr otherwise. Level is controlled by
//! `--debug`, then the `AMBIENTD_LOG` environment variable, defaulting to
//! `Info`.

use std::str::FromStr;

use anyhow::Result;
use env_logger::Logger;
use log::{info, LevelFilter, Log, Metadata, Record};
use systemd_journal_logger::{connected_to_journal, JournalLog};

use crate::Args;

const LOG_ENV: &str = "AMBIENTD_LOG";

pub fn setup_logging(cmd_args: &Args) -> Result<()> {
    let log_level = if cmd_args.debug {
        LevelFilter::Debug
    } else if let Ok(log_lvl) = std::env::var(LOG_ENV) {
        LevelFilter::from_str(&log_lvl).unwrap_or(LevelFilter::Info)
    } else {
        LevelFilter::Info
    };
    AmbientLogger::new(log_level)?.init()?;
    info!("Logging Level: {}", log::max_level());
    Ok(())
}

/// Picks the journal logger when connected to systemd, falling back to
/// `env_logger`'s stderr formatter otherwise. Both are still filtered
/// through one `env_logger::Logger` so `AMBIENTD_LOG` module-level filter
/// syntax (e.g. `tokio=warn`) works regardless of the sink.
struct AmbientLogger {
    max_level: LevelFilter,
    filter: Logger,
    sink: Box<dyn Log>,
}

impl AmbientLogger {
    fn new(max_level: LevelFilter) -> Result<Self> {
        let timestamp_precision = if max_level >= LevelFilter::Debug {
            env_logger::fmt::TimestampPrecision::Millis
        } else {
            env_logger::fmt::TimestampPrecision::Seconds
        };
        let filter = env_logger::Builder::from_env(LOG_ENV)
            .filter_level(max_level)
            .filter_module("tokio", LevelFilter::Warn)
            .filter_module("moro_local", LevelFilter::Warn)
            .build();
        let sink: Box<dyn Log> = if connected_to_journal() {
            Box::new(JournalLog::new()?)
        } else {
            Box::new(
                env_logger::Builder::new()
                    .filter_level(max_level)
                    .format_timestamp(Some(timestamp_precision))
                    .build(),
            )
        };
        Ok(Self {
            max_level,
            filter,
            sink,
        })
    }

    fn init(self) -> Result<(), log::SetLoggerError> {
        log::set_max_level(self.max_level);
        log::set_boxed_logger(Box::new(self))
    }
}

impl Log for AmbientLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.filter.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if self.filter.matches(record) {
            self.sink.log(record);
        }
    }

    fn flush(&self) {}
}
