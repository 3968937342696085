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

//! Daemon configuration: `led_count`, the Tick Loop interval, and the
//! Rate-Limited Trigger's two durations. Loaded from a TOML document with
//! `toml_edit` rather than deserialized with serde, so a config file with
//! unrelated keys or comments round-trips untouched if ever rewritten.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use const_format::concatcp;
use log::{error, info, warn};
use toml_edit::DocumentMut;

pub const DEFAULT_CONFIG_DIR: &str = "/etc/ambientd";
const DEFAULT_CONFIG_FILE_PATH: &str = concatcp!(DEFAULT_CONFIG_DIR, "/config.toml");
const DEFAULT_CONFIG_FILE_CONTENTS: &str = "\
# ambientd configuration\n\
led_count = 0\n\
tick_interval_ms = 250\n\
trigger_block_ms = 1000\n\
trigger_defer_ms = 500\n\
";

const DEFAULT_TICK_INTERVAL_MS: u64 = 250;
const DEFAULT_TRIGGER_BLOCK_MS: u64 = 1000;
const DEFAULT_TRIGGER_DEFER_MS: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MuxerSettings {
    pub led_count: usize,
    pub tick_interval: Duration,
    pub trigger_block: Duration,
    pub trigger_defer: Duration,
}

impl Default for MuxerSettings {
    fn default() -> Self {
        Self {
            led_count: 0,
            tick_interval: Duration::from_millis(DEFAULT_TICK_INTERVAL_MS),
            trigger_block: Duration::from_millis(DEFAULT_TRIGGER_BLOCK_MS),
            trigger_defer: Duration::from_millis(DEFAULT_TRIGGER_DEFER_MS),
        }
    }
}

pub struct Config {
    path: PathBuf,
    document: DocumentMut,
}

impl Config {
    /// Loads the configuration file, creating a default one if it's
    /// missing, and validates it's parseable as settings.
    pub async fn load_config_file() -> Result<Self> {
        let config_dir = Path::new(DEFAULT_CONFIG_DIR);
        if !config_dir.exists() {
            info!(
                "config directory doesn't exist, attempting to create it: {}",
                DEFAULT_CONFIG_DIR
            );
            tokio::fs::create_dir_all(config_dir)
                .await
                .with_context(|| format!("Creating config directory: {DEFAULT_CONFIG_DIR}"))?;
        }
        let path = Path::new(DEFAULT_CONFIG_FILE_PATH).to_path_buf();
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) if !contents.trim().is_empty() => contents,
            Ok(_) => {
                error!("Config file is empty. Writing a new default config file.");
                Self::write_default_config_file(&path).await?
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!("Config file not found. Writing a new default config file.");
                Self::write_default_config_file(&path).await?
            }
            Err(err) => {
                warn!("Error reading configuration file, using defaults: {err}");
                DEFAULT_CONFIG_FILE_CONTENTS.to_string()
            }
        };
        let document = contents
            .parse::<DocumentMut>()
            .with_context(|| "Parsing configuration file")?;
        let config = Self { path, document };
        // test parsing now so a bad config fails fast, at startup
        let _ = config.settings()?;
        Ok(config)
    }

    async fn write_default_config_file(path: &Path) -> Result<String> {
        tokio::fs::write(path, DEFAULT_CONFIG_FILE_CONTENTS)
            .await
            .with_context(|| format!("Writing default config file: {}", path.display()))?;
        Ok(DEFAULT_CONFIG_FILE_CONTENTS.to_string())
    }

    pub fn settings(&self) -> Result<MuxerSettings> {
        let defaults = MuxerSettings::default();
        let led_count = self
            .document
            .get("led_count")
            .and_then(|item| item.as_integer())
            .map(|n| n.max(0) as usize)
            .unwrap_or(defaults.led_count);
        let tick_interval_ms = self
            .document
            .get("tick_interval_ms")
            .and_then(|item| item.as_integer())
            .filter(|ms| *ms > 0)
            .map(|ms| ms as u64)
            .unwrap_or(DEFAULT_TICK_INTERVAL_MS);
        let trigger_block_ms = self
            .document
            .get("trigger_block_ms")
            .and_then(|item| item.as_integer())
            .filter(|ms| *ms > 0)
            .map(|ms| ms as u64)
            .unwrap_or(DEFAULT_TRIGGER_BLOCK_MS);
        let trigger_defer_ms = self
            .document
            .get("trigger_defer_ms")
            .and_then(|item| item.as_integer())
            .filter(|ms| *ms > 0)
            .map(|ms| ms as u64)
            .unwrap_or(DEFAULT_TRIGGER_DEFER_MS);
        Ok(MuxerSettings {
            led_count,
            tick_interval: Duration::from_millis(tick_interval_ms),
            trigger_block: Duration::from_millis(trigger_block_ms),
            trigger_defer: Duration::from_millis(trigger_defer_ms),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse_from_shipped_template() {
        let document = DEFAULT_CONFIG_FILE_CONTENTS.parse::<DocumentMut>().unwrap();
        let config = Config {
            path: PathBuf::from("/tmp/unused"),
            document,
        };
        let settings = config.settings().unwrap();
        assert_eq!(settings.led_count, 0);
        assert_eq!(settings.tick_interval, Duration::from_millis(250));
        assert_eq!(settings.trigger_block, Duration::from_millis(1000));
        assert_eq!(settings.trigger_defer, Duration::from_millis(500));
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let document = "led_count = 30\n".parse::<DocumentMut>().unwrap();
        let config = Config {
            path: PathBuf::from("/tmp/unused"),
            document,
        };
        let settings = config.settings().unwrap();
        assert_eq!(settings.led_count, 30);
        assert_eq!(settings.tick_interval, Duration::from_millis(250));
    }

    #[test]
    fn non_positive_durations_fall_back_to_defaults() {
        let document = "tick_interval_ms = 0\ntrigger_block_ms = -5\n"
            .parse::<DocumentMut>()
            .unwrap();
        let config = Config {
            path: PathBuf::from("/tmp/unused"),
            document,
        };
        let settings = config.settings().unwrap();
        assert_eq!(settings.tick_interval, Duration::from_millis(250));
        assert_eq!(settings.trigger_block, Duration::from_millis(1000));
    }
}
