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

//! Core data types for the Priority Multiplexer: the slot index, the kind of
//! source that can occupy a slot, the per-slot record, and the internal
//! (non-sentinel-encoded) representation of a slot's expiry.

use rgb::RGB8;
use strum::{Display, EnumString};

/// A priority slot. Lower numerically wins. `LOWEST` is the always-present
/// background slot.
pub type Priority = u8;

/// The background slot, reserved for the solid color fallback frame.
pub const LOWEST: Priority = 255;

/// One LED's color. Re-exported so callers don't need a direct `rgb` dependency.
pub type Led = RGB8;

/// An opaque raster payload. The muxer never decodes or interprets pixel
/// data, only stores it and reports its dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpaqueImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl OpaqueImage {
    pub fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            data: Vec::new(),
        }
    }
}

/// The kind of source occupying a priority slot. `Color` and `Effect` get
/// special treatment in the Rate-Limited Trigger (see `trigger.rs`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum ComponentId {
    Color,
    Effect,
    Image,
    Grabber,
    BoblightServer,
    FlatBuffer,
    ProtoBuffer,
    V4L,
}

/// Internal, sum-typed representation of a slot's expiry. The sentinel
/// encoding (`-100`, `-1`, positive ms) is a boundary concern only; see
/// `Deadline::{from_millis, to_millis}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deadline {
    /// Registered but no data has been pushed yet.
    Inactive,
    /// Active, never expires on its own.
    Persistent,
    /// Active until this absolute monotonic millisecond timestamp.
    At(i64),
}

pub const SENTINEL_INACTIVE: i64 = -100;
pub const SENTINEL_PERSISTENT: i64 = -1;

impl Deadline {
    /// Converts a boundary `timeout_ms` parameter (relative milliseconds, or
    /// one of the two sentinels) into the internal representation, given the
    /// current monotonic time. Zero is treated as immediate expiration.
    pub fn from_timeout_param(timeout_ms: i64, now_ms: i64) -> Self {
        match timeout_ms {
            SENTINEL_PERSISTENT => Deadline::Persistent,
            SENTINEL_INACTIVE => Deadline::Inactive,
            ms if ms > 0 => Deadline::At(now_ms + ms),
            _ => Deadline::At(now_ms), // 0 or other negatives: expire immediately
        }
    }

    /// Converts an already-absolute sentinel-encoded `timeout_time_ms` field
    /// (as stored on the wire/in `InputInfo`) back into the internal type.
    pub fn from_absolute(timeout_time_ms: i64) -> Self {
        match timeout_time_ms {
            SENTINEL_PERSISTENT => Deadline::Persistent,
            SENTINEL_INACTIVE => Deadline::Inactive,
            ms => Deadline::At(ms),
        }
    }

    /// Converts back to the sentinel-encoded `timeout_time_ms` boundary field.
    pub fn to_timeout_time_ms(self) -> i64 {
        match self {
            Deadline::Inactive => SENTINEL_INACTIVE,
            Deadline::Persistent => SENTINEL_PERSISTENT,
            Deadline::At(ms) => ms,
        }
    }

    /// True when the slot should participate in selection, i.e. not
    /// `Inactive` (spec: `timeout_time_ms > -100`).
    pub fn is_active(self) -> bool {
        !matches!(self, Deadline::Inactive)
    }

    /// True when this is a positive absolute deadline that has elapsed.
    pub fn has_expired(self, now_ms: i64) -> bool {
        matches!(self, Deadline::At(ms) if ms <= now_ms)
    }
}

/// A single registered priority slot.
#[derive(Debug, Clone, PartialEq)]
pub struct InputInfo {
    pub priority: Priority,
    pub component_id: ComponentId,
    pub origin: String,
    pub owner: String,
    /// Opaque handle into the downstream smoothing engine; stored and
    /// returned, never interpreted.
    pub smooth_cfg: u32,
    pub deadline: Deadline,
    pub led_colors: Vec<Led>,
    pub image: Option<OpaqueImage>,
}

impl InputInfo {
    pub fn new_registered(
        priority: Priority,
        component_id: ComponentId,
        origin: String,
        owner: String,
        smooth_cfg: u32,
    ) -> Self {
        Self {
            priority,
            component_id,
            origin,
            owner,
            smooth_cfg,
            deadline: Deadline::Inactive,
            led_colors: Vec::new(),
            image: None,
        }
    }

    /// The `LOWEST` background record: a persistent, solid-black frame sized
    /// to `led_count`.
    pub fn background(led_count: usize) -> Self {
        Self {
            priority: LOWEST,
            component_id: ComponentId::Color,
            origin: "System".to_string(),
            owner: String::new(),
            smooth_cfg: 0,
            deadline: Deadline::Persistent,
            led_colors: vec![Led::new(0, 0, 0); led_count],
            image: None,
        }
    }

    /// `timeout_time_ms` as it appears on the public-API boundary.
    pub fn timeout_time_ms(&self) -> i64 {
        self.deadline.to_timeout_time_ms()
    }
}
