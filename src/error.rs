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

use crate::model::Priority;
use derive_more::{Display, Error};

/// Domain errors for the Public API. Nothing here is retried or fatal:
/// every call that can fail this way instead logs and returns `false`
/// (or an `Err` where callers find that more useful), with no state change
/// and no events emitted.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum MuxerError {
    #[display("priority {priority} was not registered")]
    UnregisteredPriority { priority: Priority },

    #[display("cannot disable auto-select: manual pin {priority} is not present")]
    InvalidManualPin { priority: Priority },

    #[display("cannot clear priority {priority}")]
    InvalidClearTarget { priority: Priority },
}
