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

//! Single-threaded actor scaffolding. The muxer's state (the Input Table,
//! the selection mode, the Rate-Limited Trigger) lives behind one actor on
//! one task; every producer and consumer talks to it only through a
//! `Handle`'s channel. This is what gives us the ordering guarantees in the
//! concurrency model: messages are serviced one at a time, in the order
//! they were sent, with no locking required.

mod muxer;
pub use self::muxer::*;
