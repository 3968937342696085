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

//! The typed change notifications the muxer emits. Three external
//! collaborators are expected to subscribe, per the system design:
//!
//! - the LED output pipeline, which listens for `VisiblePriorityChanged`
//!   and `PrioritiesChanged`, then reads the current frame via `get_visible`;
//! - a status subsystem, which enumerates `get_priorities`/`get_input_info`
//!   for a UI whenever `PrioritiesChanged` fires;
//! - the effect-engine's cleanup logic, which listens for
//!   `PriorityChanged { present: false, .. }` to stop scripts whose slot
//!   vanished.

use crate::model::Priority;
use tokio::sync::broadcast;

pub const EVENT_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuxerEvent {
    /// Emitted on register (`present = true`) and on removal/expiry
    /// (`present = false`).
    PriorityChanged { priority: Priority, present: bool },
    /// Emitted on the `Inactive <-> non-Inactive` transition for a slot.
    ActiveStateChanged { priority: Priority, active: bool },
    /// Emitted when the Selector's output differs from its last published
    /// value.
    VisiblePriorityChanged { priority: Priority },
    /// Emitted when the auto-select mode flag flips.
    AutoSelectChanged { enabled: bool },
    /// Union notification fired after any of the above, and on each
    /// Rate-Limited Trigger emission.
    PrioritiesChanged,
}

/// Thin wrapper around a `broadcast` channel so callers don't need to know
/// the channel type or capacity. A clone of the sender is cheap and is held
/// by the muxer actor; `subscribe()` is the only thing external consumers
/// need.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<MuxerEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MuxerEvent> {
        self.sender.subscribe()
    }

    /// Emits `event`, silently dropping it if there are no subscribers.
    pub fn emit(&self, event: MuxerEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_emitted_event() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        bus.emit(MuxerEvent::PrioritiesChanged);
        let received = rx.recv().await.unwrap();
        assert_eq!(received, MuxerEvent::PrioritiesChanged);
    }

    #[test]
    fn emit_without_subscribers_does_not_panic() {
        let bus = EventBus::new();
        bus.emit(MuxerEvent::AutoSelectChanged { enabled: true });
    }
}
