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

//! The `MuxerCore` holds every piece of state the Priority Multiplexer is
//! responsible for and implements the Public API's mutation semantics. It
//! is deliberately synchronous and free of channels/timers so it can be
//! driven directly in tests; `api::actor::muxer` is the thin async wrapper
//! that exposes it to the rest of the system.

use std::time::Instant;

use log::{error, warn};

use crate::clock::Clock;
use crate::error::MuxerError;
use crate::events::{EventBus, MuxerEvent};
use crate::input_table::InputTable;
use crate::model::{ComponentId, Deadline, InputInfo, Led, OpaqueImage, Priority, LOWEST};
use crate::selector::select;
use crate::trigger::RateLimitedTrigger;

/// Priorities at or above this value never fire the Rate-Limited Trigger
/// (spec §4.3 step 3). Note this is the same numeric boundary as the
/// `clear_all` exclusion in §4.6, but the two conditions are independent;
/// see `clear_all`'s doc comment for the documented off-by-one there.
const TRIGGER_PRIORITY_CEILING: Priority = 254;

pub struct MuxerCore<C: Clock> {
    table: InputTable,
    clock: C,
    events: EventBus,
    trigger: RateLimitedTrigger,
    auto_select: bool,
    manual_priority: Priority,
    current_priority: Priority,
}

impl<C: Clock> MuxerCore<C> {
    pub fn new(led_count: usize, clock: C, events: EventBus) -> Self {
        Self {
            table: InputTable::new(led_count),
            clock,
            events,
            trigger: RateLimitedTrigger::new(),
            auto_select: true,
            manual_priority: LOWEST,
            current_priority: LOWEST,
        }
    }

    /// Overrides the default Rate-Limited Trigger durations, e.g. from
    /// config.
    pub fn with_trigger(mut self, trigger: RateLimitedTrigger) -> Self {
        self.trigger = trigger;
        self
    }

    // ---- Public API -----------------------------------------------------

    /// Inserts a new record if `priority` is absent (with `Deadline::Inactive`),
    /// else overwrites its metadata while preserving the existing deadline,
    /// colors and image.
    pub fn register(
        &mut self,
        priority: Priority,
        component_id: ComponentId,
        origin: String,
        owner: String,
        smooth_cfg: u32,
    ) {
        if let Some(existing) = self.table.get(priority) {
            let mut updated = existing.clone();
            updated.component_id = component_id;
            updated.origin = origin;
            updated.owner = owner;
            updated.smooth_cfg = smooth_cfg;
            self.table.insert_or_update(updated);
        } else {
            self.table.insert_or_update(InputInfo::new_registered(
                priority,
                component_id,
                origin,
                owner,
                smooth_cfg,
            ));
            self.events.emit(MuxerEvent::PriorityChanged {
                priority,
                present: true,
            });
            self.events.emit(MuxerEvent::PrioritiesChanged);
        }
    }

    pub fn set_color_input(
        &mut self,
        priority: Priority,
        colors: Vec<Led>,
        timeout_ms: i64,
    ) -> Result<(), MuxerError> {
        self.set_input(priority, timeout_ms, |info| info.led_colors = colors)
    }

    pub fn set_image_input(
        &mut self,
        priority: Priority,
        image: OpaqueImage,
        timeout_ms: i64,
    ) -> Result<(), MuxerError> {
        self.set_input(priority, timeout_ms, |info| info.image = Some(image))
    }

    pub fn set_inactive(&mut self, priority: Priority) -> Result<(), MuxerError> {
        self.set_image_input(priority, OpaqueImage::empty(), crate::model::SENTINEL_INACTIVE)
    }

    fn set_input(
        &mut self,
        priority: Priority,
        timeout_ms: i64,
        apply: impl FnOnce(&mut InputInfo),
    ) -> Result<(), MuxerError> {
        let Some(existing) = self.table.get(priority) else {
            error!("set_* called for unregistered priority {priority}");
            return Err(MuxerError::UnregisteredPriority { priority });
        };
        let mut info = existing.clone();
        let was_active = info.deadline.is_active();
        apply(&mut info);
        info.deadline = Deadline::from_timeout_param(timeout_ms, self.clock.now_ms());
        let now_active = info.deadline.is_active();
        self.table.insert_or_update(info);
        if was_active != now_active {
            self.events.emit(MuxerEvent::ActiveStateChanged {
                priority,
                active: now_active,
            });
            self.events.emit(MuxerEvent::PrioritiesChanged);
        }
        self.reselect();
        Ok(())
    }

    /// Valid only for a present `priority < LOWEST`.
    pub fn clear(&mut self, priority: Priority) -> Result<(), MuxerError> {
        if priority == LOWEST || self.table.remove(priority).is_none() {
            return Err(MuxerError::InvalidClearTarget { priority });
        }
        self.events.emit(MuxerEvent::PriorityChanged {
            priority,
            present: false,
        });
        self.events.emit(MuxerEvent::PrioritiesChanged);
        self.reselect();
        Ok(())
    }

    /// `force = true` wipes the table and re-inserts the background record.
    /// `force = false` clears only `Color`/`Effect` slots below
    /// `LOWEST - 1`; `Grabber`/stream sources survive. The `< 254` bound
    /// (excluding priority 254, one below `LOWEST`) is replicated verbatim
    /// from the original system; see DESIGN.md for why it is kept as-is.
    pub fn clear_all(&mut self, force: bool) {
        if force {
            self.table.reset();
            self.reselect();
            return;
        }
        for priority in self.table.keys() {
            let Some(info) = self.table.get(priority) else {
                continue;
            };
            let clearable = matches!(info.component_id, ComponentId::Color | ComponentId::Effect)
                && priority < LOWEST - 1;
            if clearable {
                let _ = self.clear(priority);
            }
        }
    }

    /// Pins `priority` and disables auto-select. Returns `false` if
    /// `priority` isn't registered.
    pub fn set_manual_priority(&mut self, priority: Priority) -> bool {
        if !self.table.contains(priority) {
            return false;
        }
        self.manual_priority = priority;
        if self.auto_select {
            self.auto_select = false;
            self.events.emit(MuxerEvent::AutoSelectChanged { enabled: false });
            self.events.emit(MuxerEvent::PrioritiesChanged);
        }
        self.reselect();
        true
    }

    /// Enabling/disabling auto-select is a no-op (returns `false`) if the
    /// mode is already in the requested state. Disabling requires the
    /// current manual pin to still be registered.
    pub fn set_auto_select(&mut self, enabled: bool, update: bool) -> Result<bool, MuxerError> {
        if enabled == self.auto_select {
            return Ok(false);
        }
        if !enabled && !self.table.contains(self.manual_priority) {
            warn!(
                "cannot disable auto-select: manual pin {} is not present",
                self.manual_priority
            );
            return Err(MuxerError::InvalidManualPin {
                priority: self.manual_priority,
            });
        }
        self.auto_select = enabled;
        self.events.emit(MuxerEvent::AutoSelectChanged { enabled });
        self.events.emit(MuxerEvent::PrioritiesChanged);
        if update {
            self.reselect();
        }
        Ok(true)
    }

    pub fn get_visible(&self) -> InputInfo {
        self.table.get_or_default(self.current_priority).clone()
    }

    pub fn get_priorities(&self) -> Vec<Priority> {
        self.table.keys()
    }

    pub fn get_input_info(&self, priority: Priority) -> Option<InputInfo> {
        self.table.get(priority).cloned()
    }

    pub fn update_led_count(&mut self, n: usize) {
        self.table.resize_all_led_buffers(n);
    }

    pub fn current_priority(&self) -> Priority {
        self.current_priority
    }

    pub fn auto_select(&self) -> bool {
        self.auto_select
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<MuxerEvent> {
        self.events.subscribe()
    }

    // ---- Tick Loop --------------------------------------------------------

    /// One full sweep: expire timed-out slots, fire the Rate-Limited
    /// Trigger for surviving timed Color/Effect slots, then re-evaluate the
    /// Selector. Returns the next instant the caller should wake up at to
    /// service a pending deferred trigger check, if any.
    pub fn tick(&mut self, trigger_now: Instant) -> Option<Instant> {
        self.sweep_expire();
        self.sweep_trigger(trigger_now);
        self.reselect();
        self.trigger.next_wakeup()
    }

    /// Called when a previously armed deferred-trigger wakeup elapses,
    /// outside of a regular tick. Returns the next wakeup, if any.
    pub fn trigger_deferred_elapsed(&mut self, now: Instant) -> Option<Instant> {
        if self.trigger.deferred_elapsed(now) {
            self.events.emit(MuxerEvent::PrioritiesChanged);
        }
        self.trigger.next_wakeup()
    }

    fn sweep_expire(&mut self) {
        let now = self.clock.now_ms();
        let expired: Vec<Priority> = self
            .table
            .keys()
            .into_iter()
            .filter(|&p| {
                self.table
                    .get(p)
                    .is_some_and(|info| info.deadline.has_expired(now))
            })
            .collect();
        for priority in expired {
            self.table.remove(priority);
            self.events.emit(MuxerEvent::PriorityChanged {
                priority,
                present: false,
            });
            self.events.emit(MuxerEvent::PrioritiesChanged);
        }
    }

    fn sweep_trigger(&mut self, now: Instant) {
        for priority in self.table.keys() {
            if priority >= TRIGGER_PRIORITY_CEILING {
                continue;
            }
            let fires = self.table.get(priority).is_some_and(|info| {
                matches!(info.deadline, Deadline::At(_))
                    && matches!(info.component_id, ComponentId::Color | ComponentId::Effect)
            });
            if fires && self.trigger.request(now) {
                self.events.emit(MuxerEvent::PrioritiesChanged);
            }
        }
    }

    fn reselect(&mut self) {
        let selection = select(&self.table, self.auto_select, self.manual_priority);
        if selection.auto_select_forced {
            self.auto_select = true;
            self.events.emit(MuxerEvent::AutoSelectChanged { enabled: true });
            self.events.emit(MuxerEvent::PrioritiesChanged);
        }
        if selection.priority != self.current_priority {
            self.current_priority = selection.priority;
            self.events.emit(MuxerEvent::VisiblePriorityChanged {
                priority: selection.priority,
            });
            self.events.emit(MuxerEvent::PrioritiesChanged);
        }
    }
}
