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

//! The Rate-Limited Trigger: coalesces bursts of "a timed Color/Effect slot
//! is still counting down" requests into a steady pulse of at most 1Hz.
//!
//! Modeled as the `Idle | Blocked | BlockedPending` state machine from the
//! design notes, but implemented with two lazily-checked deadlines rather
//! than a dedicated callback for the block timer elapsing: a slot only
//! matters at the moment a new request arrives or the deferred timer fires,
//! so there's nothing to do in between.

use std::time::{Duration, Instant};

pub const BLOCK_DURATION: Duration = Duration::from_millis(1000);
pub const DEFER_DURATION: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerState {
    Idle,
    Blocked,
    BlockedPending,
}

pub struct RateLimitedTrigger {
    block_until: Option<Instant>,
    deferred_until: Option<Instant>,
    block_duration: Duration,
    defer_duration: Duration,
}

impl RateLimitedTrigger {
    pub fn new() -> Self {
        Self::with_durations(BLOCK_DURATION, DEFER_DURATION)
    }

    pub fn with_durations(block_duration: Duration, defer_duration: Duration) -> Self {
        Self {
            block_until: None,
            deferred_until: None,
            block_duration,
            defer_duration,
        }
    }

    pub fn state(&self, now: Instant) -> TriggerState {
        if self.is_blocked(now) {
            if self.deferred_until.is_some() {
                TriggerState::BlockedPending
            } else {
                TriggerState::Blocked
            }
        } else {
            TriggerState::Idle
        }
    }

    fn is_blocked(&self, now: Instant) -> bool {
        self.block_until.is_some_and(|until| now < until)
    }

    /// The next instant the caller should wake up at, if any, to service a
    /// pending deferred check.
    pub fn next_wakeup(&self) -> Option<Instant> {
        self.deferred_until
    }

    /// A fire request arrived (a surviving Color/Effect slot with a
    /// deadline was swept this tick). Returns `true` if `time_runner`
    /// should be emitted immediately.
    pub fn request(&mut self, now: Instant) -> bool {
        if self.is_blocked(now) {
            self.deferred_until = Some(now + self.defer_duration);
            false
        } else {
            self.block_until = Some(now + self.block_duration);
            self.deferred_until = None;
            true
        }
    }

    /// The deferred timer elapsed. Returns `true` if `time_runner` should be
    /// emitted now (the block window had already ended); otherwise the
    /// deferred check is rearmed and the caller should wait for
    /// `next_wakeup()` again.
    pub fn deferred_elapsed(&mut self, now: Instant) -> bool {
        if self.deferred_until.is_none() {
            return false; // stale wakeup, already coalesced away
        }
        if self.is_blocked(now) {
            self.deferred_until = Some(now + self.defer_duration);
            false
        } else {
            self.block_until = Some(now + self.block_duration);
            self.deferred_until = None;
            true
        }
    }
}

impl Default for RateLimitedTrigger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn durations() -> (Duration, Duration) {
        (Duration::from_millis(1000), Duration::from_millis(500))
    }

    #[test]
    fn first_request_emits_immediately_and_blocks() {
        let (block, defer) = durations();
        let mut trigger = RateLimitedTrigger::with_durations(block, defer);
        let t0 = Instant::now();
        assert!(trigger.request(t0));
        assert_eq!(trigger.state(t0), TriggerState::Blocked);
    }

    #[test]
    fn burst_during_block_window_coalesces_into_one_deferred() {
        let (block, defer) = durations();
        let mut trigger = RateLimitedTrigger::with_durations(block, defer);
        let t0 = Instant::now();
        assert!(trigger.request(t0));
        assert!(!trigger.request(t0 + Duration::from_millis(50)));
        assert!(!trigger.request(t0 + Duration::from_millis(200)));
        assert_eq!(
            trigger.next_wakeup(),
            Some(t0 + Duration::from_millis(200) + defer)
        );
        assert_eq!(trigger.state(t0 + Duration::from_millis(200)), TriggerState::BlockedPending);
    }

    #[test]
    fn deferred_elapsing_while_still_blocked_reschedules() {
        let (block, defer) = durations();
        let mut trigger = RateLimitedTrigger::with_durations(block, defer);
        let t0 = Instant::now();
        trigger.request(t0);
        trigger.request(t0 + Duration::from_millis(100)); // arms deferred for t0+600
        let check_at = t0 + Duration::from_millis(600);
        // block window (t0..t0+1000) still open at t0+600
        assert!(!trigger.deferred_elapsed(check_at));
        assert_eq!(trigger.next_wakeup(), Some(check_at + defer));
    }

    #[test]
    fn deferred_elapsing_after_block_ends_emits() {
        let (block, defer) = durations();
        let mut trigger = RateLimitedTrigger::with_durations(block, defer);
        let t0 = Instant::now();
        trigger.request(t0);
        trigger.request(t0 + Duration::from_millis(900)); // defer fires at t0+1400
        let check_at = t0 + Duration::from_millis(1400);
        assert!(trigger.deferred_elapsed(check_at));
        assert_eq!(trigger.state(check_at), TriggerState::Blocked);
    }

    #[test]
    fn at_most_two_emissions_across_a_continuous_burst() {
        let (block, defer) = durations();
        let mut trigger = RateLimitedTrigger::with_durations(block, defer);
        let t0 = Instant::now();
        let mut emissions = 0;
        if trigger.request(t0) {
            emissions += 1;
        }
        // continuous requests every 50ms for 1 second
        let mut t = t0;
        loop {
            t += Duration::from_millis(50);
            if t > t0 + Duration::from_millis(1000) {
                break;
            }
            if trigger.request(t) {
                emissions += 1;
            }
            while let Some(wakeup) = trigger.next_wakeup() {
                if wakeup > t {
                    break;
                }
                if trigger.deferred_elapsed(wakeup) {
                    emissions += 1;
                }
            }
        }
        assert!(emissions <= 2, "expected at most 2 emissions, got {emissions}");
    }

    #[test]
    fn idle_after_block_window_with_no_further_requests() {
        let (block, defer) = durations();
        let mut trigger = RateLimitedTrigger::with_durations(block, defer);
        let t0 = Instant::now();
        trigger.request(t0);
        assert_eq!(
            trigger.state(t0 + Duration::from_millis(1001)),
            TriggerState::Idle
        );
    }
}
