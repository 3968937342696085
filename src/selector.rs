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

//! The pure function that decides which priority is currently visible. Kept
//! free of timers and events so it is independently testable.

use crate::input_table::InputTable;
use crate::model::{Priority, LOWEST};

/// The outcome of a selection: the winning priority, and whether the caller
/// must also flip `auto_select` back on (because the pinned manual priority
/// vanished).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub priority: Priority,
    pub auto_select_forced: bool,
}

/// Computes the visible priority per spec:
/// 1. priority 0, if present and active, always wins.
/// 2. otherwise the smallest active priority (auto mode, or manual pin gone).
/// 3. otherwise the pinned manual priority, if still active.
pub fn select(table: &InputTable, auto_select: bool, manual_priority: Priority) -> Selection {
    if let Some(zero) = table.get(0) {
        if zero.deadline.is_active() {
            return Selection {
                priority: 0,
                auto_select_forced: false,
            };
        }
    }

    let manual_present = table
        .get(manual_priority)
        .is_some_and(|info| info.deadline.is_active());

    if auto_select || !manual_present {
        let smallest_active = table
            .keys()
            .into_iter()
            .filter(|&p| table.get(p).is_some_and(|info| info.deadline.is_active()))
            .min()
            .unwrap_or(LOWEST);
        Selection {
            priority: smallest_active,
            auto_select_forced: !auto_select && !manual_present,
        }
    } else {
        Selection {
            priority: manual_priority,
            auto_select_forced: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ComponentId;

    fn active(table: &mut InputTable, priority: Priority) {
        let mut info = crate::model::InputInfo::new_registered(
            priority,
            ComponentId::Color,
            "t".to_string(),
            String::new(),
            0,
        );
        info.deadline = crate::model::Deadline::Persistent;
        table.insert_or_update(info);
    }

    #[test]
    fn only_lowest_present_selects_lowest() {
        let table = InputTable::new(3);
        let sel = select(&table, true, LOWEST);
        assert_eq!(sel.priority, LOWEST);
        assert!(!sel.auto_select_forced);
    }

    #[test]
    fn auto_select_picks_smallest_active() {
        let mut table = InputTable::new(3);
        active(&mut table, 50);
        active(&mut table, 100);
        let sel = select(&table, true, LOWEST);
        assert_eq!(sel.priority, 50);
    }

    #[test]
    fn priority_zero_always_wins() {
        let mut table = InputTable::new(3);
        active(&mut table, 50);
        active(&mut table, 100);
        active(&mut table, 0);
        let sel = select(&table, true, LOWEST);
        assert_eq!(sel.priority, 0);
    }

    #[test]
    fn manual_pin_wins_over_smaller_auto_candidate() {
        let mut table = InputTable::new(3);
        active(&mut table, 30);
        active(&mut table, 60);
        let sel = select(&table, false, 60);
        assert_eq!(sel.priority, 60);
        assert!(!sel.auto_select_forced);
    }

    #[test]
    fn manual_pin_missing_falls_back_and_forces_auto() {
        let mut table = InputTable::new(3);
        active(&mut table, 30);
        // manual priority 60 was never registered
        let sel = select(&table, false, 60);
        assert_eq!(sel.priority, 30);
        assert!(sel.auto_select_forced);
    }

    #[test]
    fn inactive_slot_is_ignored() {
        let mut table = InputTable::new(3);
        let info = crate::model::InputInfo::new_registered(
            20,
            ComponentId::Color,
            "x".to_string(),
            String::new(),
            0,
        );
        table.insert_or_update(info); // stays at Deadline::Inactive
        let sel = select(&table, true, LOWEST);
        assert_eq!(sel.priority, LOWEST);
    }
}
