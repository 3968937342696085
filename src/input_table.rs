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

//! The keyed store of `InputInfo` records, indexed by `Priority`. `LOWEST`
//! is always present; every other operation is a thin wrapper around a
//! `HashMap` that keeps that invariant.

use std::collections::HashMap;

use crate::model::{InputInfo, Led, Priority, LOWEST};

pub struct InputTable {
    records: HashMap<Priority, InputInfo>,
    led_count: usize,
}

impl InputTable {
    pub fn new(led_count: usize) -> Self {
        let mut records = HashMap::new();
        records.insert(LOWEST, InputInfo::background(led_count));
        Self { records, led_count }
    }

    pub fn contains(&self, priority: Priority) -> bool {
        self.records.contains_key(&priority)
    }

    pub fn get(&self, priority: Priority) -> Option<&InputInfo> {
        self.records.get(&priority)
    }

    /// Returns the record at `priority`, or the `LOWEST` record if absent.
    pub fn get_or_default(&self, priority: Priority) -> &InputInfo {
        self.records
            .get(&priority)
            .unwrap_or_else(|| self.records.get(&LOWEST).expect("LOWEST always present"))
    }

    pub fn insert_or_update(&mut self, info: InputInfo) {
        self.records.insert(info.priority, info);
    }

    /// Removes the record at `priority`. Refuses to remove `LOWEST`.
    pub fn remove(&mut self, priority: Priority) -> Option<InputInfo> {
        if priority == LOWEST {
            return None;
        }
        self.records.remove(&priority)
    }

    /// Wipes every record, including `LOWEST`, and re-inserts a fresh
    /// background record. Used only by `clear_all(force = true)`.
    pub fn reset(&mut self) {
        self.records.clear();
        self.records
            .insert(LOWEST, InputInfo::background(self.led_count));
    }

    /// Sorted ascending priority keys.
    pub fn keys(&self) -> Vec<Priority> {
        let mut keys: Vec<Priority> = self.records.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    pub fn values(&self) -> impl Iterator<Item = &InputInfo> {
        self.records.values()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut InputInfo> {
        self.records.values_mut()
    }

    /// Resizes every record's `led_colors` buffer to length `n`. Newly grown
    /// slots take the value of element 0, or black if the buffer was empty.
    pub fn resize_all_led_buffers(&mut self, n: usize) {
        self.led_count = n;
        for info in self.records.values_mut() {
            let fill = info.led_colors.first().copied().unwrap_or(Led::new(0, 0, 0));
            info.led_colors.resize(n, fill);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ComponentId;

    #[test]
    fn lowest_always_present_on_construction() {
        let table = InputTable::new(3);
        assert!(table.contains(LOWEST));
        assert_eq!(table.get(LOWEST).unwrap().led_colors.len(), 3);
    }

    #[test]
    fn remove_refuses_lowest() {
        let mut table = InputTable::new(3);
        assert!(table.remove(LOWEST).is_none());
        assert!(table.contains(LOWEST));
    }

    #[test]
    fn insert_and_remove_round_trip() {
        let mut table = InputTable::new(3);
        let info = InputInfo::new_registered(
            50,
            ComponentId::Color,
            "ui".to_string(),
            String::new(),
            0,
        );
        table.insert_or_update(info);
        assert!(table.contains(50));
        assert_eq!(table.keys(), vec![50, LOWEST]);
        table.remove(50);
        assert!(!table.contains(50));
        assert_eq!(table.keys(), vec![LOWEST]);
    }

    #[test]
    fn get_or_default_falls_back_to_lowest() {
        let table = InputTable::new(3);
        assert_eq!(table.get_or_default(42).priority, LOWEST);
    }

    #[test]
    fn reset_wipes_and_reinserts_lowest() {
        let mut table = InputTable::new(3);
        table.insert_or_update(InputInfo::new_registered(
            10,
            ComponentId::Grabber,
            "g".to_string(),
            String::new(),
            0,
        ));
        table.reset();
        assert_eq!(table.keys(), vec![LOWEST]);
    }

    #[test]
    fn resize_grows_from_first_element() {
        let mut table = InputTable::new(0);
        let mut info = InputInfo::new_registered(
            10,
            ComponentId::Color,
            "x".to_string(),
            String::new(),
            0,
        );
        info.led_colors = vec![Led::new(9, 9, 9)];
        table.insert_or_update(info);
        table.resize_all_led_buffers(3);
        assert_eq!(
            table.get(10).unwrap().led_colors,
            vec![Led::new(9, 9, 9); 3]
        );
        // an empty buffer grows to black
        assert_eq!(table.get(LOWEST).unwrap().led_colors.len(), 3);
    }
}
