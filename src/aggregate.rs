use std::collections::HashMap;

use serde::Serialize;

use crate::domain::DayRecordSet;

/// One activity key with its per-day series.
///
/// Straight out of aggregation both series hold raw counts. Scaling replaces
/// `day_values` with display magnitudes and leaves `display_values` raw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyGroup {
    pub key: String,
    pub index: usize,
    pub day_values: Vec<u64>,
    pub display_values: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMatrix {
    pub groups: Vec<KeyGroup>,
    pub max_value: u64,
}

impl KeyMatrix {
    pub fn key_count(&self) -> usize {
        self.groups.len()
    }
}

/// Joins day-aligned record sets into one uniform-length series per key.
///
/// Keys are numbered in first-seen order, walking days in order and records in
/// the order the archive returned them.
pub fn aggregate(days: &[DayRecordSet]) -> KeyMatrix {
    let day_count = days.len();
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<KeyGroup> = Vec::new();
    let mut max_value = 0u64;

    for (day_idx, day) in days.iter().enumerate() {
        for record in day.records() {
            let position = *positions.entry(record.key.as_str()).or_insert_with(|| {
                groups.push(KeyGroup {
                    key: record.key.clone(),
                    index: groups.len(),
                    day_values: vec![0; day_count],
                    display_values: Vec::new(),
                });
                groups.len() - 1
            });
            groups[position].day_values[day_idx] = record.count;
            max_value = max_value.max(record.count);
        }
    }

    for group in &mut groups {
        group.display_values = group.day_values.clone();
    }

    KeyMatrix {
        groups,
        max_value,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Days, NaiveDate};

    use super::*;
    use crate::domain::ActivityRecord;

    fn day(offset: u64, records: Vec<(&str, u64)>) -> DayRecordSet {
        let date = NaiveDate::from_ymd_opt(2021, 3, 1)
            .unwrap()
            .checked_add_days(Days::new(offset))
            .unwrap();
        DayRecordSet::new(
            date,
            records
                .into_iter()
                .map(|(key, count)| ActivityRecord::new(key, count))
                .collect(),
        )
    }

    #[test]
    fn keys_in_first_seen_order() {
        let days = vec![
            day(0, vec![("b", 1), ("a", 2)]),
            day(1, vec![("c", 3), ("a", 4)]),
        ];
        let matrix = aggregate(&days);
        let keys: Vec<_> = matrix.groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
        let indexes: Vec<_> = matrix.groups.iter().map(|g| g.index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
        assert_eq!(matrix.max_value, 4);
        assert_eq!(matrix.groups[1].day_values, vec![2, 4]);
        assert_eq!(matrix.groups[2].day_values, vec![0, 3]);
    }

    #[test]
    fn sparse_key_is_zero_padded() {
        let mut days: Vec<_> = (0..8).map(|offset| day(offset, Vec::new())).collect();
        days[4] = day(4, vec![("lonely", 7)]);
        let matrix = aggregate(&days);
        assert_eq!(matrix.groups.len(), 1);
        assert_eq!(matrix.groups[0].day_values, vec![0, 0, 0, 0, 7, 0, 0, 0]);
        assert_eq!(matrix.groups[0].display_values.len(), 8);
    }

    #[test]
    fn empty_window() {
        let days: Vec<_> = (0..3).map(|offset| day(offset, Vec::new())).collect();
        let matrix = aggregate(&days);
        assert!(matrix.groups.is_empty());
        assert_eq!(matrix.max_value, 0);
    }

    #[test]
    fn every_key_appears_once() {
        let days = vec![
            day(0, vec![("a", 1), ("b", 1)]),
            day(1, vec![("b", 2), ("c", 2)]),
            day(2, vec![("c", 3), ("a", 3), ("d", 0)]),
        ];
        let matrix = aggregate(&days);
        let mut keys: Vec<_> = matrix.groups.iter().map(|g| g.key.clone()).collect();
        keys.sort();
        assert_eq!(keys, vec!["a", "b", "c", "d"]);
        assert_eq!(matrix.groups[0].display_values, vec![1, 0, 3]);
        assert_eq!(matrix.groups[3].day_values, vec![0, 0, 0]);
    }
}
