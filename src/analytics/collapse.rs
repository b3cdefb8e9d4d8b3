//! Top-N collapsing of category distributions

use std::fmt::Display;

use crate::analytics::models::{CategoryCounter, ChartPoint};

/// Number of named slices shown per pie chart
pub const OTHER_CAP: usize = 10;

/// Keep the `cap` largest entries and fold the rest into one "Other" slice.
///
/// Entries are ordered by descending count; equal counts keep key order. The
/// total of the output always equals the total of the input.
pub fn collapse_top_n<K: Display>(counter: &CategoryCounter<K>, cap: usize) -> Vec<ChartPoint> {
    let mut entries: Vec<(&K, u64)> = counter.iter().map(|(key, count)| (key, *count)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1));

    let split = cap.min(entries.len());
    let (top, rest) = entries.split_at(split);

    let mut points: Vec<ChartPoint> = top
        .iter()
        .map(|(key, count)| ChartPoint::new(key.to_string(), *count))
        .collect();

    let other_count: u64 = rest.iter().map(|(_, count)| count).sum();
    if other_count > 0 {
        points.push(ChartPoint::new(other_label(rest.len(), other_count), other_count));
    }

    points
}

fn other_label(collapsed_keys: usize, other_count: u64) -> String {
    let noun = if collapsed_keys == 1 { "Other" } else { "Others" };
    format!("+{collapsed_keys} {noun} ({other_count})")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn countries(trailing: usize) -> CategoryCounter<String> {
        let mut counter = BTreeMap::from([
            ("US".to_string(), 50),
            ("CA".to_string(), 20),
            ("DE".to_string(), 15),
        ]);
        for i in 0..7 + trailing {
            counter.insert(format!("Z{i:02}"), 1);
        }
        counter
    }

    fn total(points: &[ChartPoint]) -> u64 {
        points.iter().map(|p| p.value).sum()
    }

    #[test]
    fn test_single_collapsed_key_is_singular() {
        let points = collapse_top_n(&countries(1), OTHER_CAP);

        assert_eq!(points.len(), 11);
        assert_eq!(points[0], ChartPoint::new("US", 50));
        assert_eq!(points[10], ChartPoint::new("+1 Other (1)", 1));
        assert_eq!(total(&points), 50 + 20 + 15 + 8);
    }

    #[test]
    fn test_multiple_collapsed_keys_pluralize() {
        let points = collapse_top_n(&countries(11), OTHER_CAP);

        assert_eq!(points.len(), 11);
        assert_eq!(points[10].label, "+11 Others (11)");
        assert_eq!(total(&points), 85 + 18);
    }

    #[test]
    fn test_no_other_entry_when_nothing_remains() {
        let counter = BTreeMap::from([("200".to_string(), 3), ("404".to_string(), 1)]);
        let points = collapse_top_n(&counter, OTHER_CAP);

        assert_eq!(
            points,
            vec![ChartPoint::new("200", 3), ChartPoint::new("404", 1)]
        );
    }

    #[test]
    fn test_ties_keep_key_order() {
        let counter = BTreeMap::from([
            ("b".to_string(), 2),
            ("a".to_string(), 2),
            ("c".to_string(), 5),
        ]);
        let labels: Vec<String> = collapse_top_n(&counter, OTHER_CAP)
            .into_iter()
            .map(|p| p.label)
            .collect();

        assert_eq!(labels, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_count_is_conserved_for_any_cap() {
        let counter = countries(5);
        let expected: u64 = counter.values().sum();

        for cap in 0..=counter.len() + 2 {
            let points = collapse_top_n(&counter, cap);
            assert_eq!(total(&points), expected, "cap {cap}");
            assert!(points.len() <= cap + 1);
        }
    }

    #[test]
    fn test_cap_zero_collapses_everything() {
        let counter = BTreeMap::from([(200u16, 4), (500u16, 1)]);
        let points = collapse_top_n(&counter, 0);

        assert_eq!(points, vec![ChartPoint::new("+2 Others (5)", 5)]);
    }
}
