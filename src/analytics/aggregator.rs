//! Per-service aggregation
//!
//! Turns one service's sparse timestamp -> analytic map into a dense,
//! oldest-first quantity series plus category counters for a single
//! timescale. Buckets are looked up by exact key; a bucket whose key is
//! missing (or written with a different precision or offset) reads as zero.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::analytics::models::{absorb, ChartPoint, ServiceProcessedData};
use crate::analytics::timescale::{boundary_key, Timescale};
use crate::models::RawAnalyticsMap;

pub fn aggregate(
    timescale: Timescale,
    raw: &RawAnalyticsMap,
    now: DateTime<Utc>,
) -> ServiceProcessedData {
    let window = timescale.window();
    let mut processed = ServiceProcessedData {
        quantity_series: Vec::with_capacity(window.bucket_count),
        ..Default::default()
    };
    let mut matched = 0usize;

    for steps_back in (0..window.bucket_count as u32).rev() {
        let boundary = window.boundary_at(now, steps_back);
        let label = window.format_label(boundary);

        let Some(analytic) = raw.get(&boundary_key(boundary)) else {
            processed.quantity_series.push(ChartPoint::new(label, 0));
            continue;
        };

        matched += 1;
        processed
            .quantity_series
            .push(ChartPoint::new(label, analytic.quantity));
        processed.total_requests += analytic.quantity;

        absorb(&mut processed.response_codes, &analytic.response_code);
        absorb(&mut processed.countries, &analytic.country);
        absorb(&mut processed.ips, &analytic.ip);
        absorb(&mut processed.resources, &analytic.resource);
    }

    if matched < raw.len() {
        report_unmatched(timescale, raw, matched);
    }

    processed
}

/// Log raw entries that did not land in any bucket
fn report_unmatched(timescale: Timescale, raw: &RawAnalyticsMap, matched: usize) {
    let mut malformed = 0usize;
    for key in raw.keys() {
        if DateTime::parse_from_rfc3339(key).is_err() {
            malformed += 1;
            warn!(%timescale, key = %key, "Skipping malformed analytics timestamp");
        }
    }

    let unaligned = raw.len() - matched - malformed;
    if unaligned > 0 {
        debug!(
            %timescale,
            unaligned,
            "Analytics entries outside the window or not aligned to a bucket boundary"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Analytic;
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 30).unwrap()
    }

    fn analytic(quantity: u64, country: &[(&str, u64)], code: u16) -> Analytic {
        Analytic {
            quantity,
            country: country
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            response_code: BTreeMap::from([(code, quantity)]),
            ..Default::default()
        }
    }

    #[test]
    fn test_single_bucket_lands_in_newest_slot() {
        let mut raw = RawAnalyticsMap::new();
        raw.insert(
            "2024-01-01T00:00:00Z".to_string(),
            analytic(5, &[("US", 5)], 200),
        );

        let processed = aggregate(Timescale::Hour, &raw, now());

        assert_eq!(processed.quantity_series.len(), 60);
        assert_eq!(processed.quantity_series[59], ChartPoint::new("00:00", 5));
        assert!(processed.quantity_series[..59].iter().all(|p| p.value == 0));
        assert_eq!(processed.total_requests, 5);
        assert_eq!(processed.countries["US"], 5);
        assert_eq!(processed.response_codes[&200], 5);
    }

    #[test]
    fn test_series_is_oldest_first() {
        let mut raw = RawAnalyticsMap::new();
        raw.insert("2023-12-31T23:01:00Z".to_string(), analytic(1, &[], 200));
        raw.insert("2023-12-31T23:30:00Z".to_string(), analytic(2, &[], 200));

        let processed = aggregate(Timescale::Hour, &raw, now());

        assert_eq!(processed.quantity_series[0], ChartPoint::new("23:01", 1));
        assert_eq!(processed.quantity_series[29], ChartPoint::new("23:30", 2));
        assert_eq!(processed.total_requests, 3);
    }

    #[test]
    fn test_series_sum_matches_in_window_quantities() {
        let mut raw = RawAnalyticsMap::new();
        raw.insert("2024-01-01T00:00:00Z".to_string(), analytic(4, &[("DE", 4)], 200));
        raw.insert("2023-12-31T12:00:00Z".to_string(), analytic(7, &[("FR", 7)], 500));
        // Older than the 24 hour window
        raw.insert("2023-12-30T23:00:00Z".to_string(), analytic(100, &[("US", 100)], 200));

        let processed = aggregate(Timescale::Day, &raw, now());
        let series_sum: u64 = processed.quantity_series.iter().map(|p| p.value).sum();

        assert_eq!(series_sum, 11);
        assert_eq!(processed.total_requests, 11);
        assert!(!processed.countries.contains_key("US"));
    }

    #[test]
    fn test_mismatched_precision_is_not_matched() {
        let mut raw = RawAnalyticsMap::new();
        raw.insert(
            "2024-01-01T00:00:00.000Z".to_string(),
            analytic(5, &[("US", 5)], 200),
        );
        raw.insert(
            "2024-01-01T00:00:00+00:00".to_string(),
            analytic(3, &[("US", 3)], 200),
        );

        let processed = aggregate(Timescale::Hour, &raw, now());

        assert_eq!(processed.total_requests, 0);
        assert!(processed.quantity_series.iter().all(|p| p.value == 0));
        assert!(processed.countries.is_empty());
    }

    #[test]
    fn test_malformed_keys_are_skipped() {
        let mut raw = RawAnalyticsMap::new();
        raw.insert("not-a-timestamp".to_string(), analytic(9, &[], 200));
        raw.insert("2024-01-01T00:00:00Z".to_string(), analytic(2, &[], 200));

        let processed = aggregate(Timescale::Hour, &raw, now());

        assert_eq!(processed.total_requests, 2);
    }

    #[test]
    fn test_empty_input_yields_zero_series() {
        for timescale in Timescale::ALL {
            let processed = aggregate(timescale, &RawAnalyticsMap::new(), now());
            assert_eq!(processed.quantity_series.len(), timescale.window().bucket_count);
            assert_eq!(processed.total_requests, 0);
        }
    }

    #[test]
    fn test_aggregation_is_deterministic() {
        let mut raw = RawAnalyticsMap::new();
        raw.insert("2024-01-01T00:00:00Z".to_string(), analytic(5, &[("US", 5)], 200));

        assert_eq!(
            aggregate(Timescale::Hour, &raw, now()),
            aggregate(Timescale::Hour, &raw, now())
        );
    }
}
