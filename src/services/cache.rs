//! Per-service cache of processed analytics
//!
//! A cache holds one `ServiceProcessedData` per timescale. It is built from
//! raw analytics and never mutated; new raw data produces a new cache that
//! shares the untouched timescales with the old one.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::analytics::aggregator::aggregate;
use crate::analytics::models::ServiceProcessedData;
use crate::analytics::timescale::{PerTimescale, Timescale};
use crate::models::RawAnalyticsMap;

#[derive(Debug, Clone)]
pub struct ServiceDataCache {
    processed: PerTimescale<Arc<ServiceProcessedData>>,
    /// Newest bucket boundary each timescale was computed against
    anchors: PerTimescale<DateTime<Utc>>,
}

impl ServiceDataCache {
    /// Aggregate every timescale from scratch
    pub fn build(raw: &PerTimescale<Arc<RawAnalyticsMap>>, now: DateTime<Utc>) -> Self {
        Self {
            processed: raw.map(|timescale, data| Arc::new(aggregate(timescale, data, now))),
            anchors: PerTimescale::from_fn(|timescale| anchor(timescale, now)),
        }
    }

    /// New cache with one timescale recomputed and the others shared
    pub fn with_timescale(
        &self,
        timescale: Timescale,
        raw: &RawAnalyticsMap,
        now: DateTime<Utc>,
    ) -> Self {
        let mut next = self.clone();
        *next.processed.get_mut(timescale) = Arc::new(aggregate(timescale, raw, now));
        *next.anchors.get_mut(timescale) = anchor(timescale, now);
        next
    }

    pub fn processed(&self, timescale: Timescale) -> &ServiceProcessedData {
        self.processed.get(timescale)
    }

    /// Whether `now` still falls in the newest bucket this timescale was built for
    pub fn is_current(&self, timescale: Timescale, now: DateTime<Utc>) -> bool {
        *self.anchors.get(timescale) == anchor(timescale, now)
    }

    pub fn total_requests(&self) -> PerTimescale<u64> {
        self.processed.map(|_, data| data.total_requests)
    }
}

fn anchor(timescale: Timescale, now: DateTime<Utc>) -> DateTime<Utc> {
    timescale.window().boundary_at(now, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Analytic;
    use chrono::{TimeDelta, TimeZone};

    fn raw_with(key: &str, quantity: u64) -> RawAnalyticsMap {
        RawAnalyticsMap::from([(
            key.to_string(),
            Analytic {
                quantity,
                ..Default::default()
            },
        )])
    }

    #[test]
    fn test_build_precomputes_every_timescale() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 30).unwrap();
        let raw = PerTimescale {
            hour: Arc::new(raw_with("2024-01-01T00:00:00Z", 5)),
            day: Arc::new(raw_with("2024-01-01T00:00:00Z", 7)),
            month: Arc::new(raw_with("2024-01-01T00:00:00Z", 9)),
            year: Arc::new(raw_with("2024-01-01T00:00:00Z", 11)),
        };

        let cache = ServiceDataCache::build(&raw, now);

        assert_eq!(
            cache.total_requests(),
            PerTimescale {
                hour: 5,
                day: 7,
                month: 9,
                year: 11
            }
        );
    }

    #[test]
    fn test_with_timescale_replaces_only_that_timescale() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 30).unwrap();
        let raw = PerTimescale::from_fn(|_| Arc::new(raw_with("2024-01-01T00:00:00Z", 1)));
        let original = ServiceDataCache::build(&raw, now);

        let updated =
            original.with_timescale(Timescale::Hour, &raw_with("2024-01-01T00:00:00Z", 4), now);

        assert_eq!(original.processed(Timescale::Hour).total_requests, 1);
        assert_eq!(updated.processed(Timescale::Hour).total_requests, 4);
        assert_eq!(updated.processed(Timescale::Day).total_requests, 1);
    }

    #[test]
    fn test_is_current_tracks_bucket_rollover() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 30).unwrap();
        let cache = ServiceDataCache::build(&PerTimescale::default(), now);

        assert!(cache.is_current(Timescale::Hour, now + TimeDelta::seconds(20)));
        assert!(!cache.is_current(Timescale::Hour, now + TimeDelta::seconds(40)));
        assert!(cache.is_current(Timescale::Day, now + TimeDelta::seconds(40)));
    }
}
