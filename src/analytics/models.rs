//! Derived analytics structures

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::analytics::timescale::PerTimescale;

/// Count per category key (country, IP, resource, status code)
pub type CategoryCounter<K> = BTreeMap<K, u64>;

/// Add every entry of `other` into `counter`
pub fn absorb<K: Ord + Clone>(counter: &mut CategoryCounter<K>, other: &CategoryCounter<K>) {
    for (key, count) in other {
        *counter.entry(key.clone()).or_insert(0) += count;
    }
}

/// A labelled value, used for series points and pie slices alike
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: u64,
}

impl ChartPoint {
    pub fn new(label: impl Into<String>, value: u64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

/// One service's analytics for one timescale.
///
/// Built in one pass from raw data and never modified afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServiceProcessedData {
    /// Requests per bucket, oldest first
    pub quantity_series: Vec<ChartPoint>,
    pub response_codes: CategoryCounter<u16>,
    pub countries: CategoryCounter<String>,
    pub ips: CategoryCounter<String>,
    pub resources: CategoryCounter<String>,
    pub total_requests: u64,
}

/// Quantity series of one enabled service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceSeries {
    pub service_id: String,
    pub service: String,
    pub points: Vec<ChartPoint>,
}

/// One row of the resource usage table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceUsage {
    pub service: String,
    pub service_url: String,
    pub resource: String,
    pub quantity: u64,
}

/// Everything the dashboard charts need for one timescale
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartReadyData {
    pub quantity_data: Vec<ServiceSeries>,
    pub response_code_data: Vec<ChartPoint>,
    pub country_code_data: Vec<ChartPoint>,
    #[serde(rename = "IPAddressData")]
    pub ip_address_data: Vec<ChartPoint>,
    pub resource_usage: Vec<ResourceUsage>,
}

impl ChartReadyData {
    pub fn is_empty(&self) -> bool {
        self.quantity_data.is_empty()
            && self.response_code_data.is_empty()
            && self.country_code_data.is_empty()
            && self.ip_address_data.is_empty()
            && self.resource_usage.is_empty()
    }
}

/// Precomputed chart data for every timescale
pub type ChartSet = PerTimescale<ChartReadyData>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absorb_sums_keywise() {
        let mut total: CategoryCounter<String> = BTreeMap::new();
        total.insert("US".to_string(), 2);

        let mut other = BTreeMap::new();
        other.insert("US".to_string(), 3);
        other.insert("DE".to_string(), 1);

        absorb(&mut total, &other);
        assert_eq!(total["US"], 5);
        assert_eq!(total["DE"], 1);
    }

    #[test]
    fn test_chart_ready_data_field_names() {
        let json = serde_json::to_value(ChartReadyData::default()).unwrap();
        for field in [
            "quantityData",
            "responseCodeData",
            "countryCodeData",
            "IPAddressData",
            "resourceUsage",
        ] {
            assert!(json.get(field).is_some(), "missing field {field}");
        }
    }
}
