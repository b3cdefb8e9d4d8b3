//! Raw analytics as delivered by the CheckBag backend

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stats for a single bucket of a single service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analytic {
    /// Number of requests that landed in this bucket
    #[serde(default)]
    pub quantity: u64,

    /// Requests per ISO country code
    #[serde(default)]
    pub country: BTreeMap<String, u64>,

    /// Requests per client IP address
    #[serde(default)]
    pub ip: BTreeMap<String, u64>,

    /// Requests per resource path
    #[serde(default)]
    pub resource: BTreeMap<String, u64>,

    /// Requests per HTTP status code
    #[serde(default)]
    pub response_code: BTreeMap<u16, u64>,
}

/// Sparse bucket-start timestamp (RFC 3339) to analytic map.
///
/// A timestamp that is absent means the service saw no traffic in that bucket.
pub type RawAnalyticsMap = BTreeMap<String, Analytic>;
