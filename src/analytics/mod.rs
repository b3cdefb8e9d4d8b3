//! Analytics aggregation engine
//!
//! Converts sparse per-timestamp analytics into fixed-length series and
//! bounded category distributions, per service and per timescale, and merges
//! the enabled services into chart-ready data.

pub mod aggregator;
pub mod collapse;
pub mod merger;
pub mod models;
pub mod timescale;

pub use aggregator::aggregate;
pub use collapse::{collapse_top_n, OTHER_CAP};
pub use merger::{merge, merge_all};
pub use models::{
    CategoryCounter, ChartPoint, ChartReadyData, ChartSet, ResourceUsage, ServiceProcessedData,
    ServiceSeries,
};
pub use timescale::{boundary_key, PerTimescale, TimeWindow, Timescale, TimescaleParseError};
