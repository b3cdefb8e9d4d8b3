pub mod analytic;
pub mod service;

pub use analytic::{Analytic, RawAnalyticsMap};
pub use service::{ServiceAddress, ServiceLink, ServicePayload};
