//! Multi-service merging
//!
//! Combines the cached aggregates of every enabled service into the
//! structures the dashboard charts consume. Nothing is recomputed here; the
//! per-service caches are only read.

use tracing::debug;

use crate::analytics::collapse::{collapse_top_n, OTHER_CAP};
use crate::analytics::models::{
    absorb, CategoryCounter, ChartReadyData, ChartSet, ResourceUsage, ServiceSeries,
};
use crate::analytics::timescale::{PerTimescale, Timescale};
use crate::services::Service;

pub fn merge<'a>(
    timescale: Timescale,
    services: impl IntoIterator<Item = &'a Service>,
) -> ChartReadyData {
    let mut quantity_data = Vec::new();
    let mut response_codes: CategoryCounter<u16> = CategoryCounter::new();
    let mut countries: CategoryCounter<String> = CategoryCounter::new();
    let mut ips: CategoryCounter<String> = CategoryCounter::new();
    let mut resource_usage = Vec::new();

    for service in services.into_iter().filter(|service| service.is_enabled()) {
        let processed = service.processed(timescale);

        quantity_data.push(ServiceSeries {
            service_id: service.id().to_string(),
            service: service.title().to_string(),
            points: processed.quantity_series.clone(),
        });

        absorb(&mut response_codes, &processed.response_codes);
        absorb(&mut countries, &processed.countries);
        absorb(&mut ips, &processed.ips);

        let service_url = service.link().outgoing_address.to_string();
        resource_usage.extend(processed.resources.iter().map(|(resource, quantity)| {
            ResourceUsage {
                service: service.title().to_string(),
                service_url: service_url.clone(),
                resource: resource.clone(),
                quantity: *quantity,
            }
        }));
    }

    resource_usage.sort_by(|a, b| {
        b.quantity
            .cmp(&a.quantity)
            .then_with(|| a.service.cmp(&b.service))
            .then_with(|| a.resource.cmp(&b.resource))
    });

    debug!(
        %timescale,
        services = quantity_data.len(),
        resources = resource_usage.len(),
        "Merged chart data"
    );

    ChartReadyData {
        quantity_data,
        response_code_data: collapse_top_n(&response_codes, OTHER_CAP),
        country_code_data: collapse_top_n(&countries, OTHER_CAP),
        ip_address_data: collapse_top_n(&ips, OTHER_CAP),
        resource_usage,
    }
}

/// Merge every timescale so switching between them is a lookup
pub fn merge_all(services: &[Service]) -> ChartSet {
    PerTimescale::from_fn(|timescale| merge(timescale, services))
}
