//! Single-owner dashboard state
//!
//! Holds the service collection and the merged chart data for every
//! timescale. Any change to the collection marks the charts stale; stale
//! charts are rebuilt once, on the latest input, before they are read.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::analytics::merger::merge_all;
use crate::analytics::models::ChartSet;
use crate::analytics::timescale::PerTimescale;
use crate::fetch::{FetchError, FetchReport};
use crate::models::ServiceLink;
use crate::services::{Service, ServiceCollection, ServiceError};

/// What the service list screen shows for one service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceSummary {
    pub id: String,
    pub title: String,
    pub enabled: bool,
    pub outgoing_address: String,
    pub incoming_addresses: Vec<String>,
    pub total_requests: PerTimescale<u64>,
}

impl From<&Service> for ServiceSummary {
    fn from(service: &Service) -> Self {
        Self {
            id: service.id().to_string(),
            title: service.title().to_string(),
            enabled: service.is_enabled(),
            outgoing_address: service.link().outgoing_address.to_string(),
            incoming_addresses: service.link().incoming_addresses.clone(),
            total_requests: service.cache().total_requests(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServicesView {
    pub services: Vec<ServiceSummary>,
    pub session_valid: bool,
}

#[derive(Debug)]
pub struct Dashboard {
    services: ServiceCollection,
    charts: Arc<ChartSet>,
    stale: bool,
    session_valid: bool,
    recomputations: u64,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Dashboard {
    pub fn new() -> Self {
        Self {
            services: ServiceCollection::new(),
            charts: Arc::new(ChartSet::default()),
            stale: false,
            session_valid: true,
            recomputations: 0,
        }
    }

    pub fn services(&self) -> &ServiceCollection {
        &self.services
    }

    pub fn session_valid(&self) -> bool {
        self.session_valid
    }

    /// Number of times the merged charts were rebuilt
    pub fn recomputations(&self) -> u64 {
        self.recomputations
    }

    /// Merged chart data for every timescale
    pub fn charts(&mut self) -> Arc<ChartSet> {
        self.refresh_if_stale();
        Arc::clone(&self.charts)
    }

    pub fn view(&self) -> ServicesView {
        ServicesView {
            services: self.services.iter().map(ServiceSummary::from).collect(),
            session_valid: self.session_valid,
        }
    }

    /// Rebuild the merged charts if the collection changed since the last build
    pub fn refresh_if_stale(&mut self) -> bool {
        if !self.stale {
            return false;
        }
        self.charts = Arc::new(merge_all(self.services.as_slice()));
        self.stale = false;
        self.recomputations += 1;
        debug!(
            services = self.services.len(),
            recomputations = self.recomputations,
            "Recomputed chart data"
        );
        true
    }

    /// Merge a fetch round into the collection.
    ///
    /// Failed timescales are skipped and keep their previous data. When every
    /// timescale failed the session is flagged invalid.
    pub fn apply_fetch(&mut self, report: FetchReport, now: DateTime<Utc>) -> Result<(), FetchError> {
        if report.all_failed() {
            error!("Every timescale fetch failed, treating session as invalid");
            self.session_valid = false;
            return Err(FetchError::SessionInvalid);
        }
        self.session_valid = true;

        for (timescale, result) in report.results {
            match result {
                Ok(payloads) => {
                    if self.services.apply_timescale(timescale, payloads, now) {
                        self.stale = true;
                    }
                }
                Err(e) => warn!(%timescale, "Skipping timescale after failed fetch: {}", e),
            }
        }
        Ok(())
    }

    pub fn toggle(&mut self, id: &str) -> Result<bool, ServiceError> {
        let enabled = self.services.toggle(id)?;
        self.stale = true;
        Ok(enabled)
    }

    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> Result<bool, ServiceError> {
        let changed = self.services.set_enabled(id, enabled)?;
        if changed {
            self.stale = true;
        }
        Ok(changed)
    }

    /// Add a service, returning the updated list to publish
    pub fn add(&mut self, link: ServiceLink, now: DateTime<Utc>) -> Result<Vec<ServiceLink>, ServiceError> {
        self.services.add(link, now)?;
        self.stale = true;
        Ok(self.services.links())
    }

    /// Remove a service, returning the updated list to publish
    pub fn remove(&mut self, id: &str) -> Result<Vec<ServiceLink>, ServiceError> {
        self.services.remove(id)?;
        self.stale = true;
        Ok(self.services.links())
    }
}
