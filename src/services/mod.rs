//! Services known to the dashboard and their cached analytics

pub mod cache;

pub use cache::ServiceDataCache;

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::analytics::models::ServiceProcessedData;
use crate::analytics::timescale::{PerTimescale, Timescale};
use crate::models::{RawAnalyticsMap, ServiceLink, ServicePayload};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("service '{0}' not found")]
    NotFound(String),
    #[error("service '{0}' already exists")]
    Duplicate(String),
}

/// A proxied service together with its raw and processed analytics
#[derive(Debug, Clone)]
pub struct Service {
    link: ServiceLink,
    enabled: bool,
    raw: PerTimescale<Arc<RawAnalyticsMap>>,
    cache: Arc<ServiceDataCache>,
}

impl Service {
    /// A service with no analytics yet, enabled
    pub fn new(link: ServiceLink, now: DateTime<Utc>) -> Self {
        let raw = PerTimescale::default();
        let cache = Arc::new(ServiceDataCache::build(&raw, now));
        Self {
            link: link.normalized(),
            enabled: true,
            raw,
            cache,
        }
    }

    pub fn id(&self) -> &str {
        &self.link.id
    }

    pub fn title(&self) -> &str {
        &self.link.title
    }

    pub fn link(&self) -> &ServiceLink {
        &self.link
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn with_enabled(self, enabled: bool) -> Self {
        Self { enabled, ..self }
    }

    pub fn raw(&self, timescale: Timescale) -> &RawAnalyticsMap {
        self.raw.get(timescale)
    }

    pub fn cache(&self) -> &Arc<ServiceDataCache> {
        &self.cache
    }

    /// Cached aggregate for one timescale; never recomputes
    pub fn processed(&self, timescale: Timescale) -> &ServiceProcessedData {
        self.cache.processed(timescale)
    }

    /// Replace one timescale's raw data, rebuilding that part of the cache.
    ///
    /// The cache is swapped for a new one; the old one is left untouched.
    pub fn with_raw(&self, timescale: Timescale, raw: RawAnalyticsMap, now: DateTime<Utc>) -> Self {
        let cache = Arc::new(self.cache.with_timescale(timescale, &raw, now));
        let mut next = self.clone();
        *next.raw.get_mut(timescale) = Arc::new(raw);
        next.cache = cache;
        next
    }

    fn needs_refresh(&self, timescale: Timescale, raw: &RawAnalyticsMap, now: DateTime<Utc>) -> bool {
        **self.raw.get(timescale) != *raw || !self.cache.is_current(timescale, now)
    }
}

/// Ordered set of services, keyed by id
#[derive(Debug, Clone, Default)]
pub struct ServiceCollection {
    services: Vec<Service>,
}

impl ServiceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_slice(&self) -> &[Service] {
        &self.services
    }

    pub fn iter(&self) -> impl Iterator<Item = &Service> {
        self.services.iter()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Service> {
        self.services.iter().find(|service| service.id() == id)
    }

    pub fn links(&self) -> Vec<ServiceLink> {
        self.services.iter().map(|service| service.link.clone()).collect()
    }

    /// Merge one timescale's fetch result into the collection.
    ///
    /// Known services get that timescale's raw data replaced, unknown ones are
    /// added enabled, and services the backend no longer reports are dropped.
    /// Returns whether anything changed.
    pub fn apply_timescale(
        &mut self,
        timescale: Timescale,
        payloads: Vec<ServicePayload>,
        now: DateTime<Utc>,
    ) -> bool {
        let previous_order: Vec<String> =
            self.services.iter().map(|s| s.id().to_string()).collect();
        let mut existing: HashMap<String, Service> = self
            .services
            .drain(..)
            .map(|service| (service.id().to_string(), service))
            .collect();

        let mut changed = false;
        let mut next = Vec::with_capacity(payloads.len());

        for mut payload in payloads {
            if next.iter().any(|s: &Service| s.id() == payload.id) {
                warn!(id = %payload.id, %timescale, "Ignoring duplicate service in payload");
                continue;
            }

            let link = payload.link();
            let raw = take_raw(&mut payload, timescale);

            let service = match existing.remove(&link.id) {
                Some(mut service) => {
                    if service.link != link {
                        service.link = link;
                        changed = true;
                    }
                    if service.needs_refresh(timescale, &raw, now) {
                        changed = true;
                        service.with_raw(timescale, raw, now)
                    } else {
                        service
                    }
                }
                None => {
                    info!(id = %link.id, title = %link.title, "Discovered new service");
                    changed = true;
                    Service::new(link, now).with_raw(timescale, raw, now)
                }
            };
            next.push(service);
        }

        for id in existing.keys() {
            debug!(id = %id, %timescale, "Service no longer reported by backend, removing");
            changed = true;
        }

        let next_order: Vec<&str> = next.iter().map(|s| s.id()).collect();
        if next_order != previous_order {
            changed = true;
        }

        self.services = next;
        changed
    }

    /// Flip a service's enabled flag, returning the new value
    pub fn toggle(&mut self, id: &str) -> Result<bool, ServiceError> {
        let service = self.find_mut(id)?;
        service.enabled = !service.enabled;
        Ok(service.enabled)
    }

    /// Set a service's enabled flag, returning whether it changed
    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> Result<bool, ServiceError> {
        let service = self.find_mut(id)?;
        let changed = service.enabled != enabled;
        service.enabled = enabled;
        Ok(changed)
    }

    pub fn add(&mut self, link: ServiceLink, now: DateTime<Utc>) -> Result<(), ServiceError> {
        if self.get(&link.id).is_some() {
            return Err(ServiceError::Duplicate(link.id));
        }
        self.services.push(Service::new(link, now));
        Ok(())
    }

    pub fn insert(&mut self, service: Service) -> Result<(), ServiceError> {
        if self.get(service.id()).is_some() {
            return Err(ServiceError::Duplicate(service.id().to_string()));
        }
        self.services.push(service);
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Result<Service, ServiceError> {
        let index = self
            .services
            .iter()
            .position(|service| service.id() == id)
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))?;
        Ok(self.services.remove(index))
    }

    fn find_mut(&mut self, id: &str) -> Result<&mut Service, ServiceError> {
        self.services
            .iter_mut()
            .find(|service| service.id() == id)
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))
    }
}

fn take_raw(payload: &mut ServicePayload, timescale: Timescale) -> RawAnalyticsMap {
    let slot = match timescale {
        Timescale::Hour => &mut payload.hour,
        Timescale::Day => &mut payload.day,
        Timescale::Month => &mut payload.month,
        Timescale::Year => &mut payload.year,
    };
    slot.take().unwrap_or_default()
}
