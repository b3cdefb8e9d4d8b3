use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::RawAnalyticsMap;

/// Where the proxy forwards traffic for a service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAddress {
    pub protocol: String,
    pub domain: String,
    pub port: u16,
}

impl ServiceAddress {
    /// Fill in the protocol's default port when none was given
    pub fn normalized(mut self) -> Self {
        self.protocol = self.protocol.to_lowercase();
        if self.port == 0 {
            self.port = if self.protocol == "https" { 443 } else { 80 };
        }
        self
    }
}

impl Default for ServiceAddress {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            domain: String::new(),
            port: 80,
        }
    }
}

impl fmt::Display for ServiceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.protocol, self.domain, self.port)
    }
}

/// Service definition without analytics, as exchanged with `/api/services-set`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceLink {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub outgoing_address: ServiceAddress,
    #[serde(default)]
    pub incoming_addresses: Vec<String>,
}

impl ServiceLink {
    /// Normalize addresses the way the backend stores them
    pub fn normalized(self) -> Self {
        Self {
            outgoing_address: self.outgoing_address.normalized(),
            incoming_addresses: self
                .incoming_addresses
                .iter()
                .map(|address| normalize_incoming_address(address))
                .collect(),
            ..self
        }
    }
}

/// One service as returned by `/api/service-data`.
///
/// Only the timescales requested with `time-step` carry data; the rest are
/// absent or empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServicePayload {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub outgoing_address: ServiceAddress,
    #[serde(default)]
    pub incoming_addresses: Vec<String>,
    #[serde(default)]
    pub hour: Option<RawAnalyticsMap>,
    #[serde(default)]
    pub day: Option<RawAnalyticsMap>,
    #[serde(default)]
    pub month: Option<RawAnalyticsMap>,
    #[serde(default)]
    pub year: Option<RawAnalyticsMap>,
}

impl ServicePayload {
    pub fn link(&self) -> ServiceLink {
        ServiceLink {
            id: self.id.clone(),
            title: self.title.clone(),
            outgoing_address: self.outgoing_address.clone(),
            incoming_addresses: self.incoming_addresses.clone(),
        }
        .normalized()
    }
}

/// Strip the scheme and any path, keeping `host[:port]`
pub fn normalize_incoming_address(address: &str) -> String {
    let trimmed = address.trim();
    let without_scheme = trimmed
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(trimmed);

    without_scheme
        .split('/')
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_port_uses_protocol_default() {
        let http = ServiceAddress {
            protocol: "http".to_string(),
            domain: "internal".to_string(),
            port: 0,
        }
        .normalized();
        assert_eq!(http.port, 80);

        let https = ServiceAddress {
            protocol: "HTTPS".to_string(),
            domain: "internal".to_string(),
            port: 0,
        }
        .normalized();
        assert_eq!(https.port, 443);
        assert_eq!(https.to_string(), "https://internal:443");
    }

    #[test]
    fn test_normalize_incoming_address() {
        assert_eq!(normalize_incoming_address("https://App.example.com/"), "app.example.com");
        assert_eq!(normalize_incoming_address("example.com:8443"), "example.com:8443");
        assert_eq!(normalize_incoming_address("http://10.0.0.2:81/path"), "10.0.0.2:81");
    }

    #[test]
    fn test_payload_deserializes_sparse_timescales() {
        let json = r#"{
            "id": "svc-1",
            "title": "Grafana",
            "outgoing_address": {"protocol": "http", "domain": "grafana", "port": 3000},
            "incoming_addresses": ["grafana.example.com"],
            "hour": {"2024-01-01T00:00:00Z": {"quantity": 5}},
            "day": {}
        }"#;

        let payload: ServicePayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.hour.as_ref().map(|m| m.len()), Some(1));
        assert_eq!(payload.day.as_ref().map(|m| m.len()), Some(0));
        assert!(payload.month.is_none());
        assert_eq!(payload.link().outgoing_address.to_string(), "http://grafana:3000");
    }
}
