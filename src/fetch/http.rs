use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::COOKIE;
use reqwest::{Client, RequestBuilder};
use tracing::debug;

use crate::analytics::timescale::Timescale;
use crate::fetch::{FetchError, ServiceDataSource};
use crate::models::{ServiceLink, ServicePayload};

/// Cookie the backend uses to identify a signed-in user
pub const SESSION_COOKIE: &str = "checkbag-session-token";

/// Backend client over HTTP
#[derive(Clone)]
pub struct HttpServiceDataSource {
    client: Client,
    base_url: String,
    session_token: Option<String>,
}

impl HttpServiceDataSource {
    pub fn new(base_url: &str, session_token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("checkbag-dashboard/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client for the CheckBag backend")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session_token,
        })
    }

    pub fn service_data_url(&self, timescale: Timescale) -> String {
        format!("{}/api/service-data?time-step={}", self.base_url, timescale)
    }

    fn with_session(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session_token {
            Some(ref token) => request.header(COOKIE, format!("{SESSION_COOKIE}={token}")),
            None => request,
        }
    }
}

#[async_trait]
impl ServiceDataSource for HttpServiceDataSource {
    async fn fetch_timescale(&self, timescale: Timescale) -> Result<Vec<ServicePayload>, FetchError> {
        let url = self.service_data_url(timescale);
        debug!("Fetching {}", url);

        let response = self.with_session(self.client.get(&url)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn publish_services(&self, links: &[ServiceLink]) -> Result<(), FetchError> {
        let url = format!("{}/api/services-set", self.base_url);
        let response = self
            .with_session(self.client.post(&url).json(links))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_data_url() {
        let source = HttpServiceDataSource::new("http://backend:8080/", None).unwrap();
        assert_eq!(
            source.service_data_url(Timescale::Month),
            "http://backend:8080/api/service-data?time-step=month"
        );
    }
}
