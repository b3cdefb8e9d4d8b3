//! Fetching raw analytics from the CheckBag backend
//!
//! One request is issued per timescale, all concurrently. Each result is kept
//! independently so a failing timescale never discards the others.

pub mod http;

pub use http::HttpServiceDataSource;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::analytics::timescale::{PerTimescale, Timescale};
use crate::models::{ServiceLink, ServicePayload};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("backend responded with status {0}")]
    Status(u16),
    #[error("request to backend failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("could not decode backend response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("fetch task did not complete: {0}")]
    Task(String),
    #[error("session invalid: every timescale fetch failed")]
    SessionInvalid,
}

/// Source of per-service analytics
#[async_trait]
pub trait ServiceDataSource: Send + Sync {
    /// Every service, carrying raw analytics for `timescale`
    async fn fetch_timescale(&self, timescale: Timescale) -> Result<Vec<ServicePayload>, FetchError>;

    /// Replace the backend's service list
    async fn publish_services(&self, links: &[ServiceLink]) -> Result<(), FetchError>;
}

/// Outcome of one fetch per timescale
#[derive(Debug)]
pub struct FetchReport {
    pub results: PerTimescale<Result<Vec<ServicePayload>, FetchError>>,
}

impl FetchReport {
    pub fn all_failed(&self) -> bool {
        self.results.iter().all(|(_, result)| result.is_err())
    }

    /// `"ok"` or the error text, per timescale
    pub fn summary(&self) -> PerTimescale<String> {
        self.results.map(|_, result| match result {
            Ok(_) => "ok".to_string(),
            Err(e) => format!("error: {e}"),
        })
    }
}

/// Fetch all four timescales concurrently and collect each result
pub async fn fetch_all_timescales(source: Arc<dyn ServiceDataSource>) -> FetchReport {
    let mut tasks = JoinSet::new();
    for timescale in Timescale::ALL {
        let source = Arc::clone(&source);
        tasks.spawn(async move { (timescale, source.fetch_timescale(timescale).await) });
    }

    let mut results: PerTimescale<Option<Result<Vec<ServicePayload>, FetchError>>> =
        PerTimescale::from_fn(|_| None);

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((timescale, result)) => {
                debug!(%timescale, ok = result.is_ok(), "Timescale fetch finished");
                *results.get_mut(timescale) = Some(result);
            }
            Err(e) => error!("Timescale fetch task failed: {}", e),
        }
    }

    FetchReport {
        results: results.into_map(|timescale, result| {
            result.unwrap_or_else(|| Err(FetchError::Task(format!("{timescale} fetch aborted"))))
        }),
    }
}
