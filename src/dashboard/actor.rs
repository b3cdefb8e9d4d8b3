//! Actor that owns the dashboard state
//!
//! All reads and writes go through a bounded mpsc channel to a single task,
//! so the state needs no locks. After each burst of messages the actor
//! rebuilds stale chart data once.

use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use crate::analytics::models::ChartSet;
use crate::dashboard::state::{Dashboard, ServicesView};
use crate::fetch::{FetchError, FetchReport};
use crate::models::ServiceLink;
use crate::services::ServiceError;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("dashboard actor is not running")]
    Closed,
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

enum ActorMessage {
    Charts(oneshot::Sender<Arc<ChartSet>>),
    Services(oneshot::Sender<ServicesView>),
    Toggle {
        id: String,
        reply: oneshot::Sender<Result<bool, ServiceError>>,
    },
    SetEnabled {
        id: String,
        enabled: bool,
        reply: oneshot::Sender<Result<bool, ServiceError>>,
    },
    Add {
        link: ServiceLink,
        reply: oneshot::Sender<Result<Vec<ServiceLink>, ServiceError>>,
    },
    Remove {
        id: String,
        reply: oneshot::Sender<Result<Vec<ServiceLink>, ServiceError>>,
    },
    ApplyFetch {
        report: FetchReport,
        reply: oneshot::Sender<Result<(), FetchError>>,
    },
    Shutdown,
}

struct DashboardActor {
    receiver: mpsc::Receiver<ActorMessage>,
    dashboard: Dashboard,
}

impl DashboardActor {
    async fn run(mut self) {
        while let Some(msg) = self.receiver.recv().await {
            if !self.handle(msg) {
                return;
            }

            // Drain whatever queued up meanwhile so a burst costs one rebuild
            while let Ok(msg) = self.receiver.try_recv() {
                if !self.handle(msg) {
                    return;
                }
            }

            self.dashboard.refresh_if_stale();
        }

        warn!("Dashboard actor channel closed unexpectedly");
    }

    /// Returns false once the actor should stop
    fn handle(&mut self, msg: ActorMessage) -> bool {
        // A dropped reply receiver only means the caller went away
        match msg {
            ActorMessage::Charts(reply) => {
                let _ = reply.send(self.dashboard.charts());
            }
            ActorMessage::Services(reply) => {
                let _ = reply.send(self.dashboard.view());
            }
            ActorMessage::Toggle { id, reply } => {
                let _ = reply.send(self.dashboard.toggle(&id));
            }
            ActorMessage::SetEnabled { id, enabled, reply } => {
                let _ = reply.send(self.dashboard.set_enabled(&id, enabled));
            }
            ActorMessage::Add { link, reply } => {
                let _ = reply.send(self.dashboard.add(link, Utc::now()));
            }
            ActorMessage::Remove { id, reply } => {
                let _ = reply.send(self.dashboard.remove(&id));
            }
            ActorMessage::ApplyFetch { report, reply } => {
                let _ = reply.send(self.dashboard.apply_fetch(report, Utc::now()));
            }
            ActorMessage::Shutdown => {
                info!("Dashboard actor received shutdown signal");
                return false;
            }
        }
        true
    }
}

/// Cheap, cloneable handle to the dashboard actor
#[derive(Clone)]
pub struct DashboardHandle {
    sender: mpsc::Sender<ActorMessage>,
}

impl DashboardHandle {
    /// Spawn the actor on the current tokio runtime
    pub fn spawn(buffer_size: usize) -> Self {
        Self::spawn_with(Dashboard::new(), buffer_size)
    }

    pub fn spawn_with(dashboard: Dashboard, buffer_size: usize) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size.max(1));
        let actor = DashboardActor { receiver, dashboard };

        tokio::spawn(async move {
            actor.run().await;
        });

        Self { sender }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> ActorMessage,
    ) -> Result<T, DashboardError> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(build(reply))
            .await
            .map_err(|_| DashboardError::Closed)?;
        response.await.map_err(|_| DashboardError::Closed)
    }

    /// Precomputed chart data for every timescale
    pub async fn charts(&self) -> Result<Arc<ChartSet>, DashboardError> {
        self.request(ActorMessage::Charts).await
    }

    pub async fn services(&self) -> Result<ServicesView, DashboardError> {
        self.request(ActorMessage::Services).await
    }

    /// Flip a service's enabled flag, returning the new value
    pub async fn toggle(&self, id: &str) -> Result<bool, DashboardError> {
        let id = id.to_string();
        Ok(self
            .request(|reply| ActorMessage::Toggle { id, reply })
            .await??)
    }

    pub async fn set_enabled(&self, id: &str, enabled: bool) -> Result<bool, DashboardError> {
        let id = id.to_string();
        Ok(self
            .request(|reply| ActorMessage::SetEnabled { id, enabled, reply })
            .await??)
    }

    pub async fn add(&self, link: ServiceLink) -> Result<Vec<ServiceLink>, DashboardError> {
        Ok(self
            .request(|reply| ActorMessage::Add { link, reply })
            .await??)
    }

    pub async fn remove(&self, id: &str) -> Result<Vec<ServiceLink>, DashboardError> {
        let id = id.to_string();
        Ok(self
            .request(|reply| ActorMessage::Remove { id, reply })
            .await??)
    }

    pub async fn apply_fetch(&self, report: FetchReport) -> Result<(), DashboardError> {
        Ok(self
            .request(|reply| ActorMessage::ApplyFetch { report, reply })
            .await??)
    }

    /// Stop the actor; later requests fail with `DashboardError::Closed`
    pub async fn shutdown(&self) {
        let _ = self.sender.send(ActorMessage::Shutdown).await;
    }
}
