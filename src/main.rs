use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use checkbag::analytics::timescale::Timescale;
use checkbag::api;
use checkbag::config::Config;
use checkbag::dashboard::{refresh, start_refresh_task, DashboardHandle};
use checkbag::fetch::{HttpServiceDataSource, ServiceDataSource};

#[derive(Parser)]
#[command(name = "checkbag-dashboard")]
#[command(about = "Traffic analytics dashboard for CheckBag proxied services", long_about = None)]
struct Cli {
    /// Address to bind the dashboard API to (overrides API_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to bind the dashboard API to (overrides API_PORT)
    #[arg(long)]
    port: Option<u16>,

    /// CheckBag backend base URL (overrides CHECKBAG_BACKEND_URL)
    #[arg(long)]
    backend_url: Option<String>,

    /// Fetch once, print chart data for the given timescale and exit
    #[arg(long, value_name = "TIMESCALE")]
    once: Option<Timescale>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(host) = cli.host {
        config.api_server.host = host;
    }
    if let Some(port) = cli.port {
        config.api_server.port = port;
    }
    if let Some(url) = cli.backend_url {
        config.backend.url = url;
    }
    info!("Loaded configuration");

    let source: Arc<dyn ServiceDataSource> = Arc::new(HttpServiceDataSource::new(
        &config.backend.url,
        config.backend.session_token.clone(),
    )?);
    info!("Using CheckBag backend at {}", config.backend.url);

    let dashboard = DashboardHandle::spawn(config.actor_buffer_size);

    if let Some(timescale) = cli.once {
        let summary = refresh(&dashboard, Arc::clone(&source))
            .await
            .context("failed to fetch analytics from backend")?;
        for (timescale, outcome) in summary.iter() {
            info!(%timescale, "{}", outcome);
        }
        let charts = dashboard.charts().await?;
        println!("{}", serde_json::to_string_pretty(charts.get(timescale))?);
        dashboard.shutdown().await;
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let refresh_task = if config.refresh.enabled() {
        info!(
            "Refreshing analytics every {}s",
            config.refresh.interval_secs
        );
        Some(start_refresh_task(
            dashboard.clone(),
            Arc::clone(&source),
            Duration::from_secs(config.refresh.interval_secs),
            shutdown_rx,
        ))
    } else {
        info!("Background refresh disabled");
        None
    };

    let router = api::create_api_router(dashboard.clone(), source);

    let api_addr = format!("{}:{}", config.api_server.host, config.api_server.port);
    let listener = tokio::net::TcpListener::bind(&api_addr).await?;
    info!("🚀 Dashboard API listening on http://{}", api_addr);
    info!("   - Chart data at http://{}/api/chart-data?timescale=hour", api_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    info!("Shutting down");
    let _ = shutdown_tx.send(true);
    if let Some(task) = refresh_task {
        if let Err(e) = task.await {
            error!("Refresh task ended abnormally: {}", e);
        }
    }
    dashboard.shutdown().await;

    Ok(())
}
