use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub backend: BackendConfig,
    pub api_server: ServerConfig,
    pub refresh: RefreshConfig,
    pub actor_buffer_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the CheckBag backend, without a trailing `/api`
    pub url: String,
    /// Value of the `checkbag-session-token` cookie, if already signed in
    #[serde(default, skip_serializing)]
    pub session_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Seconds between background refreshes; 0 disables them
    pub interval_secs: u64,
}

impl RefreshConfig {
    const fn default_interval_secs() -> u64 {
        60
    }

    pub fn enabled(&self) -> bool {
        self.interval_secs > 0
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let backend_url = std::env::var("CHECKBAG_BACKEND_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8080".to_string());
        let session_token = std::env::var("CHECKBAG_SESSION_TOKEN")
            .ok()
            .filter(|token| !token.is_empty());

        let api_host = std::env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let api_port = std::env::var("API_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .context("API_PORT must be a valid port number")?;

        let interval_secs = match std::env::var("REFRESH_INTERVAL_SECS") {
            Ok(value) => value
                .parse::<u64>()
                .context("REFRESH_INTERVAL_SECS must be a whole number of seconds")?,
            Err(_) => RefreshConfig::default_interval_secs(),
        };

        let actor_buffer_size = std::env::var("ACTOR_BUFFER_SIZE")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(1024);

        Ok(Config {
            backend: BackendConfig {
                url: backend_url,
                session_token,
            },
            api_server: ServerConfig {
                host: api_host,
                port: api_port,
            },
            refresh: RefreshConfig { interval_secs },
            actor_buffer_size,
        })
    }
}
