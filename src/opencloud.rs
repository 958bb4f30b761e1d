// src/opencloud.rs
use std::fmt;
use reqwest::StatusCode;
use log::debug;
use crate::config::Config;
use crate::models::server::ServerList;

#[derive(Debug)]
pub enum FetchError {
    Status { status: StatusCode, body: String },
    Transport(reqwest::Error),
    Decode(serde_json::Error),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status { status, .. } => write!(f, "OpenCloud responded with {}", status),
            Self::Transport(e) => write!(f, "{}", e),
            Self::Decode(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Status { .. } => None,
            Self::Transport(e) => Some(e),
            Self::Decode(e) => Some(e),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e)
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e)
    }
}

/// Client for the Open Cloud place instances endpoint.
pub struct OpenCloudClient {
    http: reqwest::Client,
    instances_url: String,
    api_key: String,
}

impl OpenCloudClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            instances_url: format!(
                "{}/universes/v1/{}/places/{}/instances",
                config.api_base_url, config.universe_id, config.place_id
            ),
            api_key: config.api_key.clone(),
        }
    }

    /// Lists the live instances of the configured place. One attempt, no retry.
    pub async fn fetch_servers(&self) -> Result<ServerList, FetchError> {
        debug!("Fetching instances from {}", self.instances_url);

        let response = self.http
            .get(&self.instances_url)
            .header("x-api-key", &self.api_key)
            .send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(FetchError::Status { status, body });
        }

        let bytes = response.bytes().await?;
        let body: serde_json::Value = serde_json::from_slice(&bytes)?;
        let servers = ServerList::from_instances(&body);

        debug!("OpenCloud returned {} instances", servers.len());
        Ok(servers)
    }
}
