//! Application configuration

use std::env;

use serde::{Deserialize, Serialize};

/// Default relay endpoint the terminal client talks to.
pub const DEFAULT_RELAY_URL: &str = "http://127.0.0.1:3000";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Bind address for the relay server.
    pub host: String,
    pub port: u16,
    /// Databricks workspace URL, e.g. `https://adb-123.azuredatabricks.net`.
    pub databricks_host: Option<String>,
    /// Personal access token attached as a bearer credential upstream.
    pub databricks_token: Option<String>,
    /// Genie space the relay forwards every conversation to.
    pub genie_space_id: Option<String>,
    /// Relay base URL used by the terminal client.
    pub relay_url: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".into()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            databricks_host: env::var("DATABRICKS_HOST").ok(),
            databricks_token: env::var("DATABRICKS_TOKEN").ok(),
            genie_space_id: env::var("DATABRICKS_GENIE_SPACE_ID").ok(),
            relay_url: env::var("GENIE_RELAY_URL").unwrap_or_else(|_| DEFAULT_RELAY_URL.into()),
        })
    }
}
