//! Command-line flags.
//!
//! Credentials fall back to `WL_ACCESS_TOKEN`, `WL_CLIENT_ID` and `DGS_TOKEN`,
//! so `tracklist` runs with no flags when those are exported.

use std::time::Duration;

use anyhow::bail;
use clap::Parser;
use tracklist_core::transport::USER_AGENT;
use tracklist_core::{MusicClient, TaskClient, TransportConfig};

use crate::report::Options;

/// Print release metadata for the "artist - track" tasks of a list
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Access token of the task-list account
    #[arg(long, env = "WL_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Client ID of the task-list account
    #[arg(long, env = "WL_CLIENT_ID", hide_env_values = true)]
    pub client_id: Option<String>,

    /// Music-database API token
    #[arg(long, env = "DGS_TOKEN", hide_env_values = true)]
    pub discogs_token: Option<String>,

    /// Title of the list holding the tracks
    #[arg(long, default_value = "Música")]
    pub list: String,

    /// Search results to print per track
    #[arg(long, default_value_t = 1)]
    pub per_page: u32,

    /// Task-list API base URL
    #[arg(long, env = "WL_API_URL", default_value = TaskClient::DEFAULT_BASE_URL)]
    pub tasks_url: String,

    /// Music-database API base URL
    #[arg(long, env = "DGS_API_URL", default_value = MusicClient::DEFAULT_BASE_URL)]
    pub music_url: String,

    /// User agent sent to the music database
    #[arg(long, default_value = USER_AGENT)]
    pub user_agent: String,

    /// Per-request timeout in seconds (0 disables it)
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,
}

/// Credentials that must all be present before any request is made.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub access_token: String,
    pub client_id: String,
    pub discogs_token: String,
}

impl Cli {
    pub fn credentials(&self) -> anyhow::Result<Credentials> {
        let mut missing = Vec::new();
        let mut take = |value: &Option<String>, flag: &'static str| match value.as_deref() {
            Some(v) if !v.is_empty() => v.to_string(),
            _ => {
                missing.push(flag);
                String::new()
            }
        };
        let credentials = Credentials {
            access_token: take(&self.access_token, "--access-token"),
            client_id: take(&self.client_id, "--client-id"),
            discogs_token: take(&self.discogs_token, "--discogs-token"),
        };
        if !missing.is_empty() {
            bail!("missing arguments: {}", missing.join(", "));
        }
        Ok(credentials)
    }

    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            timeout: (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs)),
            user_agent: Some(self.user_agent.clone()),
        }
    }

    pub fn options(&self) -> Options {
        Options {
            list: self.list.clone(),
            per_page: self.per_page,
        }
    }
}
