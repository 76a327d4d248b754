// Connection to a single Plex Media Server

use super::session::SessionsResponse;
use super::traits::SessionSource;
use super::{with_plex_headers, Session};
use anyhow::{Context, Result};
use std::time::Duration;

/// Probe timeout used while picking a connection
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct PlexServer {
    name: String,
    uri: String,
    token: String,
    client_id: String,
}

impl PlexServer {
    /// Check that `uri` answers for this server and keep it
    pub fn connect(name: &str, uri: &str, token: &str, client_id: &str) -> Result<Self> {
        let uri = uri.trim_end_matches('/');

        with_plex_headers(attohttpc::get(format!("{}/identity", uri)), client_id)
            .header("X-Plex-Token", token)
            .connect_timeout(PROBE_TIMEOUT)
            .timeout(PROBE_TIMEOUT)
            .send()
            .with_context(|| format!("Failed to reach {}", uri))?
            .error_for_status()
            .with_context(|| format!("{} refused the connection", uri))?;

        Ok(Self {
            name: name.to_string(),
            uri: uri.to_string(),
            token: token.to_string(),
            client_id: client_id.to_string(),
        })
    }
}

impl SessionSource for PlexServer {
    fn sessions(&self) -> Result<Vec<Session>> {
        let response: SessionsResponse = with_plex_headers(
            attohttpc::get(format!("{}/status/sessions", self.uri)),
            &self.client_id,
        )
        .header("X-Plex-Token", &self.token)
        .send()
        .with_context(|| format!("Failed to list sessions on {}", self.name))?
        .error_for_status()
        .with_context(|| format!("{} refused the session list", self.name))?
        .json()
        .context("Failed to parse session list")?;

        Ok(response
            .media_container
            .metadata
            .into_iter()
            .map(|m| m.into_session(&self.uri, &self.token))
            .collect())
    }
}
