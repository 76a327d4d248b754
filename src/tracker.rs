// Session tracking module
// Polls the configured Plex server for the active music session

use crate::plex::traits::{MediaAccount, SessionSource};
use crate::plex::{Resource, Session};
use anyhow::{Context, Result};

/// Finds the one session whose playback should be mirrored.
///
/// The server connection is opened on the first poll and reused for the
/// lifetime of the tracker.
pub struct SessionTracker<A: MediaAccount> {
    account: A,
    servers: Vec<String>,
    users: Vec<String>,
    server: Option<A::Server>,
}

impl<A: MediaAccount> SessionTracker<A> {
    pub fn new(account: A, servers: Vec<String>, users: Vec<String>) -> Self {
        Self {
            account,
            servers,
            users,
            server: None,
        }
    }

    /// Return the active eligible session, if any.
    ///
    /// Errors are fatal: no configured server was found, or connecting to
    /// it failed. A failed session listing is logged and reads as no session.
    pub fn fetch(&mut self) -> Result<Option<Session>> {
        let server = self.server()?;

        let sessions = match server.sessions() {
            Ok(sessions) => sessions,
            Err(e) => {
                log::warn!("Failed to list media sessions, {:#}", e);
                return Ok(None);
            }
        };

        let active = pick_session(sessions, &self.users);

        if active.is_none() {
            log::info!("No active media sessions found for configured users");
        }

        Ok(active)
    }

    fn server(&mut self) -> Result<&A::Server> {
        if self.server.is_none() {
            let resources = self
                .account
                .resources()
                .context("Failed to list Plex resources")?;

            let resource = resolve_resource(resources, &self.servers)
                .context("Failed to locate configured Plex Media Server")?;

            log::info!("Connecting to {}...", resource.name);
            let server = self.account.connect(&resource).with_context(|| {
                format!(
                    "Failed to connect to configured Plex Media Server ({})",
                    resource.name
                )
            })?;
            log::info!("Connected to {}", resource.name);

            self.server = Some(server);
        }

        self.server
            .as_ref()
            .context("Plex Media Server connection missing")
    }
}

/// First server resource matching a configured name, in configured order
pub fn resolve_resource(resources: Vec<Resource>, names: &[String]) -> Option<Resource> {
    names.iter().find_map(|name| {
        resources
            .iter()
            .filter(|r| r.is_server())
            .find(|r| r.name.to_lowercase() == name.to_lowercase())
            .cloned()
    })
}

/// First track session owned by the highest-priority configured user
pub fn pick_session(sessions: Vec<Session>, users: &[String]) -> Option<Session> {
    let index = users.iter().find_map(|user| {
        sessions
            .iter()
            .position(|s| s.is_track() && s.belongs_to(user))
    })?;

    sessions.into_iter().nth(index)
}
