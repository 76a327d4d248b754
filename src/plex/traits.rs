// Seams between the session tracker and the Plex transport

use super::{Resource, Session};
use anyhow::Result;

/// An authenticated media account that can reach servers
pub trait MediaAccount {
    type Server: SessionSource;

    /// List everything reachable from the account
    fn resources(&self) -> Result<Vec<Resource>>;

    /// Open a connection to one resource
    fn connect(&self, resource: &Resource) -> Result<Self::Server>;
}

/// A connected server that reports its playback sessions
pub trait SessionSource {
    fn sessions(&self) -> Result<Vec<Session>>;
}
