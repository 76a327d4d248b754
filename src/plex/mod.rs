// Plex module
// Account login, resource discovery and server session listing

use attohttpc::RequestBuilder;
use serde::Deserialize;

pub mod account;
pub mod server;
pub mod session;
pub mod traits;

pub use account::PlexAccount;
pub use server::PlexServer;
pub use session::{ArtworkRef, Session};

pub(crate) const PLEX_TV: &str = "https://plex.tv";
pub(crate) const PRODUCT: &str = "plex-presence";

/// A device or server reachable from the account
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub name: String,
    #[serde(default)]
    pub provides: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Connection {
    pub uri: String,
    #[serde(default)]
    pub local: bool,
    #[serde(default)]
    pub relay: bool,
}

impl Resource {
    pub fn is_server(&self) -> bool {
        self.provides.split(',').any(|p| p.trim() == "server")
    }

    /// Connections in the order they should be tried: local, remote, relay
    pub fn preferred_connections(&self) -> Vec<&Connection> {
        let mut connections: Vec<&Connection> = self.connections.iter().collect();
        connections.sort_by_key(|c| (c.relay, !c.local));
        connections
    }
}

/// Stable client identifier sent with every request
pub(crate) fn client_identifier(username: &str) -> String {
    format!("{:x}", md5::compute(format!("{}:{}", PRODUCT, username)))
}

/// Attach the headers Plex expects from a client
pub(crate) fn with_plex_headers<B>(request: RequestBuilder<B>, client_id: &str) -> RequestBuilder<B> {
    request
        .header("Accept", "application/json")
        .header("X-Plex-Product", PRODUCT)
        .header("X-Plex-Version", env!("CARGO_PKG_VERSION"))
        .header("X-Plex-Client-Identifier", client_id)
}
