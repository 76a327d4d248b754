// Discord Rich Presence over the local IPC socket

use super::{PresenceSink, PresenceUpdate, SinkConnector};
use anyhow::{anyhow, Result};
use discord_rich_presence::{activity, DiscordIpc, DiscordIpcClient};

/// Creates IPC clients for one Discord application
pub struct DiscordConnector {
    app_id: String,
}

impl DiscordConnector {
    pub fn new(app_id: String) -> Self {
        Self { app_id }
    }
}

impl SinkConnector for DiscordConnector {
    type Sink = DiscordPresence;

    fn connect(&self) -> Result<DiscordPresence> {
        let mut client = DiscordIpcClient::new(&self.app_id);
        client
            .connect()
            .map_err(|e| anyhow!("Discord IPC connect failed: {}", e))?;

        Ok(DiscordPresence { client })
    }
}

/// A connected client. Dropping it closes the socket.
pub struct DiscordPresence {
    client: DiscordIpcClient,
}

impl PresenceSink for DiscordPresence {
    fn update(&mut self, update: &PresenceUpdate) -> Result<()> {
        // Asset keys "playing" and "paused" must be registered on the
        // application in Discord's developer portal.
        let mut assets = activity::Assets::new()
            .large_text(update.large_text.as_str())
            .small_image(update.small_image)
            .small_text(update.small_text.as_str());
        if let Some(image) = &update.large_image {
            assets = assets.large_image(image.as_str());
        }

        let mut activity = activity::Activity::new()
            .details(update.details.as_str())
            .state(update.state.as_str())
            .assets(assets);
        if let Some(start) = update.start {
            activity = activity.timestamps(activity::Timestamps::new().start(start));
        }

        self.client
            .set_activity(activity)
            .map_err(|e| anyhow!("Discord IPC update failed: {}", e))
    }

    fn clear(&mut self) -> Result<()> {
        self.client
            .clear_activity()
            .map_err(|e| anyhow!("Discord IPC clear failed: {}", e))
    }
}

impl Drop for DiscordPresence {
    fn drop(&mut self) {
        let _ = self.client.close();
    }
}
