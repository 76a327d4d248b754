// Presence module
// Builds presence payloads and pushes them to the presence sink

use crate::clock::Clock;
use anyhow::Result;
use backoff::backoff::{Backoff, Constant};
use chrono::{DateTime, Utc};
use std::time::Duration;

pub mod builder;
pub mod discord;

pub use builder::{build_track_presence, PresencePayload};
pub use discord::DiscordConnector;

/// Delay between reconnection attempts
pub const RECONNECT_DELAY: Duration = Duration::from_secs(15);

/// Fields sent to the sink for one update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceUpdate {
    pub details: String,
    pub state: String,
    /// Unix timestamp playback started at, only while playing
    pub start: Option<i64>,
    pub large_image: Option<String>,
    pub large_text: String,
    pub small_image: &'static str,
    pub small_text: String,
}

/// A live connection to the presence service
pub trait PresenceSink {
    fn update(&mut self, update: &PresenceUpdate) -> Result<()>;
    fn clear(&mut self) -> Result<()>;
}

/// Opens new sink connections
pub trait SinkConnector {
    type Sink: PresenceSink;

    fn connect(&self) -> Result<Self::Sink>;
}

impl PresenceUpdate {
    pub fn from_payload(payload: &PresencePayload, now: DateTime<Utc>) -> Self {
        let playing = payload.state == "playing";

        Self {
            details: payload.primary.clone(),
            state: payload.secondary.clone(),
            start: playing.then(|| now.timestamp() - payload.remaining as i64),
            large_image: payload.image.clone(),
            large_text: payload.image_text.clone(),
            small_image: if playing { "playing" } else { "paused" },
            small_text: capitalize(&payload.state),
        }
    }
}

/// Push a payload. `false` means the connection should be replaced.
pub fn set_presence<S: PresenceSink>(sink: &mut S, payload: &PresencePayload, now: DateTime<Utc>) -> bool {
    let update = PresenceUpdate::from_payload(payload, now);

    match sink.update(&update) {
        Ok(()) => {
            log::info!(
                "Set Discord Rich Presence to: {} ({})",
                update.details,
                update.small_text
            );
            true
        }
        Err(e) => {
            log::error!(
                "Failed to set Discord Rich Presence to {}, {:#}",
                update.details,
                e
            );
            false
        }
    }
}

/// Connect, retrying every fifteen seconds until it works
pub fn connect_with_retry<C: SinkConnector, K: Clock>(connector: &C, clock: &K) -> C::Sink {
    let mut delay = Constant::new(RECONNECT_DELAY);

    loop {
        match connector.connect() {
            Ok(sink) => {
                log::info!("Authenticated with Discord");
                return sink;
            }
            Err(e) => {
                let wait = delay.next_backoff().unwrap_or(RECONNECT_DELAY);
                log::error!(
                    "Failed to connect to Discord ({:#}) retry in {}s...",
                    e,
                    wait.as_secs()
                );
                clock.sleep(wait);
            }
        }
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
