// Presence payload built from a playback session

use crate::artwork::ArtworkSource;
use crate::plex::Session;
use anyhow::Result;

/// What the presence sink should show for one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresencePayload {
    pub primary: String,
    pub secondary: String,
    /// Seconds already played. The sink turns this into a start timestamp.
    pub remaining: u64,
    pub image: Option<String>,
    pub image_text: String,
    pub state: String,
}

/// Map a track session to a payload, resolving its album artwork
pub fn build_track_presence<A: ArtworkSource>(session: &Session, artwork: &mut A) -> Result<PresencePayload> {
    let image = match &session.artwork {
        Some(art) => Some(artwork.resolve(art)?),
        None => {
            log::debug!("{} has no artwork", session.key);
            None
        }
    };

    let by = session
        .original_title
        .as_deref()
        .unwrap_or(&session.artist_title);

    let payload = PresencePayload {
        primary: session.sort_title.clone(),
        secondary: format!("by {}", by),
        remaining: session.view_offset_ms / 1000,
        image,
        image_text: session.album_title.clone(),
        state: session.player_state.clone(),
    };

    log::trace!("{:?}", payload);

    Ok(payload)
}
