// Playback sessions reported by a Plex Media Server

use serde::Deserialize;

/// Kind of media a session is streaming
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Track,
    Other,
}

/// Where a session's album artwork lives and how to authorise fetching it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtworkRef {
    /// Thumbnail path on the server, e.g. `/library/metadata/42/thumb/1700000000`
    pub path: String,
    /// Base URI of the server connection the session came from
    pub server_uri: String,
    pub access_token: String,
}

/// One active playback stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub key: String,
    pub kind: SessionKind,
    pub usernames: Vec<String>,
    pub title: String,
    pub sort_title: String,
    pub original_title: Option<String>,
    pub artist_title: String,
    pub album_title: String,
    pub artwork: Option<ArtworkRef>,
    pub player_state: String,
    pub view_offset_ms: u64,
}

impl Session {
    pub fn is_track(&self) -> bool {
        self.kind == SessionKind::Track
    }

    /// Case-insensitive check against the session's usernames
    pub fn belongs_to(&self, user: &str) -> bool {
        self.usernames
            .iter()
            .any(|name| name.to_lowercase() == user.to_lowercase())
    }
}

/// `GET /status/sessions` response body
#[derive(Debug, Deserialize)]
pub(crate) struct SessionsResponse {
    #[serde(rename = "MediaContainer")]
    pub media_container: MediaContainer,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MediaContainer {
    #[serde(rename = "Metadata", default)]
    pub metadata: Vec<SessionMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SessionMetadata {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub title: String,
    pub title_sort: Option<String>,
    pub original_title: Option<String>,
    #[serde(default)]
    pub grandparent_title: String,
    #[serde(default)]
    pub parent_title: String,
    pub parent_thumb: Option<String>,
    pub thumb: Option<String>,
    #[serde(default)]
    pub view_offset: u64,
    #[serde(rename = "User")]
    pub user: Option<SessionUser>,
    #[serde(rename = "Player")]
    pub player: Option<SessionPlayer>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SessionUser {
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SessionPlayer {
    #[serde(default)]
    pub state: String,
}

impl SessionMetadata {
    /// Convert the wire form, attaching the server the session was read from
    pub fn into_session(self, server_uri: &str, access_token: &str) -> Session {
        let kind = if self.kind == "track" {
            SessionKind::Track
        } else {
            SessionKind::Other
        };

        let artwork = self
            .parent_thumb
            .or(self.thumb)
            .filter(|path| !path.is_empty())
            .map(|path| ArtworkRef {
                path,
                server_uri: server_uri.to_string(),
                access_token: access_token.to_string(),
            });

        let usernames = self
            .user
            .map(|u| u.title)
            .filter(|t| !t.is_empty())
            .into_iter()
            .collect();

        Session {
            key: self.key,
            kind,
            usernames,
            sort_title: self.title_sort.unwrap_or_else(|| self.title.clone()),
            title: self.title,
            original_title: self.original_title,
            artist_title: self.grandparent_title,
            album_title: self.parent_title,
            artwork,
            player_state: self.player.map(|p| p.state).unwrap_or_default(),
            view_offset_ms: self.view_offset,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Track session fixture used across the crate's tests
    pub fn track(key: &str, user: &str, state: &str) -> Session {
        Session {
            key: key.to_string(),
            kind: SessionKind::Track,
            usernames: vec![user.to_string()],
            title: "Song".to_string(),
            sort_title: "Song".to_string(),
            original_title: None,
            artist_title: "Artist".to_string(),
            album_title: "Album".to_string(),
            artwork: Some(ArtworkRef {
                path: format!("{}/thumb/1700000000", key),
                server_uri: "https://10-0-0-2.abc.plex.direct:32400".to_string(),
                access_token: "server-token".to_string(),
            }),
            player_state: state.to_string(),
            view_offset_ms: 0,
        }
    }

    #[test]
    fn parses_sessions_payload() {
        let body = r#"{
            "MediaContainer": {
                "size": 2,
                "Metadata": [
                    {
                        "type": "track",
                        "key": "/library/metadata/101",
                        "title": "The Song",
                        "titleSort": "Song",
                        "grandparentTitle": "The Band",
                        "parentTitle": "The Album",
                        "parentThumb": "/library/metadata/100/thumb/1699",
                        "thumb": "/library/metadata/101/thumb/1699",
                        "viewOffset": 125000,
                        "User": {"id": "1", "title": "Alice"},
                        "Player": {"state": "playing", "title": "Plexamp"}
                    },
                    {
                        "type": "episode",
                        "key": "/library/metadata/7",
                        "title": "Pilot"
                    }
                ]
            }
        }"#;

        let response: SessionsResponse = serde_json::from_str(body).unwrap();
        let sessions: Vec<Session> = response
            .media_container
            .metadata
            .into_iter()
            .map(|m| m.into_session("https://server:32400", "tok"))
            .collect();

        let song = &sessions[0];
        assert!(song.is_track());
        assert_eq!(song.sort_title, "Song");
        assert_eq!(song.artist_title, "The Band");
        assert_eq!(song.original_title, None);
        assert_eq!(song.view_offset_ms, 125000);
        assert_eq!(song.player_state, "playing");
        assert!(song.belongs_to("alice"));
        let artwork = song.artwork.as_ref().unwrap();
        assert_eq!(artwork.path, "/library/metadata/100/thumb/1699");
        assert_eq!(artwork.access_token, "tok");

        let episode = &sessions[1];
        assert!(!episode.is_track());
        assert_eq!(episode.sort_title, "Pilot");
        assert!(episode.usernames.is_empty());
        assert!(episode.artwork.is_none());
    }

    #[test]
    fn empty_container_has_no_sessions() {
        let response: SessionsResponse =
            serde_json::from_str(r#"{"MediaContainer": {"size": 0}}"#).unwrap();
        assert!(response.media_container.metadata.is_empty());
    }
}
