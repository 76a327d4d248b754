// Album thumbnails through the server's photo transcoder

use super::ThumbnailFetcher;
use crate::plex::ArtworkRef;
use anyhow::{Context, Result};
use url::Url;

/// Edge length requested from the transcoder
const THUMB_SIZE: u32 = 128;

/// URL asking the server for a square, upscaled copy of the artwork
pub fn transcode_url(artwork: &ArtworkRef) -> Result<String> {
    let base = format!(
        "{}/photo/:/transcode",
        artwork.server_uri.trim_end_matches('/')
    );
    let mut url = Url::parse(&base).with_context(|| format!("Invalid server URI {}", base))?;

    url.query_pairs_mut()
        .append_pair("width", &THUMB_SIZE.to_string())
        .append_pair("height", &THUMB_SIZE.to_string())
        .append_pair("minSize", "1")
        .append_pair("upscale", "1")
        .append_pair("url", &artwork.path)
        .append_pair("X-Plex-Token", &artwork.access_token);

    Ok(url.into())
}

/// Plain HTTP download
pub struct HttpThumbnails;

impl ThumbnailFetcher for HttpThumbnails {
    fn download(&self, url: &str) -> Result<Vec<u8>> {
        attohttpc::get(url)
            .send()
            .context("Failed to download album artwork")?
            .error_for_status()
            .context("Server refused the artwork transcode")?
            .bytes()
            .context("Failed to read album artwork")
    }
}
