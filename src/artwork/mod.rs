// Artwork module
// Resolves album artwork on the media server to a public image URL

use crate::plex::ArtworkRef;
use anyhow::Result;

pub mod cache;
pub mod imgur;
pub mod transcode;

pub use cache::{cache_key, ArtworkCache};
pub use imgur::Imgur;
pub use transcode::{transcode_url, HttpThumbnails};

/// Downloads a thumbnail
pub trait ThumbnailFetcher {
    fn download(&self, url: &str) -> Result<Vec<u8>>;
}

/// Publishes an image and returns its public URL
pub trait ImageHost {
    fn upload(&self, image: &[u8], file_name: &str) -> Result<String>;
}

/// Anything that can turn artwork into a public URL
pub trait ArtworkSource {
    fn resolve(&mut self, artwork: &ArtworkRef) -> Result<String>;
}

/// The most recently resolved album
#[derive(Debug, Clone)]
struct Memo {
    key: String,
    url: String,
}

/// Artwork resolution backed by the on-disk cache and a one-album memo.
///
/// Errors from the download or the upload are returned untouched; the
/// caller decides what a failed resolution means for the current poll.
pub struct ArtworkResolver<F, H> {
    cache: ArtworkCache,
    fetcher: F,
    host: H,
    memo: Option<Memo>,
}

impl<F: ThumbnailFetcher, H: ImageHost> ArtworkResolver<F, H> {
    pub fn new(cache: ArtworkCache, fetcher: F, host: H) -> Self {
        Self {
            cache,
            fetcher,
            host,
            memo: None,
        }
    }
}

impl<F: ThumbnailFetcher, H: ImageHost> ArtworkSource for ArtworkResolver<F, H> {
    fn resolve(&mut self, artwork: &ArtworkRef) -> Result<String> {
        let key = cache_key(&artwork.path);

        if let Some(memo) = self.memo.as_ref().filter(|m| m.key == key) {
            log::trace!("Artwork {} still current", key);
            return Ok(memo.url.clone());
        }

        let entry = self.cache.entry(&key);
        entry.ensure_dir()?;

        if !entry.has_image() {
            let url = transcode_url(artwork)?;
            log::debug!("Downloading artwork {}", key);
            let bytes = self.fetcher.download(&url)?;
            entry.write_image(&bytes)?;
        }

        let url = match entry.read_link()? {
            Some(url) => url,
            None => {
                let image = entry.read_image()?;
                let url = self.host.upload(&image, &entry.file_name())?;
                entry.write_link(&url)?;
                url
            }
        };

        self.memo = Some(Memo {
            key,
            url: url.clone(),
        });

        Ok(url)
    }
}
