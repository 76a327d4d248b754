// On-disk artwork cache
// One image file and one link file per album, never evicted

use anyhow::{Context, Result};
use regex::Regex;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

fn illegal_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"[%<>:"|?*\x00-\x1f]"#).expect("static regex"))
}

/// Turn a thumbnail path into a relative path that is safe on disk.
///
/// `/library/metadata/42/thumb/1700000000` becomes
/// `library/metadata/42/thumb/1700000000`. Characters that are illegal in
/// file names, and `%` itself, are percent-escaped so distinct paths keep
/// distinct keys. Dot segments are escaped rather than followed.
pub fn cache_key(thumb_path: &str) -> String {
    let normalized = thumb_path.replace('\\', "/");

    let segments: Vec<String> = normalized
        .split('/')
        .filter(|s| !s.is_empty())
        .map(escape_segment)
        .collect();

    if segments.is_empty() {
        "%".to_string()
    } else {
        segments.join("/")
    }
}

fn escape_segment(segment: &str) -> String {
    match segment {
        "." => "%2E".to_string(),
        ".." => "%2E%2E".to_string(),
        _ => illegal_chars()
            .replace_all(segment, |caps: &regex::Captures| {
                format!("%{:02X}", caps[0].as_bytes()[0])
            })
            .into_owned(),
    }
}

/// Root directory of the cache
#[derive(Debug, Clone)]
pub struct ArtworkCache {
    root: PathBuf,
}

impl ArtworkCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn entry(&self, key: &str) -> CacheEntry {
        let base = self.root.join(key);
        CacheEntry {
            image: with_suffix(&base, ".png"),
            link: with_suffix(&base, ".txt"),
        }
    }
}

/// The image/link file pair for one album
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub image: PathBuf,
    pub link: PathBuf,
}

impl CacheEntry {
    pub fn ensure_dir(&self) -> Result<()> {
        if let Some(parent) = self.image.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create cache dir {}", parent.display()))?;
        }
        Ok(())
    }

    pub fn has_image(&self) -> bool {
        self.image.is_file()
    }

    pub fn read_image(&self) -> Result<Vec<u8>> {
        fs::read(&self.image).with_context(|| format!("Failed to read {}", self.image.display()))
    }

    pub fn write_image(&self, bytes: &[u8]) -> Result<()> {
        write_atomic(&self.image, bytes)
    }

    /// The stored public URL; an empty link file counts as missing
    pub fn read_link(&self) -> Result<Option<String>> {
        if !self.link.is_file() {
            return Ok(None);
        }

        let link = fs::read_to_string(&self.link)
            .with_context(|| format!("Failed to read {}", self.link.display()))?;
        let link = link.trim();

        Ok((!link.is_empty()).then(|| link.to_string()))
    }

    pub fn write_link(&self, url: &str) -> Result<()> {
        write_atomic(&self.link, url.as_bytes())
    }

    /// File name used when uploading the image
    pub fn file_name(&self) -> String {
        self.image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "cover.png".to_string())
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Write through a temp file and rename, so readers never see a partial file
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = with_suffix(path, ".tmp");
    fs::write(&tmp, bytes).with_context(|| format!("Failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("Failed to rename {}", path.display()))?;
    Ok(())
}
