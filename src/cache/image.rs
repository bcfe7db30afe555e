use crate::core::{DecodeError, ImageError};
use crate::providers::HttpTransport;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    WebP,
}

impl ImageFormat {
    /// Identifies the image format from its leading signature bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some(ImageFormat::Png),
            [0xFF, 0xD8, 0xFF, ..] => Some(ImageFormat::Jpeg),
            [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Some(ImageFormat::Gif),
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => {
                Some(ImageFormat::WebP)
            }
            _ => None,
        }
    }
}

/// Disk-backed cache of coin images, falling back to the network on a miss.
///
/// Entries never expire. Two concurrent misses for the same coin both
/// download and both write; whichever write lands last is kept.
pub struct ImageCache {
    root: PathBuf,
    transport: Arc<HttpTransport>,
    write_seq: Arc<AtomicU64>,
}

impl ImageCache {
    pub fn new(root: impl Into<PathBuf>, transport: Arc<HttpTransport>) -> Self {
        Self {
            root: root.into(),
            transport,
            write_seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// On-disk location of the image for `coin_id`. Bytes outside
    /// `[A-Za-z0-9-]` are written as `_xx` hex escapes, so distinct ids never
    /// share a file and no id can leave the cache root.
    pub fn path_for(&self, coin_id: &str) -> PathBuf {
        let mut file_name = String::with_capacity(coin_id.len());
        for byte in coin_id.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' {
                file_name.push(char::from(byte));
            } else {
                file_name.push_str(&format!("_{byte:02x}"));
            }
        }
        self.root.join(format!("{file_name}.img"))
    }

    #[instrument(name = "CoinImageGet", skip(self, source_url))]
    pub async fn get(&self, coin_id: &str, source_url: &str) -> Result<Vec<u8>, ImageError> {
        let path = self.path_for(coin_id);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                debug!("Image cache HIT");
                return Ok(bytes);
            }
            Err(e) if e.kind() == ErrorKind::NotFound => debug!("Image cache MISS"),
            Err(e) => warn!(error = %e, "Unreadable cached image, downloading again"),
        }

        let bytes = self.transport.fetch(source_url).await?;
        let format = ImageFormat::sniff(&bytes).ok_or_else(|| {
            DecodeError::new("coin image", format!("unrecognised image data from {source_url}"))
        })?;
        debug!(?format, bytes = bytes.len(), "Downloaded coin image");

        self.persist_in_background(path, bytes.clone());
        Ok(bytes)
    }

    /// Writes to a unique temp file then renames it into place, so a reader
    /// never observes a partially written image.
    fn persist_in_background(&self, path: PathBuf, bytes: Vec<u8>) {
        let root = self.root.clone();
        let seq = self.write_seq.fetch_add(1, Ordering::Relaxed);
        tokio::spawn(async move {
            if let Err(e) = write_atomically(&root, &path, &bytes, seq).await {
                warn!(path = %path.display(), error = %e, "Failed to cache coin image");
            } else {
                debug!(path = %path.display(), "Cached coin image");
            }
        });
    }
}

async fn write_atomically(root: &Path, path: &Path, bytes: &[u8], seq: u64) -> std::io::Result<()> {
    tokio::fs::create_dir_all(root).await?;
    let tmp = path.with_extension(format!("{}.{seq}.tmp", std::process::id()));
    tokio::fs::write(&tmp, bytes).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}
