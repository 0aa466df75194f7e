//! Scoped on-disk buffers for image downloads and uploads.
//!
//! Three well-known roots are created once at startup. Handles wrap
//! [`tempfile::NamedTempFile`], so the backing file is removed on drop on
//! every exit path, including errors and cancellation.

use std::path::{Path, PathBuf};

use skinforge_core::error::GenerateError;
use skinforge_core::images::{MAX_IMAGE_BYTES, MIN_IMAGE_BYTES, PNG_MIME};
use tempfile::NamedTempFile;

use super::EngineError;

/// Which root a buffer belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempKind {
    /// Downloads of user-supplied URLs.
    UrlDownload,
    /// Copies of uploaded bytes.
    Upload,
    /// Re-fetches of what the upstream actually stored.
    UpstreamFetch,
}

/// The three temp roots, created once at startup.
#[derive(Debug, Clone)]
pub struct TempRoots {
    url: PathBuf,
    upload: PathBuf,
    fetch: PathBuf,
}

impl TempRoots {
    /// Create (or reuse) the root directories under `base`.
    pub fn create(base: &Path) -> std::io::Result<Self> {
        let roots = Self {
            url: base.join("url"),
            upload: base.join("upload"),
            fetch: base.join("fetch"),
        };
        for dir in [&roots.url, &roots.upload, &roots.fetch] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(roots)
    }

    /// Acquire a scoped file in the root for `kind`.
    pub fn acquire(&self, kind: TempKind) -> std::io::Result<TempSkinFile> {
        let dir = match kind {
            TempKind::UrlDownload => &self.url,
            TempKind::Upload => &self.upload,
            TempKind::UpstreamFetch => &self.fetch,
        };
        let inner = tempfile::Builder::new()
            .prefix("skin-")
            .suffix(".png")
            .tempfile_in(dir)?;
        Ok(TempSkinFile { inner })
    }
}

/// A scoped on-disk buffer; the backing file is deleted on drop.
pub struct TempSkinFile {
    inner: NamedTempFile,
}

impl TempSkinFile {
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    pub async fn write_bytes(&self, bytes: &[u8]) -> std::io::Result<()> {
        tokio::fs::write(self.path(), bytes).await
    }
}

/// Stream a response body into `file`, returning the bytes.
///
/// Enforces the size cap while streaming and requires `image/png` at
/// completion.
pub async fn download_to(
    http: &reqwest::Client,
    url: &str,
    file: &TempSkinFile,
    max_bytes: usize,
) -> Result<Vec<u8>, EngineError> {
    let mut response = http
        .get(url)
        .send()
        .await
        .map_err(|e| GenerateError::InvalidImageUrl(format!("download failed: {e}")))?;

    if !response.status().is_success() {
        return Err(GenerateError::InvalidImageUrl(format!(
            "download returned status {}",
            response.status()
        ))
        .into());
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !content_type.starts_with(PNG_MIME) {
        return Err(GenerateError::InvalidImage(format!(
            "content type must be {PNG_MIME}, got {content_type}"
        ))
        .into());
    }

    let mut buf: Vec<u8> = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| GenerateError::InvalidImageUrl(format!("download interrupted: {e}")))?
    {
        if buf.len() + chunk.len() > max_bytes {
            return Err(GenerateError::InvalidImage(format!(
                "image exceeds {max_bytes} bytes"
            ))
            .into());
        }
        buf.extend_from_slice(&chunk);
    }

    if buf.len() < MIN_IMAGE_BYTES {
        return Err(GenerateError::InvalidImage(format!(
            "image size must be between {MIN_IMAGE_BYTES} and {MAX_IMAGE_BYTES} bytes, got {}",
            buf.len()
        ))
        .into());
    }

    file.write_bytes(&buf).await?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_is_removed_on_drop() {
        let base = tempfile::tempdir().unwrap();
        let roots = TempRoots::create(base.path()).unwrap();

        let file = roots.acquire(TempKind::Upload).unwrap();
        let path = file.path().to_path_buf();
        assert!(path.exists());

        drop(file);
        assert!(!path.exists());
    }

    #[test]
    fn roots_are_created_per_kind() {
        let base = tempfile::tempdir().unwrap();
        let roots = TempRoots::create(base.path()).unwrap();

        let url = roots.acquire(TempKind::UrlDownload).unwrap();
        let upload = roots.acquire(TempKind::Upload).unwrap();
        let fetch = roots.acquire(TempKind::UpstreamFetch).unwrap();

        assert!(url.path().starts_with(base.path().join("url")));
        assert!(upload.path().starts_with(base.path().join("upload")));
        assert!(fetch.path().starts_with(base.path().join("fetch")));
    }
}
