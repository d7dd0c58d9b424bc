//! Remote image resolution for listing photos.
//!
//! Google Drive share links are rewritten into direct-download form and
//! fetched over HTTP (following exactly one redirect hop), with the bytes
//! streamed to a uniquely named file under the public media directory. Any
//! failure degrades to the original URL, so one bad image never fails an
//! otherwise-good property record.

use anyhow::{Context, Result};
use regex::Regex;
use reqwest::header::LOCATION;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

const DRIVE_HOST: &str = "drive.google.com";
const DRIVE_DOWNLOAD_URL: &str = "https://drive.google.com/uc?export=download";

/// Transport seam so tests can exercise the fallback policy without a
/// network. The production implementation is [`HttpFetcher`].
#[async_trait::async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Fetch `url` and write the response body to `dest`. Implementations
    /// must not leave a partial file behind on failure.
    async fn fetch_to_file(&self, url: &str, dest: &Path) -> Result<()>;
}

/// reqwest-backed fetcher. Automatic redirects are disabled so the
/// single-hop rule is enforced here: a 301/302 is followed once to its
/// `Location`, anything further is a download failure.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl ImageFetcher for HttpFetcher {
    async fn fetch_to_file(&self, url: &str, dest: &Path) -> Result<()> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Request failed: {}", url))?;

        let resp = if matches!(resp.status().as_u16(), 301 | 302) {
            let location = resp
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .context("Redirect response without Location header")?;
            // Location may be relative; resolve against the redirecting URL
            let target = resp
                .url()
                .join(location)
                .context("Invalid redirect Location")?;
            debug!("Following redirect to {}", target);
            self.client
                .get(target)
                .send()
                .await
                .context("Redirect request failed")?
        } else {
            resp
        };

        let mut resp = resp
            .error_for_status()
            .context("Image host returned an error status")?;

        let mut file = tokio::fs::File::create(dest)
            .await
            .with_context(|| format!("Failed to create {:?}", dest))?;

        let written = async {
            while let Some(chunk) = resp.chunk().await? {
                file.write_all(&chunk).await?;
            }
            file.flush().await?;
            Ok::<_, anyhow::Error>(())
        }
        .await;

        if written.is_err() {
            drop(file);
            let _ = tokio::fs::remove_file(dest).await;
        }
        written
    }
}

/// Resolves a property's raw image URLs into locally served media paths.
pub struct ImageResolver {
    fetcher: Arc<dyn ImageFetcher>,
    /// Filesystem directory downloads land in (created on demand).
    media_dir: PathBuf,
    /// Prefix of the returned public path, e.g. `/uploads/properties`.
    public_prefix: String,
    drive_file_re: Regex,
    drive_id_re: Regex,
}

impl ImageResolver {
    pub fn new(media_dir: PathBuf, public_prefix: String, timeout: Duration) -> Result<Self> {
        let fetcher = Arc::new(HttpFetcher::new(timeout)?);
        Ok(Self::with_fetcher(fetcher, media_dir, public_prefix))
    }

    pub fn with_fetcher(
        fetcher: Arc<dyn ImageFetcher>,
        media_dir: PathBuf,
        public_prefix: String,
    ) -> Self {
        Self {
            fetcher,
            media_dir,
            public_prefix: public_prefix.trim_end_matches('/').to_string(),
            drive_file_re: Regex::new(r"/file/d/([A-Za-z0-9_-]+)").unwrap(),
            drive_id_re: Regex::new(r"[?&]id=([A-Za-z0-9_-]+)").unwrap(),
        }
    }

    /// Rewrite a Drive share link into its direct-download form. Returns
    /// `None` for non-Drive URLs and for Drive URLs with no recognizable
    /// file id; those must not be fetched at all.
    pub fn direct_download_url(&self, url: &str) -> Option<String> {
        if !url.contains(DRIVE_HOST) {
            return None;
        }
        let id = self
            .drive_file_re
            .captures(url)
            .or_else(|| self.drive_id_re.captures(url))
            .and_then(|c| c.get(1))?;
        Some(format!("{}&id={}", DRIVE_DOWNLOAD_URL, id.as_str()))
    }

    /// Resolve one image URL to the value persisted on the record:
    /// a local media path when the URL is a downloadable share link, or the
    /// URL itself (pass-through for direct URLs, fallback on any failure).
    pub async fn resolve_image(&self, url: &str) -> String {
        let Some(direct_url) = self.direct_download_url(url) else {
            // Not a share link, already directly fetchable; keep as-is
            return url.to_string();
        };

        match self.download_image(&direct_url).await {
            Ok(path) => path,
            Err(e) => {
                warn!("Image download failed for {}: {:#}. Keeping original URL", url, e);
                url.to_string()
            }
        }
    }

    /// Resolve a property's full image list sequentially, preserving order
    /// (index 0 stays the primary image). One URL at a time so a failure is
    /// attributable to a specific URL.
    pub async fn process_property_images(&self, urls: &[String]) -> Vec<String> {
        let mut resolved = Vec::with_capacity(urls.len());
        for url in urls {
            resolved.push(self.resolve_image(url).await);
        }
        resolved
    }

    /// Concurrent variant for batch pre-warming. Not used on the per-record
    /// import path, which stays sequential for failure attribution.
    #[allow(dead_code)]
    pub async fn resolve_images_concurrent(self: &Arc<Self>, urls: Vec<String>) -> Vec<String> {
        let mut out = urls.clone();
        let mut set = tokio::task::JoinSet::new();
        for (i, url) in urls.into_iter().enumerate() {
            let resolver = Arc::clone(self);
            set.spawn(async move { (i, resolver.resolve_image(&url).await) });
        }
        while let Some(joined) = set.join_next().await {
            if let Ok((i, path)) = joined {
                out[i] = path;
            }
        }
        out
    }

    async fn download_image(&self, direct_url: &str) -> Result<String> {
        tokio::fs::create_dir_all(&self.media_dir)
            .await
            .with_context(|| format!("Failed to create media dir {:?}", self.media_dir))?;

        // Always .jpg regardless of source content type, matching what the
        // rest of the site expects of imported media.
        let filename = format!("{}.jpg", Uuid::new_v4().simple());
        let dest = self.media_dir.join(&filename);

        self.fetcher.fetch_to_file(direct_url, &dest).await?;

        debug!("Downloaded {} -> {:?}", direct_url, dest);
        Ok(format!("{}/{}", self.public_prefix, filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fetcher double: either writes a stub file or fails, counting calls.
    struct FakeFetcher {
        fail: bool,
        calls: AtomicUsize,
    }

    impl FakeFetcher {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                fail,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait::async_trait]
    impl ImageFetcher for FakeFetcher {
        async fn fetch_to_file(&self, _url: &str, dest: &Path) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("connection reset by peer");
            }
            tokio::fs::write(dest, b"jpeg bytes").await?;
            Ok(())
        }
    }

    fn resolver(fetcher: Arc<FakeFetcher>, dir: &Path) -> ImageResolver {
        ImageResolver::with_fetcher(fetcher, dir.to_path_buf(), "/uploads/properties".into())
    }

    #[test]
    fn test_drive_file_path_shape() {
        let r = resolver(FakeFetcher::new(false), Path::new("unused"));
        let direct = r
            .direct_download_url("https://drive.google.com/file/d/ABC123/view?usp=sharing")
            .unwrap();
        assert_eq!(direct, "https://drive.google.com/uc?export=download&id=ABC123");
    }

    #[test]
    fn test_drive_id_param_shape() {
        let r = resolver(FakeFetcher::new(false), Path::new("unused"));
        let direct = r
            .direct_download_url("https://drive.google.com/open?id=XYZ_9-8")
            .unwrap();
        assert!(direct.ends_with("id=XYZ_9-8"));
    }

    #[test]
    fn test_unrecognized_urls_not_rewritten() {
        let r = resolver(FakeFetcher::new(false), Path::new("unused"));
        assert_eq!(r.direct_download_url("https://example.com/a.jpg"), None);
        // Drive host but no extractable file id
        assert_eq!(r.direct_download_url("https://drive.google.com/drive/my-drive"), None);
    }

    #[tokio::test]
    async fn test_non_share_links_pass_through_without_fetch() {
        let fetcher = FakeFetcher::new(false);
        let r = resolver(fetcher.clone(), Path::new("unused"));

        let out = r.resolve_image("https://cdn.example.com/photo.jpg").await;
        assert_eq!(out, "https://cdn.example.com/photo.jpg");
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_download_failure_falls_back_to_original_url() {
        let dir = tempfile::tempdir().unwrap();
        let r = resolver(FakeFetcher::new(true), dir.path());

        let url = "https://drive.google.com/file/d/ABC123/view";
        assert_eq!(r.resolve_image(url).await, url);
    }

    #[tokio::test]
    async fn test_successful_download_returns_public_path() {
        let dir = tempfile::tempdir().unwrap();
        let r = resolver(FakeFetcher::new(false), dir.path());

        let path = r
            .resolve_image("https://drive.google.com/file/d/ABC123/view")
            .await;
        assert!(path.starts_with("/uploads/properties/"));
        assert!(path.ends_with(".jpg"));

        let filename = path.rsplit('/').next().unwrap();
        assert!(dir.path().join(filename).exists());
    }

    #[tokio::test]
    async fn test_image_list_order_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let r = resolver(FakeFetcher::new(false), dir.path());

        let urls = vec![
            "https://cdn.example.com/primary.jpg".to_string(),
            "https://drive.google.com/file/d/SECOND/view".to_string(),
            "https://cdn.example.com/third.jpg".to_string(),
        ];
        let resolved = r.process_property_images(&urls).await;

        assert_eq!(resolved.len(), 3);
        assert_eq!(resolved[0], urls[0]);
        assert!(resolved[1].starts_with("/uploads/properties/"));
        assert_eq!(resolved[2], urls[2]);
    }

    #[tokio::test]
    async fn test_concurrent_variant_keeps_positions() {
        let dir = tempfile::tempdir().unwrap();
        let r = Arc::new(resolver(FakeFetcher::new(false), dir.path()));

        let urls = vec![
            "https://cdn.example.com/a.jpg".to_string(),
            "https://drive.google.com/file/d/B/view".to_string(),
        ];
        let resolved = r.resolve_images_concurrent(urls.clone()).await;
        assert_eq!(resolved[0], urls[0]);
        assert!(resolved[1].ends_with(".jpg"));
    }
}
