//! Runtime configuration from environment variables.
//!
//! Every variable has a default so the service runs with no `.env` at all;
//! `dotenvy` is loaded in `main` before this is read.

use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_MEDIA_ROOT: &str = "public";
const DEFAULT_MEDIA_PREFIX: &str = "/uploads/properties";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct ImporterConfig {
    /// Address the HTTP server binds to.
    pub bind_addr: String,
    /// Filesystem root served as static content by the site.
    pub media_root: PathBuf,
    /// Public URL prefix under which downloaded images are served.
    pub media_prefix: String,
    /// Per-request timeout for image downloads. A timeout is treated as a
    /// download failure like any other.
    pub http_timeout: Duration,
}

impl ImporterConfig {
    pub fn from_env() -> Self {
        let bind_addr =
            std::env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let media_root = std::env::var("MEDIA_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_MEDIA_ROOT));
        let media_prefix =
            std::env::var("MEDIA_PREFIX").unwrap_or_else(|_| DEFAULT_MEDIA_PREFIX.to_string());

        let timeout_secs = match std::env::var("HTTP_TIMEOUT_SECS") {
            Ok(v) => v.parse::<u64>().unwrap_or_else(|_| {
                warn!("HTTP_TIMEOUT_SECS={} is not a number, using default", v);
                DEFAULT_HTTP_TIMEOUT_SECS
            }),
            Err(_) => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        Self {
            bind_addr,
            media_root,
            media_prefix,
            http_timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Filesystem directory backing the public media prefix.
    pub fn media_dir(&self) -> PathBuf {
        self.media_root
            .join(self.media_prefix.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_dir_joins_root_and_prefix() {
        let config = ImporterConfig {
            bind_addr: DEFAULT_BIND_ADDR.into(),
            media_root: PathBuf::from("public"),
            media_prefix: "/uploads/properties".into(),
            http_timeout: Duration::from_secs(30),
        };
        assert_eq!(config.media_dir(), PathBuf::from("public/uploads/properties"));
    }
}
