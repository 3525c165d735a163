//! Root path resolution.
//!
//! Relative user paths are stored under the device root path. A path is
//! rooted exactly once: paths that already carry the root, start at the
//! filesystem root, or are protocol-qualified URLs pass through unchanged.

use tokio::sync::OnceCell;

use crate::error::{Result, ServiceError};
use crate::platform::Platform;

/// Whether `path` starts with a `scheme://` prefix (e.g. `file://`, `content://`).
pub fn has_protocol(path: &str) -> bool {
    match path.find("://") {
        Some(end) if end > 0 => path[..end].chars().all(|c| c.is_ascii_alphabetic()),
        _ => false,
    }
}

/// Prefix `path` with `root` unless it is already rooted.
pub fn apply_root(root: &str, path: &str) -> String {
    let already_rooted = path == root
        || path.starts_with('/')
        || path
            .strip_prefix(root)
            .is_some_and(|rest| rest.starts_with('/'))
        || has_protocol(path);

    if already_rooted {
        path.to_string()
    } else {
        format!("{}/{}", root, path)
    }
}

/// Resolves paths against the platform root path, which is fetched once.
#[derive(Debug, Default)]
pub struct PathResolver {
    root: OnceCell<String>,
}

impl PathResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// The device root path, resolved on first use.
    pub async fn root_path<P: Platform>(&self, platform: &P) -> Result<&str> {
        self.root
            .get_or_try_init(|| async {
                let root = platform.root_path().await.map_err(ServiceError::RootPath)?;
                tracing::debug!(root = %root, "Resolved device root path");
                Ok(root)
            })
            .await
            .map(String::as_str)
    }

    /// Resolve `path`. With an explicit root handle the path is relative to
    /// that handle and is returned unchanged.
    pub async fn resolve<P: Platform>(
        &self,
        platform: &P,
        path: &str,
        has_root: bool,
    ) -> Result<String> {
        if has_root {
            return Ok(path.to_string());
        }

        let root = self.root_path(platform).await?;
        Ok(apply_root(root, path))
    }
}
