//! The file service facade and its cached platform objects.

use std::sync::Arc;

use tokio::sync::{OnceCell, RwLock};

use super::path::PathResolver;
use crate::error::{ErrorCodeTable, Result, ServiceError};
use crate::platform::{FileSystem, Platform, StorageKind};

/// Directory handle type of a platform.
pub type DirectoryOf<P> = <<P as Platform>::FileSystem as FileSystem>::Directory;

/// File handle type of a platform.
pub type FileOf<P> = <<P as Platform>::FileSystem as FileSystem>::File;

/// Default number of retries after a failed download.
pub const DEFAULT_DOWNLOAD_ATTEMPTS: u32 = 3;

/// Async file service over a [`Platform`].
///
/// The root path, filesystem and transport are obtained lazily and cached for
/// the lifetime of the service. Handles returned by operations are never
/// cached.
pub struct FileService<P: Platform> {
    pub(crate) platform: P,
    resolver: PathResolver,
    file_system: RwLock<Option<Arc<P::FileSystem>>>,
    transport: OnceCell<P::Transport>,
    pub(crate) codes: ErrorCodeTable,
    pub(crate) default_attempts: u32,
}

impl<P: Platform> FileService<P> {
    /// Create a service over `platform`.
    pub fn new(platform: P) -> Self {
        Self {
            platform,
            resolver: PathResolver::new(),
            file_system: RwLock::new(None),
            transport: OnceCell::new(),
            codes: ErrorCodeTable::new(),
            default_attempts: DEFAULT_DOWNLOAD_ATTEMPTS,
        }
    }

    /// Set the number of download retries used when a call does not specify one.
    pub fn with_default_attempts(mut self, attempts: u32) -> Self {
        if attempts > 0 {
            self.default_attempts = attempts;
        }
        self
    }

    /// The underlying platform.
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Error code tables used for messages.
    pub fn error_codes(&self) -> &ErrorCodeTable {
        &self.codes
    }

    async fn wait_ready(&self) -> Result<()> {
        self.platform
            .readiness()
            .wait()
            .await
            .map_err(ServiceError::NotReady)
    }

    /// Get a filesystem.
    ///
    /// Without a kind or size the cached filesystem is returned when there is
    /// one. Otherwise the platform is asked (persistent storage unless
    /// temporary is requested) and the result replaces the cached one.
    pub async fn request_file_system(
        &self,
        kind: Option<StorageKind>,
        size: Option<u64>,
    ) -> Result<Arc<P::FileSystem>> {
        let use_cache = kind.is_none() && size.is_none();

        if use_cache {
            if let Some(fs) = self.file_system.read().await.as_ref() {
                return Ok(Arc::clone(fs));
            }
        }

        let mut slot = self.file_system.write().await;
        if use_cache {
            // Another caller may have filled the slot while we waited
            if let Some(fs) = slot.as_ref() {
                return Ok(Arc::clone(fs));
            }
        }

        self.wait_ready().await?;

        let kind = kind.unwrap_or_default();
        let fs = self
            .platform
            .request_file_system(kind, size.unwrap_or(0))
            .await
            .map_err(|e| {
                tracing::warn!(%kind, code = e.code, "File system error");
                ServiceError::FileSystem { code: e.code }
            })?;

        let fs = Arc::new(fs);
        *slot = Some(Arc::clone(&fs));
        Ok(fs)
    }

    pub(crate) async fn file_system(&self) -> Result<Arc<P::FileSystem>> {
        self.request_file_system(None, None).await
    }

    /// The transfer object, created once the platform is ready.
    pub async fn file_transfer(&self) -> Result<&P::Transport> {
        self.transport
            .get_or_try_init(|| async {
                self.wait_ready().await?;
                tracing::debug!("Created file transfer object");
                Ok(self.platform.create_transport())
            })
            .await
    }

    /// The device root path.
    pub async fn root_path(&self) -> Result<&str> {
        self.resolver.root_path(&self.platform).await
    }

    pub(crate) async fn resolve_path(&self, path: &str, has_root: bool) -> Result<String> {
        self.resolver.resolve(&self.platform, path, has_root).await
    }
}
