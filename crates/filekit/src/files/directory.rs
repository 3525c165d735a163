//! Directory retrieval, recursive creation and listing.

use super::path::has_protocol;
use super::service::{DirectoryOf, FileOf, FileService};
use crate::error::{Result, ServiceError};
use crate::platform::{DirEntry, Entry, EntryFlags, FileSystem, Platform};

/// A directory given either by path or by handle.
#[derive(Debug, Clone)]
pub enum DirectorySource<D> {
    Path(String),
    Handle(D),
}

impl<D> From<&str> for DirectorySource<D> {
    fn from(path: &str) -> Self {
        Self::Path(path.to_string())
    }
}

impl<D> From<String> for DirectorySource<D> {
    fn from(path: String) -> Self {
        Self::Path(path)
    }
}

impl<P: Platform> FileService<P> {
    /// Get a directory, creating it when missing.
    ///
    /// Only the last path segment is created; use
    /// [`get_directory_recursive`](Self::get_directory_recursive) when parents
    /// may be missing too.
    pub async fn get_directory(
        &self,
        path: &str,
        root: Option<&DirectoryOf<P>>,
    ) -> Result<DirectoryOf<P>> {
        let fs = self.file_system().await?;
        let path = self.resolve_path(path, root.is_some()).await?;
        let parent = root.unwrap_or(fs.root());

        fs.get_directory(parent, &path, EntryFlags::CREATE)
            .await
            .map_err(|e| {
                let shown = match root {
                    Some(root) => format!("{}/{}", root.full_path(), path),
                    None => path.clone(),
                };
                let reason = self.codes.file(e.code);
                tracing::warn!(path = %shown, code = e.code, reason, "Error getting directory");
                ServiceError::Directory {
                    path: shown,
                    code: e.code,
                    reason,
                }
            })
    }

    /// Get a directory, creating every missing level of it.
    ///
    /// The whole path is tried first. If that fails, each segment is created
    /// under the previous one, reusing directories that already exist.
    pub async fn get_directory_recursive(
        &self,
        path: &str,
        root: Option<&DirectoryOf<P>>,
    ) -> Result<DirectoryOf<P>> {
        let path = self.resolve_path(path, root.is_some()).await?;

        let direct_err = match self.get_directory(&path, root).await {
            Ok(dir) => return Ok(dir),
            Err(e) => e,
        };

        if has_protocol(&path) {
            return Err(direct_err);
        }

        let mut segments = path.split('/').filter(|s| !s.is_empty()).peekable();
        if segments.peek().is_none() {
            return Err(direct_err);
        }

        tracing::debug!(path = %path, "Creating directory levels");

        let fs = self.file_system().await?;
        let mut parent = match root {
            Some(root) if !path.starts_with('/') => root.clone(),
            _ => fs.root().clone(),
        };

        for segment in segments {
            parent = self.get_directory(segment, Some(&parent)).await?;
        }

        Ok(parent)
    }

    /// List the children of a directory.
    ///
    /// A path is resolved with [`get_directory`](Self::get_directory) first.
    pub async fn get_files_in_directory(
        &self,
        dir: DirectorySource<DirectoryOf<P>>,
    ) -> Result<Vec<DirEntry<DirectoryOf<P>, FileOf<P>>>> {
        let dir = match dir {
            DirectorySource::Path(path) => self.get_directory(&path, None).await?,
            DirectorySource::Handle(handle) => handle,
        };

        let fs = self.file_system().await?;
        fs.read_entries(&dir).await.map_err(|e| {
            let reason = self.codes.file(e.code);
            tracing::warn!(path = %dir.full_path(), code = e.code, reason, "Error getting file list");
            ServiceError::ListDirectory {
                name: dir.name().to_string(),
                code: e.code,
                reason,
            }
        })
    }
}
