//! File lookup.

use super::naming::{self, file_extension};
use super::path::has_protocol;
use super::service::{DirectoryOf, FileOf, FileService};
use crate::error::{FileError, Result, ServiceError};
use crate::platform::{Entry, EntryFlags, FileInfo, FileSystem, Platform};

/// A file given by path, by handle, or as an already read [`FileInfo`].
#[derive(Debug, Clone)]
pub enum FileSource<F> {
    Path(String),
    Entry(F),
    Info(FileInfo),
}

impl<F> From<&str> for FileSource<F> {
    fn from(path: &str) -> Self {
        Self::Path(path.to_string())
    }
}

impl<F> From<String> for FileSource<F> {
    fn from(path: String) -> Self {
        Self::Path(path)
    }
}

impl<F> From<FileInfo> for FileSource<F> {
    fn from(info: FileInfo) -> Self {
        Self::Info(info)
    }
}

impl<P: Platform> FileService<P> {
    fn file_entry_error(&self, path: &str, e: FileError) -> ServiceError {
        let reason = self.codes.file(e.code);
        tracing::debug!(path, code = e.code, reason, "Failed to retrieve file");
        ServiceError::FileEntry {
            path: path.to_string(),
            code: e.code,
            reason,
        }
    }

    /// Get a file handle.
    ///
    /// URLs such as `file://...` go straight to the platform URL resolver.
    /// Other paths are resolved against the root path (or `root`) and opened
    /// with `flags`, which default to open-only.
    pub async fn get_file_entry(
        &self,
        path: &str,
        root: Option<&DirectoryOf<P>>,
        flags: Option<EntryFlags>,
    ) -> Result<FileOf<P>> {
        let fs = self.file_system().await?;

        if has_protocol(path) {
            return fs
                .resolve_url(path)
                .await
                .map_err(|e| self.file_entry_error(path, e));
        }

        let path = self.resolve_path(path, root.is_some()).await?;
        let parent = root.unwrap_or(fs.root());

        fs.get_file(parent, &path, flags.unwrap_or(EntryFlags::OPEN))
            .await
            .map_err(|e| self.file_entry_error(&path, e))
    }

    /// Read the file object for a path, handle or file.
    pub async fn get_file(&self, source: FileSource<FileOf<P>>) -> Result<FileInfo> {
        let entry = match source {
            FileSource::Info(info) => return Ok(info),
            FileSource::Entry(entry) => entry,
            FileSource::Path(path) => self.get_file_entry(&path, None, None).await?,
        };

        let fs = self.file_system().await?;
        fs.file(&entry)
            .await
            .map_err(|e| self.file_entry_error(entry.full_path(), e))
    }

    /// Whether a file exists at `path`. Any lookup failure counts as missing.
    pub async fn file_exists(&self, path: &str) -> bool {
        match self.get_file_entry(path, None, None).await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(path, error = %e, "File does not exist");
                false
            }
        }
    }

    /// Name of a file: the handle's name, or the last segment of a path.
    pub fn get_file_name(&self, source: &FileSource<FileOf<P>>) -> String {
        match source {
            FileSource::Path(path) => naming::file_name(path).to_string(),
            FileSource::Entry(entry) => entry.name().to_string(),
            FileSource::Info(info) => info.name.clone(),
        }
    }

    /// Extension of a file name. See [`naming::file_extension`].
    pub fn get_file_extension(&self, file_name: &str, to_lower: bool, include_dot: bool) -> String {
        file_extension(file_name, to_lower, include_dot)
    }

    /// Cache directory for an order, relative to the root path.
    pub fn get_cache_dir(&self, order_id: &str) -> String {
        naming::cache_dir(order_id)
    }
}
