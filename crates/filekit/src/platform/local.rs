//! Sandboxed local filesystem platform.
//!
//! Each storage kind maps to a directory under a configured sandbox root on
//! disk. Entry paths are validated so nothing escapes the sandbox:
//! - `..` components are rejected
//! - URLs are canonicalized and must resolve inside the sandbox
//! - copy/move target names may not contain separators

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use url::Url;

use super::{
    DirEntry, Entry, EntryFlags, FileInfo, FileSystem, HttpTransport, Platform, ReadinessGate,
    StorageKind,
};
use crate::config::Config;
use crate::error::{file_codes, FileError};
use crate::files::mime::guess_mime_type;

/// Map an IO error to a native filesystem error code.
fn io_error(err: std::io::Error) -> FileError {
    let code = match err.kind() {
        ErrorKind::NotFound => file_codes::NOT_FOUND_ERR,
        ErrorKind::PermissionDenied => file_codes::SECURITY_ERR,
        ErrorKind::AlreadyExists => file_codes::PATH_EXISTS_ERR,
        ErrorKind::InvalidInput => file_codes::ENCODING_ERR,
        _ => file_codes::INVALID_STATE_ERR,
    };
    FileError::new(code)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct EntryPath {
    name: String,
    full_path: String,
    disk_path: PathBuf,
}

impl EntryPath {
    fn new(full_path: String, disk_path: PathBuf) -> Self {
        let name = full_path.rsplit('/').next().unwrap_or_default().to_string();
        Self {
            name,
            full_path,
            disk_path,
        }
    }
}

/// Directory handle on the local filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalDirectory(EntryPath);

impl LocalDirectory {
    /// Location of the directory on disk.
    pub fn disk_path(&self) -> &Path {
        &self.0.disk_path
    }
}

impl Entry for LocalDirectory {
    fn name(&self) -> &str {
        &self.0.name
    }

    fn full_path(&self) -> &str {
        &self.0.full_path
    }

    fn to_url(&self) -> String {
        Url::from_directory_path(&self.0.disk_path)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| format!("file://{}/", self.0.disk_path.display()))
    }
}

/// File handle on the local filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile(EntryPath);

impl LocalFile {
    /// Location of the file on disk.
    pub fn disk_path(&self) -> &Path {
        &self.0.disk_path
    }
}

impl Entry for LocalFile {
    fn name(&self) -> &str {
        &self.0.name
    }

    fn full_path(&self) -> &str {
        &self.0.full_path
    }

    fn to_url(&self) -> String {
        Url::from_file_path(&self.0.disk_path)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| format!("file://{}", self.0.disk_path.display()))
    }
}

/// Filesystem rooted at a sandbox directory on disk.
#[derive(Debug)]
pub struct LocalFileSystem {
    base: PathBuf,
    root: LocalDirectory,
}

impl LocalFileSystem {
    /// Open (creating if needed) a filesystem rooted at `base`.
    pub async fn open(base: impl AsRef<Path>) -> Result<Self, FileError> {
        let base = base.as_ref();
        fs::create_dir_all(base).await.map_err(io_error)?;
        let base = fs::canonicalize(base).await.map_err(io_error)?;

        let root = LocalDirectory(EntryPath::new("/".to_string(), base.clone()));
        Ok(Self { base, root })
    }

    /// Sandbox directory on disk.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Resolve `path` against `parent_full` into a full path and a disk path.
    fn locate(&self, parent_full: &str, path: &str) -> Result<(String, PathBuf), FileError> {
        let joined = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("{}/{}", parent_full, path)
        };

        let mut segments = Vec::new();
        for segment in joined.split('/') {
            match segment {
                "" | "." => continue,
                ".." => return Err(FileError::new(file_codes::SECURITY_ERR)),
                s => segments.push(s),
            }
        }

        let full_path = format!("/{}", segments.join("/"));
        let disk_path = segments
            .iter()
            .fold(self.base.clone(), |acc, segment| acc.join(segment));

        Ok((full_path, disk_path))
    }

    /// Map a canonical disk path inside the sandbox back to a full path.
    fn full_path_of(&self, disk_path: &Path) -> Result<String, FileError> {
        let relative = disk_path
            .strip_prefix(&self.base)
            .map_err(|_| FileError::new(file_codes::SECURITY_ERR))?;

        let segments: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();

        Ok(format!("/{}", segments.join("/")))
    }

    /// Pick and validate the target path for a copy or move.
    async fn transfer_target(
        &self,
        entry: &LocalFile,
        dest: &LocalDirectory,
        new_name: Option<&str>,
    ) -> Result<(String, PathBuf), FileError> {
        let name = new_name.filter(|n| !n.is_empty()).unwrap_or(entry.name());
        if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
            return Err(FileError::new(file_codes::ENCODING_ERR));
        }

        let dest_meta = fs::metadata(dest.disk_path()).await.map_err(io_error)?;
        if !dest_meta.is_dir() {
            return Err(FileError::new(file_codes::TYPE_MISMATCH_ERR));
        }

        let (full_path, disk_path) = self.locate(dest.full_path(), name)?;
        if disk_path == entry.disk_path() {
            return Err(FileError::new(file_codes::INVALID_MODIFICATION_ERR));
        }

        if let Ok(meta) = fs::metadata(&disk_path).await {
            if meta.is_dir() {
                return Err(FileError::new(file_codes::INVALID_MODIFICATION_ERR));
            }
        }

        Ok((full_path, disk_path))
    }
}

impl FileSystem for LocalFileSystem {
    type Directory = LocalDirectory;
    type File = LocalFile;

    fn root(&self) -> &LocalDirectory {
        &self.root
    }

    async fn get_directory(
        &self,
        parent: &LocalDirectory,
        path: &str,
        flags: EntryFlags,
    ) -> Result<LocalDirectory, FileError> {
        let (full_path, disk_path) = self.locate(parent.full_path(), path)?;

        match fs::metadata(&disk_path).await {
            Ok(meta) => {
                if !meta.is_dir() {
                    return Err(FileError::new(file_codes::TYPE_MISMATCH_ERR));
                }
                if flags.create && flags.exclusive {
                    return Err(FileError::new(file_codes::PATH_EXISTS_ERR));
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if !flags.create {
                    return Err(FileError::new(file_codes::NOT_FOUND_ERR));
                }
                // Only the last segment is created; a missing parent is NOT_FOUND.
                match fs::create_dir(&disk_path).await {
                    Ok(()) => tracing::debug!(path = %full_path, "Created directory"),
                    Err(e) if e.kind() == ErrorKind::AlreadyExists && !flags.exclusive => {}
                    Err(e) => return Err(io_error(e)),
                }
            }
            Err(e) => return Err(io_error(e)),
        }

        Ok(LocalDirectory(EntryPath::new(full_path, disk_path)))
    }

    async fn get_file(
        &self,
        parent: &LocalDirectory,
        path: &str,
        flags: EntryFlags,
    ) -> Result<LocalFile, FileError> {
        let (full_path, disk_path) = self.locate(parent.full_path(), path)?;

        match fs::metadata(&disk_path).await {
            Ok(meta) => {
                if meta.is_dir() {
                    return Err(FileError::new(file_codes::TYPE_MISMATCH_ERR));
                }
                if flags.create && flags.exclusive {
                    return Err(FileError::new(file_codes::PATH_EXISTS_ERR));
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if !flags.create {
                    return Err(FileError::new(file_codes::NOT_FOUND_ERR));
                }
                match fs::OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .open(&disk_path)
                    .await
                {
                    Ok(_) => tracing::debug!(path = %full_path, "Created file"),
                    Err(e) if e.kind() == ErrorKind::AlreadyExists && !flags.exclusive => {}
                    Err(e) => return Err(io_error(e)),
                }
            }
            Err(e) => return Err(io_error(e)),
        }

        Ok(LocalFile(EntryPath::new(full_path, disk_path)))
    }

    async fn resolve_url(&self, url: &str) -> Result<LocalFile, FileError> {
        let parsed = Url::parse(url).map_err(|_| FileError::new(file_codes::ENCODING_ERR))?;
        if parsed.scheme() != "file" {
            return Err(FileError::new(file_codes::ENCODING_ERR));
        }
        let path = parsed
            .to_file_path()
            .map_err(|_| FileError::new(file_codes::ENCODING_ERR))?;

        let canonical = fs::canonicalize(&path).await.map_err(io_error)?;
        if !canonical.starts_with(&self.base) {
            tracing::warn!(url = %url, "URL resolves outside of the sandbox");
            return Err(FileError::new(file_codes::SECURITY_ERR));
        }

        let meta = fs::metadata(&canonical).await.map_err(io_error)?;
        if meta.is_dir() {
            return Err(FileError::new(file_codes::TYPE_MISMATCH_ERR));
        }

        let full_path = self.full_path_of(&canonical)?;
        Ok(LocalFile(EntryPath::new(full_path, canonical)))
    }

    async fn read_entries(
        &self,
        dir: &LocalDirectory,
    ) -> Result<Vec<DirEntry<LocalDirectory, LocalFile>>, FileError> {
        let mut reader = fs::read_dir(dir.disk_path()).await.map_err(io_error)?;
        let mut results = Vec::new();

        while let Some(child) = reader.next_entry().await.map_err(io_error)? {
            let file_type = match child.file_type().await {
                Ok(t) => t,
                Err(_) => continue, // Skip entries we can't stat
            };

            let name = child.file_name().to_string_lossy().to_string();
            let full_path = if dir.full_path() == "/" {
                format!("/{}", name)
            } else {
                format!("{}/{}", dir.full_path(), name)
            };
            let entry = EntryPath::new(full_path, child.path());

            if file_type.is_dir() {
                results.push(DirEntry::Directory(LocalDirectory(entry)));
            } else if file_type.is_file() {
                results.push(DirEntry::File(LocalFile(entry)));
            }
        }

        // Directories first, then files, each by name
        results.sort_by(|a, b| match (a.is_directory(), b.is_directory()) {
            (true, false) => std::cmp::Ordering::Less,
            (false, true) => std::cmp::Ordering::Greater,
            _ => a.name().to_lowercase().cmp(&b.name().to_lowercase()),
        });

        Ok(results)
    }

    async fn file(&self, entry: &LocalFile) -> Result<FileInfo, FileError> {
        let meta = fs::metadata(entry.disk_path()).await.map_err(io_error)?;
        if meta.is_dir() {
            return Err(FileError::new(file_codes::TYPE_MISMATCH_ERR));
        }

        let mime = guess_mime_type(entry.name());
        Ok(FileInfo {
            name: entry.name().to_string(),
            mime_type: (!mime.is_empty()).then(|| mime.to_string()),
            size: meta.len(),
            last_modified: meta.modified().ok(),
            url: entry.to_url(),
        })
    }

    async fn copy_to(
        &self,
        entry: &LocalFile,
        dest: &LocalDirectory,
        new_name: Option<&str>,
    ) -> Result<LocalFile, FileError> {
        let (full_path, disk_path) = self.transfer_target(entry, dest, new_name).await?;
        fs::copy(entry.disk_path(), &disk_path)
            .await
            .map_err(io_error)?;
        Ok(LocalFile(EntryPath::new(full_path, disk_path)))
    }

    async fn move_to(
        &self,
        entry: &LocalFile,
        dest: &LocalDirectory,
        new_name: Option<&str>,
    ) -> Result<LocalFile, FileError> {
        let (full_path, disk_path) = self.transfer_target(entry, dest, new_name).await?;
        fs::rename(entry.disk_path(), &disk_path)
            .await
            .map_err(io_error)?;
        Ok(LocalFile(EntryPath::new(full_path, disk_path)))
    }
}

/// Platform backed by a sandbox directory and an HTTP transport.
#[derive(Debug)]
pub struct LocalPlatform {
    root_dir: PathBuf,
    root_path: String,
    user_agent: String,
    gate: ReadinessGate,
}

impl LocalPlatform {
    /// Create a platform storing files under `root_dir`, with relative
    /// paths placed under `root_path`.
    pub fn new(root_dir: impl Into<PathBuf>, root_path: impl Into<String>) -> Self {
        let root_path: String = root_path.into();
        Self {
            root_dir: root_dir.into(),
            root_path: root_path.trim_end_matches('/').to_string(),
            user_agent: crate::config::default_user_agent(),
            gate: ReadinessGate::opened(),
        }
    }

    /// Create a platform from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.storage.root_dir, config.storage.root_path.clone())
            .with_user_agent(config.transfer.user_agent.clone())
    }

    /// Set the user agent used by the transport.
    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }

    /// Sandbox directory for a storage kind.
    pub fn storage_dir(&self, kind: StorageKind) -> PathBuf {
        self.root_dir.join(kind.to_string())
    }
}

impl Platform for LocalPlatform {
    type FileSystem = LocalFileSystem;
    type Transport = HttpTransport;

    fn readiness(&self) -> &ReadinessGate {
        &self.gate
    }

    async fn root_path(&self) -> Result<String, String> {
        Ok(self.root_path.clone())
    }

    async fn request_file_system(
        &self,
        kind: StorageKind,
        size: u64,
    ) -> Result<LocalFileSystem, FileError> {
        tracing::debug!(%kind, size, "Opening local file system");
        LocalFileSystem::open(self.storage_dir(kind)).await
    }

    fn create_transport(&self) -> HttpTransport {
        HttpTransport::new(self.user_agent.clone())
    }
}
