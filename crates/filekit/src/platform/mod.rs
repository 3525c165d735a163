//! Platform abstraction for the native filesystem and transfer facilities.
//!
//! The file service never touches disk or network itself. Everything goes
//! through a [`Platform`], which supplies:
//! - a readiness gate that must open before any native access
//! - the device root path under which relative paths are stored
//! - filesystems (one per [`StorageKind`])
//! - a transfer object for downloads and uploads
//!
//! [`LocalPlatform`] is the bundled implementation, backed by a sandbox
//! directory on disk and an HTTP transport.

pub mod http;
pub mod local;
pub mod ready;

use std::collections::HashMap;
use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::error::{FileError, TransferError};

pub use http::HttpTransport;
pub use local::{LocalDirectory, LocalFile, LocalFileSystem, LocalPlatform};
pub use ready::ReadinessGate;

/// Storage area requested from the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Storage the platform may evict.
    Temporary,
    /// Storage that survives restarts.
    #[default]
    Persistent,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Temporary => write!(f, "temporary"),
            Self::Persistent => write!(f, "persistent"),
        }
    }
}

/// Flags for retrieving an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntryFlags {
    /// Create the entry when it does not exist.
    pub create: bool,
    /// Fail when `create` is set and the entry already exists.
    pub exclusive: bool,
}

impl EntryFlags {
    /// Retrieve only, never create.
    pub const OPEN: Self = Self {
        create: false,
        exclusive: false,
    };

    /// Create when missing, reuse when present.
    pub const CREATE: Self = Self {
        create: true,
        exclusive: false,
    };
}

/// Common surface of file and directory handles.
pub trait Entry: Clone + fmt::Debug + Send + Sync {
    /// Entry name (last path segment).
    fn name(&self) -> &str;

    /// Path from the filesystem root, starting with `/`.
    fn full_path(&self) -> &str;

    /// URL form of the entry.
    fn to_url(&self) -> String;

    /// URL understood by the native transfer facility.
    fn to_native_url(&self) -> String {
        self.to_url()
    }
}

/// File object behind a file handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// File name.
    pub name: String,
    /// MIME type reported by the platform, if any.
    pub mime_type: Option<String>,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub last_modified: Option<SystemTime>,
    /// URL of the file.
    pub url: String,
}

/// A child of a directory.
#[derive(Debug, Clone)]
pub enum DirEntry<D, F> {
    Directory(D),
    File(F),
}

impl<D: Entry, F: Entry> DirEntry<D, F> {
    pub fn name(&self) -> &str {
        match self {
            Self::Directory(d) => d.name(),
            Self::File(f) => f.name(),
        }
    }

    pub fn full_path(&self) -> &str {
        match self {
            Self::Directory(d) => d.full_path(),
            Self::File(f) => f.full_path(),
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Self::Directory(_))
    }
}

/// Options for a download.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadOptions {
    /// Extra request headers.
    pub headers: HashMap<String, String>,
}

/// HTTP method used for uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UploadMethod {
    #[default]
    Post,
    Put,
}

/// Options for an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadOptions {
    /// Name of the form field carrying the file.
    pub file_key: String,
    /// File name sent to the server.
    pub file_name: String,
    /// MIME type of the file part. Empty means unknown.
    pub mime_type: Option<String>,
    /// Extra form fields.
    pub params: HashMap<String, String>,
    /// Extra request headers.
    pub headers: HashMap<String, String>,
    /// HTTP method.
    pub method: UploadMethod,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            file_key: "file".to_string(),
            file_name: String::new(),
            mime_type: None,
            params: HashMap::new(),
            headers: HashMap::new(),
            method: UploadMethod::Post,
        }
    }
}

/// Result of a completed upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    /// Number of file bytes sent.
    pub bytes_sent: u64,
    /// HTTP status code of the response.
    pub response_code: u16,
    /// Response body.
    pub response: String,
    /// Response headers.
    pub headers: HashMap<String, String>,
}

/// Native filesystem operations.
///
/// Paths passed to `get_directory`/`get_file` are relative to `parent`
/// unless they start with `/`, in which case they are relative to the
/// filesystem root.
#[allow(async_fn_in_trait)]
pub trait FileSystem: Send + Sync {
    type Directory: Entry;
    type File: Entry;

    /// Root directory of this filesystem.
    fn root(&self) -> &Self::Directory;

    /// Get (and optionally create) a directory.
    async fn get_directory(
        &self,
        parent: &Self::Directory,
        path: &str,
        flags: EntryFlags,
    ) -> Result<Self::Directory, FileError>;

    /// Get (and optionally create) a file.
    async fn get_file(
        &self,
        parent: &Self::Directory,
        path: &str,
        flags: EntryFlags,
    ) -> Result<Self::File, FileError>;

    /// Resolve a URL such as `file:///...` to a file handle.
    async fn resolve_url(&self, url: &str) -> Result<Self::File, FileError>;

    /// List the children of a directory.
    async fn read_entries(
        &self,
        dir: &Self::Directory,
    ) -> Result<Vec<DirEntry<Self::Directory, Self::File>>, FileError>;

    /// Read the file object behind a handle.
    async fn file(&self, entry: &Self::File) -> Result<FileInfo, FileError>;

    /// Copy a file into `dest`, optionally under a new name.
    async fn copy_to(
        &self,
        entry: &Self::File,
        dest: &Self::Directory,
        new_name: Option<&str>,
    ) -> Result<Self::File, FileError>;

    /// Move a file into `dest`, optionally under a new name.
    async fn move_to(
        &self,
        entry: &Self::File,
        dest: &Self::Directory,
        new_name: Option<&str>,
    ) -> Result<Self::File, FileError>;
}

/// Native transfer operations.
#[allow(async_fn_in_trait)]
pub trait Transport: Send + Sync {
    /// Download `source` into the file at URL `target`.
    async fn download(
        &self,
        source: &str,
        target: &str,
        trust_all: bool,
        options: &DownloadOptions,
    ) -> Result<(), TransferError>;

    /// Upload the local file at `file_url` to `server_url`.
    async fn upload(
        &self,
        file_url: &str,
        server_url: &str,
        options: &UploadOptions,
        trust_all: bool,
    ) -> Result<UploadResult, TransferError>;
}

/// Host platform providing native facilities.
#[allow(async_fn_in_trait)]
pub trait Platform: Send + Sync {
    type FileSystem: FileSystem;
    type Transport: Transport;

    /// Gate that opens once the native bridge is initialized.
    fn readiness(&self) -> &ReadinessGate;

    /// Base storage path for relative user paths.
    async fn root_path(&self) -> Result<String, String>;

    /// Request a filesystem. `size` is the expected usage in bytes, 0 if unknown.
    async fn request_file_system(
        &self,
        kind: StorageKind,
        size: u64,
    ) -> Result<Self::FileSystem, FileError>;

    /// Create the transfer object.
    fn create_transport(&self) -> Self::Transport;
}
