//! # Filekit
//!
//! Async convenience layer over a platform's native filesystem and file
//! transfer facilities.
//!
//! ## Overview
//!
//! - **Path resolution**: relative paths are placed under a device root path,
//!   exactly once
//! - **Directories**: get or create directories, including every missing level
//! - **Files**: look up files by path, handle or URL, check existence
//! - **Transfers**: download with bounded retry, upload with MIME inference,
//!   copy and move
//! - **Names**: file name, extension, MIME and cache directory helpers
//!
//! All disk and network work is delegated to a [`Platform`]. The bundled
//! [`LocalPlatform`] stores files in a sandbox directory and transfers over
//! HTTP(S).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use filekit::{Config, FileService, LocalPlatform};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load_default()?;
//!     let service = FileService::new(LocalPlatform::from_config(&config));
//!
//!     let file = service
//!         .download_file("https://example.com/photo.jpg", "photos/2024", None, None, None)
//!         .await?;
//!     println!("stored at {:?}", file);
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and defaults
//! - [`error`]: Native error codes and service errors
//! - [`files`]: The file service operations
//! - [`platform`]: Platform traits and the local implementation

pub mod config;
pub mod error;
pub mod files;
pub mod platform;

pub use config::Config;

pub use error::{ErrorCodeTable, FileError, ServiceError, TransferError};

pub use files::{
    DirectoryOf, DirectorySource, FileOf, FileService, FileSource, DEFAULT_DOWNLOAD_ATTEMPTS,
};

pub use platform::{
    DirEntry, DownloadOptions, Entry, EntryFlags, FileInfo, FileSystem, HttpTransport,
    LocalDirectory, LocalFile, LocalFileSystem, LocalPlatform, Platform, ReadinessGate,
    StorageKind, Transport, UploadMethod, UploadOptions, UploadResult,
};
