//! File service operations.
//!
//! This module provides the caller-facing file operations:
//! - Root path resolution for relative user paths
//! - Directory retrieval, recursive creation and listing
//! - File lookup and existence checks
//! - Downloads with bounded retry, uploads with MIME inference
//! - Copy and move between directories
//! - File name, extension and MIME helpers

pub mod directory;
pub mod locator;
pub mod mime;
pub mod naming;
pub mod path;
pub mod service;
pub mod transfer;

pub use directory::DirectorySource;
pub use locator::FileSource;
pub use mime::{guess_extension, guess_mime_type};
pub use naming::{cache_dir, file_extension, file_name, file_name_from_url};
pub use path::{apply_root, has_protocol, PathResolver};
pub use service::{DirectoryOf, FileOf, FileService, DEFAULT_DOWNLOAD_ATTEMPTS};
